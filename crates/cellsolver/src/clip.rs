use geo::Coord;

/// Twice the signed area of a ring (positive when counter-clockwise).
pub(crate) fn signed_area2(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

/// Unsigned area and centroid of a ring.  Degenerate rings report zero area
/// and the vertex mean.
pub(crate) fn area_centroid(ring: &[Coord<f64>]) -> (f64, Coord<f64>) {
    let n = ring.len();
    if n == 0 {
        return (0.0, Coord { x: 0.0, y: 0.0 });
    }
    let mut a2 = 0.0;
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let (p, q) = (ring[i], ring[(i + 1) % n]);
        let cross = p.x * q.y - q.x * p.y;
        a2 += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    if a2.abs() < 1e-18 {
        let inv = 1.0 / n as f64;
        let (sx, sy) = ring.iter().fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));
        return (0.0, Coord { x: sx * inv, y: sy * inv });
    }
    (a2.abs() * 0.5, Coord { x: cx / (3.0 * a2), y: cy / (3.0 * a2) })
}

/// Drop a repeated closing vertex and orient the ring counter-clockwise.
pub(crate) fn open_ccw(ring: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out = ring.to_vec();
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    if signed_area2(&out) < 0.0 {
        out.reverse();
    }
    out
}

/// Even-odd point in polygon test.
pub(crate) fn contains(ring: &[Coord<f64>], p: Coord<f64>) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Sutherland–Hodgman: clip an arbitrary `subject` ring against a convex,
/// counter-clockwise `clipper`.  For a non-convex subject the result may
/// contain zero-width bridges, which does not affect its area or centroid.
pub(crate) fn clip_to_convex(subject: &[Coord<f64>], clipper: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut output = subject.to_vec();
    let m = clipper.len();
    for k in 0..m {
        if output.is_empty() {
            break;
        }
        let (a, b) = (clipper[k], clipper[(k + 1) % m]);
        let side = |p: Coord<f64>| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        let input = std::mem::take(&mut output);
        let n = input.len();
        for i in 0..n {
            let (p, q) = (input[i], input[(i + 1) % n]);
            let (sp, sq) = (side(p), side(q));
            if sp >= 0.0 {
                output.push(p);
            }
            if (sp >= 0.0) != (sq >= 0.0) {
                let t = sp / (sp - sq);
                output.push(Coord { x: p.x + t * (q.x - p.x), y: p.y + t * (q.y - p.y) });
            }
        }
    }
    output
}
