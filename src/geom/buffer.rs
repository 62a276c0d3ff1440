use std::f64::consts::PI;

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Vertices per half circle of a capsule end.
const ARC_STEPS: usize = 8;

/// Stadium-shaped polygon of points within `radius` of segment `a`–`b`.
pub fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64) -> Polygon<f64> {
    let theta = (b.y - a.y).atan2(b.x - a.x);
    let mut ring = Vec::with_capacity(2 * (ARC_STEPS + 1) + 1);
    for (center, start) in [(b, theta - PI / 2.0), (a, theta + PI / 2.0)] {
        for k in 0..=ARC_STEPS {
            let angle = start + PI * k as f64 / ARC_STEPS as f64;
            ring.push(Coord { x: center.x + radius * angle.cos(), y: center.y + radius * angle.sin() });
        }
    }
    Polygon::new(LineString::from(ring), vec![])
}

/// Union of many multipolygons, merged pairwise in a balanced tree.
pub fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    if parts.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    while parts.len() > 1 {
        let mut merged = Vec::with_capacity(parts.len().div_ceil(2));
        let mut iter = parts.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => merged.push(a.union(&b)),
                None => merged.push(a),
            }
        }
        parts = merged;
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// Union of capsules around every segment of every line; `lines` pairs a
/// linestring with its buffer radius (half its width).
pub fn buffer_lines<'a>(lines: impl IntoIterator<Item = (&'a LineString<f64>, f64)>) -> MultiPolygon<f64> {
    let capsules = lines.into_iter()
        .filter(|(_, radius)| *radius > 0.0)
        .flat_map(|(line, radius)| line.lines().map(move |l| capsule(l.start, l.end, radius)))
        .map(|c| MultiPolygon::new(vec![c]))
        .collect();
    union_all(capsules)
}

fn ring_capsules(shape: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    let rings: Vec<&LineString<f64>> = shape.iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .collect();
    buffer_lines(rings.into_iter().map(|r| (r, distance)))
}

/// Grow a shape outward by `distance`.
pub fn dilate(shape: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if distance <= 0.0 {
        return shape.clone();
    }
    shape.union(&ring_capsules(shape, distance))
}

/// Shrink a shape inward by `distance`.
pub fn erode(shape: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if distance <= 0.0 {
        return shape.clone();
    }
    shape.difference(&ring_capsules(shape, distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Contains, Point};

    #[test]
    fn capsule_area_is_close_to_stadium() {
        let c = capsule(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 0.0 }, 1.0);
        let exact = 20.0 + PI;
        assert!(c.unsigned_area() < exact);
        assert!(c.unsigned_area() > 0.97 * exact);
        assert!(c.contains(&Point::new(5.0, 0.9)));
        assert!(!c.contains(&Point::new(5.0, 1.1)));
    }

    #[test]
    fn dilate_then_erode_square() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)
        ]]);
        let grown = dilate(&square, 1.0);
        assert!(grown.unsigned_area() > 100.0 + 40.0);
        let shrunk = erode(&square, 1.0);
        assert!((shrunk.unsigned_area() - 64.0).abs() < 0.5);
    }

    #[test]
    fn union_all_merges_overlaps() {
        let parts = (0..5)
            .map(|i| {
                let x = i as f64;
                MultiPolygon::new(vec![polygon![
                    (x: x, y: 0.0), (x: x + 2.0, y: 0.0), (x: x + 2.0, y: 1.0), (x: x, y: 1.0)
                ]])
            })
            .collect();
        let merged = union_all(parts);
        assert_eq!(merged.0.len(), 1);
        assert!((merged.unsigned_area() - 6.0).abs() < 1e-9);
    }
}
