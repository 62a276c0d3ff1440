use geo::{Area, Coord, Line, LineString, MultiLineString, MultiPolygon, Polygon};

/// Boundary of a (multi)polygon as line features: every exterior and
/// interior ring becomes one linestring.
pub fn multilinestring_of(shape: &MultiPolygon<f64>) -> MultiLineString<f64> {
    MultiLineString::new(
        shape.iter()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
            .filter(|ring| ring.0.len() >= 2)
            .cloned()
            .collect(),
    )
}

/// Split a multipolygon into its parts, dropping empty ones.
pub fn explode(shape: MultiPolygon<f64>) -> Vec<Polygon<f64>> {
    shape.into_iter().filter(|p| p.unsigned_area() > 0.0).collect()
}

/// Segments of a linestring.
pub fn segments(line: &LineString<f64>) -> impl Iterator<Item = Line<f64>> + '_ {
    line.lines()
}

pub fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 { (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0) } else { 0.0 };
    let (qx, qy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - qx).powi(2) + (p.y - qy).powi(2)).sqrt()
}

fn orientation(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_cross(a: Line<f64>, b: Line<f64>) -> bool {
    let d1 = orientation(b.start, b.end, a.start);
    let d2 = orientation(b.start, b.end, a.end);
    let d3 = orientation(a.start, a.end, b.start);
    let d4 = orientation(a.start, a.end, b.end);
    (d1 > 0.0) != (d2 > 0.0) && (d3 > 0.0) != (d4 > 0.0) && d1 != 0.0 && d2 != 0.0 && d3 != 0.0 && d4 != 0.0
}

fn segment_distance(a: Line<f64>, b: Line<f64>) -> f64 {
    if segments_cross(a, b) {
        return 0.0;
    }
    point_segment_distance(a.start, b.start, b.end)
        .min(point_segment_distance(a.end, b.start, b.end))
        .min(point_segment_distance(b.start, a.start, a.end))
        .min(point_segment_distance(b.end, a.start, a.end))
}

fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

/// Distance from a point to a polygon (zero inside).
pub fn point_polygon_distance(p: Coord<f64>, polygon: &Polygon<f64>) -> f64 {
    use geo::Contains;
    if polygon.contains(&p) {
        return 0.0;
    }
    rings(polygon)
        .flat_map(|ring| ring.lines())
        .map(|line| point_segment_distance(p, line.start, line.end))
        .fold(f64::INFINITY, f64::min)
}

/// Minimum distance between the boundaries of two polygons; zero when
/// either contains a vertex of the other.
pub fn polygon_distance(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    use geo::Intersects;
    if a.intersects(b) {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    for la in rings(a).flat_map(|ring| ring.lines()) {
        for lb in rings(b).flat_map(|ring| ring.lines()) {
            best = best.min(segment_distance(la, lb));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn boundary_lines_include_holes() {
        let shape = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)])],
        )]);
        let lines = multilinestring_of(&shape);
        assert_eq!(lines.0.len(), 2);
        assert_eq!(lines.0[0].0.len(), 5);
    }

    #[test]
    fn distances() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let b = polygon![(x: 3.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 1.0), (x: 3.0, y: 1.0)];
        assert!((polygon_distance(&a, &b) - 2.0).abs() < 1e-12);
        assert_eq!(polygon_distance(&a, &a), 0.0);
        assert!((point_polygon_distance(Coord { x: 2.0, y: 2.0 }, &a) - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(point_polygon_distance(Coord { x: 0.5, y: 0.5 }, &a), 0.0);
    }

    #[test]
    fn explode_drops_empty_parts() {
        let small = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let flat = polygon![(x: 5.0, y: 0.0), (x: 9.0, y: 0.0), (x: 7.0, y: 0.0)];
        assert_eq!(explode(MultiPolygon::new(vec![small, flat])).len(), 1);
    }
}
