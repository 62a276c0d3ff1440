use geo::{MultiPolygon, Polygon, SimplifyVwPreserve};

/// Simplify every ring of a polygon (Visvalingam-Whyatt, topology
/// preserving).  `tolerance` is a length; vertices spanning a triangle
/// smaller than `tolerance²` are removed.
pub fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    if tolerance <= 0.0 { return polygon.clone() }
    polygon.simplify_vw_preserve(&(tolerance * tolerance))
}

pub fn simplify_multipolygon(shape: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(shape.iter().map(|p| simplify_polygon(p, tolerance)).collect())
}
