use std::collections::BTreeSet;

use geo::{Area, BooleanOps, InteriorPoint, Polygon};

use crate::geom::Geometries;

/// Overlaps below this share of a feature do not make its zone a candidate.
const MIN_OVERLAP: f64 = 1e-3;

/// `(feature, zone)` pairs suggested by a proxy partition: a zone is a
/// candidate for a feature when its proxy region overlaps the feature, and
/// always for the region holding (or, outside every region, nearest to) the
/// feature's interior point.
///
/// Proxy region `z` stands for zone `z`.
pub fn permitted_pairs(features: &[Polygon<f64>], proxies: &Geometries) -> Vec<(usize, usize)> {
    let mut pairs = BTreeSet::new();
    for (f, feature) in features.iter().enumerate() {
        let area = feature.unsigned_area();
        for (z, proxy) in proxies.shapes().iter().enumerate() {
            if feature.intersection(proxy).unsigned_area() > MIN_OVERLAP * area {
                pairs.insert((f, z));
            }
        }
        if let Some(z) = feature.interior_point().and_then(|p| proxies.locate_or_nearest(p)) {
            pairs.insert((f, z));
        }
    }
    pairs.into_iter().collect()
}

/// Every feature may carry every zone.
pub fn all_pairs(features: usize, zones: usize) -> Vec<(usize, usize)> {
    (0..features).flat_map(|f| (0..zones).map(move |z| (f, z))).collect()
}

#[cfg(test)]
mod tests {
    use geo::polygon;

    use super::*;

    fn square(x: f64, y: f64, side: f64) -> Polygon<f64> {
        polygon![(x: x, y: y), (x: x + side, y: y), (x: x + side, y: y + side), (x: x, y: y + side)]
    }

    #[test]
    fn overlap_and_interior_point_pick_zones() {
        let proxies = Geometries::new(vec![square(0.0, 0.0, 10.0), square(10.0, 0.0, 10.0)]);
        let features = vec![
            square(1.0, 1.0, 3.0),  // inside zone 0
            square(8.0, 2.0, 4.0),  // straddles both
            square(30.0, 0.0, 2.0), // outside both, nearest is zone 1
        ];
        assert_eq!(permitted_pairs(&features, &proxies), vec![(0, 0), (1, 0), (1, 1), (2, 1)]);
    }

    #[test]
    fn complete_pairs() {
        assert_eq!(all_pairs(2, 2), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}
