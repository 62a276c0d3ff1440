use geo::{Area, ConvexHull, MultiPolygon, Polygon};

use super::{dilate, erode, polygon_distance, union_all};

/// Closing rounds attempted before settling for the convex hull.
const MAX_ROUNDS: usize = 8;

/// Near-convex polygon enclosing a set of disjoint features.
///
/// Each round closes the gaps between parts by growing and shrinking the
/// union by the largest nearest-neighbour gap (rounded up, plus 0.1); parts
/// that remain separate are wrapped again.  Holes are dropped.  Returns
/// `None` for an empty input.
pub fn elastic_wrap(features: &[Polygon<f64>]) -> Option<Polygon<f64>> {
    let mut parts: Vec<Polygon<f64>> =
        union_all(features.iter().map(|p| MultiPolygon::new(vec![p.clone()])).collect())
            .into_iter()
            .filter(|p| p.unsigned_area() > 0.0)
            .collect();

    for round in 0..MAX_ROUNDS {
        match parts.len() {
            0 => return None,
            1 => return Some(Polygon::new(parts[0].exterior().clone(), vec![])),
            _ => {}
        }

        let gap = (0..parts.len())
            .map(|i| {
                (0..parts.len())
                    .filter(|&j| j != i)
                    .map(|j| polygon_distance(&parts[i], &parts[j]))
                    .fold(f64::INFINITY, f64::min)
            })
            .fold(0.0, f64::max);
        let distance = gap.ceil() + 0.1;
        tracing::debug!(round, parts = parts.len(), distance, "elastic wrap");

        let closed = erode(&dilate(&MultiPolygon::new(parts), distance), distance);
        parts = closed.into_iter().filter(|p| p.unsigned_area() > 0.0).collect();
    }

    let hull = MultiPolygon::new(features.to_vec()).convex_hull();
    (hull.unsigned_area() > 0.0).then_some(hull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Contains};

    #[test]
    fn single_feature_keeps_exterior() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)];
        let wrap = elastic_wrap(std::slice::from_ref(&square)).unwrap();
        assert!((wrap.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn two_features_are_bridged() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0), (x: 100.0, y: 100.0), (x: 0.0, y: 100.0)];
        let b = polygon![(x: 110.0, y: 0.0), (x: 210.0, y: 0.0), (x: 210.0, y: 100.0), (x: 110.0, y: 100.0)];
        let wrap = elastic_wrap(&[a.clone(), b.clone()]).unwrap();

        assert!(wrap.unsigned_area() > a.unsigned_area() + b.unsigned_area());
        assert!(wrap.unsigned_area() < 210.0 * 100.0 * 1.05);
        assert!(wrap.contains(&geo::Point::new(105.0, 50.0)));
    }

    #[test]
    fn empty_input() {
        assert!(elastic_wrap(&[]).is_none());
    }
}
