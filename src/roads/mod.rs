//! Road-width-aware final cells.

use geo::{Area, BooleanOps, BoundingRect, InteriorPoint, MultiPolygon, Polygon};
use rayon::prelude::*;

use crate::geom::{Geometries, buffer_lines, explode};
use crate::table::{RoadRecord, ZoneRecord};

/// Final cells smaller than this (m²) are dropped.
const MIN_CELL_AREA: f64 = 1.0;

/// Area covered by the roads, each buffered by half its width.
pub fn road_surface(roads: &[RoadRecord]) -> MultiPolygon<f64> {
    buffer_lines(roads.iter().map(|r| (&r.geometry, r.width / 2.0)))
}

/// Carve the road surface out of the zones.
///
/// Every zone loses the part covered by road buffers and falls apart into
/// the cells left between roads.  A cell whose interior point lies on the
/// road surface is discarded; the others take the labels of the zone their
/// interior point falls in.
pub fn assemble(zones: Vec<ZoneRecord>, roads: &[RoadRecord]) -> Vec<ZoneRecord> {
    let surface = road_surface(roads);
    if surface.0.is_empty() {
        return zones;
    }
    let pavement = Geometries::new(surface.0);
    let outlines = Geometries::new(zones.iter().map(|z| z.geometry.clone()).collect());

    let cells: Vec<ZoneRecord> = zones
        .par_iter()
        .flat_map_iter(|zone| {
            let carved = explode(carve(&zone.geometry, &pavement));
            carved.into_iter().filter(|cell| cell.unsigned_area() >= MIN_CELL_AREA).collect::<Vec<_>>()
        })
        .filter_map(|cell| {
            let point = cell.interior_point()?;
            if pavement.locate(point).is_some() {
                return None;
            }
            let owner = outlines.locate_or_nearest(point)?;
            Some(ZoneRecord { geometry: cell, labels: zones[owner].labels.clone() })
        })
        .collect();

    tracing::info!(zones = zones.len(), cells = cells.len(), roads = roads.len(), "roads carved out of zones");
    cells
}

/// `polygon` minus the road polygons whose bounds touch it.
fn carve(polygon: &Polygon<f64>, pavement: &Geometries) -> MultiPolygon<f64> {
    let shape = MultiPolygon::new(vec![polygon.clone()]);
    let Some(bounds) = polygon.bounding_rect() else { return shape };
    let nearby: Vec<Polygon<f64>> = pavement.near(bounds).into_iter().cloned().collect();
    if nearby.is_empty() {
        return shape;
    }
    shape.difference(&MultiPolygon::new(nearby))
}

#[cfg(test)]
mod tests {
    use geo::{LineString, polygon};

    use super::*;
    use crate::table::Labels;

    fn zone(x0: f64, x1: f64, name: &str) -> ZoneRecord {
        ZoneRecord {
            geometry: polygon![(x: x0, y: 0.0), (x: x1, y: 0.0), (x: x1, y: 100.0), (x: x0, y: 100.0)],
            labels: Labels::default().with_territory_zone(name),
        }
    }

    fn road(x: f64, width: f64) -> RoadRecord {
        RoadRecord::new(LineString::from(vec![(x, -10.0), (x, 110.0)]), "regulated highway", width)
    }

    #[test]
    fn road_width_is_taken_from_both_sides() {
        let cells = assemble(vec![zone(0.0, 100.0, "west"), zone(100.0, 200.0, "east")], &[road(100.0, 20.0)]);
        assert_eq!(cells.len(), 2);
        for cell in &cells {
            assert!((cell.geometry.unsigned_area() - 9_000.0).abs() < 1.0, "{}", cell.geometry.unsigned_area());
        }
        let mut names: Vec<&str> = cells.iter().filter_map(|c| c.labels.territory_zone.as_deref()).collect();
        names.sort();
        assert_eq!(names, vec!["east", "west"]);
    }

    #[test]
    fn a_road_through_a_zone_cuts_it_in_two() {
        let cells = assemble(vec![zone(0.0, 200.0, "whole")], &[road(100.0, 10.0)]);
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|c| c.labels.territory_zone.as_deref() == Some("whole")));
        let total: f64 = cells.iter().map(|c| c.geometry.unsigned_area()).sum();
        assert!((total - 19_000.0).abs() < 1.0);
    }

    #[test]
    fn zones_under_the_road_disappear() {
        let cells = assemble(vec![zone(0.0, 4.0, "sliver"), zone(4.0, 100.0, "rest")], &[road(2.0, 10.0)]);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].labels.territory_zone.as_deref(), Some("rest"));
    }

    #[test]
    fn without_roads_zones_pass_through() {
        let zones = vec![zone(0.0, 100.0, "west")];
        assert_eq!(assemble(zones.clone(), &[]), zones);
        assert_eq!(assemble(zones.clone(), &[road(50.0, 0.0)]), zones);
    }
}
