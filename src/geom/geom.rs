use geo::{BoundingRect, Contains, Point, Polygon, Rect};
use rstar::{
    AABB, RTree,
    primitives::{GeomWithData, Rectangle},
};

use super::point_polygon_distance;

/// Bounding box of the polygon at the attached index.
type Envelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

fn envelope(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(rect.min().into(), rect.max().into())
}

/// A collection of polygons with an R-tree over their bounding boxes, used
/// for point-in-zone lookups.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<Polygon<f64>>,
    rtree: RTree<Envelope>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of polygons.
    pub fn new(polygons: Vec<Polygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(i, polygon)| {
                        let bbox = polygon.bounding_rect()?;
                        Some(GeomWithData::new(Rectangle::from_aabb(envelope(bbox)), i))
                    })
                    .collect()
            ),
            shapes: polygons,
        }
    }

    /// Get the number of polygons.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no polygons.
    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of polygons.
    #[inline] pub fn shapes(&self) -> &[Polygon<f64>] { &self.shapes }

    /// Polygons whose bounding box meets `rect`.
    pub fn near(&self, rect: Rect<f64>) -> Vec<&Polygon<f64>> {
        self.rtree.locate_in_envelope_intersecting(&envelope(rect))
            .map(|entry| &self.shapes[entry.data])
            .collect()
    }

    /// Index of the first polygon containing `point`.
    pub fn locate(&self, point: Point<f64>) -> Option<usize> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .filter(|&i| self.shapes[i].contains(&point))
            .min()
    }

    /// Index of the polygon containing `point`, or else of the polygon
    /// closest to it.
    pub fn locate_or_nearest(&self, point: Point<f64>) -> Option<usize> {
        self.locate(point).or_else(|| {
            self.shapes.iter().enumerate()
                .map(|(i, polygon)| (i, point_polygon_distance(point.0, polygon)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i)
        })
    }
}
