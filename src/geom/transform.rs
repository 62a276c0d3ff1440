use geo::{BoundingRect, Centroid, Coord, MapCoords, MinimumRotatedRect, Point, Polygon, Rect, Rotate};

/// Maps a bounding box onto a unit-scale frame centred at `(0.5, 0.5)`:
/// the longer side of the box becomes length 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalizer {
    center: Coord<f64>,
    scale: f64,
}

impl Normalizer {
    /// `None` for boxes without positive extent.
    pub fn from_bounds(bounds: Rect<f64>) -> Option<Self> {
        let scale = bounds.width().max(bounds.height());
        (scale > 0.0 && scale.is_finite()).then(|| Self { center: bounds.center(), scale })
    }

    pub fn of<G: BoundingRect<f64, Output = Option<Rect<f64>>>>(geometry: &G) -> Option<Self> {
        geometry.bounding_rect().and_then(Self::from_bounds)
    }

    #[inline] pub fn scale(&self) -> f64 { self.scale }

    #[inline]
    pub fn normalize(&self, c: Coord<f64>) -> Coord<f64> {
        Coord { x: (c.x - self.center.x) / self.scale + 0.5, y: (c.y - self.center.y) / self.scale + 0.5 }
    }

    #[inline]
    pub fn denormalize(&self, c: Coord<f64>) -> Coord<f64> {
        Coord { x: (c.x - 0.5) * self.scale + self.center.x, y: (c.y - 0.5) * self.scale + self.center.y }
    }

    pub fn to_unit<G: MapCoords<f64, f64, Output = G>>(&self, geometry: &G) -> G {
        let this = *self;
        geometry.map_coords(move |c| this.normalize(c))
    }

    pub fn from_unit<G: MapCoords<f64, f64, Output = G>>(&self, geometry: &G) -> G {
        let this = *self;
        geometry.map_coords(move |c| this.denormalize(c))
    }
}

/// Rotation that brings the longest side of a polygon's minimum rotated
/// rectangle parallel to the x axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    pivot: Point<f64>,
    degrees: f64,
}

impl Alignment {
    pub fn identity() -> Self {
        Self { pivot: Point::new(0.0, 0.0), degrees: 0.0 }
    }

    pub fn of(polygon: &Polygon<f64>) -> Self {
        let Some(pivot) = polygon.centroid() else { return Self::identity() };
        let Some(rect) = polygon.minimum_rotated_rect() else { return Self::identity() };

        let coords = &rect.exterior().0;
        if coords.len() < 3 {
            return Self::identity();
        }
        let length = |a: Coord<f64>, b: Coord<f64>| ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        let (a, b) = if length(coords[0], coords[1]) >= length(coords[1], coords[2]) {
            (coords[0], coords[1])
        } else {
            (coords[1], coords[2])
        };
        Self { pivot, degrees: (b.y - a.y).atan2(b.x - a.x).to_degrees() }
    }

    /// Bearing of the longest side, in degrees.
    #[inline] pub fn degrees(&self) -> f64 { self.degrees }

    pub fn align<G: Rotate<f64>>(&self, geometry: &G) -> G {
        geometry.rotate_around_point(-self.degrees, self.pivot)
    }

    pub fn restore<G: Rotate<f64>>(&self, geometry: &G) -> G {
        geometry.rotate_around_point(self.degrees, self.pivot)
    }
}
