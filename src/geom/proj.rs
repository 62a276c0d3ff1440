use geo::{Coord, MapCoords};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Reference frame of caller geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crs {
    /// Longitude/latitude in degrees with the given EPSG code (4326, 4269, ...).
    Geographic(u32),
    /// Already metric; used as is.
    Metric,
}

impl Default for Crs {
    fn default() -> Self { Self::Geographic(4326) }
}

/// A per-territory UTM projection: geographic ↔ metres.
pub struct LocalProjection {
    geographic: Proj4,
    utm: Proj4,
    definition: String,
}

impl std::fmt::Debug for LocalProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalProjection").field("definition", &self.definition).finish()
    }
}

impl LocalProjection {
    /// Build PROJ.4 string for the source geographic CRS (degrees → radians handled in code).
    #[inline]
    fn source_geog_proj4(epsg: u32) -> &'static str {
        match epsg {
            4269 | 4937 => "+proj=longlat +datum=NAD83 +no_defs +type=crs",
            _            => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
        }
    }

    /// Build PROJ.4 string for the UTM zone containing a lon/lat `center`.
    /// NAD83 UTM is only standard in the north; fall back to WGS84 in the south.
    fn utm_proj4(epsg: u32, center: Coord<f64>) -> String {
        let zone = (((center.x + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
        let north = center.y >= 0.0;
        let datum = if matches!(epsg, 4269 | 4937) && north { "NAD83" } else { "WGS84" };
        let south = if north { "" } else { " +south" };
        format!("+proj=utm +zone={zone}{south} +datum={datum} +units=m +no_defs +type=crs")
    }

    /// Estimate the UTM projection for a territory centred at `center` (degrees).
    pub fn estimate(epsg: u32, center: Coord<f64>) -> Result<Self> {
        let source = Self::source_geog_proj4(epsg);
        let geographic = Proj4::from_proj_string(source)
            .map_err(|e| PlannerError::Projection(format!("failed to build source PROJ.4 {source}: {e}")))?;
        let definition = Self::utm_proj4(epsg, center);
        let utm = Proj4::from_proj_string(&definition)
            .map_err(|e| PlannerError::Projection(format!("failed to build target PROJ.4 {definition}: {e}")))?;
        Ok(Self { geographic, utm, definition })
    }

    #[inline] pub fn definition(&self) -> &str { &self.definition }

    /// Degrees → metres.
    pub fn forward<G: MapCoords<f64, f64, Output = G>>(&self, geometry: &G) -> Result<G> {
        geometry.try_map_coords(|c: Coord<f64>| {
            let mut point = (c.x.to_radians(), c.y.to_radians(), 0.0);
            transform(&self.geographic, &self.utm, &mut point)
                .map_err(|e| PlannerError::Projection(format!("forward transform of ({}, {}): {e}", c.x, c.y)))?;
            Ok(Coord { x: point.0, y: point.1 })
        })
    }

    /// Metres → degrees.
    pub fn inverse<G: MapCoords<f64, f64, Output = G>>(&self, geometry: &G) -> Result<G> {
        geometry.try_map_coords(|c: Coord<f64>| {
            let mut point = (c.x, c.y, 0.0);
            transform(&self.utm, &self.geographic, &mut point)
                .map_err(|e| PlannerError::Projection(format!("inverse transform of ({}, {}): {e}", c.x, c.y)))?;
            Ok(Coord { x: point.0.to_degrees(), y: point.1.to_degrees() })
        })
    }
}
