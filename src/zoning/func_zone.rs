use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::Serialize;

use super::{derived_min_area, normalize, TerritoryZone, Zone};
use crate::error::Result;

/// A land-use category expressed as a normalized mix of territorial zones.
#[derive(Clone, Debug, Serialize)]
pub struct FuncZone {
    name: String,
    zones_ratio: Vec<(TerritoryZone, f64)>,
    min_zone_area: f64,
}

impl FuncZone {
    /// Build a functional zone; ratios are normalized to sum to 1 and
    /// `min_zone_area` is derived from them.
    pub fn new(name: impl Into<String>, zones_ratio: impl IntoIterator<Item = (TerritoryZone, f64)>) -> Result<Self> {
        let name = name.into();
        let zones_ratio = normalize(&format!("functional zone \"{name}\""), zones_ratio.into_iter().collect())?;
        let min_zone_area = derived_min_area(&zones_ratio);
        Ok(Self { name, zones_ratio, min_zone_area })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized `(zone, ratio)` entries in declaration order.
    #[inline]
    pub fn zones_ratio(&self) -> &[(TerritoryZone, f64)] {
        &self.zones_ratio
    }

    #[inline]
    pub fn min_zone_area(&self) -> f64 {
        self.min_zone_area
    }

    pub fn ratio_of(&self, zone: &str) -> Option<f64> {
        self.zones_ratio.iter().find(|(z, _)| z.name() == zone).map(|(_, r)| *r)
    }

    pub fn zone(&self, zone: &str) -> Option<&TerritoryZone> {
        self.zones_ratio.iter().find(|(z, _)| z.name() == zone).map(|(z, _)| z)
    }

    /// The territorial zone with the largest ratio (first one on ties).
    pub fn dominant(&self) -> &TerritoryZone {
        let mut best = &self.zones_ratio[0];
        for entry in &self.zones_ratio[1..] {
            if entry.1 > best.1 {
                best = entry;
            }
        }
        &best.0
    }
}

impl Zone for FuncZone {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_area(&self) -> f64 {
        self.min_zone_area
    }
}

impl PartialEq for FuncZone {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for FuncZone {}

impl Hash for FuncZone {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for FuncZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "functional zone \"{}\"", self.name)
    }
}
