use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::Serialize;

use super::Zone;

/// A concrete zoning category with a minimum viable block area (m²).
///
/// Identity is the name: two zones with the same name compare equal even when
/// their minimum areas differ.
#[derive(Clone, Debug, Serialize)]
pub struct TerritoryZone {
    name: String,
    min_block_area: f64,
}

impl TerritoryZone {
    pub fn new(name: impl Into<String>, min_block_area: f64) -> Self {
        Self { name: name.into(), min_block_area }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn min_block_area(&self) -> f64 {
        self.min_block_area
    }

    /// Copy of this zone with a different minimum block area.
    pub fn with_min_block_area(&self, min_block_area: f64) -> Self {
        Self { name: self.name.clone(), min_block_area }
    }
}

impl Zone for TerritoryZone {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_area(&self) -> f64 {
        self.min_block_area
    }
}

impl PartialEq for TerritoryZone {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TerritoryZone {}

impl Hash for TerritoryZone {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for TerritoryZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "territory zone \"{}\"", self.name)
    }
}
