use serde::Serialize;

use super::{derived_min_area, normalize, FuncZone, Zone};
use crate::error::Result;

/// Top-level mix of functional zones for a whole district.
#[derive(Clone, Debug, Serialize)]
pub struct GenPlan {
    name: String,
    func_zone_ratio: Vec<(FuncZone, f64)>,
    min_zone_area: f64,
}

impl GenPlan {
    pub fn new(name: impl Into<String>, func_zone_ratio: impl IntoIterator<Item = (FuncZone, f64)>) -> Result<Self> {
        let name = name.into();
        let func_zone_ratio = normalize(&format!("general plan \"{name}\""), func_zone_ratio.into_iter().collect())?;
        let min_zone_area = derived_min_area(&func_zone_ratio);
        Ok(Self { name, func_zone_ratio, min_zone_area })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn func_zone_ratio(&self) -> &[(FuncZone, f64)] {
        &self.func_zone_ratio
    }

    #[inline]
    pub fn min_zone_area(&self) -> f64 {
        self.min_zone_area
    }
}

impl Zone for GenPlan {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_area(&self) -> f64 {
        self.min_zone_area
    }
}
