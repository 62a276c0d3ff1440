use std::collections::BTreeMap;

use super::{FuncZone, GenPlan, TerritoryZone};
use crate::error::{PlannerError, Result};

/// Base minimum block area of the standard catalog, m².
pub const BASE_BLOCK_AREA: f64 = 80_000.0;

/// `(scenario id, name, multiple of BASE_BLOCK_AREA)`
const TERRITORY_ZONES: [(u32, &str, f64); 7] = [
    (1, "residential", 1.0),
    (4, "industrial", 4.0),
    (7, "business", 1.0),
    (2, "recreation", 2.0),
    (6, "transport", 1.0),
    (5, "agriculture", 4.0),
    (3, "special", 1.0),
];

type Mix = &'static [(&'static str, f64)];

const FUNC_ZONES: [(u32, &str, Mix); 8] = [
    (8, "basic", &[
        ("residential", 0.25),
        ("industrial", 0.12),
        ("business", 0.08),
        ("recreation", 0.3),
        ("transport", 0.1),
        ("agriculture", 0.03),
        ("special", 0.02),
    ]),
    (1, "residential territory", &[
        ("residential", 0.5),
        ("business", 0.1),
        ("recreation", 0.1),
        ("transport", 0.1),
        ("agriculture", 0.05),
        ("special", 0.05),
    ]),
    (4, "industrial territory", &[
        ("industrial", 0.5),
        ("business", 0.1),
        ("recreation", 0.05),
        ("transport", 0.1),
        ("agriculture", 0.05),
        ("special", 0.05),
    ]),
    (7, "business territory", &[
        ("residential", 0.1),
        ("business", 0.5),
        ("recreation", 0.1),
        ("transport", 0.1),
        ("agriculture", 0.05),
        ("special", 0.05),
    ]),
    (2, "recreation territory", &[
        ("residential", 0.2),
        ("business", 0.1),
        ("recreation", 0.5),
        ("transport", 0.05),
        ("agriculture", 0.1),
    ]),
    (6, "transport territory", &[
        ("industrial", 0.1),
        ("business", 0.05),
        ("recreation", 0.05),
        ("transport", 0.5),
        ("agriculture", 0.05),
        ("special", 0.05),
    ]),
    (5, "agriculture territory", &[
        ("residential", 0.1),
        ("industrial", 0.1),
        ("business", 0.05),
        ("recreation", 0.1),
        ("transport", 0.05),
        ("agriculture", 0.5),
        ("special", 0.05),
    ]),
    (3, "special territory", &[
        ("residential", 0.01),
        ("industrial", 0.1),
        ("business", 0.05),
        ("recreation", 0.05),
        ("transport", 0.05),
        ("agriculture", 0.05),
        ("special", 0.5),
    ]),
];

const GEN_PLAN: (&str, Mix) = ("General Plan", &[
    ("recreation territory", 0.333),
    ("residential territory", 0.277),
    ("industrial territory", 0.133),
    ("transport territory", 0.111),
    ("business territory", 0.088),
    ("agriculture territory", 0.033),
    ("special territory", 0.022),
]);

/// Immutable catalog of named zones, built once and passed by reference.
///
/// Holds the standard territorial zones, functional zones and general plan,
/// each addressable by name or by its numeric scenario id.
#[derive(Clone, Debug)]
pub struct ZoneCatalog {
    territory: Vec<(u32, TerritoryZone)>,
    functional: Vec<(u32, FuncZone)>,
    gen_plans: Vec<GenPlan>,
}

impl Default for ZoneCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ZoneCatalog {
    /// The standard catalog.
    pub fn standard() -> Self {
        Self::assemble(&BTreeMap::new()).expect("[ZoneCatalog.standard] built-in catalog is consistent")
    }

    /// The standard catalog with some territorial zones' `min_block_area`
    /// replaced.  Functional zones and the general plan are rebuilt so their
    /// derived minimum areas follow.
    pub fn with_min_block_areas(overrides: &BTreeMap<String, f64>) -> Result<Self> {
        for (name, area) in overrides {
            if !TERRITORY_ZONES.iter().any(|(_, n, _)| *n == name.as_str()) {
                return Err(PlannerError::ConstraintViolation(format!("unknown territorial zone \"{name}\"")));
            }
            if !area.is_finite() || *area <= 0.0 {
                return Err(PlannerError::ConstraintViolation(format!(
                    "min_block_area of \"{name}\" must be positive, got {area}"
                )));
            }
        }
        Self::assemble(overrides)
    }

    fn assemble(overrides: &BTreeMap<String, f64>) -> Result<Self> {
        let territory: Vec<(u32, TerritoryZone)> = TERRITORY_ZONES
            .iter()
            .map(|&(id, name, k)| {
                let area = overrides.get(name).copied().unwrap_or(BASE_BLOCK_AREA * k);
                (id, TerritoryZone::new(name, area))
            })
            .collect();

        let lookup = |name: &str| -> Result<TerritoryZone> {
            territory
                .iter()
                .find(|(_, z)| z.name() == name)
                .map(|(_, z)| z.clone())
                .ok_or_else(|| PlannerError::ConstraintViolation(format!("unknown territorial zone \"{name}\"")))
        };

        let mut functional = Vec::with_capacity(FUNC_ZONES.len());
        for &(id, name, mix) in &FUNC_ZONES {
            let entries = mix
                .iter()
                .map(|&(z, r)| -> Result<(TerritoryZone, f64)> { Ok((lookup(z)?, r)) })
                .collect::<Result<Vec<_>>>()?;
            functional.push((id, FuncZone::new(name, entries)?));
        }

        let (plan_name, plan_mix) = GEN_PLAN;
        let mut plan_entries = Vec::with_capacity(plan_mix.len());
        for &(name, ratio) in plan_mix {
            let zone = functional
                .iter()
                .find(|(_, f)| f.name() == name)
                .map(|(_, f)| f.clone())
                .ok_or_else(|| PlannerError::ConstraintViolation(format!("unknown functional zone \"{name}\"")))?;
            plan_entries.push((zone, ratio));
        }
        let gen_plans = vec![GenPlan::new(plan_name, plan_entries)?];

        Ok(Self { territory, functional, gen_plans })
    }

    pub fn territory_zones(&self) -> impl Iterator<Item = &TerritoryZone> {
        self.territory.iter().map(|(_, z)| z)
    }

    pub fn func_zones(&self) -> impl Iterator<Item = &FuncZone> {
        self.functional.iter().map(|(_, z)| z)
    }

    pub fn territory_zone(&self, name: &str) -> Result<&TerritoryZone> {
        self.territory
            .iter()
            .find(|(_, z)| z.name() == name)
            .map(|(_, z)| z)
            .ok_or_else(|| PlannerError::ConstraintViolation(format!("unknown territorial zone \"{name}\"")))
    }

    pub fn territory_zone_by_id(&self, id: u32) -> Result<&TerritoryZone> {
        self.territory
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, z)| z)
            .ok_or_else(|| PlannerError::ConstraintViolation(format!("unknown territorial zone id {id}")))
    }

    pub fn func_zone(&self, name: &str) -> Result<&FuncZone> {
        self.functional
            .iter()
            .find(|(_, z)| z.name() == name)
            .map(|(_, z)| z)
            .ok_or_else(|| PlannerError::ConstraintViolation(format!("unknown functional zone \"{name}\"")))
    }

    pub fn func_zone_by_id(&self, id: u32) -> Result<&FuncZone> {
        self.functional
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, z)| z)
            .ok_or_else(|| PlannerError::ConstraintViolation(format!("unknown functional zone id {id}")))
    }

    pub fn gen_plan(&self, name: &str) -> Result<&GenPlan> {
        self.gen_plans
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| PlannerError::ConstraintViolation(format!("unknown general plan \"{name}\"")))
    }

    /// The default general plan.
    pub fn default_gen_plan(&self) -> &GenPlan {
        &self.gen_plans[0]
    }

    /// A user-defined functional zone from a `{territorial zone name → ratio}`
    /// balance.  Every name must exist in the catalog.
    pub fn custom_func_zone(&self, name: &str, balance: &[(String, f64)]) -> Result<FuncZone> {
        let entries = balance
            .iter()
            .map(|(zone, ratio)| -> Result<(TerritoryZone, f64)> { Ok((self.territory_zone(zone)?.clone(), *ratio)) })
            .collect::<Result<Vec<_>>>()?;
        FuncZone::new(name, entries)
    }
}
