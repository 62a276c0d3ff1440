use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Road width, in metres, per road level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadWidths {
    pub high_speed_highway: f64,
    pub regulated_highway: f64,
    pub local_road: f64,
}

impl Default for RoadWidths {
    fn default() -> Self {
        Self { high_speed_highway: 30.0, regulated_highway: 20.0, local_road: 5.0 }
    }
}

/// Every tunable of the planner in one struct.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    // -- Seeding --
    /// Poisson-disk radius (in normalized units) keyed by number of zones in a split.
    pub poisson_radius: BTreeMap<usize, f64>,
    /// Radius used when the zone count has no entry.
    pub poisson_radius_default: f64,

    // -- Splitter --
    /// Attempts per polygon split before giving up.
    pub split_attempts: usize,
    /// Maximum relative deviation of the total split area from the input area.
    pub area_tolerance: f64,
    /// Maximum relative deviation of a single zone from its target area.
    /// `None` disables the check.
    pub room_area_tolerance: Option<f64>,
    /// Iteration budget of the partition solver.
    pub solver_iterations: usize,

    // -- Roads --
    pub road_widths: RoadWidths,
    /// Width of the first local road level when splitting zones into blocks;
    /// deeper levels interpolate down to `road_widths.local_road`.
    pub block_road_width: f64,

    // -- Block decomposition --
    /// Largest branching factor of one block split.
    pub max_split_factor: usize,
    /// Cap on blocks produced by the deepest split.
    pub deepest_block_cap: usize,

    // -- Zone filtering --
    /// Multiplier on `min_block_area` when filtering zones of a single polygon.
    pub zone_min_factor: f64,
    /// Multiplier on `min_block_area` when filtering zones of a multi-feature territory.
    pub multi_feature_min_factor: f64,
    /// Fraction of the target area the assignment program must reach.
    pub lp_target_share: f64,

    // -- Whole-generation retries --
    pub generation_retries: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            poisson_radius: BTreeMap::from([
                (2, 0.25),
                (3, 0.23),
                (4, 0.22),
                (5, 0.2),
                (6, 0.18),
                (7, 0.15),
                (8, 0.12),
            ]),
            poisson_radius_default: 0.1,
            split_attempts: 10,
            area_tolerance: 0.1,
            room_area_tolerance: Some(0.35),
            solver_iterations: 250,
            road_widths: RoadWidths::default(),
            block_road_width: 13.0,
            max_split_factor: 6,
            deepest_block_cap: 6,
            zone_min_factor: 1.0,
            multi_feature_min_factor: 0.8,
            lp_target_share: 0.999,
            generation_retries: 10,
        }
    }
}

impl PlannerConfig {
    /// Poisson-disk radius for a split into `zones` parts.
    pub fn poisson_radius(&self, zones: usize) -> f64 {
        self.poisson_radius.get(&zones).copied().unwrap_or(self.poisson_radius_default)
    }

    /// Load a config from a JSON file; missing keys take their default.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("[PlannerConfig.from_json_file] open {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[PlannerConfig.from_json_file] parse {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_lookup_falls_back() {
        let config = PlannerConfig::default();
        assert_eq!(config.poisson_radius(2), 0.25);
        assert_eq!(config.poisson_radius(8), 0.12);
        assert_eq!(config.poisson_radius(12), 0.1);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PlannerConfig =
            serde_json::from_str(r#"{"split_attempts": 3, "road_widths": {"local_road": 7.5}}"#).unwrap();
        assert_eq!(config.split_attempts, 3);
        assert_eq!(config.road_widths.local_road, 7.5);
        assert_eq!(config.road_widths.regulated_highway, 20.0);
        assert_eq!(config.area_tolerance, 0.1);
        assert_eq!(config.poisson_radius(3), 0.23);
    }

    #[test]
    fn radius_keys_round_trip_through_json() {
        let json = serde_json::to_string(&PlannerConfig::default()).unwrap();
        let back: PlannerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PlannerConfig::default());
    }
}
