use geo::{Coord, Polygon};

use super::BlockPlan;
use crate::table::{Labels, RoadRecord, ZoneRecord};
use crate::zoning::{FuncZone, GenPlan, TerritoryZone};

/// One unit of recursive work.  Carries data only; [`super::run_task`]
/// decides what to do with it.
#[derive(Clone, Debug)]
pub struct Task {
    pub job: Job,
    /// Labels every row produced below this task inherits.
    pub labels: Labels,
    /// Seed of the task's random source.
    pub seed: u64,
}

#[derive(Clone, Debug)]
pub enum Job {
    /// Split a polygon into named parts by ratio.
    SplitByRatios {
        polygon: Polygon<f64>,
        ratios: Vec<(String, f64)>,
        fixed: Vec<(String, Coord<f64>)>,
        road_width: f64,
    },
    /// Split a territory into the functional zones of a general plan.
    GenPlanToFuncZones {
        features: Vec<Polygon<f64>>,
        plan: GenPlan,
        split_further: bool,
    },
    /// Split one polygon into the territorial zones of a functional zone.
    FuncZoneToTerrZones {
        polygon: Polygon<f64>,
        func_zone: FuncZone,
        fixed: Vec<(String, Coord<f64>)>,
        split_further: bool,
        /// Multiplier on `min_block_area` when filtering zones.
        min_factor: f64,
        /// Fail when no zone fits instead of keeping the dominant one.
        strict: bool,
    },
    /// Distribute the territorial zones of a functional zone over disjoint
    /// features.
    MultiFeatureToTerrZones {
        features: Vec<Polygon<f64>>,
        func_zone: FuncZone,
        /// Pinned sites, handed to the features that contain them.
        fixed: Vec<(String, Coord<f64>)>,
        split_further: bool,
    },
    /// Plan the block split of a zone and run its first level.
    ZoneToBlocks {
        polygon: Polygon<f64>,
        zone: TerritoryZone,
    },
    /// One level (1-based `depth`) of a block split.
    SplitBlocks {
        polygon: Polygon<f64>,
        zone: TerritoryZone,
        plan: BlockPlan,
        depth: usize,
    },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::SplitByRatios { .. } => "split_by_ratios",
            Job::GenPlanToFuncZones { .. } => "gen_plan_to_func_zones",
            Job::FuncZoneToTerrZones { .. } => "func_zone_to_terr_zones",
            Job::MultiFeatureToTerrZones { .. } => "multi_feature_to_terr_zones",
            Job::ZoneToBlocks { .. } => "zone_to_blocks",
            Job::SplitBlocks { .. } => "split_blocks",
        }
    }
}

impl Task {
    pub fn new(job: Job, labels: Labels, seed: u64) -> Self {
        Self { job, labels, seed }
    }

    /// Short description for logs and panic reports.
    pub fn describe(&self) -> String {
        let mut out = self.job.name().to_string();
        let labels = [&self.labels.func_zone, &self.labels.territory_zone, &self.labels.zone];
        for label in labels.into_iter().flatten() {
            out.push_str(" / ");
            out.push_str(label);
        }
        if let Job::SplitBlocks { depth, .. } = &self.job {
            out.push_str(&format!(" @ {depth}"));
        }
        out
    }
}

/// What a finished task hands back to the scheduler: finished rows, more
/// work, or both.  A task without children is terminal.
#[derive(Clone, Debug, Default)]
pub struct TaskOutcome {
    pub zones: Vec<ZoneRecord>,
    pub children: Vec<Task>,
    pub roads: Vec<RoadRecord>,
}

impl TaskOutcome {
    pub fn terminal(zones: Vec<ZoneRecord>, roads: Vec<RoadRecord>) -> Self {
        Self { zones, children: vec![], roads }
    }

    pub fn expanded(children: Vec<Task>, roads: Vec<RoadRecord>) -> Self {
        Self { zones: vec![], children, roads }
    }

    #[inline] pub fn is_terminal(&self) -> bool { self.children.is_empty() }
}
