use std::sync::Arc;

use geo::{Area, BooleanOps, Contains, Coord, MultiLineString, MultiPolygon, Polygon};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{BlockPlan, Job, Task, TaskOutcome};
use crate::assign::assign_features;
use crate::config::PlannerConfig;
use crate::error::{PlannerError, Result};
use crate::geom::{elastic_wrap, explode};
use crate::solver::PartitionSolver;
use crate::split::{PolygonSplitter, Split};
use crate::table::{Labels, RoadRecord, ZoneRecord};
use crate::zoning::{FuncZone, GenPlan, TerritoryZone, Zone, filter_feasible};

pub const HIGH_SPEED_HIGHWAY: &str = "high speed highway";
pub const REGULATED_HIGHWAY: &str = "regulated highway";
pub const LOCAL_ROAD: &str = "local road";
pub const UNDEFINED_ROAD: &str = "undefined";

/// Clipped pieces smaller than this (m²) are dropped.
const MIN_PIECE_AREA: f64 = 1.0;

/// Everything a task may read: shared, immutable.
#[derive(Clone)]
pub struct EngineContext {
    pub config: PlannerConfig,
    pub solver: Arc<dyn PartitionSolver>,
}

impl EngineContext {
    pub fn new(config: PlannerConfig, solver: Arc<dyn PartitionSolver>) -> Self {
        Self { config, solver }
    }
}

/// Run one task to completion.
pub fn run_task(task: Task, ctx: &EngineContext) -> Result<TaskOutcome> {
    let Task { job, labels, seed } = task;
    let mut rng = StdRng::seed_from_u64(seed);
    let splitter = PolygonSplitter::new(ctx.solver.as_ref(), &ctx.config);
    let run = Run { config: &ctx.config, splitter, labels };

    match job {
        Job::SplitByRatios { polygon, ratios, fixed, road_width } => {
            run.split_by_ratios(&polygon, &ratios, &fixed, road_width, &mut rng)
        }
        Job::GenPlanToFuncZones { features, plan, split_further } => {
            run.gen_plan_to_func_zones(&features, &plan, split_further, &mut rng)
        }
        Job::FuncZoneToTerrZones { polygon, func_zone, fixed, split_further, min_factor, strict } => {
            run.func_zone_to_terr_zones(polygon, &func_zone, &fixed, split_further, min_factor, strict, &mut rng)
        }
        Job::MultiFeatureToTerrZones { features, func_zone, fixed, split_further } => {
            run.multi_feature_to_terr_zones(&features, &func_zone, &fixed, split_further, &mut rng)
        }
        Job::ZoneToBlocks { polygon, zone } => {
            let plan = BlockPlan::new(polygon.unsigned_area(), zone.min_block_area(), &ctx.config);
            tracing::debug!(zone = zone.name(), factors = ?plan.factors, "block plan");
            run.split_blocks(polygon, zone, plan, 1, &mut rng)
        }
        Job::SplitBlocks { polygon, zone, plan, depth } => run.split_blocks(polygon, zone, plan, depth, &mut rng),
    }
}

struct Run<'a> {
    config: &'a PlannerConfig,
    splitter: PolygonSplitter<'a>,
    labels: Labels,
}

impl Run<'_> {
    fn split_by_ratios(
        &self,
        polygon: &Polygon<f64>,
        ratios: &[(String, f64)],
        fixed: &[(String, Coord<f64>)],
        road_width: f64,
        rng: &mut StdRng,
    ) -> Result<TaskOutcome> {
        let split = self.splitter.split(polygon, ratios, fixed, rng)?;
        let zones = split
            .zones
            .into_iter()
            .map(|(name, geometry)| ZoneRecord { geometry, labels: self.labels.clone().with_zone(&name) })
            .collect();
        Ok(TaskOutcome::terminal(zones, roads(split.roads, UNDEFINED_ROAD, road_width)))
    }

    fn gen_plan_to_func_zones(
        &self,
        features: &[Polygon<f64>],
        plan: &GenPlan,
        split_further: bool,
        rng: &mut StdRng,
    ) -> Result<TaskOutcome> {
        let area: f64 = features.iter().map(|f| f.unsigned_area()).sum();
        let entries = filter_feasible(area, plan.func_zone_ratio(), self.config.zone_min_factor);
        if entries.is_empty() {
            return Err(PlannerError::InfeasibleZoning {
                area,
                required: smallest_minimum(plan.func_zone_ratio()) * self.config.zone_min_factor,
                context: format!("general plan \"{}\"", plan.name()),
            });
        }
        tracing::debug!(plan = plan.name(), kept = entries.len(), of = plan.func_zone_ratio().len(), "functional zones");

        let ratios: Vec<(String, f64)> = entries.iter().map(|(z, r)| (z.name().to_string(), *r)).collect();
        let split = self.split_features(features, &ratios, rng)?;
        let road_rows = roads(split.roads, HIGH_SPEED_HIGHWAY, self.config.road_widths.high_speed_highway);
        let labels = self.labels.clone().with_gen_plan(plan.name());

        let mut zones = Vec::new();
        let mut children = Vec::new();
        for (name, polygon) in split.zones {
            let Some((func_zone, _)) = entries.iter().find(|(z, _)| z.name() == name) else { continue };
            let labels = labels.clone().with_func_zone(&name);
            if split_further {
                let job = Job::FuncZoneToTerrZones {
                    polygon,
                    func_zone: func_zone.clone(),
                    fixed: vec![],
                    split_further: true,
                    min_factor: self.config.zone_min_factor,
                    strict: false,
                };
                children.push(Task::new(job, labels, rng.random()));
            } else {
                zones.push(ZoneRecord { geometry: polygon, labels });
            }
        }
        Ok(outcome(split_further, zones, children, road_rows))
    }

    #[allow(clippy::too_many_arguments)]
    fn func_zone_to_terr_zones(
        &self,
        polygon: Polygon<f64>,
        func_zone: &FuncZone,
        fixed: &[(String, Coord<f64>)],
        split_further: bool,
        min_factor: f64,
        strict: bool,
        rng: &mut StdRng,
    ) -> Result<TaskOutcome> {
        let area = polygon.unsigned_area();
        let labels = self.labels.clone().with_func_zone(func_zone.name());
        let entries = filter_feasible(area, func_zone.zones_ratio(), min_factor);

        if entries.is_empty() {
            if strict {
                return Err(PlannerError::InfeasibleZoning {
                    area,
                    required: smallest_minimum(func_zone.zones_ratio()) * min_factor,
                    context: format!("{func_zone}"),
                });
            }
            let zone = func_zone.dominant().clone();
            tracing::debug!(func_zone = func_zone.name(), zone = zone.name(), area, "no zone fits, keeping the dominant one");
            return Ok(self.zone_rows(vec![(zone, polygon)], labels, split_further, vec![], rng));
        }

        let ratios: Vec<(String, f64)> = entries.iter().map(|(z, r)| (z.name().to_string(), *r)).collect();
        let split = self.splitter.split(&polygon, &ratios, fixed, rng)?;
        let road_rows = roads(split.roads, REGULATED_HIGHWAY, self.config.road_widths.regulated_highway);
        let placed = split
            .zones
            .into_iter()
            .filter_map(|(name, p)| entries.iter().find(|(z, _)| z.name() == name).map(|(z, _)| (z.clone(), p)))
            .collect();
        Ok(self.zone_rows(placed, labels, split_further, road_rows, rng))
    }

    fn multi_feature_to_terr_zones(
        &self,
        features: &[Polygon<f64>],
        func_zone: &FuncZone,
        fixed: &[(String, Coord<f64>)],
        split_further: bool,
        rng: &mut StdRng,
    ) -> Result<TaskOutcome> {
        let zoning = assign_features(features, func_zone, &self.splitter, self.config, rng)?;
        let labels = self.labels.clone().with_func_zone(func_zone.name());

        let mut single = Vec::new();
        let mut children = Vec::new();
        for assignment in zoning {
            let polygon = features[assignment.feature].clone();
            match assignment.zones.as_slice() {
                [(zone, _)] => single.push((zone.clone(), polygon)),
                _ => {
                    let capacity = polygon.unsigned_area();
                    let mix = assignment.zones.iter().map(|(z, a)| (z.clone(), a / capacity));
                    let fixed = fixed
                        .iter()
                        .filter(|(name, at)| {
                            polygon.contains(at) && assignment.zones.iter().any(|(z, _)| z.name() == name.as_str())
                        })
                        .cloned()
                        .collect();
                    let job = Job::FuncZoneToTerrZones {
                        polygon,
                        func_zone: FuncZone::new(func_zone.name(), mix)?,
                        fixed,
                        split_further,
                        min_factor: self.config.multi_feature_min_factor,
                        strict: false,
                    };
                    children.push(Task::new(job, self.labels.clone(), rng.random()));
                }
            }
        }

        let mut outcome = self.zone_rows(single, labels, split_further, vec![], rng);
        outcome.children.extend(children);
        Ok(outcome)
    }

    fn split_blocks(
        &self,
        polygon: Polygon<f64>,
        zone: TerritoryZone,
        plan: BlockPlan,
        depth: usize,
        rng: &mut StdRng,
    ) -> Result<TaskOutcome> {
        let labels = self.labels.clone().with_territory_zone(zone.name());
        let area = polygon.unsigned_area();
        let fit = (area / zone.min_block_area()).floor() as usize;
        let deepest = depth >= plan.depth();
        // never more blocks than fit at the minimum block area
        let blocks = if deepest {
            fit.min(self.config.deepest_block_cap)
        } else {
            plan.factors.get(depth - 1).copied().unwrap_or(1).min(fit)
        };

        if blocks <= 1 {
            return Ok(TaskOutcome::terminal(vec![ZoneRecord { geometry: polygon, labels }], vec![]));
        }

        let ratios: Vec<(String, f64)> = (0..blocks).map(|i| (i.to_string(), 1.0)).collect();
        let split = self.splitter.split(&polygon, &ratios, &[], rng)?;
        let width = plan.widths.get(depth - 1).copied().unwrap_or(self.config.road_widths.local_road);
        let road_rows = roads(split.roads, &format!("{LOCAL_ROAD}, level {depth}"), width);

        if deepest {
            let zones = split.zones.into_iter().map(|(_, geometry)| ZoneRecord { geometry, labels: labels.clone() }).collect();
            return Ok(TaskOutcome::terminal(zones, road_rows));
        }
        let children = split
            .zones
            .into_iter()
            .map(|(_, polygon)| {
                let job = Job::SplitBlocks { polygon, zone: zone.clone(), plan: plan.clone(), depth: depth + 1 };
                Task::new(job, self.labels.clone(), rng.random())
            })
            .collect();
        Ok(TaskOutcome::expanded(children, road_rows))
    }

    /// Rows for polygons whose territorial zone is decided: block tasks when
    /// splitting further, finished zones otherwise.
    fn zone_rows(
        &self,
        placed: Vec<(TerritoryZone, Polygon<f64>)>,
        labels: Labels,
        split_further: bool,
        road_rows: Vec<RoadRecord>,
        rng: &mut StdRng,
    ) -> TaskOutcome {
        if split_further {
            let children = placed
                .into_iter()
                .map(|(zone, polygon)| Task::new(Job::ZoneToBlocks { polygon, zone }, labels.clone(), rng.random()))
                .collect();
            TaskOutcome::expanded(children, road_rows)
        } else {
            let zones = placed
                .into_iter()
                .map(|(zone, geometry)| ZoneRecord { geometry, labels: labels.clone().with_territory_zone(zone.name()) })
                .collect();
            TaskOutcome::terminal(zones, road_rows)
        }
    }

    /// Split a territory of one or more features.  Several features are
    /// split through their elastic wrap and the parts clipped back.
    fn split_features(&self, features: &[Polygon<f64>], ratios: &[(String, f64)], rng: &mut StdRng) -> Result<Split> {
        match features {
            [] => Err(PlannerError::InvalidGeometry("empty territory".into())),
            [single] => self.splitter.split(single, ratios, &[], rng),
            _ => {
                let wrap = elastic_wrap(features)
                    .ok_or_else(|| PlannerError::InvalidGeometry("territory has no area".into()))?;
                let split = self.splitter.split(&wrap, ratios, &[], rng)?;
                let land = MultiPolygon::new(features.to_vec());
                let zones = split
                    .zones
                    .into_iter()
                    .flat_map(|(name, zone)| {
                        explode(land.intersection(&MultiPolygon::new(vec![zone])))
                            .into_iter()
                            .filter(|p| p.unsigned_area() >= MIN_PIECE_AREA)
                            .map(move |p| (name.clone(), p))
                    })
                    .collect();
                let roads = land.clip(&MultiLineString::new(split.roads), false).0;
                Ok(Split { zones, roads })
            }
        }
    }
}

fn outcome(split_further: bool, zones: Vec<ZoneRecord>, children: Vec<Task>, roads: Vec<RoadRecord>) -> TaskOutcome {
    if split_further { TaskOutcome::expanded(children, roads) } else { TaskOutcome::terminal(zones, roads) }
}

fn roads(lines: Vec<geo::LineString<f64>>, level: &str, width: f64) -> Vec<RoadRecord> {
    lines.into_iter().map(|line| RoadRecord::new(line, level, width)).collect()
}

fn smallest_minimum<Z: Zone>(entries: &[(Z, f64)]) -> f64 {
    entries.iter().map(|(z, _)| z.min_area()).fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use geo::{MapCoords, polygon};

    use super::*;
    use crate::solver::PowerDiagramAdapter;
    use crate::zoning::ZoneCatalog;

    fn square(side: f64) -> Polygon<f64> {
        polygon![(x: 0.0, y: 0.0), (x: side, y: 0.0), (x: side, y: side), (x: 0.0, y: side)]
    }

    fn context() -> EngineContext {
        EngineContext::new(PlannerConfig::default(), Arc::new(PowerDiagramAdapter::default()))
    }

    fn func_zone_job(side: f64, func_zone: FuncZone, strict: bool) -> Task {
        let job = Job::FuncZoneToTerrZones {
            polygon: square(side),
            func_zone,
            fixed: vec![],
            split_further: false,
            min_factor: 1.0,
            strict,
        };
        Task::new(job, Labels::default(), 5)
    }

    #[test]
    fn undersized_zones_are_dropped_before_splitting() {
        // 1 km²: special (5% → 50 000 m² < 80 000 m²) cannot fit
        let residential = TerritoryZone::new("residential", 80_000.0);
        let business = TerritoryZone::new("business", 80_000.0);
        let special = TerritoryZone::new("special", 80_000.0);
        let func_zone = FuncZone::new("mixed", [(residential, 0.6), (business, 0.35), (special, 0.05)]).unwrap();

        let outcome = run_task(func_zone_job(1_000.0, func_zone, true), &context()).unwrap();
        assert!(outcome.is_terminal());
        let names: Vec<&str> = outcome.zones.iter().filter_map(|z| z.labels.territory_zone.as_deref()).collect();
        assert_eq!(names.len(), 2);
        assert!(!names.contains(&"special"));
        assert!(outcome.roads.iter().all(|r| r.level == REGULATED_HIGHWAY && r.width == 20.0));
    }

    #[test]
    fn nothing_fits_is_fatal_only_when_strict() {
        let catalog = ZoneCatalog::standard();
        let func_zone = catalog.func_zone("industrial territory").unwrap().clone();

        let err = run_task(func_zone_job(100.0, func_zone.clone(), true), &context()).unwrap_err();
        assert!(matches!(err, PlannerError::InfeasibleZoning { .. }));

        let outcome = run_task(func_zone_job(100.0, func_zone, false), &context()).unwrap();
        assert_eq!(outcome.zones.len(), 1);
        assert_eq!(outcome.zones[0].labels.territory_zone.as_deref(), Some("industrial"));
        assert_eq!(outcome.zones[0].labels.func_zone.as_deref(), Some("industrial territory"));
    }

    #[test]
    fn gen_plan_expands_into_func_zone_tasks() {
        let catalog = ZoneCatalog::standard();
        let plan = catalog.default_gen_plan().clone();
        let job = Job::GenPlanToFuncZones { features: vec![square(5_000.0)], plan, split_further: true };
        let outcome = run_task(Task::new(job, Labels::default(), 9), &context()).unwrap();

        assert!(!outcome.is_terminal());
        assert!(outcome.children.iter().all(|t| matches!(t.job, Job::FuncZoneToTerrZones { strict: false, .. })));
        assert!(outcome.children.iter().all(|t| t.labels.gen_plan.as_deref() == Some("General Plan")));
        assert!(outcome.roads.iter().all(|r| r.level == HIGH_SPEED_HIGHWAY && r.width == 30.0));
    }

    #[test]
    fn ratio_split_labels_parts() {
        let job = Job::SplitByRatios {
            polygon: square(1_000.0),
            ratios: vec![("north".into(), 1.0), ("south".into(), 1.0)],
            fixed: vec![],
            road_width: 8.0,
        };
        let outcome = run_task(Task::new(job, Labels::default(), 3), &context()).unwrap();
        let mut names: Vec<&str> = outcome.zones.iter().filter_map(|z| z.labels.zone.as_deref()).collect();
        names.sort();
        assert_eq!(names, vec!["north", "south"]);
        assert!(outcome.roads.iter().all(|r| r.level == UNDEFINED_ROAD && r.width == 8.0));
    }

    #[test]
    fn disjoint_features_go_through_assignment() {
        let residential = TerritoryZone::new("residential", 10_000.0);
        let business = TerritoryZone::new("business", 10_000.0);
        let func_zone = FuncZone::new("mixed", [(residential, 0.5), (business, 0.5)]).unwrap();
        let offset = |dx: f64| square(300.0).map_coords(|c| geo::Coord { x: c.x + dx, y: c.y });
        let job = Job::MultiFeatureToTerrZones {
            features: vec![offset(0.0), offset(500.0)],
            func_zone,
            fixed: vec![],
            split_further: false,
        };

        let outcome = run_task(Task::new(job, Labels::default(), 21), &context()).unwrap();
        let direct: f64 = outcome.zones.iter().map(|z| z.geometry.unsigned_area()).sum();
        let deferred = outcome.children.len();
        assert!(direct > 0.0 || deferred > 0);
        assert!(outcome.zones.iter().all(|z| z.labels.func_zone.as_deref() == Some("mixed")));
    }
}
