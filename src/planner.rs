//! The public entry point: a territory prepared once, split many ways.

use std::sync::Arc;

use geo::{Area, BooleanOps, BoundingRect, Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::PlannerConfig;
use crate::engine::{EngineContext, Job, Scheduler, Task, Workers};
use crate::error::{PlannerError, Result};
use crate::geom::{Crs, Geometries, LocalProjection, buffer_lines, explode, simplify_multipolygon};
use crate::io::Feature;
use crate::roads::assemble;
use crate::solver::{PartitionSolver, PowerDiagramAdapter};
use crate::table::{EXISTING_ROAD, Generation, Labels, RoadRecord, ZoneRecord};
use crate::zoning::{FuncZone, GenPlan, TerritoryZone};

/// Working features smaller than this (m²) are dropped.
const MIN_FEATURE_AREA: f64 = 1.0;

/// Largest number of parts of a plain ratio split.
const MAX_RATIO_PARTS: usize = 8;

/// Everything besides the territory itself.
#[derive(Clone, Debug)]
pub struct PlannerOptions {
    /// Existing roads: lines (with an optional `width` property) or polygons.
    pub roads: Vec<Feature>,
    /// Polygons removed from the territory, such as water.
    pub exclusions: Vec<Feature>,
    /// Simplification tolerance in metres; `0` keeps every vertex.
    pub simplify_tolerance: f64,
    pub workers: Workers,
    pub crs: Crs,
    pub config: PlannerConfig,
    /// Seed of the run; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            roads: vec![],
            exclusions: vec![],
            simplify_tolerance: 0.0,
            workers: Workers::default(),
            crs: Crs::default(),
            config: PlannerConfig::default(),
            seed: None,
        }
    }
}

/// How to split the territory.
#[derive(Clone, Debug)]
pub enum Operation {
    /// Blocks of one territorial zone.
    TerritorialZone(TerritoryZone),
    /// Territorial zones of a functional zone, then blocks.  Fixed points pin
    /// a named territorial zone to a location.
    FunctionalZone { func_zone: FuncZone, fixed: Vec<(String, Coord<f64>)> },
    /// Functional zones of a general plan, then territorial zones, then blocks.
    GenPlan(GenPlan),
    /// Named parts by ratio, no further splitting.
    Ratios { parts: RatioParts, road_width: Option<f64> },
}

/// Parts of a plain ratio split.
#[derive(Clone, Debug)]
pub enum RatioParts {
    Named(Vec<(String, f64)>),
    Equal(usize),
}

impl RatioParts {
    fn ratios(&self) -> Vec<(String, f64)> {
        match self {
            RatioParts::Named(ratios) => ratios.clone(),
            RatioParts::Equal(n) => (0..*n).map(|i| (i.to_string(), 1.0)).collect(),
        }
    }
}

/// A territory in a metric frame, cut by its existing roads and ready to
/// be split.
pub struct GenPlanner {
    ctx: Arc<EngineContext>,
    workers: Workers,
    projection: Option<LocalProjection>,
    /// Disjoint working polygons, metric.
    features: Vec<Polygon<f64>>,
    /// Existing roads, metric.
    existing_roads: Vec<RoadRecord>,
    rng: StdRng,
}

impl GenPlanner {
    /// Prepare `territory`: project to metres, remove exclusions, cut by
    /// existing roads and simplify.
    pub fn new(territory: &[Feature], options: PlannerOptions) -> Result<Self> {
        let PlannerOptions { roads, exclusions, simplify_tolerance, workers, crs, config, seed } = options;

        let shape = polygonal(territory);
        if shape.0.is_empty() {
            return Err(PlannerError::InvalidGeometry("territory has no polygons".into()));
        }
        let projection = match crs {
            Crs::Metric => None,
            Crs::Geographic(epsg) => {
                let bounds = shape
                    .bounding_rect()
                    .ok_or_else(|| PlannerError::InvalidGeometry("territory has no extent".into()))?;
                Some(LocalProjection::estimate(epsg, bounds.center())?)
            }
        };
        let project = |g: &Geometry<f64>| match &projection {
            Some(p) => p.forward(g),
            None => Ok(g.clone()),
        };
        let project_all = |features: &[Feature]| -> Result<Vec<Feature>> {
            features
                .iter()
                .map(|f| Ok(Feature { geometry: project(&f.geometry)?, properties: f.properties.clone() }))
                .collect()
        };

        let mut land = polygonal(&project_all(territory)?);
        let exclusions = polygonal(&project_all(&exclusions)?);
        if !exclusions.0.is_empty() {
            land = land.difference(&exclusions);
        }

        let roads = project_all(&roads)?;
        let existing_roads = road_lines(&roads, config.road_widths.local_road);
        let mut cuts = buffer_lines(existing_roads.iter().map(|r| (&r.geometry, r.width / 2.0)));
        let road_polygons = polygonal(&roads);
        if !road_polygons.0.is_empty() {
            cuts = cuts.union(&road_polygons);
        }
        if !cuts.0.is_empty() {
            land = land.difference(&cuts);
        }

        let features: Vec<Polygon<f64>> = explode(simplify_multipolygon(&land, simplify_tolerance))
            .into_iter()
            .filter(|p| p.unsigned_area() >= MIN_FEATURE_AREA)
            .collect();
        if features.is_empty() {
            return Err(PlannerError::InvalidGeometry("nothing left of the territory after exclusions".into()));
        }
        tracing::info!(
            features = features.len(),
            area = features.iter().map(|f| f.unsigned_area()).sum::<f64>(),
            existing_roads = existing_roads.len(),
            "territory prepared"
        );

        let solver: Arc<dyn PartitionSolver> = Arc::new(PowerDiagramAdapter::new(config.solver_iterations));
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { ctx: Arc::new(EngineContext::new(config, solver)), workers, projection, features, existing_roads, rng })
    }

    /// Replace the partition solver.
    pub fn with_solver(mut self, solver: Arc<dyn PartitionSolver>) -> Self {
        self.ctx = Arc::new(EngineContext::new(self.ctx.config.clone(), solver));
        self
    }

    /// The working polygons, in metres.
    #[inline] pub fn features(&self) -> &[Polygon<f64>] { &self.features }

    #[inline] pub fn config(&self) -> &PlannerConfig { &self.ctx.config }

    pub fn split_by_territorial_zone(&mut self, zone: &TerritoryZone) -> Result<Generation> {
        self.run(&Operation::TerritorialZone(zone.clone()))
    }

    pub fn split_by_functional_zone(&mut self, func_zone: &FuncZone, fixed: &[(String, Coord<f64>)]) -> Result<Generation> {
        self.run(&Operation::FunctionalZone { func_zone: func_zone.clone(), fixed: fixed.to_vec() })
    }

    pub fn split_by_gen_plan(&mut self, plan: &GenPlan) -> Result<Generation> {
        self.run(&Operation::GenPlan(plan.clone()))
    }

    pub fn split_by_ratios(&mut self, parts: RatioParts, road_width: Option<f64>) -> Result<Generation> {
        self.run(&Operation::Ratios { parts, road_width })
    }

    /// Run `operation` until `count` generations succeeded, giving up after
    /// `generation_retries` failures in total.
    pub fn generate_variants(&mut self, count: usize, operation: &Operation) -> Result<Vec<Generation>> {
        let budget = self.ctx.config.generation_retries;
        let mut variants = Vec::with_capacity(count);
        let mut failures = 0;
        while variants.len() < count {
            match self.run(operation) {
                Ok(generation) => variants.push(generation),
                Err(err) => {
                    failures += 1;
                    tracing::warn!(%err, failures, budget, "generation failed");
                    if failures >= budget {
                        return Err(err);
                    }
                }
            }
        }
        Ok(variants)
    }

    /// Run one operation end to end.  The result stays in the planner's
    /// metric frame; [`GenPlanner::to_source_crs`] maps it back.
    pub fn run(&mut self, operation: &Operation) -> Result<Generation> {
        let roots = self.root_tasks(operation)?;
        tracing::info!(tasks = roots.len(), first = %roots[0].describe(), "generation started");
        let generation = Scheduler::new(self.workers).run(roots, Arc::clone(&self.ctx))?;

        let mut roads = generation.roads;
        roads.extend(self.existing_roads.iter().cloned());
        let zones = assemble(generation.zones, &roads);
        Ok(Generation { zones, roads })
    }

    /// Top-level tasks of `operation`; never empty.
    fn root_tasks(&mut self, operation: &Operation) -> Result<Vec<Task>> {
        let features = self.features.clone();
        let job = match operation {
            Operation::TerritorialZone(zone) => {
                return Ok(features
                    .into_iter()
                    .map(|polygon| {
                        let job = Job::ZoneToBlocks { polygon, zone: zone.clone() };
                        Task::new(job, Labels::default(), self.rng.random())
                    })
                    .collect());
            }
            Operation::FunctionalZone { func_zone, fixed } => {
                let fixed = self.check_fixed(func_zone, fixed)?;
                match <[Polygon<f64>; 1]>::try_from(features) {
                    Ok([polygon]) => Job::FuncZoneToTerrZones {
                        polygon,
                        func_zone: func_zone.clone(),
                        fixed,
                        split_further: true,
                        min_factor: self.ctx.config.multi_feature_min_factor,
                        strict: true,
                    },
                    Err(features) => Job::MultiFeatureToTerrZones {
                        features,
                        func_zone: func_zone.clone(),
                        fixed,
                        split_further: true,
                    },
                }
            }
            Operation::GenPlan(plan) => Job::GenPlanToFuncZones { features, plan: plan.clone(), split_further: true },
            Operation::Ratios { parts, road_width } => {
                let ratios = parts.ratios();
                if !(2..=MAX_RATIO_PARTS).contains(&ratios.len()) {
                    return Err(PlannerError::ConstraintViolation(format!(
                        "a ratio split takes 2 to {MAX_RATIO_PARTS} parts, got {}",
                        ratios.len()
                    )));
                }
                let road_width = road_width.unwrap_or(self.ctx.config.road_widths.local_road);
                let polygon = self.single_feature()?;
                Job::SplitByRatios { polygon, ratios, fixed: vec![], road_width }
            }
        };
        Ok(vec![Task::new(job, Labels::default(), self.rng.random())])
    }

    /// The territory as one polygon; a ratio split needs a connected territory.
    fn single_feature(&self) -> Result<Polygon<f64>> {
        match self.features.as_slice() {
            [polygon] => Ok(polygon.clone()),
            features => Err(PlannerError::ConstraintViolation(format!(
                "a ratio split needs a single polygon, the territory has {}",
                features.len()
            ))),
        }
    }

    /// Fixed points moved into metres, after checking each lies on the
    /// working territory and names a zone of `func_zone`.
    fn check_fixed(&self, func_zone: &FuncZone, fixed: &[(String, Coord<f64>)]) -> Result<Vec<(String, Coord<f64>)>> {
        let land = Geometries::new(self.features.clone());
        fixed
            .iter()
            .map(|(name, at)| {
                if func_zone.zone(name).is_none() {
                    return Err(PlannerError::ConstraintViolation(format!(
                        "fixed zone \"{name}\" is not part of {func_zone}"
                    )));
                }
                let at = match &self.projection {
                    Some(p) => p.forward(&Point(*at))?.0,
                    None => *at,
                };
                if land.locate(Point(at)).is_none() {
                    return Err(PlannerError::ConstraintViolation(format!(
                        "fixed zone \"{name}\" at ({:.1}, {:.1}) lies outside the territory",
                        at.x, at.y
                    )));
                }
                Ok((name.clone(), at))
            })
            .collect()
    }

    /// Move a generation back into the territory's coordinate system.
    pub fn to_source_crs(&self, generation: Generation) -> Result<Generation> {
        let Some(projection) = &self.projection else { return Ok(generation) };
        let zones = generation
            .zones
            .into_iter()
            .map(|z| Ok(ZoneRecord { geometry: projection.inverse(&z.geometry)?, labels: z.labels }))
            .collect::<Result<_>>()?;
        let roads = generation
            .roads
            .into_iter()
            .map(|r| Ok(RoadRecord { geometry: projection.inverse(&r.geometry)?, ..r }))
            .collect::<Result<_>>()?;
        Ok(Generation { zones, roads })
    }
}

/// Polygonal geometry of a feature table, multipolygons flattened.
fn polygonal(features: &[Feature]) -> MultiPolygon<f64> {
    MultiPolygon::new(crate::io::polygons_of(features))
}

/// Line features as road rows; `width` comes from the feature or `default_width`.
fn road_lines(features: &[Feature], default_width: f64) -> Vec<RoadRecord> {
    features
        .iter()
        .flat_map(|f| {
            let width = f.number("width").filter(|w| *w > 0.0).unwrap_or(default_width);
            let lines: Vec<LineString<f64>> = match &f.geometry {
                Geometry::LineString(l) => vec![l.clone()],
                Geometry::MultiLineString(ml) => ml.0.clone(),
                _ => vec![],
            };
            lines.into_iter().map(move |l| RoadRecord::new(l, EXISTING_ROAD, width))
        })
        .collect()
}
