use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use geo::{Area, BooleanOps, BoundingRect, Coord, LineString, Polygon, polygon};
use genplanner::engine::{HIGH_SPEED_HIGHWAY, REGULATED_HIGHWAY, UNDEFINED_ROAD, Workers};
use genplanner::geom::Crs;
use genplanner::io::Feature;
use genplanner::solver::{CellComplex, PartitionSolver, SolverFailure, SolverInput};
use genplanner::table::EXISTING_ROAD;
use genplanner::{FuncZone, GenPlan, GenPlanner, Operation, PlannerConfig, PlannerError, PlannerOptions, RatioParts, TerritoryZone};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)]
}

fn metric(seed: u64) -> PlannerOptions {
    PlannerOptions { crs: Crs::Metric, workers: Workers::Pool(2), seed: Some(seed), ..PlannerOptions::default() }
}

fn planner(territory: Polygon<f64>, options: PlannerOptions) -> GenPlanner {
    GenPlanner::new(&[Feature::new(territory)], options).unwrap()
}

fn mixed(min_block_area: f64) -> FuncZone {
    FuncZone::new(
        "mixed",
        [
            (TerritoryZone::new("residential", min_block_area), 0.6),
            (TerritoryZone::new("business", min_block_area), 0.4),
        ],
    )
    .unwrap()
}

fn small_plan() -> GenPlan {
    let living = FuncZone::new(
        "living",
        [(TerritoryZone::new("residential", 50_000.0), 0.7), (TerritoryZone::new("business", 50_000.0), 0.3)],
    )
    .unwrap();
    let work = FuncZone::new(
        "work",
        [(TerritoryZone::new("industrial", 60_000.0), 0.6), (TerritoryZone::new("transport", 40_000.0), 0.4)],
    )
    .unwrap();
    GenPlan::new("plan", [(living, 0.6), (work, 0.4)]).unwrap()
}

/// Every block carries the full label chain of `small_plan` and both road
/// levels above the blocks are present.
fn assert_plan_hierarchy(generation: &genplanner::Generation) {
    assert!(!generation.zones.is_empty());
    let mut func_zones = std::collections::BTreeSet::new();
    for zone in &generation.zones {
        assert_eq!(zone.labels.gen_plan.as_deref(), Some("plan"));
        let func_zone = zone.labels.func_zone.as_deref().unwrap();
        let territory = zone.labels.territory_zone.as_deref().unwrap();
        match func_zone {
            "living" => assert!(territory == "residential" || territory == "business", "{territory}"),
            "work" => assert!(territory == "industrial" || territory == "transport", "{territory}"),
            other => panic!("unexpected functional zone {other}"),
        }
        func_zones.insert(func_zone.to_string());
    }
    assert_eq!(func_zones.len(), 2);

    let levels: Vec<&str> = generation.roads.iter().map(|r| r.level.as_str()).collect();
    assert!(levels.contains(&HIGH_SPEED_HIGHWAY));
    assert!(levels.contains(&REGULATED_HIGHWAY));
}

#[test]
fn ratio_split_of_a_square_kilometre() {
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), metric(42));
    let parts = RatioParts::Named(vec![("residential".into(), 0.5), ("business".into(), 0.5)]);
    let generation = planner.split_by_ratios(parts, None).unwrap();

    assert_eq!(generation.zones.len(), 2);
    for zone in &generation.zones {
        let area = zone.geometry.unsigned_area();
        assert!((area - 500_000.0).abs() <= 60_000.0, "{area}");
    }
    assert!(!generation.roads.is_empty());
    assert!(generation.roads.iter().all(|r| r.level == UNDEFINED_ROAD && r.width == 5.0));
}

#[test]
fn existing_roads_cut_the_territory() {
    let road = Feature::new(LineString::from(vec![(200.0, -10.0), (200.0, 210.0)])).with_property("width", 10.0);
    let options = PlannerOptions { roads: vec![road], ..metric(1) };
    let mut planner = planner(rect(0.0, 0.0, 400.0, 200.0), options);
    assert_eq!(planner.features().len(), 2);

    let generation = planner.split_by_territorial_zone(&TerritoryZone::new("residential", 80_000.0)).unwrap();
    assert_eq!(generation.zones.len(), 2);
    for zone in &generation.zones {
        assert!((zone.geometry.unsigned_area() - 39_000.0).abs() < 100.0);
        assert_eq!(zone.labels.territory_zone.as_deref(), Some("residential"));
    }
    assert_eq!(generation.roads.len(), 1);
    assert_eq!(generation.roads[0].level, EXISTING_ROAD);
    assert_eq!(generation.roads[0].width, 10.0);
}

#[test]
fn exclusions_are_removed_first() {
    let options = PlannerOptions { exclusions: vec![Feature::new(rect(100.0, -5.0, 120.0, 105.0))], ..metric(2) };
    let planner = planner(rect(0.0, 0.0, 300.0, 100.0), options);
    let areas: Vec<f64> = planner.features().iter().map(|f| f.unsigned_area()).collect();
    assert_eq!(areas.len(), 2);
    assert!((areas.iter().sum::<f64>() - 28_000.0).abs() < 1e-6);
}

#[test]
fn interior_exclusion_stays_empty() {
    let lake = rect(300.0, 300.0, 700.0, 700.0);
    let options = PlannerOptions { exclusions: vec![Feature::new(lake.clone())], ..metric(8) };
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), options);
    assert_eq!(planner.features().len(), 1);
    assert_eq!(planner.features()[0].interiors().len(), 1);

    let operation = Operation::Ratios { parts: RatioParts::Equal(2), road_width: None };
    let generation = planner.generate_variants(1, &operation).unwrap().remove(0);

    let names: std::collections::BTreeSet<&str> =
        generation.zones.iter().filter_map(|z| z.labels.zone.as_deref()).collect();
    assert_eq!(names.len(), 2);
    let total: f64 = generation.zones.iter().map(|z| z.geometry.unsigned_area()).sum();
    assert!((total - 840_000.0).abs() <= 84_000.0, "{total}");
    let flooded: f64 = generation.zones.iter().map(|z| z.geometry.intersection(&lake).unsigned_area()).sum();
    assert!(flooded < 1.0, "{flooded} m² of the exclusion covered");
}

#[test]
fn gen_plan_down_to_blocks() {
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), metric(12));
    let generation = planner.generate_variants(1, &Operation::GenPlan(small_plan())).unwrap().remove(0);

    assert_plan_hierarchy(&generation);
    let total: f64 = generation.zones.iter().map(|z| z.geometry.unsigned_area()).sum();
    assert!(total > 800_000.0 && total < 1_000_000.0, "{total}");
}

#[test]
fn gen_plan_over_disjoint_features() {
    let territory = [Feature::new(rect(0.0, 0.0, 600.0, 1_000.0)), Feature::new(rect(650.0, 0.0, 1_250.0, 1_000.0))];
    let mut planner = GenPlanner::new(&territory, metric(13)).unwrap();
    assert_eq!(planner.features().len(), 2);

    let generation = planner.generate_variants(1, &Operation::GenPlan(small_plan())).unwrap().remove(0);
    assert_plan_hierarchy(&generation);

    let gap = rect(600.0, 0.0, 650.0, 1_000.0);
    let in_gap: f64 = generation.zones.iter().map(|z| z.geometry.intersection(&gap).unsigned_area()).sum();
    assert!(in_gap < 1.0, "{in_gap} m² between the features");
}

#[test]
fn functional_zone_down_to_blocks() {
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), metric(7));
    let generation = planner.split_by_functional_zone(&mixed(100_000.0), &[]).unwrap();

    assert!(generation.zones.len() >= 6, "{} blocks", generation.zones.len());
    for zone in &generation.zones {
        assert_eq!(zone.labels.func_zone.as_deref(), Some("mixed"));
        let name = zone.labels.territory_zone.as_deref().unwrap();
        assert!(name == "residential" || name == "business", "{name}");
    }
    let levels: Vec<&str> = generation.roads.iter().map(|r| r.level.as_str()).collect();
    assert!(levels.contains(&REGULATED_HIGHWAY));
    assert!(levels.contains(&"local road, level 1"));
}

#[test]
fn fixed_zones_are_checked() {
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), metric(3));

    let outside = [("business".to_string(), Coord { x: 5_000.0, y: 5_000.0 })];
    let err = planner.split_by_functional_zone(&mixed(80_000.0), &outside).unwrap_err();
    assert!(matches!(err, PlannerError::ConstraintViolation(_)), "{err}");

    let foreign = [("industrial".to_string(), Coord { x: 500.0, y: 500.0 })];
    let err = planner.split_by_functional_zone(&mixed(80_000.0), &foreign).unwrap_err();
    assert!(matches!(err, PlannerError::ConstraintViolation(_)), "{err}");
}

#[test]
fn ratio_split_part_count_is_bounded() {
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), metric(4));
    for n in [1, 9] {
        let err = planner.split_by_ratios(RatioParts::Equal(n), Some(8.0)).unwrap_err();
        assert!(matches!(err, PlannerError::ConstraintViolation(_)), "{n}: {err}");
    }
}

#[test]
fn ratio_split_needs_one_polygon() {
    let road = Feature::new(LineString::from(vec![(200.0, -10.0), (200.0, 210.0)]));
    let mut planner = planner(rect(0.0, 0.0, 400.0, 200.0), PlannerOptions { roads: vec![road], ..metric(5) });
    let err = planner.split_by_ratios(RatioParts::Equal(2), None).unwrap_err();
    assert!(matches!(err, PlannerError::ConstraintViolation(_)));
}

#[test]
fn variants_are_independent_generations() {
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), metric(11));
    let operation = Operation::Ratios { parts: RatioParts::Equal(2), road_width: None };
    let variants = planner.generate_variants(2, &operation).unwrap();
    assert_eq!(variants.len(), 2);
    assert!(variants.iter().all(|g| g.zones.len() == 2));
}

struct Failing {
    calls: AtomicUsize,
}

impl PartitionSolver for Failing {
    fn solve(&self, _input: &SolverInput) -> Result<CellComplex, SolverFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SolverFailure("diverged".into()))
    }
}

#[test]
fn variant_retries_are_bounded() {
    let config = PlannerConfig { split_attempts: 2, generation_retries: 3, ..PlannerConfig::default() };
    let options = PlannerOptions { config, workers: Workers::Inline, ..metric(9) };
    let solver = Arc::new(Failing { calls: AtomicUsize::new(0) });
    let mut planner = planner(rect(0.0, 0.0, 1_000.0, 1_000.0), options).with_solver(solver.clone());

    let operation = Operation::Ratios { parts: RatioParts::Equal(3), road_width: None };
    let err = planner.generate_variants(1, &operation).unwrap_err();
    assert!(matches!(err, PlannerError::SolverDivergence { attempts: 2, .. }), "{err}");
    assert_eq!(solver.calls.load(Ordering::SeqCst), 6);
}

#[test]
fn geographic_territory_is_projected_and_restored() {
    // about 560 m × 1110 m near Saint Petersburg
    let territory = rect(30.30, 59.90, 30.31, 59.91);
    let options = PlannerOptions { crs: Crs::Geographic(4326), workers: Workers::Inline, seed: Some(5), ..PlannerOptions::default() };
    let mut planner = planner(territory, options);

    let metric_area = planner.features()[0].unsigned_area();
    assert!((metric_area - 620_000.0).abs() < 20_000.0, "{metric_area}");

    let generation = planner.split_by_territorial_zone(&TerritoryZone::new("residential", 200_000.0)).unwrap();
    assert_eq!(generation.zones.len(), 3);

    let restored = planner.to_source_crs(generation).unwrap();
    for zone in &restored.zones {
        let bounds = zone.geometry.bounding_rect().unwrap();
        assert!(bounds.min().x > 30.2999 && bounds.max().x < 30.3101, "{bounds:?}");
        assert!(bounds.min().y > 59.8999 && bounds.max().y < 59.9101, "{bounds:?}");
    }
}
