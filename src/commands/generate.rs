use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow, bail, ensure};
use geo::{Coord, Geometry};

use crate::cli::{Cli, GenerateArgs, Mode};
use crate::config::PlannerConfig;
use crate::engine::Workers;
use crate::geom::Crs;
use crate::io::{
    Feature, ensure_dir_exists, outline_features, read_geojson_file, road_features, write_geojson_file,
    zone_features,
};
use crate::planner::{GenPlanner, Operation, PlannerOptions, RatioParts};
use crate::table::{Generation, write_csv};
use crate::zoning::ZoneCatalog;

const OUTPUTS: [&str; 4] = ["zones.geojson", "roads.geojson", "outlines.geojson", "zones.csv"];

pub fn run(cli: &Cli, args: &GenerateArgs) -> Result<()> {
    ensure!(args.variants > 0, "--variants must be at least 1");

    let config = match &args.config {
        Some(path) => PlannerConfig::from_json_file(path)?,
        None => PlannerConfig::default(),
    };
    let catalog = match &args.min_block_areas {
        Some(path) => ZoneCatalog::with_min_block_areas(&read_json_map(path)?)?,
        None => ZoneCatalog::standard(),
    };
    let operation = operation(args, &catalog)?;

    let territory = read_geojson_file(&args.territory)?;
    let options = PlannerOptions {
        roads: read_optional(args.roads.as_deref())?,
        exclusions: read_optional(args.exclusions.as_deref())?,
        simplify_tolerance: args.simplify,
        workers: if args.dev { Workers::Inline } else { Workers::Pool(args.workers) },
        crs: if args.metric { Crs::Metric } else { Crs::Geographic(args.epsg) },
        config,
        seed: args.seed,
    };
    if cli.verbose > 0 {
        eprintln!("[generate] territory={} mode={:?} -> {}", args.territory.display(), args.mode, args.out.display());
    }

    let mut planner = GenPlanner::new(&territory, options)?;
    let variants = planner.generate_variants(args.variants, &operation)?;

    for (i, generation) in variants.into_iter().enumerate() {
        let dir = if args.variants == 1 { args.out.clone() } else { args.out.join(format!("variant-{i}")) };
        ensure_dir_exists(&dir)?;
        if !args.force {
            if let Some(existing) = OUTPUTS.iter().map(|name| dir.join(name)).find(|p| p.exists()) {
                bail!("{} already exists (use --force to overwrite)", existing.display());
            }
        }
        write_generation(&planner, generation, &dir)?;
        if cli.verbose > 0 {
            eprintln!("[generate] wrote {}", dir.display());
        }
    }
    Ok(())
}

/// The CSV is written from the metric generation so `area_m2` is in m².
fn write_generation(planner: &GenPlanner, generation: Generation, dir: &Path) -> Result<()> {
    write_csv(&mut generation.zones_frame()?, &dir.join("zones.csv"))?;
    let generation = planner.to_source_crs(generation)?;
    write_geojson_file(&dir.join("zones.geojson"), &zone_features(&generation.zones))?;
    write_geojson_file(&dir.join("roads.geojson"), &road_features(&generation.roads))?;
    write_geojson_file(&dir.join("outlines.geojson"), &outline_features(&generation.zones))?;
    Ok(())
}

fn operation(args: &GenerateArgs, catalog: &ZoneCatalog) -> Result<Operation> {
    Ok(match args.mode {
        Mode::GenPlan => {
            let plan = match &args.zone {
                Some(name) => catalog.gen_plan(name)?,
                None => catalog.default_gen_plan(),
            };
            Operation::GenPlan(plan.clone())
        }
        Mode::FuncZone => {
            let func_zone = match (&args.zone, args.ratios.is_empty()) {
                (Some(name), true) => catalog.func_zone(name)?.clone(),
                (name, false) => catalog.custom_func_zone(name.as_deref().unwrap_or("custom"), &args.ratios)?,
                (None, true) => bail!("func-zone mode needs --zone or --ratio"),
            };
            let fixed = match &args.fixed {
                Some(path) => fixed_points(&read_geojson_file(path)?)?,
                None => vec![],
            };
            Operation::FunctionalZone { func_zone, fixed }
        }
        Mode::TerrZone => {
            let name = args.zone.as_deref().ok_or_else(|| anyhow!("terr-zone mode needs --zone"))?;
            Operation::TerritorialZone(catalog.territory_zone(name)?.clone())
        }
        Mode::Ratios => {
            let parts = match args.parts {
                Some(n) => RatioParts::Equal(n),
                None if !args.ratios.is_empty() => RatioParts::Named(args.ratios.clone()),
                None => bail!("ratios mode needs --parts or --ratio"),
            };
            Operation::Ratios { parts, road_width: args.road_width }
        }
    })
}

/// Point features with a `zone` property.
fn fixed_points(features: &[Feature]) -> Result<Vec<(String, Coord<f64>)>> {
    features
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let Geometry::Point(point) = &f.geometry else { bail!("fixed zone {i} is not a point") };
            let zone = f.text("zone").with_context(|| format!("fixed zone {i} has no `zone` property"))?;
            Ok((zone.to_string(), point.0))
        })
        .collect()
}

fn read_optional(path: Option<&Path>) -> Result<Vec<Feature>> {
    path.map(read_geojson_file).transpose().map(Option::unwrap_or_default)
}

fn read_json_map(path: &Path) -> Result<BTreeMap<String, f64>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse {}", path.display()))
}
