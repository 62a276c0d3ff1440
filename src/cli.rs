use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

/// Synthetic urban block layout generator
#[derive(Parser, Debug)]
#[command(name = "genplanner", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a territory into zones, blocks and roads
    Generate(GenerateArgs),
}

/// What the territory is split into.
#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
pub enum Mode {
    /// Functional zones of a general plan, down to blocks
    GenPlan,
    /// Territorial zones of a functional zone, down to blocks
    FuncZone,
    /// Blocks of a single territorial zone
    TerrZone,
    /// Named parts by ratio
    Ratios,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Territory GeoJSON (polygons)
    #[arg(value_hint = ValueHint::FilePath)]
    pub territory: PathBuf,

    /// Output directory
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::GenPlan)]
    pub mode: Mode,

    /// Zone name: general plan, functional zone or territorial zone, depending on the mode
    #[arg(long)]
    pub zone: Option<String>,

    /// Custom ratios as NAME=RATIO (repeatable); a custom functional zone in
    /// func-zone mode, the parts in ratios mode
    #[arg(long = "ratio", value_parser = parse_ratio)]
    pub ratios: Vec<(String, f64)>,

    /// Number of equal parts in ratios mode
    #[arg(long, conflicts_with = "ratios")]
    pub parts: Option<usize>,

    /// Road width of a ratios split (metres)
    #[arg(long)]
    pub road_width: Option<f64>,

    /// Points with a `zone` property pinning territorial zones (func-zone mode)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub fixed: Option<PathBuf>,

    /// Existing roads GeoJSON: lines with an optional `width`, or polygons
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub roads: Option<PathBuf>,

    /// Polygons removed from the territory (water, protected areas)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub exclusions: Option<PathBuf>,

    /// Simplification tolerance in metres
    #[arg(long, default_value_t = 0.0)]
    pub simplify: f64,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Run every task on the main thread
    #[arg(long, conflicts_with = "workers")]
    pub dev: bool,

    /// Coordinates are already metric; skip reprojection
    #[arg(long)]
    pub metric: bool,

    /// EPSG code of geographic input
    #[arg(long, default_value_t = 4326, conflicts_with = "metric")]
    pub epsg: u32,

    /// Planner config JSON; missing keys keep their default
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// JSON object of territorial zone name -> min block area (m²)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub min_block_areas: Option<PathBuf>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of variants to generate
    #[arg(long, default_value_t = 1)]
    pub variants: usize,

    /// Overwrite existing output files
    #[arg(long)]
    pub force: bool,
}

fn parse_ratio(s: &str) -> Result<(String, f64), String> {
    let (name, ratio) = s.split_once('=').ok_or_else(|| format!("expected NAME=RATIO, got '{s}'"))?;
    let ratio: f64 = ratio.trim().parse().map_err(|e| format!("bad ratio in '{s}': {e}"))?;
    Ok((name.trim().to_string(), ratio))
}
