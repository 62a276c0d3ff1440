use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use genplanner::cli::{Cli, Commands};
use genplanner::commands::generate;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("genplanner={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match &cli.command {
        Commands::Generate(args) => generate::run(&cli, args),
    }
}
