use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use gcodelevel::{init_logging, level_program, Config, GridHeightMap};

/// Apply a probed height map to a G-code program
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// G-code program to level
    input: PathBuf,

    /// Height map (JSON grid)
    #[arg(short = 'm', long)]
    height_map: PathBuf,

    /// Settings file (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decimal digits of emitted coordinates
    #[arg(short, long)]
    precision: Option<u32>,

    /// Maximum length of a split piece
    #[arg(short, long)]
    segment_length: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::new(),
    };
    if let Some(precision) = args.precision {
        config.output.precision = precision;
    }
    if let Some(length) = args.segment_length {
        config.leveling.max_segment_length = Some(length);
    }
    debug!(?config, "Effective configuration");

    let map_text = std::fs::read_to_string(&args.height_map)
        .with_context(|| format!("Failed to read height map {}", args.height_map.display()))?;
    let map = GridHeightMap::from_json(&map_text)
        .with_context(|| format!("Invalid height map {}", args.height_map.display()))?;

    let program = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let leveled = level_program(&program, &map, &config)
        .with_context(|| format!("Failed to level {}", args.input.display()))?;

    match &args.output {
        Some(path) => std::fs::write(path, leveled.to_text())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", leveled.to_text()),
    }
    Ok(())
}
