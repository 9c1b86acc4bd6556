//! # GCodeLevel
//!
//! Height-map Z compensation for G-code toolpaths. A program is tokenized,
//! every feed move is split into pieces no longer than the probe grid
//! resolution, each piece's endpoint is lifted by the probed surface height,
//! and the result is written back out as G-code.
//!
//! ## Architecture
//!
//! GCodeLevel is organized as a workspace with multiple crates:
//!
//! 1. **gcodelevel-core** - Errors, vector helpers, modal state
//! 2. **gcodelevel-gcode** - Tokenizer and formatter
//! 3. **gcodelevel-leveling** - Motion splitting, arc geometry, compensation pass
//! 4. **gcodelevel-settings** - Configuration files
//! 5. **gcodelevel** - This crate: the pipeline and the command line tool

pub use gcodelevel_core::{
    ArcDirection, ConfigError, DistanceMode, Error, GcodeError, GeometryError, Plane, Position,
    Result,
};
pub use gcodelevel_gcode::{GcodeFormatter, GcodeParser, GcodeToken, LineNumbering};
pub use gcodelevel_leveling::{
    compensate, Compensation, CompensationOptions, CompensationReport, FnHeightCorrection,
    GridHeightMap, HeightCorrection,
};
pub use gcodelevel_settings::Config;

use tracing::info;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Leveled program text and pass statistics
#[derive(Debug, Clone, PartialEq)]
pub struct LeveledProgram {
    /// Output lines, without line terminators
    pub lines: Vec<String>,
    /// Motion counts of the compensation pass
    pub report: CompensationReport,
}

impl LeveledProgram {
    /// Program text with one line per output token
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Compensation options described by `config`
pub fn compensation_options(config: &Config) -> CompensationOptions {
    let [x, y, z] = config.machine.start_position;
    CompensationOptions {
        start_position: Position::new(x, y, z),
        plane: config.machine.plane,
        distance_mode: config.machine.distance_mode,
        precision: config.output.precision,
        segment_length: config.leveling.max_segment_length,
    }
}

/// Output formatter described by `config`
pub fn formatter(config: &Config) -> GcodeFormatter {
    let formatter = GcodeFormatter::new(config.output.precision);
    if config.output.line_numbers_enabled {
        formatter.with_line_numbers(LineNumbering {
            start: config.output.line_number_increment,
            increment: config.output.line_number_increment,
        })
    } else {
        formatter
    }
}

/// Tokenize, compensate and format a whole program.
///
/// Nothing is returned unless every stage succeeds.
pub fn level_program<M: HeightCorrection + ?Sized>(
    text: &str,
    map: &M,
    config: &Config,
) -> Result<LeveledProgram> {
    config.validate()?;

    let tokens = GcodeParser::new().parse(text)?;
    let compensation = compensate(&tokens, map, &compensation_options(config))?;
    let lines = formatter(config).format(&compensation.tokens);

    info!(
        input_motions = compensation.report.input_motions,
        output_motions = compensation.report.output_motions,
        split_motions = compensation.report.split_motions,
        lines = lines.len(),
        "Leveled program"
    );
    Ok(LeveledProgram {
        lines,
        report: compensation.report,
    })
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, keeping stdout free for G-code
/// - RUST_LOG environment variable support (default level `info`)
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
