//! Configuration for a leveling run
//!
//! Settings are grouped into sections:
//! - Leveling (segment length override)
//! - Output (precision, line numbering)
//! - Machine (state of the controller when the program starts)
//!
//! Files are JSON or TOML, selected by extension. Every section and field is
//! optional in the file; missing values take their defaults.

pub use gcodelevel_core::MAX_PRECISION;

use gcodelevel_core::{ConfigError, DistanceMode, Error, Plane, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Compensation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingSettings {
    /// Maximum length of a split piece; the height map's grid spacing when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_segment_length: Option<f64>,
}

/// Output formatting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Decimal digits of emitted coordinates
    pub precision: u32,
    /// Whether to renumber output lines with `N` words
    pub line_numbers_enabled: bool,
    /// Step between consecutive line numbers
    pub line_number_increment: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            precision: 4,
            line_numbers_enabled: false,
            line_number_increment: 10,
        }
    }
}

/// Controller state when the program starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Machine position (X, Y, Z)
    pub start_position: [f64; 3],
    /// Active arc plane
    pub plane: Plane,
    /// Active distance mode
    pub distance_mode: DistanceMode,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compensation settings
    pub leveling: LevelingSettings,
    /// Output formatting
    pub output: OutputSettings,
    /// Initial machine state
    pub machine: MachineSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }
            .into()),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Invalid JSON config: {}", e)))?,
            Format::Toml => toml::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Invalid TOML config: {}", e)))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?,
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?,
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(length) = self.leveling.max_segment_length {
            if !(length.is_finite() && length > 0.0) {
                return Err(invalid(
                    "leveling.max_segment_length",
                    format!("must be a positive number, got {}", length),
                ));
            }
        }

        if self.output.precision > MAX_PRECISION {
            return Err(invalid(
                "output.precision",
                format!("must be at most {}, got {}", MAX_PRECISION, self.output.precision),
            ));
        }

        if self.output.line_number_increment == 0 {
            return Err(invalid("output.line_number_increment", "must be > 0"));
        }

        if self.machine.start_position.iter().any(|v| !v.is_finite()) {
            return Err(invalid("machine.start_position", "must be finite"));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> Error {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}
