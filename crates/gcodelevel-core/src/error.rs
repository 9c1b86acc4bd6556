//! Error handling for GCodeLevel
//!
//! Provides error types for all layers of the toolchain:
//! - Geometry errors (arc reconstruction, unsupported planes)
//! - G-Code errors (tokenizing)
//! - Configuration errors (settings files and parameters)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::modal::Plane;

/// Geometry error type
///
/// Raised while reconstructing or compensating motions. Every variant is
/// fatal for the transform that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Arc compensation requested outside the XY plane
    #[error("Arcs in the {plane} plane cannot be compensated, only XY plane arcs are supported")]
    UnsupportedPlane {
        /// The plane that was active when the arc was encountered.
        plane: Plane,
    },

    /// Arc center or radius cannot be reconciled with its endpoints
    #[error("Malformed arc: {reason}")]
    MalformedArc {
        /// Why the arc was rejected.
        reason: String,
    },

    /// Segment length used for subdivision is not a positive finite number
    #[error("Invalid segment length: {value}")]
    InvalidSegmentLength {
        /// The rejected value.
        value: f64,
    },

    /// A single motion would be split into more pieces than allowed
    #[error("Motion needs {count} pieces, more than the limit of {limit}")]
    TooManySegments {
        /// Pieces the motion would need.
        count: usize,
        /// Largest accepted piece count.
        limit: usize,
    },

    /// Output precision outside the supported range
    #[error("Invalid precision {value}: at most {max} decimal digits are supported")]
    InvalidPrecision {
        /// The rejected value.
        value: u32,
        /// Largest supported precision.
        max: u32,
    },

    /// Height map data is inconsistent
    #[error("Invalid height map: {reason}")]
    InvalidHeightMap {
        /// Why the map was rejected.
        reason: String,
    },
}

impl GeometryError {
    /// Shorthand for a [`GeometryError::MalformedArc`]
    pub fn malformed_arc(reason: impl Into<String>) -> Self {
        Self::MalformedArc {
            reason: reason.into(),
        }
    }
}

/// G-Code error type
///
/// Represents errors raised while tokenizing G-Code text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// Invalid G-Code syntax
    #[error("Invalid syntax at line {line_number}: {reason}")]
    InvalidSyntax {
        /// The line number where the syntax error occurred.
        line_number: u32,
        /// The reason for the syntax error.
        reason: String,
    },

    /// Invalid or conflicting parameter words
    #[error("Invalid parameter '{param}' at line {line_number}: {reason}")]
    InvalidParameter {
        /// The line number where the invalid parameter was found.
        line_number: u32,
        /// The parameter name.
        param: String,
        /// The reason the parameter is invalid.
        reason: String,
    },
}

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting holds a value outside its valid range
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The setting key.
        key: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The settings file extension is not recognized
    #[error("Unsupported config format: {path} (expected .json or .toml)")]
    UnsupportedFormat {
        /// The offending path.
        path: String,
    },

    /// The settings file could not be parsed or written
    #[error("Config parse error: {0}")]
    Parse(String),
}

/// Main error type for GCodeLevel
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
