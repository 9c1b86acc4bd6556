//! # GCodeLevel Leveling
//!
//! Height-map compensation of G-code toolpaths.
//!
//! - [`motion`]: line and arc motions, their length, interpolation and
//!   subdivision into bounded-length pieces
//! - [`arc`]: arc center reconstruction and angular span arithmetic
//! - [`height_map`]: the height-correction capability and a grid map
//! - [`compensation`]: the single pass that walks a token stream, splits
//!   each move and shifts every endpoint by the probed surface height

pub mod arc;
pub mod compensation;
pub mod height_map;
pub mod motion;

pub use compensation::{
    compensate, Compensation, CompensationOptions, CompensationReport, Compensator, PassState,
    MAX_PIECES_PER_MOTION,
};
pub use height_map::{FnHeightCorrection, GridHeightMap, HeightCorrection};
pub use motion::{Arc, Line, Motion, Split};
