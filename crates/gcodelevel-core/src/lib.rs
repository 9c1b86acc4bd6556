//! # GCodeLevel Core
//!
//! Core types and utilities shared by the GCodeLevel crates:
//! - 3D vector algebra and axis-roll helpers used for plane remapping
//! - Modal state enums (plane, distance mode, arc direction)
//! - The unified error taxonomy

pub mod error;
pub mod geometry;
pub mod modal;

pub use error::{ConfigError, Error, GcodeError, GeometryError, Result};
pub use geometry::{round_to, DVec2, DVec3, Position, VectorExt, MAX_PRECISION};
pub use modal::{ArcDirection, DistanceMode, Plane};
