//! # GCodeLevel G-Code
//!
//! G-code token model and text adapters for GCodeLevel:
//! - Token types carrying axis presence (which words a line specified)
//! - A line tokenizer with modal motion tracking
//! - A formatter rendering tokens back to text with optional renumbering

pub mod command;
pub mod formatter;
pub mod parser;

pub use command::{ArcEncoding, Axes, GcodeToken, MotionCommand, MotionKind};
pub use formatter::{GcodeFormatter, LineNumbering};
pub use parser::GcodeParser;
