//! GCodeLevel Settings Crate
//!
//! Loads, validates and saves the configuration of a leveling run.

pub mod config;

pub use config::{Config, LevelingSettings, MachineSettings, OutputSettings, MAX_PRECISION};
