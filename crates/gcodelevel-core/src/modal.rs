//! Modal state shared by the tokenizer and the compensation pass

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::{DVec2, DVec3, VectorExt};

/// Arc plane selection (G17, G18, G19)
///
/// Each plane names the two axes an arc curves in, in order, followed by the
/// normal axis the arc may travel along as a helix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    /// G17: X, Y (normal Z)
    #[default]
    XY,
    /// G19: Y, Z (normal X)
    YZ,
    /// G18: Z, X (normal Y)
    ZX,
}

impl Plane {
    /// Number of axis-roll turns mapping machine coordinates into this plane
    pub fn turns(self) -> i32 {
        match self {
            Plane::XY => 0,
            Plane::YZ => 1,
            Plane::ZX => 2,
        }
    }

    /// Map machine coordinates to (u, v, normal)
    pub fn to_plane(self, point: DVec3) -> DVec3 {
        point.roll(self.turns())
    }

    /// Map (u, v, normal) back to machine coordinates
    pub fn from_plane(self, point: DVec3) -> DVec3 {
        point.roll(-self.turns())
    }

    /// Project a machine point onto the plane's two axes
    pub fn project(self, point: DVec3) -> DVec2 {
        self.to_plane(point).truncate()
    }

    /// Plane selected by a G-code number
    pub fn from_gcode(code: u8) -> Option<Self> {
        match code {
            17 => Some(Plane::XY),
            18 => Some(Plane::ZX),
            19 => Some(Plane::YZ),
            _ => None,
        }
    }

    /// G-code number selecting this plane
    pub fn gcode(self) -> u8 {
        match self {
            Plane::XY => 17,
            Plane::ZX => 18,
            Plane::YZ => 19,
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::XY => write!(f, "XY"),
            Plane::YZ => write!(f, "YZ"),
            Plane::ZX => write!(f, "ZX"),
        }
    }
}

/// Distance mode (G90, G91)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    /// G90: coordinates are targets
    #[default]
    Absolute,
    /// G91: coordinates are deltas from the current position
    Incremental,
}

impl DistanceMode {
    /// Distance mode selected by a G-code number
    pub fn from_gcode(code: u8) -> Option<Self> {
        match code {
            90 => Some(DistanceMode::Absolute),
            91 => Some(DistanceMode::Incremental),
            _ => None,
        }
    }

    /// G-code number selecting this mode
    pub fn gcode(self) -> u8 {
        match self {
            DistanceMode::Absolute => 90,
            DistanceMode::Incremental => 91,
        }
    }
}

impl fmt::Display for DistanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMode::Absolute => write!(f, "Absolute"),
            DistanceMode::Incremental => write!(f, "Incremental"),
        }
    }
}

/// Arc winding direction (G2, G3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcDirection {
    /// G2
    Clockwise,
    /// G3
    CounterClockwise,
}

impl ArcDirection {
    /// G-code number for this direction
    pub fn gcode(self) -> u8 {
        match self {
            ArcDirection::Clockwise => 2,
            ArcDirection::CounterClockwise => 3,
        }
    }
}
