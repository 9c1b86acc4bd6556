//! G-Code token types
//!
//! A parsed program is an ordered list of [`GcodeToken`]s. Motion tokens keep
//! track of which coordinate words were written on the source line so that
//! unspecified axes can be resolved against the running position.

use serde::{Deserialize, Serialize};

use gcodelevel_core::{ArcDirection, DVec3, DistanceMode, Plane};

/// Per-axis values, `None` where the word was absent
///
/// Used both for X/Y/Z targets and for I/J/K center offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    /// X (or I) value
    pub x: Option<f64>,
    /// Y (or J) value
    pub y: Option<f64>,
    /// Z (or K) value
    pub z: Option<f64>,
}

impl Axes {
    /// Create axes from optional components
    pub fn new(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Self {
        Self { x, y, z }
    }

    /// All three axes present
    pub fn xyz(point: DVec3) -> Self {
        Self::new(Some(point.x), Some(point.y), Some(point.z))
    }

    /// True when no axis word was given
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// Resolve against a running position.
    ///
    /// Absolute: missing axes keep the origin's value. Incremental: present
    /// axes are deltas and missing axes are a zero delta.
    pub fn resolve(&self, origin: DVec3, mode: DistanceMode) -> DVec3 {
        match mode {
            DistanceMode::Absolute => DVec3::new(
                self.x.unwrap_or(origin.x),
                self.y.unwrap_or(origin.y),
                self.z.unwrap_or(origin.z),
            ),
            DistanceMode::Incremental => {
                origin
                    + DVec3::new(
                        self.x.unwrap_or(0.0),
                        self.y.unwrap_or(0.0),
                        self.z.unwrap_or(0.0),
                    )
            }
        }
    }

    /// Missing components read as zero
    pub fn or_zero(&self) -> DVec3 {
        DVec3::new(
            self.x.unwrap_or(0.0),
            self.y.unwrap_or(0.0),
            self.z.unwrap_or(0.0),
        )
    }

    /// Keep `point`'s components on the axes present in `self`
    pub fn mask(&self, point: DVec3) -> Self {
        Self::new(
            self.x.map(|_| point.x),
            self.y.map(|_| point.y),
            self.z.map(|_| point.z),
        )
    }

    /// Same presence as `self`, with Z always present
    pub fn with_z(mut self) -> Self {
        self.z = Some(self.z.unwrap_or(0.0));
        self
    }
}

/// How an arc's center is encoded on its source line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArcEncoding {
    /// I/J/K offsets from the arc start to the center
    CenterOffset(Axes),
    /// Signed radius; negative selects the arc longer than a half circle
    Radius(f64),
}

/// Kind of a motion token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionKind {
    /// G0 positioning move
    Rapid,
    /// G1 feed move
    Linear,
    /// G2/G3 circular feed move
    Arc {
        /// Winding direction
        direction: ArcDirection,
        /// Center encoding
        encoding: ArcEncoding,
    },
}

impl MotionKind {
    /// G-code number for this motion
    pub fn gcode(&self) -> u8 {
        match self {
            MotionKind::Rapid => 0,
            MotionKind::Linear => 1,
            MotionKind::Arc { direction, .. } => direction.gcode(),
        }
    }
}

/// A single motion word group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    /// Motion kind
    pub kind: MotionKind,
    /// Target words as written (absolute or incremental per distance mode)
    pub target: Axes,
    /// Feed rate word on the same line
    pub feed_rate: Option<f64>,
}

impl MotionCommand {
    /// Create a rapid move
    pub fn rapid(target: Axes) -> Self {
        Self {
            kind: MotionKind::Rapid,
            target,
            feed_rate: None,
        }
    }

    /// Create a linear feed move
    pub fn linear(target: Axes) -> Self {
        Self {
            kind: MotionKind::Linear,
            target,
            feed_rate: None,
        }
    }

    /// Create an arc move
    pub fn arc(direction: ArcDirection, encoding: ArcEncoding, target: Axes) -> Self {
        Self {
            kind: MotionKind::Arc {
                direction,
                encoding,
            },
            target,
            feed_rate: None,
        }
    }

    /// Attach a feed rate
    pub fn with_feed_rate(mut self, feed_rate: f64) -> Self {
        self.feed_rate = Some(feed_rate);
        self
    }
}

/// One record of a parsed program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GcodeToken {
    /// G0/G1/G2/G3 move
    Motion(MotionCommand),
    /// G17/G18/G19
    PlaneSelect(Plane),
    /// G90/G91
    DistanceMode(DistanceMode),
    /// Anything else, forwarded verbatim
    Passthrough(String),
}

impl GcodeToken {
    /// The motion command, if this is a motion token
    pub fn as_motion(&self) -> Option<&MotionCommand> {
        match self {
            GcodeToken::Motion(motion) => Some(motion),
            _ => None,
        }
    }
}
