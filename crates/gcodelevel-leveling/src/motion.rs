//! Motion primitives
//!
//! A [`Motion`] is one atomic move, either a straight [`Line`] or a circular
//! [`Arc`]. Both report their travel length, can be sampled at a ratio along
//! the path, and can be split into contiguous pieces no longer than a given
//! length.

use std::iter::FusedIterator;

use gcodelevel_core::{ArcDirection, DVec2, DVec3, Plane};

/// Straight segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Start point
    pub start: DVec3,
    /// End point
    pub end: DVec3,
    /// G0 positioning move; never subdivided
    pub rapid: bool,
}

impl Line {
    /// Creates a new line
    pub fn new(start: DVec3, end: DVec3, rapid: bool) -> Self {
        Self { start, end, rapid }
    }

    /// Straight-line distance
    pub fn length(&self) -> f64 {
        (self.end - self.start).length()
    }

    /// Point at `ratio` (0 = start, 1 = end)
    pub fn interpolate(&self, ratio: f64) -> DVec3 {
        self.start + (self.end - self.start) * ratio
    }
}

/// Circular segment in one of the three arc planes
///
/// The center is expressed in the plane's own (u, v) axes; see
/// [`Plane::project`]. Travel along the plane normal is interpolated
/// linearly, giving a helix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    /// Start point
    pub start: DVec3,
    /// End point
    pub end: DVec3,
    /// Center in plane coordinates
    pub center: DVec2,
    /// Winding direction
    pub direction: ArcDirection,
    /// Plane the arc curves in
    pub plane: Plane,
}

impl Arc {
    /// Creates a new arc from an already known center
    pub fn new(
        start: DVec3,
        end: DVec3,
        center: DVec2,
        direction: ArcDirection,
        plane: Plane,
    ) -> Self {
        Self {
            start,
            end,
            center,
            direction,
            plane,
        }
    }

    /// Arc length, `|angle_span * radius|`
    pub fn length(&self) -> f64 {
        (self.angle_span() * self.radius()).abs()
    }

    /// Point at `ratio` of the angular span
    pub fn interpolate(&self, ratio: f64) -> DVec3 {
        let start = self.plane.to_plane(self.start);
        let end = self.plane.to_plane(self.end);
        let radius = self.radius();
        let angle = self.start_angle() + self.angle_span() * ratio;

        let point = DVec3::new(
            self.center.x + radius * angle.cos(),
            self.center.y + radius * angle.sin(),
            start.z + (end.z - start.z) * ratio,
        );
        self.plane.from_plane(point)
    }
}

/// A single move: straight or circular
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Straight move
    Line(Line),
    /// Circular move
    Arc(Arc),
}

impl Motion {
    /// Start point
    pub fn start(&self) -> DVec3 {
        match self {
            Motion::Line(line) => line.start,
            Motion::Arc(arc) => arc.start,
        }
    }

    /// End point
    pub fn end(&self) -> DVec3 {
        match self {
            Motion::Line(line) => line.end,
            Motion::Arc(arc) => arc.end,
        }
    }

    /// Travel distance along the path
    pub fn length(&self) -> f64 {
        match self {
            Motion::Line(line) => line.length(),
            Motion::Arc(arc) => arc.length(),
        }
    }

    /// Point at `ratio` along the path
    pub fn interpolate(&self, ratio: f64) -> DVec3 {
        match self {
            Motion::Line(line) => line.interpolate(ratio),
            Motion::Arc(arc) => arc.interpolate(ratio),
        }
    }

    /// True for a G0 line
    pub fn is_rapid(&self) -> bool {
        matches!(self, Motion::Line(Line { rapid: true, .. }))
    }

    /// Number of pieces [`Motion::split`] produces for `max_length`.
    ///
    /// `ceil(length / max_length)`, at least 1. Rapid lines always give 1.
    pub fn divisions(&self, max_length: f64) -> usize {
        if self.is_rapid() {
            return 1;
        }
        let divisions = (self.length() / max_length).ceil();
        if divisions.is_finite() && divisions >= 1.0 {
            divisions as usize
        } else {
            1
        }
    }

    /// Split into contiguous pieces no longer than `max_length`.
    ///
    /// Lines are cut at uniform parametric steps, arcs at uniform angular
    /// steps. The first piece starts exactly at [`Motion::start`] and the
    /// last ends exactly at [`Motion::end`]. A motion that needs a single
    /// piece yields itself unchanged.
    pub fn split(&self, max_length: f64) -> Split {
        Split {
            motion: *self,
            divisions: self.divisions(max_length),
            index: 0,
            last_end: self.start(),
        }
    }

    fn with_endpoints(&self, start: DVec3, end: DVec3) -> Motion {
        match self {
            Motion::Line(line) => Motion::Line(Line { start, end, ..*line }),
            Motion::Arc(arc) => Motion::Arc(Arc { start, end, ..*arc }),
        }
    }
}

impl From<Line> for Motion {
    fn from(line: Line) -> Self {
        Motion::Line(line)
    }
}

impl From<Arc> for Motion {
    fn from(arc: Arc) -> Self {
        Motion::Arc(arc)
    }
}

/// Lazy iterator over the pieces of a split motion
#[derive(Debug, Clone)]
pub struct Split {
    motion: Motion,
    divisions: usize,
    index: usize,
    last_end: DVec3,
}

impl Iterator for Split {
    type Item = Motion;

    fn next(&mut self) -> Option<Motion> {
        if self.index >= self.divisions {
            return None;
        }
        self.index += 1;

        let end = if self.index == self.divisions {
            self.motion.end()
        } else {
            self.motion
                .interpolate(self.index as f64 / self.divisions as f64)
        };
        let start = std::mem::replace(&mut self.last_end, end);
        Some(self.motion.with_endpoints(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.divisions - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Split {}

impl FusedIterator for Split {}
