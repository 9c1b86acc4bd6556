//! Arc geometry solver
//!
//! Reconstructs an arc's center from either G-code encoding and derives its
//! angles. All angles are measured in the arc's plane with `atan2` of the
//! point relative to the center.

use std::f64::consts::TAU;
use tracing::{debug, trace};

use gcodelevel_core::{ArcDirection, DVec2, DVec3, GeometryError, Plane};
use gcodelevel_gcode::ArcEncoding;

use crate::motion::Arc;

/// Absolute start/end radius mismatch accepted without error
pub const RADIUS_TOLERANCE: f64 = 0.005;

/// Relative start/end radius mismatch accepted without error
pub const RADIUS_TOLERANCE_RELATIVE: f64 = 0.001;

const DEGENERATE_LENGTH: f64 = 1e-9;

impl Arc {
    /// Build an arc from its G-code encoding
    ///
    /// # Errors
    /// [`GeometryError::MalformedArc`] when the center cannot be reconciled
    /// with both endpoints.
    pub fn from_encoding(
        start: DVec3,
        end: DVec3,
        encoding: &ArcEncoding,
        direction: ArcDirection,
        plane: Plane,
    ) -> Result<Self, GeometryError> {
        let center = match encoding {
            ArcEncoding::CenterOffset(offset) => center_from_offset(start, offset.or_zero(), plane),
            ArcEncoding::Radius(radius) => {
                center_from_radius(start, end, *radius, direction, plane)?
            }
        };
        let arc = Arc::new(start, end, center, direction, plane);
        arc.check_radii()?;
        trace!(?start, ?end, ?center, ?direction, %plane, "Resolved arc center");
        Ok(arc)
    }

    /// Angle of the start point around the center
    pub fn start_angle(&self) -> f64 {
        let relative = self.plane.project(self.start) - self.center;
        relative.y.atan2(relative.x)
    }

    /// Angle of the end point around the center
    pub fn end_angle(&self) -> f64 {
        let relative = self.plane.project(self.end) - self.center;
        relative.y.atan2(relative.x)
    }

    /// Signed angular travel; never positive for CW, never negative for CCW.
    ///
    /// Zero for a degenerate arc whose endpoints sit on the center.
    pub fn angle_span(&self) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        angle_span(self.start_angle(), self.end_angle(), self.direction)
    }

    /// Both endpoints coincide with the center in the arc plane
    pub fn is_degenerate(&self) -> bool {
        let (start_radius, end_radius) = self.endpoint_radii();
        start_radius <= DEGENERATE_LENGTH && end_radius <= DEGENERATE_LENGTH
    }

    /// Mean of the start-to-center and end-to-center distances
    pub fn radius(&self) -> f64 {
        let (start_radius, end_radius) = self.endpoint_radii();
        (start_radius + end_radius) / 2.0
    }

    /// Center relative to `from`, in machine axes (I, J, K)
    pub fn center_offset(&self, from: DVec3) -> DVec3 {
        let relative = self.center - self.plane.project(from);
        self.plane.from_plane(relative.extend(0.0))
    }

    fn endpoint_radii(&self) -> (f64, f64) {
        (
            (self.plane.project(self.start) - self.center).length(),
            (self.plane.project(self.end) - self.center).length(),
        )
    }

    fn check_radii(&self) -> Result<(), GeometryError> {
        let (start_radius, end_radius) = self.endpoint_radii();
        if self.is_degenerate() {
            debug!(start = ?self.start, "Zero-length arc");
            return Ok(());
        }
        if start_radius <= DEGENERATE_LENGTH || end_radius <= DEGENERATE_LENGTH {
            return Err(GeometryError::malformed_arc(
                "an endpoint coincides with the center",
            ));
        }

        let delta = (start_radius - end_radius).abs();
        if delta > RADIUS_TOLERANCE && delta > RADIUS_TOLERANCE_RELATIVE * start_radius {
            return Err(GeometryError::malformed_arc(format!(
                "start radius {:.4} and end radius {:.4} differ by {:.4}",
                start_radius, end_radius, delta
            )));
        }
        if delta > DEGENERATE_LENGTH {
            debug!(start_radius, end_radius, "Tolerating arc radius mismatch");
        }
        Ok(())
    }
}

/// Angular span from `start_angle` to `end_angle` in the given direction.
///
/// A CW span that comes out non-negative has 2π subtracted, a CCW span that
/// comes out non-positive has 2π added. Equal angles therefore give a full
/// turn, and a half circle is disambiguated by direction alone.
pub fn angle_span(start_angle: f64, end_angle: f64, direction: ArcDirection) -> f64 {
    let span = end_angle - start_angle;
    match direction {
        ArcDirection::Clockwise if span >= 0.0 => span - TAU,
        ArcDirection::CounterClockwise if span <= 0.0 => span + TAU,
        _ => span,
    }
}

/// Center from I/J/K offsets: start plus the offset's in-plane components
pub fn center_from_offset(start: DVec3, offset: DVec3, plane: Plane) -> DVec2 {
    plane.project(start) + plane.project(offset)
}

/// Center from a signed radius.
///
/// Positive radius picks the arc of at most half a circle, negative radius
/// the longer one. A chord marginally longer than the diameter is accepted
/// within [`RADIUS_TOLERANCE`] and treated as an exact half circle.
pub fn center_from_radius(
    start: DVec3,
    end: DVec3,
    radius: f64,
    direction: ArcDirection,
    plane: Plane,
) -> Result<DVec2, GeometryError> {
    let start = plane.project(start);
    let chord = plane.project(end) - start;
    let chord_length = chord.length();

    if chord_length <= DEGENERATE_LENGTH {
        return Err(GeometryError::malformed_arc(
            "a radius arc cannot start and end at the same point",
        ));
    }
    if radius.abs() <= DEGENERATE_LENGTH {
        return Err(GeometryError::malformed_arc("zero radius"));
    }

    let mut height_squared = 4.0 * radius * radius - chord_length * chord_length;
    if height_squared < 0.0 {
        let shortfall = chord_length / 2.0 - radius.abs();
        if shortfall > RADIUS_TOLERANCE {
            return Err(GeometryError::malformed_arc(format!(
                "radius {:.4} is too small for a chord of {:.4}",
                radius.abs(),
                chord_length
            )));
        }
        height_squared = 0.0;
    }

    // Offset of the center from the chord midpoint, as a multiple of the
    // chord's perpendicular.
    let mut h_over_chord = -height_squared.sqrt() / chord_length;
    if direction == ArcDirection::CounterClockwise {
        h_over_chord = -h_over_chord;
    }
    if radius < 0.0 {
        h_over_chord = -h_over_chord;
    }

    Ok(start
        + DVec2::new(
            0.5 * (chord.x - chord.y * h_over_chord),
            0.5 * (chord.y + chord.x * h_over_chord),
        ))
}
