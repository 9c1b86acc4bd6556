//! Height-map compensation pass
//!
//! Walks a token stream once, left to right. Each motion is split into
//! pieces no longer than the segment length, and every piece's endpoint is
//! lifted by the height correction at its XY position. Mode tokens update
//! the pass state; everything else is forwarded untouched.
//!
//! The running state is an explicit [`PassState`] value threaded through
//! [`Compensator::step`], so each transition can be tested on its own.

use std::f64::consts::PI;
use tracing::{debug, trace};

use gcodelevel_core::{
    round_to, DVec3, DistanceMode, Error, GeometryError, Plane, Position, VectorExt,
    MAX_PRECISION,
};
use gcodelevel_gcode::{ArcEncoding, Axes, GcodeToken, MotionCommand, MotionKind};

use crate::height_map::HeightCorrection;
use crate::motion::{Arc, Line, Motion};

/// Most pieces a single source motion may be split into
pub const MAX_PIECES_PER_MOTION: usize = 1_000_000;

/// Caller-supplied starting conditions of a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensationOptions {
    /// Machine position when the program starts
    pub start_position: Position,
    /// Active arc plane when the program starts
    pub plane: Plane,
    /// Active distance mode when the program starts
    pub distance_mode: DistanceMode,
    /// Decimal digits of emitted coordinates
    pub precision: u32,
    /// Maximum piece length; the height map's finer grid spacing when unset
    pub segment_length: Option<f64>,
}

impl Default for CompensationOptions {
    fn default() -> Self {
        Self {
            start_position: Position::ZERO,
            plane: Plane::XY,
            distance_mode: DistanceMode::Absolute,
            precision: 4,
            segment_length: None,
        }
    }
}

/// Modal state threaded through a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassState {
    /// Uncompensated position at the end of the last source motion
    pub position: Position,
    /// Last emitted (compensated, rounded) position; the base for
    /// incremental output
    pub machine: Position,
    /// Active arc plane
    pub plane: Plane,
    /// Active distance mode
    pub distance_mode: DistanceMode,
}

impl PassState {
    /// State at `position` with nothing emitted yet
    pub fn new(position: Position, plane: Plane, distance_mode: DistanceMode) -> Self {
        Self {
            position,
            machine: position,
            plane,
            distance_mode,
        }
    }
}

impl From<&CompensationOptions> for PassState {
    fn from(options: &CompensationOptions) -> Self {
        PassState::new(options.start_position, options.plane, options.distance_mode)
    }
}

/// Motion counts of a finished pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompensationReport {
    /// Motion tokens read
    pub input_motions: usize,
    /// Motion tokens emitted
    pub output_motions: usize,
    /// Source motions emitted as more than one piece
    pub split_motions: usize,
}

impl CompensationReport {
    fn record(&mut self, emitted: usize) {
        self.input_motions += 1;
        self.output_motions += emitted;
        if emitted > 1 {
            self.split_motions += 1;
        }
    }
}

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq)]
pub struct Compensation {
    /// Compensated token stream
    pub tokens: Vec<GcodeToken>,
    /// Motion counts
    pub report: CompensationReport,
    /// State after the last token
    pub final_state: PassState,
}

/// Per-token transition function of the compensation pass
pub struct Compensator<'a, M: HeightCorrection + ?Sized> {
    map: &'a M,
    segment_length: f64,
    precision: u32,
}

impl<'a, M: HeightCorrection + ?Sized> Compensator<'a, M> {
    /// Create a compensator.
    ///
    /// `segment_length` falls back to [`HeightCorrection::segment_length`].
    ///
    /// # Errors
    /// - [`GeometryError::InvalidSegmentLength`] unless the resolved length is
    ///   positive and finite
    /// - [`GeometryError::InvalidPrecision`] above [`MAX_PRECISION`]
    pub fn new(
        map: &'a M,
        segment_length: Option<f64>,
        precision: u32,
    ) -> Result<Self, GeometryError> {
        if precision > MAX_PRECISION {
            return Err(GeometryError::InvalidPrecision {
                value: precision,
                max: MAX_PRECISION,
            });
        }
        let segment_length = segment_length.unwrap_or_else(|| map.segment_length());
        if !(segment_length.is_finite() && segment_length > 0.0) {
            return Err(GeometryError::InvalidSegmentLength {
                value: segment_length,
            });
        }
        Ok(Self {
            map,
            segment_length,
            precision,
        })
    }

    /// Maximum piece length in use
    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    /// Apply one token: the next state and the tokens to emit
    pub fn step(
        &self,
        state: PassState,
        token: &GcodeToken,
    ) -> Result<(PassState, Vec<GcodeToken>), GeometryError> {
        match token {
            GcodeToken::PlaneSelect(plane) => {
                Ok((PassState { plane: *plane, ..state }, vec![token.clone()]))
            }
            GcodeToken::DistanceMode(mode) => Ok((
                PassState {
                    distance_mode: *mode,
                    ..state
                },
                vec![token.clone()],
            )),
            GcodeToken::Motion(command) => self.motion(state, command),
            GcodeToken::Passthrough(_) => Ok((state, vec![token.clone()])),
        }
    }

    fn motion(
        &self,
        state: PassState,
        command: &MotionCommand,
    ) -> Result<(PassState, Vec<GcodeToken>), GeometryError> {
        let end = command.target.resolve(state.position, state.distance_mode);
        let motion: Motion = match command.kind {
            MotionKind::Rapid => Line::new(state.position, end, true).into(),
            MotionKind::Linear => Line::new(state.position, end, false).into(),
            MotionKind::Arc {
                direction,
                encoding,
            } => {
                if state.plane != Plane::XY {
                    return Err(GeometryError::UnsupportedPlane { plane: state.plane });
                }
                Arc::from_encoding(state.position, end, &encoding, direction, state.plane)?.into()
            }
        };

        let pieces = motion.split(self.segment_length);
        trace!(
            length = motion.length(),
            pieces = pieces.len(),
            "Splitting motion"
        );
        if pieces.len() > MAX_PIECES_PER_MOTION {
            return Err(GeometryError::TooManySegments {
                count: pieces.len(),
                limit: MAX_PIECES_PER_MOTION,
            });
        }

        let mut machine = state.machine;
        let mut emitted = Vec::with_capacity(pieces.len());
        for (index, piece) in pieces.enumerate() {
            let target = self.lift(piece.end());
            let written = match state.distance_mode {
                DistanceMode::Absolute => target,
                DistanceMode::Incremental => (target - machine).round_to(self.precision),
            };
            machine = target;

            let (kind, target_axes) = match (command.kind, piece) {
                (
                    MotionKind::Arc {
                        direction,
                        encoding,
                    },
                    Motion::Arc(arc),
                ) => (
                    MotionKind::Arc {
                        direction,
                        encoding: self.piece_encoding(&encoding, &arc),
                    },
                    Axes::xyz(written),
                ),
                (kind, _) => (kind, command.target.with_z().mask(written)),
            };

            emitted.push(GcodeToken::Motion(MotionCommand {
                kind,
                target: target_axes,
                feed_rate: if index == 0 { command.feed_rate } else { None },
            }));
        }

        let next = PassState {
            position: end,
            machine,
            ..state
        };
        Ok((next, emitted))
    }

    /// Compensated, rounded machine position of `point`
    fn lift(&self, point: DVec3) -> DVec3 {
        let dz = self.map.interpolate_z(point.x, point.y);
        DVec3::new(point.x, point.y, point.z + dz).round_to(self.precision)
    }

    fn piece_encoding(&self, source: &ArcEncoding, piece: &Arc) -> ArcEncoding {
        match source {
            ArcEncoding::CenterOffset(_) => {
                let offset = piece.center_offset(piece.start).round_to(self.precision);
                ArcEncoding::CenterOffset(in_plane(piece.plane, offset))
            }
            ArcEncoding::Radius(_) => {
                let radius = round_to(piece.radius(), self.precision);
                if piece.angle_span().abs() > PI {
                    ArcEncoding::Radius(-radius)
                } else {
                    ArcEncoding::Radius(radius)
                }
            }
        }
    }
}

/// Keep only the two offset words that belong to `plane`
fn in_plane(plane: Plane, offset: DVec3) -> Axes {
    match plane {
        Plane::XY => Axes::new(Some(offset.x), Some(offset.y), None),
        Plane::YZ => Axes::new(None, Some(offset.y), Some(offset.z)),
        Plane::ZX => Axes::new(Some(offset.x), None, Some(offset.z)),
    }
}

/// Compensate a whole token stream.
///
/// Either every token is processed, or the first error is returned and no
/// output is produced.
///
/// # Errors
/// - [`GeometryError::UnsupportedPlane`] for an arc outside the XY plane
/// - [`GeometryError::MalformedArc`] for an arc whose center cannot be
///   reconciled with its endpoints
/// - [`GeometryError::InvalidSegmentLength`] for a non-positive segment length
/// - [`GeometryError::InvalidPrecision`] for a precision above [`MAX_PRECISION`]
/// - [`GeometryError::TooManySegments`] for a motion needing more than
///   [`MAX_PIECES_PER_MOTION`] pieces
#[tracing::instrument(skip_all, fields(tokens = tokens.len()))]
pub fn compensate<M: HeightCorrection + ?Sized>(
    tokens: &[GcodeToken],
    map: &M,
    options: &CompensationOptions,
) -> Result<Compensation, Error> {
    let compensator = Compensator::new(map, options.segment_length, options.precision)?;
    debug!(
        segment_length = compensator.segment_length(),
        precision = options.precision,
        plane = %options.plane,
        distance_mode = %options.distance_mode,
        "Starting compensation"
    );

    let mut output = Vec::with_capacity(tokens.len());
    let mut report = CompensationReport::default();
    let final_state = tokens.iter().try_fold(
        PassState::from(options),
        |state, token| -> Result<PassState, GeometryError> {
            let (next, emitted) = compensator.step(state, token)?;
            if token.as_motion().is_some() {
                report.record(emitted.len());
            }
            output.extend(emitted);
            Ok(next)
        },
    )?;

    debug!(
        input_motions = report.input_motions,
        output_motions = report.output_motions,
        split_motions = report.split_motions,
        "Compensation finished"
    );
    Ok(Compensation {
        tokens: output,
        report,
        final_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::height_map::FnHeightCorrection;
    use gcodelevel_core::ArcDirection;

    fn motions(tokens: &[GcodeToken]) -> Vec<MotionCommand> {
        tokens.iter().filter_map(|t| t.as_motion().copied()).collect()
    }

    #[test]
    fn test_line_is_split_and_lifted() {
        let map = FnHeightCorrection::uniform(|x, _| x * 0.01, 5.0);
        let tokens = vec![GcodeToken::Motion(
            MotionCommand::linear(Axes::new(Some(10.0), Some(0.0), None)).with_feed_rate(300.0),
        )];
        let result = compensate(&tokens, &map, &CompensationOptions::default()).unwrap();

        assert_eq!(
            motions(&result.tokens),
            vec![
                MotionCommand::linear(Axes::new(Some(5.0), Some(0.0), Some(0.05)))
                    .with_feed_rate(300.0),
                MotionCommand::linear(Axes::new(Some(10.0), Some(0.0), Some(0.1))),
            ]
        );
        assert_eq!(
            result.report,
            CompensationReport {
                input_motions: 1,
                output_motions: 2,
                split_motions: 1,
            }
        );
        assert_eq!(result.final_state.position, DVec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_rapid_is_lifted_but_not_split() {
        let map = FnHeightCorrection::uniform(|_, _| 0.5, 1.0);
        let tokens = vec![GcodeToken::Motion(MotionCommand::rapid(Axes::new(
            Some(100.0),
            None,
            None,
        )))];
        let result = compensate(&tokens, &map, &CompensationOptions::default()).unwrap();
        assert_eq!(
            motions(&result.tokens),
            vec![MotionCommand::rapid(Axes::new(Some(100.0), None, Some(0.5)))]
        );
    }

    #[test]
    fn test_mode_tokens_update_state() {
        let map = FnHeightCorrection::uniform(|_, _| 0.0, 1.0);
        let compensator = Compensator::new(&map, None, 3).unwrap();
        let state = PassState::new(DVec3::ZERO, Plane::XY, DistanceMode::Absolute);

        let (state, out) = compensator
            .step(state, &GcodeToken::PlaneSelect(Plane::ZX))
            .unwrap();
        assert_eq!(state.plane, Plane::ZX);
        assert_eq!(out, vec![GcodeToken::PlaneSelect(Plane::ZX)]);

        let (state, _) = compensator
            .step(state, &GcodeToken::DistanceMode(DistanceMode::Incremental))
            .unwrap();
        assert_eq!(state.distance_mode, DistanceMode::Incremental);

        let passthrough = GcodeToken::Passthrough("M3 S1000".to_string());
        let (next, out) = compensator.step(state, &passthrough).unwrap();
        assert_eq!(next, state);
        assert_eq!(out, vec![passthrough]);
    }

    #[test]
    fn test_arc_outside_xy_plane_fails() {
        let map = FnHeightCorrection::uniform(|_, _| 0.0, 1.0);
        let tokens = vec![
            GcodeToken::Motion(MotionCommand::linear(Axes::new(Some(1.0), None, None))),
            GcodeToken::PlaneSelect(Plane::ZX),
            GcodeToken::Motion(MotionCommand::arc(
                ArcDirection::Clockwise,
                ArcEncoding::CenterOffset(Axes::new(Some(1.0), None, None)),
                Axes::new(Some(3.0), None, None),
            )),
        ];
        let err = compensate(&tokens, &map, &CompensationOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Geometry(GeometryError::UnsupportedPlane { plane: Plane::ZX })
        ));
    }

    #[test]
    fn test_arc_pieces_carry_fresh_offsets() {
        let map = FnHeightCorrection::uniform(|_, _| 0.0, 100.0);
        let options = CompensationOptions {
            start_position: DVec3::new(10.0, 0.0, 0.0),
            segment_length: Some(8.0),
            ..Default::default()
        };
        // Quarter circle of radius 10, length 5π: two pieces
        let tokens = vec![GcodeToken::Motion(MotionCommand::arc(
            ArcDirection::CounterClockwise,
            ArcEncoding::CenterOffset(Axes::new(Some(-10.0), Some(0.0), None)),
            Axes::new(Some(0.0), Some(10.0), None),
        ))];
        let result = compensate(&tokens, &map, &options).unwrap();
        let out = motions(&result.tokens);
        assert_eq!(out.len(), 2);

        let d = round_to(10.0 / 2f64.sqrt(), 4);
        assert_eq!(out[0].target, Axes::new(Some(d), Some(d), Some(0.0)));
        assert_eq!(
            out[0].kind,
            MotionKind::Arc {
                direction: ArcDirection::CounterClockwise,
                encoding: ArcEncoding::CenterOffset(Axes::new(Some(-10.0), Some(0.0), None)),
            }
        );
        assert_eq!(out[1].target, Axes::new(Some(0.0), Some(10.0), Some(0.0)));
        assert_eq!(
            out[1].kind,
            MotionKind::Arc {
                direction: ArcDirection::CounterClockwise,
                encoding: ArcEncoding::CenterOffset(Axes::new(Some(-d), Some(-d), None)),
            }
        );
    }

    #[test]
    fn test_long_radius_arc_keeps_negative_radius() {
        let map = FnHeightCorrection::uniform(|_, _| 0.0, 1000.0);
        let tokens = vec![GcodeToken::Motion(MotionCommand::arc(
            ArcDirection::Clockwise,
            ArcEncoding::Radius(-10.0),
            Axes::new(Some(10.0), Some(0.0), None),
        ))];
        let result = compensate(&tokens, &map, &CompensationOptions::default()).unwrap();
        let out = motions(&result.tokens);
        assert_eq!(out.len(), 1);
        assert!(matches!(
            out[0].kind,
            MotionKind::Arc { encoding: ArcEncoding::Radius(r), .. } if (r + 10.0).abs() < 1e-9
        ));
    }

    #[test]
    fn test_incremental_output_is_relative_to_emitted_position() {
        let map = FnHeightCorrection::uniform(|x, _| x * 0.1, 2.0);
        let options = CompensationOptions {
            distance_mode: DistanceMode::Incremental,
            ..Default::default()
        };
        let tokens = vec![GcodeToken::Motion(MotionCommand::linear(Axes::new(
            Some(4.0),
            None,
            None,
        )))];
        let result = compensate(&tokens, &map, &options).unwrap();
        assert_eq!(
            motions(&result.tokens),
            vec![
                MotionCommand::linear(Axes::new(Some(2.0), None, Some(0.2))),
                MotionCommand::linear(Axes::new(Some(2.0), None, Some(0.2))),
            ]
        );
        assert_eq!(result.final_state.position, DVec3::new(4.0, 0.0, 0.0));
        assert_eq!(result.final_state.machine, DVec3::new(4.0, 0.0, 0.4));
    }

    #[test]
    fn test_invalid_segment_length() {
        let map = FnHeightCorrection::uniform(|_, _| 0.0, 1.0);
        let options = CompensationOptions {
            segment_length: Some(0.0),
            ..Default::default()
        };
        let err = compensate(&[], &map, &options).unwrap_err();
        assert!(matches!(
            err,
            Error::Geometry(GeometryError::InvalidSegmentLength { .. })
        ));
    }

    #[test]
    fn test_zero_length_arc_emitted_once() {
        let map = FnHeightCorrection::uniform(|x, _| x * 0.01, 1.0);
        let options = CompensationOptions {
            start_position: DVec3::new(5.0, 5.0, 0.0),
            ..Default::default()
        };
        let tokens = vec![GcodeToken::Motion(MotionCommand::arc(
            ArcDirection::Clockwise,
            ArcEncoding::CenterOffset(Axes::new(Some(0.0), Some(0.0), None)),
            Axes::new(Some(5.0), Some(5.0), None),
        ))];
        let result = compensate(&tokens, &map, &options).unwrap();
        assert_eq!(
            motions(&result.tokens),
            vec![MotionCommand::arc(
                ArcDirection::Clockwise,
                ArcEncoding::CenterOffset(Axes::new(Some(0.0), Some(0.0), None)),
                Axes::new(Some(5.0), Some(5.0), Some(0.05)),
            )]
        );
        assert_eq!(result.report.split_motions, 0);
        assert_eq!(result.final_state.position, DVec3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn test_piece_count_is_capped() {
        let map = FnHeightCorrection::uniform(|_, _| 0.0, 1.0);
        let tokens = vec![GcodeToken::Motion(MotionCommand::linear(Axes::new(
            Some(1e12),
            None,
            None,
        )))];
        let err = compensate(&tokens, &map, &CompensationOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Geometry(GeometryError::TooManySegments {
                limit: MAX_PIECES_PER_MOTION,
                ..
            })
        ));

        // a rapid is never split, however long
        let tokens = vec![GcodeToken::Motion(MotionCommand::rapid(Axes::new(
            Some(1e12),
            None,
            None,
        )))];
        assert!(compensate(&tokens, &map, &CompensationOptions::default()).is_ok());
    }

    #[test]
    fn test_precision_is_bounded() {
        let map = FnHeightCorrection::uniform(|_, _| 0.0, 1.0);
        assert!(Compensator::new(&map, None, MAX_PRECISION).is_ok());

        let options = CompensationOptions {
            precision: 400,
            ..Default::default()
        };
        let err = compensate(&[], &map, &options).unwrap_err();
        assert!(matches!(
            err,
            Error::Geometry(GeometryError::InvalidPrecision { value: 400, .. })
        ));
    }
}
