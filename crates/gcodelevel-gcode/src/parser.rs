//! G-Code tokenizer with modal motion tracking
//!
//! Turns program text into [`GcodeToken`]s. Only what the leveling pass
//! needs is interpreted: motion words, plane selection and distance mode.
//! Every other word is forwarded verbatim.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, trace};

use gcodelevel_core::{ArcDirection, DistanceMode, GcodeError, Plane};

use super::command::{ArcEncoding, Axes, GcodeToken, MotionCommand};

/// Active motion group (group 1) as tracked across lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModalMotion {
    Rapid,
    Linear,
    Clockwise,
    CounterClockwise,
    /// G81-G89 canned cycle; repeated axis words are forwarded untouched
    CannedCycle,
}

/// A single word of a line, e.g. `X-1.5`
#[derive(Debug, Clone, Copy)]
struct Word<'a> {
    letter: char,
    value: f64,
    text: &'a str,
}

/// G-Code tokenizer
///
/// Keeps the modal motion mode so that lines such as `X10 Y5` continue the
/// previous G0/G1/G2/G3.
#[derive(Debug, Clone, Default)]
pub struct GcodeParser {
    motion: Option<ModalMotion>,
    line_number: u32,
}

impl GcodeParser {
    /// Create a new parser with no active motion mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whole program
    pub fn parse(&mut self, text: &str) -> Result<Vec<GcodeToken>, GcodeError> {
        let mut tokens = Vec::new();
        for line in text.lines() {
            tokens.extend(self.parse_line(line)?);
        }
        debug!(
            lines = self.line_number,
            tokens = tokens.len(),
            "Tokenized G-code program"
        );
        Ok(tokens)
    }

    /// Parse a single line into zero or more tokens
    ///
    /// Mode tokens come first, then forwarded words, then the motion, which
    /// matches the order a controller executes them within one block.
    pub fn parse_line(&mut self, line: &str) -> Result<Vec<GcodeToken>, GcodeError> {
        self.line_number += 1;
        let line_number = self.line_number;

        let raw = line.trim();
        let cleaned = remove_comments(raw);
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Ok(if raw.is_empty() {
                vec![]
            } else {
                vec![GcodeToken::Passthrough(raw.to_string())]
            });
        }
        if cleaned.starts_with('%') {
            return Ok(vec![GcodeToken::Passthrough(cleaned.to_string())]);
        }

        let words = split_words(line_number, cleaned)?;

        for word in words.iter().filter(|w| w.letter == 'G') {
            if consumes_axis_words(word.value) {
                debug!(line_number, line = cleaned, "Forwarding non-motion axis command");
                return Ok(self.forward_with_modes(&words));
            }
            if is_canned_cycle(word.value) {
                let tokens = self.forward_with_modes(&words);
                self.motion = Some(ModalMotion::CannedCycle);
                return Ok(tokens);
            }
        }

        let mut tokens = Vec::new();
        let mut forwarded: Vec<&str> = Vec::new();
        let mut target = Axes::default();
        let mut offset = Axes::default();
        let mut radius = None;
        let mut feed: Option<Word> = None;

        for word in &words {
            match word.letter {
                'G' => match integer_code(word.value) {
                    Some(0) => self.motion = Some(ModalMotion::Rapid),
                    Some(1) => self.motion = Some(ModalMotion::Linear),
                    Some(2) => self.motion = Some(ModalMotion::Clockwise),
                    Some(3) => self.motion = Some(ModalMotion::CounterClockwise),
                    Some(80) => {
                        self.motion = None;
                        forwarded.push(word.text);
                    }
                    Some(code) => match mode_token(code) {
                        Some(token) => tokens.push(token),
                        None => forwarded.push(word.text),
                    },
                    None => forwarded.push(word.text),
                },
                'X' => set_once(&mut target.x, word, line_number)?,
                'Y' => set_once(&mut target.y, word, line_number)?,
                'Z' => set_once(&mut target.z, word, line_number)?,
                'I' => set_once(&mut offset.x, word, line_number)?,
                'J' => set_once(&mut offset.y, word, line_number)?,
                'K' => set_once(&mut offset.z, word, line_number)?,
                'R' => set_once(&mut radius, word, line_number)?,
                'F' => feed = Some(*word),
                'N' => {}
                _ => forwarded.push(word.text),
            }
        }

        let has_arc_words = !offset.is_empty() || radius.is_some();
        if target.is_empty() && !has_arc_words {
            if let Some(feed) = feed {
                forwarded.push(feed.text);
            }
            if !forwarded.is_empty() {
                tokens.push(GcodeToken::Passthrough(forwarded.join(" ")));
            }
            return Ok(tokens);
        }

        let kind = match self.motion {
            None => {
                return Err(GcodeError::InvalidSyntax {
                    line_number,
                    reason: "axis words without an active motion mode".to_string(),
                })
            }
            Some(ModalMotion::CannedCycle) => return Ok(self.forward_with_modes(&words)),
            Some(mode) => mode,
        };

        let mut motion = match kind {
            ModalMotion::Rapid | ModalMotion::Linear => {
                if has_arc_words {
                    return Err(GcodeError::InvalidParameter {
                        line_number,
                        param: "I/J/K/R".to_string(),
                        reason: "center words are only valid on G2/G3".to_string(),
                    });
                }
                if kind == ModalMotion::Rapid {
                    MotionCommand::rapid(target)
                } else {
                    MotionCommand::linear(target)
                }
            }
            _ => {
                let direction = if kind == ModalMotion::Clockwise {
                    ArcDirection::Clockwise
                } else {
                    ArcDirection::CounterClockwise
                };
                let encoding = match (radius, offset.is_empty()) {
                    (Some(_), false) => {
                        return Err(GcodeError::InvalidParameter {
                            line_number,
                            param: "R".to_string(),
                            reason: "an arc cannot use both R and I/J/K".to_string(),
                        })
                    }
                    (Some(r), true) => ArcEncoding::Radius(r),
                    (None, false) => ArcEncoding::CenterOffset(offset),
                    (None, true) => {
                        return Err(GcodeError::InvalidParameter {
                            line_number,
                            param: "I/J/K/R".to_string(),
                            reason: "an arc needs a center offset or a radius".to_string(),
                        })
                    }
                };
                MotionCommand::arc(direction, encoding, target)
            }
        };
        motion.feed_rate = feed.map(|w| w.value);

        if !forwarded.is_empty() {
            tokens.push(GcodeToken::Passthrough(forwarded.join(" ")));
        }
        trace!(line_number, ?motion, "Parsed motion");
        tokens.push(GcodeToken::Motion(motion));
        Ok(tokens)
    }

    /// Forward a line whose axis words are not a move target.
    ///
    /// Plane and distance mode words still become their own tokens, ahead of
    /// the rest of the line, so the pass keeps tracking them.
    fn forward_with_modes(&mut self, words: &[Word<'_>]) -> Vec<GcodeToken> {
        let mut tokens = Vec::new();
        let mut forwarded = Vec::new();
        for word in words {
            match (word.letter, integer_code(word.value)) {
                ('N', _) => {}
                ('G', Some(80)) => {
                    self.motion = None;
                    forwarded.push(word.text);
                }
                ('G', Some(code)) => match mode_token(code) {
                    Some(token) => tokens.push(token),
                    None => forwarded.push(word.text),
                },
                _ => forwarded.push(word.text),
            }
        }
        if !forwarded.is_empty() {
            tokens.push(GcodeToken::Passthrough(forwarded.join(" ")));
        }
        tokens
    }
}

/// G17/G18/G19 or G90/G91 as a token
fn mode_token(code: u8) -> Option<GcodeToken> {
    Plane::from_gcode(code)
        .map(GcodeToken::PlaneSelect)
        .or_else(|| DistanceMode::from_gcode(code).map(GcodeToken::DistanceMode))
}

/// Remove `( ... )` and `; ...` comments from a G-Code line
fn remove_comments(line: &str) -> String {
    static COMMENT_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = COMMENT_REGEX
        .get_or_init(|| Regex::new(r"\([^)]*\)?|;.*").expect("invalid regex pattern"));
    regex.replace_all(line, " ").to_string()
}

fn split_words(line_number: u32, line: &str) -> Result<Vec<Word<'_>>, GcodeError> {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = WORD_REGEX.get_or_init(|| {
        Regex::new(r"([A-Za-z])\s*([-+]?(?:\d+\.?\d*|\.\d+))").expect("invalid regex pattern")
    });

    let mut words = Vec::new();
    let mut last_end = 0;
    for captures in regex.captures_iter(line) {
        let whole = captures.get(0).expect("capture 0 always exists");
        check_gap(line_number, &line[last_end..whole.start()])?;
        last_end = whole.end();

        let value = captures[2]
            .parse::<f64>()
            .map_err(|e| GcodeError::InvalidParameter {
                line_number,
                param: captures[1].to_uppercase(),
                reason: e.to_string(),
            })?;
        words.push(Word {
            letter: captures[1]
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_default(),
            value,
            text: whole.as_str(),
        });
    }
    check_gap(line_number, &line[last_end..])?;
    Ok(words)
}

fn check_gap(line_number: u32, gap: &str) -> Result<(), GcodeError> {
    if gap.trim().is_empty() {
        Ok(())
    } else {
        Err(GcodeError::InvalidSyntax {
            line_number,
            reason: format!("unexpected text '{}'", gap.trim()),
        })
    }
}

fn set_once(slot: &mut Option<f64>, word: &Word, line_number: u32) -> Result<(), GcodeError> {
    if slot.is_some() {
        return Err(GcodeError::InvalidParameter {
            line_number,
            param: word.letter.to_string(),
            reason: "word appears twice on one line".to_string(),
        });
    }
    *slot = Some(word.value);
    Ok(())
}

fn integer_code(value: f64) -> Option<u8> {
    if value.fract() == 0.0 && (0.0..=255.0).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

/// Non-motion commands whose axis words are not a move target
/// (dwell, offsets, homing, probing, machine coordinates, G92)
fn consumes_axis_words(value: f64) -> bool {
    matches!(value.trunc() as i64, 4 | 10 | 28 | 30 | 38 | 53 | 92)
}

fn is_canned_cycle(value: f64) -> bool {
    matches!(integer_code(value), Some(81..=89))
}
