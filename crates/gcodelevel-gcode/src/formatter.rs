//! Renders tokens back to G-Code text

use serde::{Deserialize, Serialize};

use super::command::{ArcEncoding, Axes, GcodeToken, MotionCommand, MotionKind};

/// Line renumbering options (`N` words)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineNumbering {
    /// First line number
    pub start: u32,
    /// Step between consecutive lines
    pub increment: u32,
}

impl LineNumbering {
    /// Number of the line at `index`, in `u64`
    pub fn number(&self, index: usize) -> u64 {
        u64::from(self.start) + u64::from(self.increment) * index as u64
    }
}

impl Default for LineNumbering {
    fn default() -> Self {
        Self {
            start: 10,
            increment: 10,
        }
    }
}

/// Formats tokens as G-Code lines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GcodeFormatter {
    precision: u32,
    numbering: Option<LineNumbering>,
}

impl GcodeFormatter {
    /// Create a formatter writing `precision` decimal digits
    pub fn new(precision: u32) -> Self {
        Self {
            precision,
            numbering: None,
        }
    }

    /// Prefix every line with a fresh `N` word
    pub fn with_line_numbers(mut self, numbering: LineNumbering) -> Self {
        self.numbering = Some(numbering);
        self
    }

    /// Format a whole token list into lines
    pub fn format(&self, tokens: &[GcodeToken]) -> Vec<String> {
        let lines = tokens.iter().map(|token| self.format_token(token));
        match self.numbering {
            None => lines.collect(),
            Some(numbering) => lines
                .enumerate()
                .map(|(index, line)| format!("N{} {}", numbering.number(index), line))
                .collect(),
        }
    }

    /// Format a single token
    pub fn format_token(&self, token: &GcodeToken) -> String {
        match token {
            GcodeToken::Motion(motion) => self.format_motion(motion),
            GcodeToken::PlaneSelect(plane) => format!("G{}", plane.gcode()),
            GcodeToken::DistanceMode(mode) => format!("G{}", mode.gcode()),
            GcodeToken::Passthrough(text) => text.clone(),
        }
    }

    fn format_motion(&self, motion: &MotionCommand) -> String {
        let mut line = format!("G{}", motion.kind.gcode());
        self.push_axes(&mut line, &motion.target, ['X', 'Y', 'Z']);
        if let MotionKind::Arc { encoding, .. } = &motion.kind {
            match encoding {
                ArcEncoding::CenterOffset(offset) => {
                    self.push_axes(&mut line, offset, ['I', 'J', 'K'])
                }
                ArcEncoding::Radius(radius) => self.push_word(&mut line, 'R', *radius),
            }
        }
        if let Some(feed) = motion.feed_rate {
            self.push_word(&mut line, 'F', feed);
        }
        line
    }

    fn push_axes(&self, line: &mut String, axes: &Axes, letters: [char; 3]) {
        for (letter, value) in letters.into_iter().zip([axes.x, axes.y, axes.z]) {
            if let Some(value) = value {
                self.push_word(line, letter, value);
            }
        }
    }

    fn push_word(&self, line: &mut String, letter: char, value: f64) {
        line.push(' ');
        line.push(letter);
        line.push_str(&format_number(value, self.precision));
    }
}

impl Default for GcodeFormatter {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Format a number with at most `precision` decimals, trimming trailing zeros
pub fn format_number(value: f64, precision: u32) -> String {
    let mut text = format!("{:.*}", precision as usize, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcodelevel_core::{ArcDirection, DistanceMode, Plane};

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.5, 3), "1.5");
        assert_eq!(format_number(10.0, 3), "10");
        assert_eq!(format_number(-0.0001, 3), "0");
        assert_eq!(format_number(0.12345, 4), "0.1235");
        assert_eq!(format_number(-2.5, 3), "-2.5");
    }

    #[test]
    fn test_format_linear_move() {
        let formatter = GcodeFormatter::new(3);
        let token = GcodeToken::Motion(
            MotionCommand::linear(Axes::new(Some(5.0), None, Some(0.05))).with_feed_rate(300.0),
        );
        assert_eq!(formatter.format_token(&token), "G1 X5 Z0.05 F300");
    }

    #[test]
    fn test_format_arc_move() {
        let formatter = GcodeFormatter::new(3);
        let offset = ArcEncoding::CenterOffset(Axes::new(Some(-10.0), Some(0.0), None));
        let token = GcodeToken::Motion(MotionCommand::arc(
            ArcDirection::CounterClockwise,
            offset,
            Axes::new(Some(10.0), Some(0.0), Some(0.0)),
        ));
        assert_eq!(formatter.format_token(&token), "G3 X10 Y0 Z0 I-10 J0");
    }

    #[test]
    fn test_format_with_line_numbers() {
        let formatter = GcodeFormatter::new(3).with_line_numbers(LineNumbering::default());
        let tokens = vec![
            GcodeToken::PlaneSelect(Plane::XY),
            GcodeToken::DistanceMode(DistanceMode::Incremental),
            GcodeToken::Passthrough("M3 S1000".to_string()),
        ];
        assert_eq!(
            formatter.format(&tokens),
            vec!["N10 G17", "N20 G91", "N30 M3 S1000"]
        );
    }

    #[test]
    fn test_large_line_number_increment() {
        let formatter = GcodeFormatter::new(3).with_line_numbers(LineNumbering {
            start: 2_000_000_000,
            increment: 2_000_000_000,
        });
        let tokens = vec![GcodeToken::Passthrough("M5".to_string()); 3];
        assert_eq!(
            formatter.format(&tokens),
            vec!["N2000000000 M5", "N4000000000 M5", "N6000000000 M5"]
        );
    }
}
