//! Minimal G-code interpreter.
//!
//! Covers what the reference engine needs to exercise the motion
//! pipeline: rapid and linear moves (`G0` / `G1`), units (`G20` /
//! `G21`), distance mode (`G90` / `G91`), feed mode (`G93` / `G94`),
//! six axis words `X Y Z A B C` and a feed rate `F`.  Anything else is
//! rejected as unsupported.
//!
//! `F` is read under the units and feed mode in effect at the end of the
//! block, so word order within a line does not matter.  In inverse-time
//! mode (`G93`) `F` is not modal: every linear move must carry one, and
//! it is converted to units per minute over the move's length.

use core::fmt;

use crate::system::{Axis, AxisVector, N_AXIS};

const MM_PER_INCH: f32 = 25.4;

// ---------------------------------------------------------------------------
// Modal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionMode {
    /// G0
    #[default]
    Rapid,
    /// G1
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Units {
    /// G21
    #[default]
    Millimetres,
    /// G20
    Inches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    /// G90
    #[default]
    Absolute,
    /// G91
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedMode {
    /// G94
    #[default]
    UnitsPerMinute,
    /// G93
    InverseTime,
}

/// Modal groups restored by [`Parser::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modal {
    pub motion: MotionMode,
    pub units: Units,
    pub distance: DistanceMode,
    pub feed_mode: FeedMode,
    /// Work coordinate system index, 0 = G54.
    pub coord_system: u8,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Parse failures, reported to the host as `error:<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A word did not start with a letter.
    ExpectedCommandLetter,
    /// A word's value was missing or not a number.
    BadNumberFormat,
    /// G or M code outside the supported subset.
    UnsupportedCommand,
    /// Linear move with no feed rate in effect.
    UndefinedFeedRate,
}

impl ParseError {
    /// Numeric code sent after `error:`.
    pub const fn code(self) -> u8 {
        match self {
            Self::ExpectedCommandLetter => 1,
            Self::BadNumberFormat => 2,
            Self::UnsupportedCommand => 20,
            Self::UndefinedFeedRate => 22,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedCommandLetter => write!(f, "expected command letter"),
            Self::BadNumberFormat => write!(f, "bad number format"),
            Self::UnsupportedCommand => write!(f, "unsupported command"),
            Self::UndefinedFeedRate => write!(f, "undefined feed rate"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// One accepted motion block, in machine millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionBlock {
    pub motion: MotionMode,
    pub target: AxisVector,
    pub feed_rate: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parser {
    modal: Modal,
    position: AxisVector,
    feed_rate: f32,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            modal: Modal::default(),
            position: [0.0; N_AXIS],
            feed_rate: 0.0,
        }
    }

    /// Restore default modal state.  Position and feed rate are left for
    /// the caller to synchronise.
    pub fn reset(&mut self) {
        self.modal = Modal::default();
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn position(&self) -> &AxisVector {
        &self.position
    }

    pub fn sync_position(&mut self, position: &AxisVector) {
        self.position = *position;
    }

    pub fn feed_rate(&self) -> f32 {
        self.feed_rate
    }

    pub fn set_feed_rate(&mut self, feed_rate: f32) {
        self.feed_rate = feed_rate;
    }

    /// Parse one line.  Modal words take effect even when the line carries
    /// no motion; `Ok(None)` means nothing needs to be planned.
    ///
    /// The line is applied atomically: on error neither the modal state
    /// nor the logical position changes.
    pub fn parse_motion(&mut self, line: &str) -> Result<Option<MotionBlock>, ParseError> {
        let mut modal = self.modal;
        let mut feed_word = None;
        let mut axis_words: [Option<f32>; N_AXIS] = [None; N_AXIS];

        let mut words = Words::new(line);
        while let Some(word) = words.next_word()? {
            match word {
                ('G', value) => match gcode(value)? {
                    0 => modal.motion = MotionMode::Rapid,
                    1 => modal.motion = MotionMode::Linear,
                    20 => modal.units = Units::Inches,
                    21 => modal.units = Units::Millimetres,
                    90 => modal.distance = DistanceMode::Absolute,
                    91 => modal.distance = DistanceMode::Incremental,
                    93 => modal.feed_mode = FeedMode::InverseTime,
                    94 => modal.feed_mode = FeedMode::UnitsPerMinute,
                    _ => return Err(ParseError::UnsupportedCommand),
                },
                ('F', value) => feed_word = Some(value),
                (letter, value) => {
                    let axis = axis_for(letter).ok_or(ParseError::UnsupportedCommand)?;
                    axis_words[axis.index()] = Some(value);
                }
            }
        }

        let mut feed_rate = self.feed_rate;
        if modal.feed_mode == FeedMode::UnitsPerMinute {
            // Leaving G93 leaves no feed rate in effect.
            if self.modal.feed_mode == FeedMode::InverseTime {
                feed_rate = 0.0;
            }
            if let Some(value) = feed_word {
                feed_rate = to_mm(modal.units, value);
            }
        }

        let block = if axis_words.iter().any(Option::is_some) {
            let mut target = self.position;
            for axis in Axis::ALL {
                let Some(value) = axis_words[axis.index()] else {
                    continue;
                };
                // Rotary axes are in degrees regardless of G20/G21
                let value = match axis {
                    Axis::X | Axis::Y | Axis::Z => to_mm(modal.units, value),
                    Axis::Rx | Axis::Ry | Axis::Rz => value,
                };
                target[axis.index()] = match modal.distance {
                    DistanceMode::Absolute => value,
                    DistanceMode::Incremental => target[axis.index()] + value,
                };
            }

            let block_feed = match (modal.motion, modal.feed_mode) {
                (MotionMode::Rapid, _) => feed_rate,
                (MotionMode::Linear, FeedMode::UnitsPerMinute) => {
                    if !feed_rate.is_finite() || feed_rate <= 0.0 {
                        return Err(ParseError::UndefinedFeedRate);
                    }
                    feed_rate
                }
                (MotionMode::Linear, FeedMode::InverseTime) => {
                    let per_minute = feed_word
                        .filter(|f| *f > 0.0)
                        .ok_or(ParseError::UndefinedFeedRate)?;
                    per_minute * distance(&self.position, &target)
                }
            };
            Some(MotionBlock {
                motion: modal.motion,
                target,
                feed_rate: block_feed,
            })
        } else {
            None
        };

        self.modal = modal;
        self.feed_rate = feed_rate;
        if let Some(block) = &block {
            self.position = block.target;
        }
        Ok(block)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn to_mm(units: Units, value: f32) -> f32 {
    match units {
        Units::Millimetres => value,
        Units::Inches => value * MM_PER_INCH,
    }
}

fn distance(from: &AxisVector, to: &AxisVector) -> f32 {
    from.iter()
        .zip(to.iter())
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f32>()
        .sqrt()
}

fn axis_for(letter: char) -> Option<Axis> {
    Axis::ALL.into_iter().find(|a| a.letter() == letter)
}

fn gcode(value: f32) -> Result<u8, ParseError> {
    if value.fract() != 0.0 || !(0.0..=255.0).contains(&value) {
        return Err(ParseError::UnsupportedCommand);
    }
    Ok(value as u8)
}

/// Letter/number word scanner.  Whitespace is ignored and letters are
/// case-insensitive.
struct Words<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Words<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            bytes: line.as_bytes(),
            pos: 0,
        }
    }

    fn skip_spaces(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn next_word(&mut self) -> Result<Option<(char, f32)>, ParseError> {
        self.skip_spaces();
        let Some(&letter) = self.bytes.get(self.pos) else {
            return Ok(None);
        };
        if !letter.is_ascii_alphabetic() {
            return Err(ParseError::ExpectedCommandLetter);
        }
        self.pos += 1;
        self.skip_spaces();

        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|&b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+'))
        {
            self.pos += 1;
        }
        let number = core::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| ParseError::BadNumberFormat)?;
        let value: f32 = number.parse().map_err(|_| ParseError::BadNumberFormat)?;
        if !value.is_finite() {
            return Err(ParseError::BadNumberFormat);
        }
        Ok(Some((char::from(letter.to_ascii_uppercase()), value)))
    }
}
