//! Telemetry parsing
//!
//! Classifies lines coming back from the device and turns the axis records
//! of one sensor exchange into a [`RawTriple`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ProtocolError, READY_SENTINEL};

/// Axis tag at the start of a telemetry record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Pan angle reported by the device
    X,
    /// Tilt angle reported by the device
    Y,
    /// Raw sensor value
    Z,
}

impl Axis {
    /// Get the axis for a leading record letter
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            _ => None,
        }
    }

    /// Get the record letter for this axis
    pub fn letter(&self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A single line received from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryLine<'a> {
    /// The ready sentinel
    Ready,
    /// Any other non-blank line, trimmed
    Data(&'a str),
    /// Blank line or read timeout
    Empty,
}

impl<'a> TelemetryLine<'a> {
    /// Classify a raw line
    pub fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            TelemetryLine::Empty
        } else if trimmed.eq_ignore_ascii_case(READY_SENTINEL) {
            TelemetryLine::Ready
        } else {
            TelemetryLine::Data(trimmed)
        }
    }
}

/// Check whether a line carries an axis record
///
/// A line is significant when its first non-whitespace character is `X`, `Y` or `Z`.
pub fn is_significant(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .and_then(Axis::from_char)
        .is_some()
}

/// Parse one axis record of the form `<letter><integer>`
pub fn parse_axis_line(line: &str) -> Result<(Axis, i64), ProtocolError> {
    let trimmed = line.trim();
    let mut chars = trimmed.chars();
    let axis = chars
        .next()
        .and_then(Axis::from_char)
        .ok_or_else(|| ProtocolError::MalformedTelemetry(format!("not an axis record: {trimmed:?}")))?;

    let value = chars.as_str().trim().parse::<i64>().map_err(|e| {
        ProtocolError::MalformedTelemetry(format!("bad {axis} value in {trimmed:?}: {e}"))
    })?;

    Ok((axis, value))
}

/// Parse every significant line, dropping diagnostic noise and blank lines
pub fn parse_records<S: AsRef<str>>(lines: &[S]) -> Result<Vec<(Axis, i64)>, ProtocolError> {
    lines
        .iter()
        .map(|line| line.as_ref())
        .filter(|line| is_significant(line))
        .map(parse_axis_line)
        .collect()
}

/// The three raw values of one sensor exchange, keyed by axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTriple {
    /// Pan angle as reported by the device
    pub x: i64,
    /// Tilt angle as reported by the device
    pub y: i64,
    /// Raw sensor value (0..=1023 on the reference firmware)
    pub z: i64,
}

impl RawTriple {
    /// Assemble a triple from the lines drained during a sensor exchange
    ///
    /// Exactly one record per axis is required. Records may arrive in any order.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, ProtocolError> {
        let records = parse_records(lines)?;
        if records.len() != 3 {
            return Err(ProtocolError::MalformedTelemetry(format!(
                "expected 3 axis records, got {}",
                records.len()
            )));
        }

        let mut slots: [Option<i64>; 3] = [None; 3];
        for (axis, value) in records {
            let slot = &mut slots[axis as usize];
            if slot.is_some() {
                return Err(ProtocolError::MalformedTelemetry(format!(
                    "duplicate {axis} record"
                )));
            }
            *slot = Some(value);
        }

        match slots {
            [Some(x), Some(y), Some(z)] => Ok(RawTriple { x, y, z }),
            _ => Err(ProtocolError::MalformedTelemetry(
                "missing axis record".to_string(),
            )),
        }
    }
}
