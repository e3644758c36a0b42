//! Timestamp parsing for timeline manifests
//!
//! Manifest authors write start offsets and durations as clock strings
//! (`"1:05.250"`) or plain millisecond numbers. Everything inside the engine
//! works in absolute milliseconds on the shared timeline.
//!
//! # Accepted forms
//!
//! | Form        | Example      | Milliseconds |
//! |-------------|--------------|--------------|
//! | `SS`        | `"7"`        | 7000         |
//! | `M:SS`      | `"1:05"`     | 65000        |
//! | `H:MM:SS`   | `"1:00:00"`  | 3600000      |
//! | `<any>.fff`  | `"0:04.5"`   | 4500         |
//!
//! The fractional part is normalized to exactly three digits: shorter
//! fractions are right-padded with zeros, longer ones are truncated.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Convert a timestamp string to absolute milliseconds
///
/// # Examples
///
/// ```
/// use storysync_common::time::to_ms;
///
/// assert_eq!(to_ms("4").unwrap(), 4000);
/// assert_eq!(to_ms("0:04.5").unwrap(), 4500);
/// assert_eq!(to_ms("1:02:03.004").unwrap(), 3_723_004);
/// assert!(to_ms("a:bc").is_err());
/// ```
pub fn to_ms(time_str: &str) -> Result<u64> {
    let trimmed = time_str.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidTime(time_str.to_string()));
    }

    let (main, fraction) = match trimmed.split_once('.') {
        Some((main, fraction)) => (main, Some(fraction)),
        None => (trimmed, None),
    };

    let parts = main
        .split(':')
        .map(|field| parse_field(field, time_str))
        .collect::<Result<Vec<u64>>>()?;

    let mut ms = match parts.as_slice() {
        [h, m, s] => h * MS_PER_HOUR + m * MS_PER_MINUTE + s * MS_PER_SECOND,
        [m, s] => m * MS_PER_MINUTE + s * MS_PER_SECOND,
        [s] => s * MS_PER_SECOND,
        _ => return Err(Error::InvalidTime(time_str.to_string())),
    };

    if let Some(fraction) = fraction {
        ms += parse_fraction(fraction, time_str)?;
    }

    Ok(ms)
}

fn parse_field(field: &str, original: &str) -> Result<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidTime(original.to_string()));
    }
    field
        .parse::<u64>()
        .map_err(|_| Error::InvalidTime(original.to_string()))
}

/// Normalize a fractional-second field to milliseconds (`"5"` → 500, `"0421"` → 42)
fn parse_fraction(fraction: &str, original: &str) -> Result<u64> {
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidTime(original.to_string()));
    }
    let normalized: String = fraction.chars().chain("000".chars()).take(3).collect();
    normalized
        .parse::<u64>()
        .map_err(|_| Error::InvalidTime(original.to_string()))
}

/// A manifest time value: either a clock string or a millisecond number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Millis(u64),
    Text(String),
}

impl TimeValue {
    /// Resolve to absolute milliseconds
    pub fn as_ms(&self) -> Result<u64> {
        match self {
            TimeValue::Millis(ms) => Ok(*ms),
            TimeValue::Text(text) => to_ms(text),
        }
    }
}

impl From<u64> for TimeValue {
    fn from(ms: u64) -> Self {
        TimeValue::Millis(ms)
    }
}

impl From<&str> for TimeValue {
    fn from(text: &str) -> Self {
        TimeValue::Text(text.to_string())
    }
}

/// Render milliseconds as `M:SS.mmm` for log output
///
/// ```
/// use storysync_common::time::format_playhead;
///
/// assert_eq!(format_playhead(65_250), "1:05.250");
/// assert_eq!(format_playhead(0), "0:00.000");
/// ```
pub fn format_playhead(ms: u64) -> String {
    let minutes = ms / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    let millis = ms % MS_PER_SECOND;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}
