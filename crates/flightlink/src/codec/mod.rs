//! Packet codec: raw telemetry lines to wire frames and back.
//!
//! The wire payload is one line of ASCII text:
//!
//! ```text
//! TailNumber|Sequence|Timestamp|AccelX|AccelY|AccelZ|Weight|Altitude|Pitch|Bank|Checksum\n
//! ```
//!
//! Numbers use Rust's shortest round-trip formatting, so decoding a frame the
//! encoder produced yields bit-identical doubles.

mod decoder;
mod encoder;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::telemetry::Field;

pub use decoder::decode;
pub use encoder::{encode_record, parse_raw_line, Encoder};

/// Separator between wire fields.
pub const FIELD_SEPARATOR: char = '|';

/// Number of fields in a wire frame.
pub const WIRE_FIELD_COUNT: usize = 11;

/// Minimum number of non-empty tokens in a raw line.
pub const RAW_FIELD_COUNT: usize = 8;

/// Timestamp layout on the wire. `%.f` prints only the digits needed, so
/// sub-second precision survives a round trip.
const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Layouts accepted for the raw-line timestamp, after `_` is replaced by a space.
const RAW_TIMESTAMP_FORMATS: [&str; 5] = [
    "%m %d %Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m-%d-%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Errors raised while turning a raw line into a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The line has fewer than [`RAW_FIELD_COUNT`] non-empty tokens.
    #[error("expected at least {RAW_FIELD_COUNT} fields, found {found}")]
    TooFewTokens {
        /// Number of non-empty tokens present.
        found: usize,
    },

    /// A token could not be parsed as its field's type.
    #[error("invalid {field} value: {token:?}")]
    InvalidToken {
        /// Which field failed.
        field: Field,
        /// The offending text.
        token: String,
    },

    /// The tail number cannot be carried on the wire.
    #[error("invalid tail number {0:?}: must be non-empty ASCII without '|' or line breaks")]
    InvalidTailNumber(String),
}

/// Errors raised while decoding and validating a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The frame does not have the expected shape.
    #[error("malformed packet: {reason}")]
    Malformed {
        /// What was wrong with the frame.
        reason: String,
    },

    /// A field's text could not be interpreted as its expected type.
    #[error("failed to parse {field}: {value:?}")]
    ParseFailed {
        /// Which field failed.
        field: Field,
        /// The offending text.
        value: String,
    },

    /// The frame is well formed but its checksum does not match its readings.
    #[error("checksum mismatch: expected {expected}, received {received}")]
    ChecksumMismatch {
        /// Checksum recomputed from the decoded readings.
        expected: i32,
        /// Checksum carried in the frame.
        received: i32,
    },
}

impl DecodeError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Short label for the failure class, for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::ParseFailed { .. } => "parse_failed",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
        }
    }

    /// Check if the frame was structurally broken.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Check if a field failed to parse.
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseFailed { .. })
    }

    /// Check if the payload was corrupted in transit.
    #[must_use]
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}

/// Validate that `tail_number` can be embedded in a frame and decoded back unchanged.
pub(crate) fn validate_tail_number(tail_number: &str) -> Result<(), FormatError> {
    let valid = !tail_number.is_empty()
        && tail_number.trim() == tail_number
        && tail_number.is_ascii()
        && !tail_number.contains([FIELD_SEPARATOR, '\r', '\n']);
    if valid {
        Ok(())
    } else {
        Err(FormatError::InvalidTailNumber(tail_number.to_string()))
    }
}

/// Parse a finite double. Rejects `NaN` and infinities.
fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_wire_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(WIRE_TIMESTAMP_FORMAT).to_string()
}

fn parse_wire_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), WIRE_TIMESTAMP_FORMAT).ok()
}

fn parse_raw_timestamp(text: &str) -> Option<NaiveDateTime> {
    let normalized = text.trim().replace('_', " ");
    RAW_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
}
