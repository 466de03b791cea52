//! Encoder: raw CSV lines to sequenced, checksummed frames.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::NaiveDateTime;
use tracing::trace;

use super::{
    format_wire_timestamp, parse_finite, parse_raw_timestamp, validate_tail_number, FormatError,
    FIELD_SEPARATOR, RAW_FIELD_COUNT,
};
use crate::telemetry::{Field, Readings, TelemetryRecord};

/// Stateful encoder for one sender.
///
/// Each successful [`Encoder::encode`] call takes the next sequence number.
/// The counter is atomic, so an encoder shared between tasks still hands out
/// every value exactly once. It wraps to 0 after `u32::MAX`.
#[derive(Debug)]
pub struct Encoder {
    tail_number: String,
    next_sequence: AtomicU32,
}

impl Encoder {
    /// Create an encoder whose first frame carries sequence 0.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidTailNumber`] if the tail number is empty,
    /// non-ASCII, or contains `|` or a line break.
    pub fn new(tail_number: impl Into<String>) -> Result<Self, FormatError> {
        Self::with_start_sequence(tail_number, 0)
    }

    /// Create an encoder whose first frame carries `start`.
    ///
    /// # Errors
    ///
    /// Same as [`Encoder::new`].
    pub fn with_start_sequence(
        tail_number: impl Into<String>,
        start: u32,
    ) -> Result<Self, FormatError> {
        let tail_number = tail_number.into();
        validate_tail_number(&tail_number)?;
        Ok(Self {
            tail_number,
            next_sequence: AtomicU32::new(start),
        })
    }

    /// The tail number stamped on every frame.
    #[must_use]
    pub fn tail_number(&self) -> &str {
        &self.tail_number
    }

    /// The sequence number the next successful encode will use.
    #[must_use]
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence.load(Ordering::SeqCst)
    }

    /// Parse a raw line into a record, assigning the next sequence number.
    ///
    /// A line that fails to parse does not consume a sequence number.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the line has too few tokens or a token
    /// does not parse.
    pub fn encode_to_record(&self, raw_line: &str) -> Result<TelemetryRecord, FormatError> {
        let (timestamp, readings) = parse_raw_line(raw_line)?;
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        Ok(TelemetryRecord::new(
            self.tail_number.clone(),
            sequence,
            timestamp,
            readings,
        ))
    }

    /// Encode a raw line into a newline-terminated ASCII frame.
    ///
    /// # Errors
    ///
    /// Same as [`Encoder::encode_to_record`].
    pub fn encode(&self, raw_line: &str) -> Result<Vec<u8>, FormatError> {
        let record = self.encode_to_record(raw_line)?;
        trace!(sequence = record.sequence(), "encoded frame");
        Ok(encode_record(&record))
    }
}

/// Split a raw CSV line into its timestamp and readings.
///
/// Empty tokens are discarded before counting; tokens past the eighth are
/// ignored.
///
/// # Errors
///
/// Returns [`FormatError::TooFewTokens`] or [`FormatError::InvalidToken`].
pub fn parse_raw_line(raw_line: &str) -> Result<(NaiveDateTime, Readings), FormatError> {
    let tokens: Vec<&str> = raw_line
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.len() < RAW_FIELD_COUNT {
        return Err(FormatError::TooFewTokens {
            found: tokens.len(),
        });
    }

    let timestamp = parse_raw_timestamp(tokens[0]).ok_or_else(|| FormatError::InvalidToken {
        field: Field::Timestamp,
        token: tokens[0].to_string(),
    })?;

    let mut values = [0.0; 7];
    for ((value, field), token) in values.iter_mut().zip(Field::READINGS).zip(&tokens[1..]) {
        *value = parse_finite(token).ok_or_else(|| FormatError::InvalidToken {
            field,
            token: (*token).to_string(),
        })?;
    }

    Ok((timestamp, Readings::from_array(values)))
}

/// Serialize a record into its wire frame.
#[must_use]
pub fn encode_record(record: &TelemetryRecord) -> Vec<u8> {
    let mut frame = String::with_capacity(128);
    frame.push_str(record.tail_number());
    frame.push(FIELD_SEPARATOR);
    let _ = write!(frame, "{}", record.sequence());
    frame.push(FIELD_SEPARATOR);
    frame.push_str(&format_wire_timestamp(&record.timestamp()));
    for value in record.readings().to_array() {
        frame.push(FIELD_SEPARATOR);
        let _ = write!(frame, "{value}");
    }
    frame.push(FIELD_SEPARATOR);
    let _ = write!(frame, "{}", record.checksum());
    frame.push('\n');
    frame.into_bytes()
}
