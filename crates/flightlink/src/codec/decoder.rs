//! Decoder: wire frames to validated telemetry records.

use super::{parse_finite, parse_wire_timestamp, DecodeError, FIELD_SEPARATOR, WIRE_FIELD_COUNT};
use crate::telemetry::{checksum, Field, Readings, TelemetryRecord};

const TAIL: usize = 0;
const SEQUENCE: usize = 1;
const TIMESTAMP: usize = 2;
const FIRST_READING: usize = 3;
const CHECKSUM: usize = 10;

/// Decode and validate one frame payload.
///
/// Either every field parses and the checksum matches, or an error is
/// returned. No partially populated record is ever produced.
///
/// # Errors
///
/// - [`DecodeError::Malformed`] for non-ASCII payloads, a field count other
///   than 11, or an empty tail, reading, or checksum field.
/// - [`DecodeError::ParseFailed`] when a field does not parse as its type.
/// - [`DecodeError::ChecksumMismatch`] when the recomputed checksum differs.
pub fn decode(bytes: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    if !bytes.is_ascii() {
        return Err(DecodeError::malformed("payload is not ASCII"));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|_| DecodeError::malformed("payload is not ASCII"))?
        .trim();

    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
    if fields.len() != WIRE_FIELD_COUNT {
        return Err(DecodeError::malformed(format!(
            "expected {WIRE_FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    }

    let tail_number = fields[TAIL].trim();
    if tail_number.is_empty() {
        return Err(DecodeError::malformed("empty tail_number field"));
    }
    let reading_fields = &fields[FIRST_READING..CHECKSUM];
    for (field, text) in Field::READINGS.iter().zip(reading_fields) {
        if text.trim().is_empty() {
            return Err(DecodeError::malformed(format!("empty {field} field")));
        }
    }
    if fields[CHECKSUM].trim().is_empty() {
        return Err(DecodeError::malformed("empty checksum field"));
    }

    let received: i32 = fields[CHECKSUM]
        .trim()
        .parse()
        .map_err(|_| parse_failed(Field::Checksum, fields[CHECKSUM]))?;
    let sequence: u32 = fields[SEQUENCE]
        .trim()
        .parse()
        .map_err(|_| parse_failed(Field::Sequence, fields[SEQUENCE]))?;
    let timestamp = parse_wire_timestamp(fields[TIMESTAMP])
        .ok_or_else(|| parse_failed(Field::Timestamp, fields[TIMESTAMP]))?;

    let mut values = [0.0; 7];
    for ((value, field), text) in values.iter_mut().zip(Field::READINGS).zip(reading_fields) {
        *value = parse_finite(text).ok_or_else(|| parse_failed(field, text))?;
    }
    let readings = Readings::from_array(values);

    let expected = checksum(readings.altitude, readings.pitch, readings.bank);
    if expected != received {
        return Err(DecodeError::ChecksumMismatch { expected, received });
    }

    Ok(TelemetryRecord::new(tail_number, sequence, timestamp, readings))
}

fn parse_failed(field: Field, value: &str) -> DecodeError {
    DecodeError::ParseFailed {
        field,
        value: value.to_string(),
    }
}
