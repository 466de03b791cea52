//! Core telemetry types for flightlink.
//!
//! A [`TelemetryRecord`] is the validated unit that travels over the link. It
//! can only be built through [`TelemetryRecord::new`], which derives the
//! checksum from the readings, so every record in memory carries a checksum
//! that matches its own altitude, pitch, and bank.

use chrono::NaiveDateTime;
use serde::Serialize;

/// Identifies one field of a telemetry frame, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Aircraft tail number.
    TailNumber,
    /// Per-sender packet ordinal.
    Sequence,
    /// Sample time.
    Timestamp,
    /// Longitudinal acceleration.
    AccelX,
    /// Lateral acceleration.
    AccelY,
    /// Vertical acceleration.
    AccelZ,
    /// Aircraft weight.
    Weight,
    /// Altitude.
    Altitude,
    /// Pitch angle.
    Pitch,
    /// Bank angle.
    Bank,
    /// Integrity checksum.
    Checksum,
}

impl Field {
    /// The seven numeric reading fields, in wire and raw-line order.
    pub const READINGS: [Field; 7] = [
        Field::AccelX,
        Field::AccelY,
        Field::AccelZ,
        Field::Weight,
        Field::Altitude,
        Field::Pitch,
        Field::Bank,
    ];

    /// Stable lowercase name of the field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TailNumber => "tail_number",
            Self::Sequence => "sequence",
            Self::Timestamp => "timestamp",
            Self::AccelX => "accel_x",
            Self::AccelY => "accel_y",
            Self::AccelZ => "accel_z",
            Self::Weight => "weight",
            Self::Altitude => "altitude",
            Self::Pitch => "pitch",
            Self::Bank => "bank",
            Self::Checksum => "checksum",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven numeric readings of one telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Readings {
    /// Longitudinal acceleration.
    pub accel_x: f64,
    /// Lateral acceleration.
    pub accel_y: f64,
    /// Vertical acceleration.
    pub accel_z: f64,
    /// Aircraft weight.
    pub weight: f64,
    /// Altitude.
    pub altitude: f64,
    /// Pitch angle.
    pub pitch: f64,
    /// Bank angle.
    pub bank: f64,
}

impl Readings {
    /// Build readings from values ordered as [`Field::READINGS`].
    #[must_use]
    pub fn from_array(values: [f64; 7]) -> Self {
        let [accel_x, accel_y, accel_z, weight, altitude, pitch, bank] = values;
        Self {
            accel_x,
            accel_y,
            accel_z,
            weight,
            altitude,
            pitch,
            bank,
        }
    }

    /// Values ordered as [`Field::READINGS`].
    #[must_use]
    pub fn to_array(&self) -> [f64; 7] {
        [
            self.accel_x,
            self.accel_y,
            self.accel_z,
            self.weight,
            self.altitude,
            self.pitch,
            self.bank,
        ]
    }

    /// Checksum over these readings. See [`checksum`].
    #[must_use]
    pub fn checksum(&self) -> i32 {
        checksum(self.altitude, self.pitch, self.bank)
    }
}

/// Integrity checksum: the mean of altitude, pitch, and bank, truncated toward zero.
///
/// Out-of-range means saturate at the `i32` bounds.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn checksum(altitude: f64, pitch: f64, bank: f64) -> i32 {
    ((altitude + pitch + bank) / 3.0) as i32
}

/// One validated telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    tail_number: String,
    sequence: u32,
    timestamp: NaiveDateTime,
    #[serde(flatten)]
    readings: Readings,
    checksum: i32,
}

impl TelemetryRecord {
    /// Create a record, deriving its checksum from `readings`.
    #[must_use]
    pub fn new(
        tail_number: impl Into<String>,
        sequence: u32,
        timestamp: NaiveDateTime,
        readings: Readings,
    ) -> Self {
        Self {
            tail_number: tail_number.into(),
            sequence,
            timestamp,
            checksum: readings.checksum(),
            readings,
        }
    }

    /// Aircraft tail number.
    #[must_use]
    pub fn tail_number(&self) -> &str {
        &self.tail_number
    }

    /// Per-sender packet ordinal.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Sample time.
    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// The numeric readings.
    #[must_use]
    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    /// The integrity checksum carried by this record.
    #[must_use]
    pub fn checksum(&self) -> i32 {
        self.checksum
    }
}
