//! `flightlink` - A small telemetry transport protocol
//!
//! This library turns raw flight-data lines into sequenced, checksummed,
//! length-framed packets, carries them over a byte stream, and validates and
//! tallies them on the receiving side for concurrent readers.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod counters;
pub mod error;
pub mod logging;
pub mod session;
pub mod source;
pub mod status;
pub mod telemetry;
pub mod transport;

pub use codec::{decode, DecodeError, Encoder, FormatError};
pub use config::Config;
pub use counters::{CounterSnapshot, IngestionCounters};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use source::{FileLineSource, LineSource, MemoryLineSource};
pub use telemetry::{Field, Readings, TelemetryRecord};
pub use transport::{
    Connector, FramedTransport, TcpConnector, TelemetryListener, TransportError,
};
