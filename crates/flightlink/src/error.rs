//! Error types for flightlink.
//!
//! The codec and transport modules define their own error enums so callers can
//! match on the exact failure class; this module wraps them into the crate-level
//! [`Error`] used by sessions, line sources, and configuration.

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::{DecodeError, FormatError};
use crate::transport::TransportError;

/// The main error type for flightlink operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Codec Errors ===
    /// A raw line could not be encoded into a frame.
    #[error("encode failed: {0}")]
    Format(#[from] FormatError),

    /// A frame payload failed decoding or validation.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    // === Transport Errors ===
    /// The framed transport failed; the connection is unusable.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    // === Line Source Errors ===
    /// The line source origin does not exist.
    #[error("line source not found: {path}")]
    NotFound {
        /// Path of the missing origin.
        path: PathBuf,
    },

    /// Reading from a line source failed after it was opened.
    #[error("failed to read line source {path}: {source}")]
    SourceRead {
        /// Path of the origin being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for flightlink operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error means the channel itself is unusable.
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this error indicates a missing line source.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
