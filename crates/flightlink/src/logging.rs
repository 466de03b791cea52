//! Logging setup for the flightlink binary and tests.
//!
//! Log lines go to stderr so that stdout stays free for frames, decoded
//! records, and JSON summaries. Per-packet events (`flightlink::counters`
//! accepts, `flightlink::transport` frame traces) are only shown at the
//! trace verbosity; `-v` alone shows connection lifecycle and drops.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above, without per-packet events.
    Verbose,
    /// Everything, one line per frame and packet.
    Trace,
}

impl Verbosity {
    /// Map the `-v` count and `-q` flag onto a verbosity. `-q` wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level emitted by the crate.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    #[must_use]
    pub fn directives(self) -> String {
        match self {
            Self::Quiet => "flightlink=error".to_string(),
            Self::Normal => "flightlink=info".to_string(),
            // Accepted packets log at debug; keep them out of -v.
            Self::Verbose => "flightlink=debug,flightlink::counters=info".to_string(),
            Self::Trace => "flightlink=trace".to_string(),
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `verbosity`. Calling this more than once
/// is harmless; only the first call installs anything.
///
/// Dropped packets are logged under the `flightlink::counters` target: checksum
/// mismatches at `warn`, other rejects at `debug`.
///
/// # Examples
///
/// ```no_run
/// use flightlink::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity != Verbosity::Normal)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Initialize logging for tests.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flightlink=warn")
        .with_test_writer()
        .try_init();
}
