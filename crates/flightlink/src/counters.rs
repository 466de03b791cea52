//! Ingestion counters: receive-side tallies and the latest validated record.
//!
//! `received`, `dropped`, and the last record live behind one mutex so every
//! reader sees a consistent triple. `sent` is touched only by the sending task
//! and uses its own atomic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{decode, DecodeError};
use crate::telemetry::TelemetryRecord;

#[derive(Debug, Default)]
struct IngestState {
    received: u64,
    dropped: u64,
    last_telemetry: Option<Arc<TelemetryRecord>>,
}

/// Concurrency-safe tallies for one receiving endpoint.
#[derive(Debug, Default)]
pub struct IngestionCounters {
    state: Mutex<IngestState>,
    sent: AtomicU64,
}

/// A point-in-time copy of [`IngestionCounters`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CounterSnapshot {
    /// Packets decoded and validated.
    pub received: u64,
    /// Packets sent by the local sender.
    pub sent: u64,
    /// Packets rejected by the decoder.
    pub dropped: u64,
    /// The most recently validated record.
    pub last_telemetry: Option<Arc<TelemetryRecord>>,
}

impl CounterSnapshot {
    /// Total decode attempts (`received + dropped`).
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.received + self.dropped
    }
}

impl IngestionCounters {
    /// Create zeroed counters with no last record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IngestState> {
        // The state is plain counters, so it stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode a frame payload and tally the outcome.
    ///
    /// Returns `true` if the packet was valid and became the last record.
    pub fn process_packet(&self, payload: &[u8]) -> bool {
        self.ingest(payload).is_ok()
    }

    /// Decode a frame payload and tally the outcome, returning the decode result.
    ///
    /// On success the record replaces the last record and `received` goes up by
    /// one. On failure `dropped` goes up by one and the last record is untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`DecodeError`] that caused the drop.
    pub fn ingest(&self, payload: &[u8]) -> Result<Arc<TelemetryRecord>, DecodeError> {
        match decode(payload) {
            Ok(record) => {
                let record = Arc::new(record);
                let mut state = self.lock();
                state.received += 1;
                state.last_telemetry = Some(Arc::clone(&record));
                drop(state);
                debug!(
                    tail = record.tail_number(),
                    sequence = record.sequence(),
                    "accepted packet"
                );
                Ok(record)
            }
            Err(err) => {
                self.lock().dropped += 1;
                if err.is_checksum_mismatch() {
                    warn!(kind = err.kind(), "dropped corrupt packet: {err}");
                } else {
                    debug!(kind = err.kind(), "dropped packet: {err}");
                }
                Err(err)
            }
        }
    }

    /// Record one frame sent by the local sender. Returns the new total.
    pub fn record_sent(&self) -> u64 {
        self.sent.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Packets decoded and validated.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.lock().received
    }

    /// Packets rejected by the decoder.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Packets sent by the local sender.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// The most recently validated record, if any.
    #[must_use]
    pub fn last_telemetry(&self) -> Option<Arc<TelemetryRecord>> {
        self.lock().last_telemetry.clone()
    }

    /// A consistent copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        let state = self.lock();
        CounterSnapshot {
            received: state.received,
            sent: self.sent(),
            dropped: state.dropped,
            last_telemetry: state.last_telemetry.clone(),
        }
    }
}
