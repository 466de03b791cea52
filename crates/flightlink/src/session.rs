//! Send and receive loops for one connection.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::codec::Encoder;
use crate::counters::{CounterSnapshot, IngestionCounters};
use crate::error::Result;
use crate::source::LineSource;
use crate::transport::FramedTransport;

/// Stream every line of `source` to the peer, one frame per line.
///
/// Blank lines are skipped. `interval` is slept between frames; zero disables
/// pacing. Each frame written bumps `counters.sent`.
///
/// Returns the number of frames sent by this call.
///
/// # Errors
///
/// Stops at and returns the first source, encode, or transport error.
pub async fn run_sender<L, S>(
    source: &L,
    encoder: &Encoder,
    transport: &mut FramedTransport<S>,
    interval: Duration,
    counters: &IngestionCounters,
) -> Result<u64>
where
    L: LineSource + ?Sized,
    S: AsyncWrite + Unpin + Send,
{
    info!("Sending {} as {}", source.describe(), encoder.tail_number());
    let mut frames = 0u64;
    for line in source.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = encoder.encode(&line)?;
        transport.send_frame(&frame).await?;
        counters.record_sent();
        frames += 1;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
    info!("Sender finished after {frames} frames");
    Ok(frames)
}

/// Receive frames until the peer closes the connection, tallying each one.
///
/// Invalid packets are counted as drops and do not end the loop.
///
/// # Errors
///
/// Returns the transport error that ended the connection, if any. These are
/// never counted as drops.
pub async fn run_receiver<S>(
    transport: &mut FramedTransport<S>,
    counters: &IngestionCounters,
) -> Result<CounterSnapshot>
where
    S: AsyncRead + Unpin + Send,
{
    while let Some(frame) = transport.receive_frame().await? {
        let _ = counters.process_packet(&frame);
    }
    debug!("Peer closed the connection");
    transport.close();
    Ok(counters.snapshot())
}
