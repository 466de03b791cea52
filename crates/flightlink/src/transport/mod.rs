//! Framed transport: length-prefixed packets over a byte stream.
//!
//! Every frame is a 4-byte little-endian payload length followed by the
//! payload. The prefix carries no type or version information.

mod tcp;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{debug, trace};

pub use tcp::{Connector, TcpConnector, TelemetryListener};

/// Size of the length prefix in bytes.
pub const LEN_SIZE: usize = 4;

/// Default upper bound on a single frame's payload.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 16 * 1024 * 1024; // 16 MiB

/// Errors raised by the framed transport. All of them leave the connection unusable.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An operation was attempted before a connection was established.
    #[error("transport is not connected")]
    NotConnected,

    /// The peer closed the stream in the middle of a frame.
    #[error("connection closed mid-frame: expected {expected} bytes, received {received}")]
    TruncatedFrame {
        /// Bytes the current frame section needed.
        expected: usize,
        /// Bytes actually read before end-of-stream.
        received: usize,
    },

    /// A frame exceeds the configured maximum length.
    #[error("frame of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge {
        /// Declared or actual payload length.
        len: usize,
        /// Configured maximum.
        max: u32,
    },

    /// A bounded receive was cancelled before a frame arrived.
    #[error("receive cancelled")]
    Cancelled,

    /// Establishing the connection failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address that was dialed.
        addr: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing the stream failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A connection that sends and receives length-prefixed frames.
///
/// The transport owns its stream exclusively. [`FramedTransport::close`]
/// releases it; dropping the transport does the same.
#[derive(Debug)]
pub struct FramedTransport<S> {
    stream: Option<S>,
    max_frame_len: u32,
}

impl<S> Default for FramedTransport<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> FramedTransport<S> {
    /// Create a transport with no connection yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stream: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Wrap an already connected stream.
    #[must_use]
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream: Some(stream),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Set the maximum accepted payload length.
    #[must_use]
    pub fn with_max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// The maximum accepted payload length.
    #[must_use]
    pub fn max_frame_len(&self) -> u32 {
        self.max_frame_len
    }

    /// Check if a stream is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Release the underlying stream.
    ///
    /// Returns `true` if a stream was released by this call. Further calls are
    /// no-ops, including after a failed send or receive.
    pub fn close(&mut self) -> bool {
        let released = self.stream.take().is_some();
        if released {
            debug!("Transport closed");
        }
        released
    }

    /// Establish a fresh connection through `connector`, replacing any current one.
    ///
    /// # Errors
    ///
    /// Returns whatever error the connector reports.
    pub async fn connect<C>(&mut self, connector: &C) -> Result<(), TransportError>
    where
        C: Connector<Stream = S> + ?Sized,
    {
        self.close();
        let stream = connector.connect().await?;
        debug!("Transport connected to {}", connector.describe());
        self.stream = Some(stream);
        Ok(())
    }

    fn stream_mut(&mut self) -> Result<&mut S, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl<S> FramedTransport<S>
where
    S: AsyncWrite + Unpin,
{
    /// Write one frame and flush it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] before a connection exists,
    /// [`TransportError::FrameTooLarge`] for oversize payloads, or
    /// [`TransportError::Io`] if the write fails.
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let max = self.max_frame_len;
        let stream = self.stream_mut()?;
        write_frame(stream, payload, max).await?;
        trace!(len = payload.len(), "sent frame");
        Ok(())
    }
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + Unpin,
{
    /// Read one frame, waiting as long as it takes.
    ///
    /// Returns `Ok(None)` when the peer closes the stream cleanly between frames.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] before a connection exists,
    /// [`TransportError::TruncatedFrame`] if the stream ends mid-frame,
    /// [`TransportError::FrameTooLarge`] if the declared length exceeds the
    /// maximum, or [`TransportError::Io`] on read failure.
    pub async fn receive_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let max = self.max_frame_len;
        let stream = self.stream_mut()?;
        let frame = read_frame(stream, max).await?;
        if let Some(payload) = &frame {
            trace!(len = payload.len(), "received frame");
        }
        Ok(frame)
    }

    /// Read one frame, giving up with [`TransportError::Cancelled`] once
    /// `cancel` completes.
    ///
    /// A cancelled read may have consumed part of a frame, so the connection
    /// should be closed afterwards.
    ///
    /// # Errors
    ///
    /// Same as [`FramedTransport::receive_frame`], plus `Cancelled`.
    pub async fn receive_frame_until<F>(
        &mut self,
        cancel: F,
    ) -> Result<Option<Vec<u8>>, TransportError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            frame = self.receive_frame() => frame,
            () = cancel => Err(TransportError::Cancelled),
        }
    }

    /// Read one frame, giving up with [`TransportError::Cancelled`] after `timeout`.
    ///
    /// # Errors
    ///
    /// Same as [`FramedTransport::receive_frame_until`].
    pub async fn receive_frame_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        self.receive_frame_until(tokio::time::sleep(timeout)).await
    }
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Split into a receive-only and a send-only transport sharing one connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] if no stream is attached.
    #[allow(clippy::type_complexity)]
    pub fn into_split(
        mut self,
    ) -> Result<(FramedTransport<ReadHalf<S>>, FramedTransport<WriteHalf<S>>), TransportError>
    {
        let max = self.max_frame_len;
        let stream = self.stream.take().ok_or(TransportError::NotConnected)?;
        let (reader, writer) = tokio::io::split(stream);
        Ok((
            FramedTransport::from_stream(reader).with_max_frame_len(max),
            FramedTransport::from_stream(writer).with_max_frame_len(max),
        ))
    }
}

async fn write_frame<W>(writer: &mut W, payload: &[u8], max: u32) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= max)
        .ok_or(TransportError::FrameTooLarge {
            len: payload.len(),
            max,
        })?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_frame<R>(reader: &mut R, max: u32) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LEN_SIZE];
    let filled = read_full(reader, &mut prefix).await?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < LEN_SIZE {
        return Err(TransportError::TruncatedFrame {
            expected: LEN_SIZE,
            received: filled,
        });
    }

    let len = u32::from_le_bytes(prefix);
    if len > max {
        return Err(TransportError::FrameTooLarge {
            len: len as usize,
            max,
        });
    }

    let mut payload = vec![0u8; len as usize];
    let filled = read_full(reader, &mut payload).await?;
    if filled < payload.len() {
        return Err(TransportError::TruncatedFrame {
            expected: payload.len(),
            received: filled,
        });
    }
    Ok(Some(payload))
}

/// Fill `buf` from `reader`, stopping early only at end-of-stream.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    fn pair() -> (FramedTransport<DuplexStream>, FramedTransport<DuplexStream>) {
        let (a, b) = duplex(1024);
        (FramedTransport::from_stream(a), FramedTransport::from_stream(b))
    }

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut sender, mut receiver) = pair();
        sender.send_frame(b"hello frame").await.unwrap();

        let frame = receiver.receive_frame().await.unwrap();
        assert_eq!(frame.as_deref(), Some(&b"hello frame"[..]));
    }

    #[tokio::test]
    async fn test_wire_layout_is_le_length_prefix() {
        let (a, mut raw) = duplex(64);
        let mut sender = FramedTransport::from_stream(a);
        sender.send_frame(b"abc").await.unwrap();
        drop(sender);

        let mut bytes = Vec::new();
        raw.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes, vec![3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[tokio::test]
    async fn test_multiple_frames_in_order() {
        let (mut sender, mut receiver) = pair();
        sender.send_frame(b"first").await.unwrap();
        sender.send_frame(b"").await.unwrap();
        sender.send_frame(b"third").await.unwrap();

        assert_eq!(receiver.receive_frame().await.unwrap().unwrap(), b"first");
        assert_eq!(receiver.receive_frame().await.unwrap().unwrap(), b"");
        assert_eq!(receiver.receive_frame().await.unwrap().unwrap(), b"third");
    }

    #[tokio::test]
    async fn test_partial_writes_are_reassembled() {
        let (mut raw, b) = duplex(4);
        let mut receiver = FramedTransport::from_stream(b);

        let writer = tokio::spawn(async move {
            let mut bytes = 10u32.to_le_bytes().to_vec();
            bytes.extend_from_slice(b"0123456789");
            for chunk in bytes.chunks(3) {
                raw.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
            raw
        });

        let frame = receiver.receive_frame().await.unwrap().unwrap();
        assert_eq!(frame, b"0123456789");
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_clean_eof_between_frames() {
        let (mut sender, mut receiver) = pair();
        sender.send_frame(b"only").await.unwrap();
        sender.close();

        assert!(receiver.receive_frame().await.unwrap().is_some());
        assert!(receiver.receive_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let (mut raw, b) = duplex(64);
        let mut receiver = FramedTransport::from_stream(b);
        raw.write_all(&8u32.to_le_bytes()).await.unwrap();
        raw.write_all(b"abc").await.unwrap();
        drop(raw);

        let err = receiver.receive_frame().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::TruncatedFrame {
                expected: 8,
                received: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_truncated_prefix() {
        let (mut raw, b) = duplex(64);
        let mut receiver = FramedTransport::from_stream(b);
        raw.write_all(&[1, 0]).await.unwrap();
        drop(raw);

        let err = receiver.receive_frame().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::TruncatedFrame {
                expected: LEN_SIZE,
                received: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_declared_length_over_maximum() {
        let (mut raw, b) = duplex(64);
        let mut receiver = FramedTransport::from_stream(b).with_max_frame_len(16);
        raw.write_all(&17u32.to_le_bytes()).await.unwrap();

        let err = receiver.receive_frame().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::FrameTooLarge { len: 17, max: 16 }
        ));
    }

    #[tokio::test]
    async fn test_send_over_maximum() {
        let (a, _b) = duplex(64);
        let mut sender = FramedTransport::from_stream(a).with_max_frame_len(2);
        let err = sender.send_frame(b"abc").await.unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { len: 3, max: 2 }));
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut transport: FramedTransport<DuplexStream> = FramedTransport::new();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send_frame(b"x").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.receive_frame().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut sender, _receiver) = pair();
        assert!(sender.is_connected());
        assert!(sender.close());
        assert!(!sender.close());
        assert!(!sender.is_connected());
        assert!(matches!(
            sender.send_frame(b"x").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_after_failure() {
        let (a, b) = duplex(64);
        drop(b);
        let mut sender = FramedTransport::from_stream(a);
        assert!(sender.send_frame(b"lost").await.is_err());
        assert!(sender.close());
        assert!(!sender.close());
    }

    #[tokio::test]
    async fn test_receive_timeout() {
        let (_sender, mut receiver) = pair();
        let err = receiver
            .receive_frame_timeout(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test]
    async fn test_receive_until_external_cancel() {
        let (_sender, mut receiver) = pair();
        let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel::<()>();
        cancel_tx.send(()).unwrap();

        let err = receiver
            .receive_frame_until(async {
                let _ = cancel_rx.await;
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test]
    async fn test_receive_until_frame_wins() {
        let (mut sender, mut receiver) = pair();
        sender.send_frame(b"ready").await.unwrap();

        let frame = receiver
            .receive_frame_until(std::future::pending())
            .await
            .unwrap();
        assert_eq!(frame.unwrap(), b"ready");
    }

    #[tokio::test]
    async fn test_split_runs_both_directions() {
        let (left, right) = pair();
        let (mut left_rx, mut left_tx) = left.into_split().unwrap();
        let (mut right_rx, mut right_tx) = right.into_split().unwrap();

        left_tx.send_frame(b"ping").await.unwrap();
        right_tx.send_frame(b"pong").await.unwrap();

        assert_eq!(right_rx.receive_frame().await.unwrap().unwrap(), b"ping");
        assert_eq!(left_rx.receive_frame().await.unwrap().unwrap(), b"pong");
    }

    #[test]
    fn test_split_requires_connection() {
        let transport: FramedTransport<DuplexStream> = FramedTransport::new();
        assert!(matches!(
            transport.into_split(),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            TransportError::NotConnected.to_string(),
            "transport is not connected"
        );
        assert!(TransportError::TruncatedFrame {
            expected: 8,
            received: 3
        }
        .to_string()
        .contains("mid-frame"));
        assert_eq!(TransportError::Cancelled.to_string(), "receive cancelled");
    }
}
