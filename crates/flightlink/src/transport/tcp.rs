//! TCP connection factory and listener.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::info;

use super::{FramedTransport, TransportError, DEFAULT_MAX_FRAME_LEN};

/// Builds a fresh stream each time a transport needs to connect.
///
/// Connection parameters live in the connector, which is handed to the code
/// that needs a link instead of being looked up from global state.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// The stream type produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the remote end is unreachable.
    async fn connect(&self) -> Result<Self::Stream, TransportError>;

    /// Human-readable remote address, for logging.
    fn describe(&self) -> String;
}

/// Connects to a receiver over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    /// Create a connector for `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait::async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| TransportError::Connect {
                addr: self.describe(),
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Accepts incoming telemetry connections.
#[derive(Debug)]
pub struct TelemetryListener {
    listener: TcpListener,
    max_frame_len: u32,
}

impl TelemetryListener {
    /// Bind to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the address cannot be bound.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening for telemetry on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    /// Set the maximum payload length for accepted transports.
    #[must_use]
    pub fn with_max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// The bound address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if the socket address is unavailable.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the next sender and wrap its connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if accepting fails.
    pub async fn accept(&self) -> Result<(FramedTransport<TcpStream>, SocketAddr), TransportError> {
        let (stream, peer) = self.listener.accept().await?;
        info!("Accepted telemetry connection from {peer}");
        let transport = FramedTransport::from_stream(stream).with_max_frame_len(self.max_frame_len);
        Ok((transport, peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let listener = TelemetryListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connector = TcpConnector::new("127.0.0.1", addr.port());

        let accept = tokio::spawn(async move {
            let (mut transport, _) = listener.accept().await.unwrap();
            transport.receive_frame().await.unwrap()
        });

        let mut sender = FramedTransport::new();
        sender.connect(&connector).await.unwrap();
        assert!(sender.is_connected());
        sender.send_frame(b"over tcp").await.unwrap();

        assert_eq!(accept.await.unwrap().unwrap(), b"over tcp");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to find a port with nothing listening.
        let listener = TelemetryListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = TcpConnector::new("127.0.0.1", port);
        let mut transport = FramedTransport::new();
        let err = transport.connect(&connector).await.unwrap_err();

        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!transport.is_connected());
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }

    #[tokio::test]
    async fn test_accepted_transport_uses_listener_limit() {
        let listener = TelemetryListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .with_max_frame_len(64);
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (transport, _) = listener.accept().await.unwrap();
        let _stream = client.await.unwrap();

        assert_eq!(transport.max_frame_len(), 64);
    }

    #[test]
    fn test_connector_describe() {
        let connector = TcpConnector::new("ground.example", 5005);
        assert_eq!(connector.describe(), "ground.example:5005");
    }
}
