use crate::types::Result;
use futures::future::BoxFuture;
use futures::{Sink, Stream, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

/// Write half of a transport
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Read half of a transport
pub type FrameStream = Pin<Box<dyn Stream<Item = std::result::Result<Message, WsError>> + Send>>;

/// How a transport ended, as seen by the reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Normal close (code 1000) requested by either side; never reconnects
    Intentional,
    /// Network drop, error, abnormal close code or failed handshake
    Unintentional,
}

/// A live, message-framed connection.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens transports. The channel owns exactly one at a time.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &Url) -> BoxFuture<'static, Result<Transport>>;
}

/// WebSocket factory for creating WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Performs the upgrade handshake and splits the socket
    pub async fn create(url: Url) -> Result<Transport> {
        tracing::debug!("Creating WebSocket connection to: {}", url);
        let (ws_stream, response) = connect_async(url.as_str()).await?;
        tracing::debug!("Handshake completed with status {}", response.status());

        let (write_half, read_half) = ws_stream.split();
        Ok(Transport::new(Box::pin(write_half), Box::pin(read_half)))
    }
}

impl Connector for WebSocketFactory {
    fn connect(&self, url: &Url) -> BoxFuture<'static, Result<Transport>> {
        Box::pin(Self::create(url.clone()))
    }
}
