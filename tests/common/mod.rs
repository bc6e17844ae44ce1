#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use admin_realtime::{
    ConnectionState, Connector, RealtimeChannel, RealtimeChannelBuilder, RealtimeChannelOptions,
    RealtimeError, Result, Transport,
};
use futures::channel::mpsc as frames;
use futures::future::BoxFuture;
use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

/// How the next connection attempt behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handshake succeeds; a [`MockServer`] is handed to the test
    Accept,
    /// Handshake fails immediately
    Refuse,
    /// Handshake never completes
    Hang,
}

/// Server side of one accepted mock transport.
pub struct MockServer {
    to_client: frames::UnboundedSender<std::result::Result<Message, WsError>>,
    from_client: frames::UnboundedReceiver<Message>,
}

impl MockServer {
    pub fn push(&self, frame: Message) {
        self.to_client.unbounded_send(Ok(frame)).unwrap();
    }

    pub fn push_text(&self, text: &str) {
        self.push(Message::Text(text.into()));
    }

    pub fn close_with(&self, code: CloseCode) {
        self.push(Message::Close(Some(CloseFrame {
            code,
            reason: "server shutdown".into(),
        })));
    }

    /// Next frame written by the client, `None` once the client hung up.
    pub async fn next_frame(&mut self) -> Option<Message> {
        timeout(Duration::from_secs(30), self.from_client.next())
            .await
            .expect("timed out waiting for a client frame")
    }
}

struct Recorder {
    script: Mutex<VecDeque<Outcome>>,
    attempts: Mutex<Vec<Instant>>,
    urls: Mutex<Vec<Url>>,
    servers: mpsc::UnboundedSender<MockServer>,
}

/// Scripted connector recording every attempt.
///
/// Attempts beyond the script are accepted.
#[derive(Clone)]
pub struct MockConnector {
    recorder: Arc<Recorder>,
}

impl MockConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MockServer>) {
        let (servers, accepted) = mpsc::unbounded_channel();
        let connector = Self {
            recorder: Arc::new(Recorder {
                script: Mutex::new(VecDeque::new()),
                attempts: Mutex::new(Vec::new()),
                urls: Mutex::new(Vec::new()),
                servers,
            }),
        };
        (connector, accepted)
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.recorder.script.lock().unwrap().extend(outcomes);
    }

    pub fn attempts(&self) -> usize {
        self.recorder.attempts.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.recorder.attempts.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<Url> {
        self.recorder.urls.lock().unwrap().clone()
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &Url) -> BoxFuture<'static, Result<Transport>> {
        self.recorder.attempts.lock().unwrap().push(Instant::now());
        self.recorder.urls.lock().unwrap().push(url.clone());
        let outcome = self
            .recorder
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Accept);

        match outcome {
            Outcome::Accept => {
                let (to_client, client_rx) = frames::unbounded();
                let (client_tx, from_client) = frames::unbounded();
                let server = MockServer {
                    to_client,
                    from_client,
                };
                let _ = self.recorder.servers.send(server);

                let sink = client_tx.sink_map_err(|_| WsError::ConnectionClosed);
                let transport = Transport::new(Box::pin(sink), Box::pin(client_rx));
                Box::pin(async move { Ok(transport) })
            }
            Outcome::Refuse => Box::pin(async {
                let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
                Err(RealtimeError::WebSocket(WsError::Io(refused)))
            }),
            Outcome::Hang => Box::pin(futures::future::pending()),
        }
    }
}

/// Options used by the mock-driven tests: no keepalive noise.
pub fn test_options() -> RealtimeChannelOptions {
    RealtimeChannelOptions {
        base_url: Some("http://admin.test:8080".to_string()),
        heartbeat_interval: None,
        ..Default::default()
    }
}

pub fn channel_with(connector: &MockConnector, options: RealtimeChannelOptions) -> RealtimeChannel {
    RealtimeChannelBuilder::new(options)
        .unwrap()
        .with_connector(connector.clone())
        .build()
}

pub async fn wait_for_state(channel: &RealtimeChannel, expected: ConnectionState) {
    let mut states = channel.watch_state();
    timeout(Duration::from_secs(30), states.wait_for(|state| *state == expected))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", expected))
        .unwrap();
}

pub async fn next_server(servers: &mut mpsc::UnboundedReceiver<MockServer>) -> MockServer {
    timeout(Duration::from_secs(30), servers.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("connector dropped")
}

/// Asserts `later - earlier` equals `expected_ms`, allowing timer-wheel rounding.
pub fn assert_delay(earlier: Instant, later: Instant, expected_ms: u64) {
    let actual = later.duration_since(earlier);
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected ~{:?} between attempts, got {:?}",
        expected,
        actual
    );
}
