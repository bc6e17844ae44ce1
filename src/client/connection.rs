use crate::types::{RealtimeError, Result, WS_CLOSE_NORMAL};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use uuid::Uuid;

/// Lifecycle of the channel's single logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport and no attempt in flight
    #[default]
    Idle,
    /// Handshake in flight (at most one at any time)
    Connecting,
    /// Transport live
    Open,
    /// Intentional close requested, close frame not yet flushed
    Closing,
    /// Transport gone; a reconnect may be pending
    Closed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

/// Instructions from the public API to the session task
#[derive(Debug)]
pub(crate) enum Command {
    Frame(Message),
    Close,
}

impl Command {
    /// Normal close frame sent on `disconnect()`
    pub(crate) fn close_frame() -> Message {
        Message::Close(Some(CloseFrame {
            code: CloseCode::from(WS_CLOSE_NORMAL),
            reason: "client disconnect".into(),
        }))
    }
}

/// Handle on one transport cycle.
///
/// The id tags every state update coming back from the session task, so
/// updates from a superseded session are recognised and dropped.
pub(crate) struct Session {
    pub(crate) id: Uuid,
    writer: mpsc::UnboundedSender<Command>,
}

impl Session {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (writer, commands) = mpsc::unbounded_channel();
        let session = Self {
            id: Uuid::new_v4(),
            writer,
        };
        (session, commands)
    }

    /// Queues a text frame for the session task
    pub(crate) fn send_text(&self, text: String) -> Result<()> {
        self.writer
            .send(Command::Frame(Message::Text(text.into())))
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Asks the session task to close normally
    pub(crate) fn close(&self) {
        if self.writer.send(Command::Close).is_err() {
            tracing::debug!("Session {} already finished before close request", self.id);
        }
    }
}
