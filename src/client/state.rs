use super::connection::{ConnectionState, Session};
use crate::infrastructure::{ReconnectBackoff, TaskManager};
use tokio::sync::watch;
use uuid::Uuid;

/// Consolidated mutable state for RealtimeChannel
/// Guarded by one lock so connect/close decisions see a consistent view
pub(crate) struct ChannelState {
    /// Current lifecycle state
    pub connection: ConnectionState,

    /// Reconnect attempt counter and delay schedule
    pub backoff: ReconnectBackoff,

    /// The live or connecting transport cycle, if any
    pub session: Option<Session>,

    /// Session flushing its close frame after `disconnect()`
    pub closing: Option<Uuid>,

    /// Session task and reconnect timer
    pub tasks: TaskManager,

    /// Sender for state change notifications
    pub state_tx: watch::Sender<ConnectionState>,
}

impl ChannelState {
    pub fn new(backoff: ReconnectBackoff, tasks: TaskManager) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            connection: ConnectionState::Idle,
            backoff,
            session: None,
            closing: None,
            tasks,
            state_tx,
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|session| session.id)
    }

    /// Set connection state and notify watchers
    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.connection == state {
            return;
        }
        tracing::debug!("Connection state {:?} -> {:?}", self.connection, state);
        self.connection = state;
        self.state_tx.send_replace(state);
    }
}
