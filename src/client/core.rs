use super::builder::{RealtimeChannelBuilder, RealtimeChannelOptions};
use super::connection::{Command, ConnectionState, Session};
use super::state::ChannelState;
use crate::infrastructure::{Beat, Heartbeat, TimerId, socket_endpoint};
use crate::messaging::{
    EventKind, EventStream, MessageRouter, Routed, SubscriptionId, SubscriptionRegistry,
};
use crate::types::{CLOSE_TIMEOUT, OutboundMessage, Payload, Result};
use crate::websocket::{CloseKind, Connector, Transport};
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use uuid::Uuid;

/// Callback run once the transport is open.
pub type OnOpen = Box<dyn FnOnce() + Send + 'static>;

/// The dashboard's single realtime notification channel.
///
/// `RealtimeChannel` owns at most one WebSocket to the admin backend, fans
/// server-pushed events out to any number of subscribers keyed by event name,
/// and reconnects with bounded exponential backoff when the connection drops.
///
/// Clones share the same connection and subscriptions: build one at startup
/// and hand clones to every screen that needs live updates.
///
/// All operations return immediately. Connection progress is observable
/// through the `on_open` callback, [`is_connected`](Self::is_connected) or
/// [`watch_state`](Self::watch_state).
///
/// # Example
///
/// ```no_run
/// use admin_realtime::{EventKind, RealtimeChannel, RealtimeChannelOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let channel = RealtimeChannel::new(RealtimeChannelOptions::from_env())?;
///
/// channel.on(EventKind::NewOrder, |order| {
///     println!("new order: {:?}", order.get("id"));
/// });
/// channel.connect_then(|| println!("live updates on"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeChannel {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) options: RealtimeChannelOptions,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) state: Mutex<ChannelState>,
}

impl RealtimeChannel {
    /// Creates a channel using the WebSocket connector.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Config`](crate::RealtimeError::Config) for
    /// invalid options and [`RealtimeError::Runtime`](crate::RealtimeError::Runtime)
    /// when called outside a tokio runtime.
    pub fn new(options: RealtimeChannelOptions) -> Result<Self> {
        RealtimeChannelBuilder::new(options).map(|builder| builder.build())
    }

    /// Opens the connection if it is not already open or opening.
    pub fn connect(&self) {
        self.inner.connect(None);
    }

    /// Like [`connect`](Self::connect), running `on_open` once the transport
    /// is live.
    ///
    /// If the channel is already open, `on_open` runs before this returns. If
    /// an attempt is already in flight the call is ignored and `on_open` is
    /// dropped without running.
    pub fn connect_then<F>(&self, on_open: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.connect(Some(Box::new(on_open)));
    }

    /// Closes the connection and stops automatic reconnection.
    ///
    /// Cancels any pending reconnect timer and any handshake in flight. A
    /// later [`connect`](Self::connect) starts over.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Registers `callback` for events of `kind`.
    ///
    /// Callbacks for one event run in registration order on the session task;
    /// they should return quickly. Registering the same closure twice yields
    /// two independent subscriptions.
    pub fn on<F>(&self, kind: impl Into<EventKind>, callback: F) -> SubscriptionId
    where
        F: Fn(&Payload) + Send + Sync + 'static,
    {
        self.inner.registry.register(&kind.into(), Arc::new(callback))
    }

    /// Removes one subscription. Returns `false` if it was not registered
    /// under `kind`. A removed callback is never invoked again.
    pub fn off(&self, kind: impl Into<EventKind>, id: SubscriptionId) -> bool {
        self.inner.registry.unregister(&kind.into(), id)
    }

    /// Subscribes with an async receiver instead of a callback.
    ///
    /// Dropping the stream removes the subscription.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use admin_realtime::{EventKind, RealtimeChannel, RealtimeChannelOptions};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let channel = RealtimeChannel::new(RealtimeChannelOptions::from_env())?;
    /// let mut returns = channel.subscribe(EventKind::ReturnRequestCreated);
    /// channel.connect();
    ///
    /// while let Some(request) = returns.recv().await {
    ///     println!("return request: {:?}", request);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self, kind: impl Into<EventKind>) -> EventStream {
        self.inner.registry.stream(&kind.into())
    }

    /// Number of subscriptions registered for `kind`.
    pub fn listener_count(&self, kind: impl Into<EventKind>) -> usize {
        self.inner.registry.listener_count(&kind.into())
    }

    /// Sends a message over the open transport.
    ///
    /// Strings go out verbatim, JSON values are encoded. Returns `false`
    /// without sending when the channel is not open or the frame could not be
    /// queued; nothing is buffered for later.
    pub fn send(&self, message: impl Into<OutboundMessage>) -> bool {
        self.inner.send(message.into())
    }

    /// JSON-encodes `value` and sends it. Returns `false` if encoding fails
    /// or the channel is not open.
    pub fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match OutboundMessage::json(value) {
            Ok(message) => self.inner.send(message),
            Err(e) => {
                tracing::warn!("Failed to encode outbound message: {}", e);
                false
            }
        }
    }

    /// Whether the transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.inner.lock().connection.is_open()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().connection
    }

    /// Receiver for lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.lock().state_tx.subscribe()
    }

    /// Reconnect attempts spent since the last successful open.
    ///
    /// Equal to the configured maximum while closed means automatic
    /// reconnection has given up.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().backoff.attempts()
    }

    /// Socket URL derived from the configured base address.
    pub fn endpoint(&self) -> Result<Url> {
        socket_endpoint(self.inner.options.base_url.as_deref())
    }

    pub fn options(&self) -> &RealtimeChannelOptions {
        &self.inner.options
    }
}

impl Inner {
    pub(crate) fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(self: &Arc<Self>, on_open: Option<OnOpen>) {
        let ready = {
            let mut state = self.lock();
            self.connect_locked(&mut state, on_open)
        };
        // Already open: call back outside the lock
        if let Some(on_open) = ready {
            run_on_open(on_open);
        }
    }

    /// Starts a connection attempt unless one is open or in flight.
    ///
    /// Returns `on_open` back when the channel is already open, so the caller
    /// can run it once the lock is released.
    fn connect_locked(
        self: &Arc<Self>,
        state: &mut ChannelState,
        on_open: Option<OnOpen>,
    ) -> Option<OnOpen> {
        match state.connection {
            ConnectionState::Open => return on_open,
            ConnectionState::Connecting => {
                tracing::debug!("Connection attempt already in flight");
                return None;
            }
            _ => {}
        }

        // An explicit connect supersedes any scheduled retry
        state.tasks.cancel_reconnect();

        let url = match socket_endpoint(self.options.base_url.as_deref()) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot build socket endpoint: {}", e);
                state.set_connection(ConnectionState::Idle);
                return None;
            }
        };

        let (session, commands) = Session::new();
        let session_id = session.id;
        state.session = Some(session);
        state.set_connection(ConnectionState::Connecting);

        tracing::info!("Connecting to {} (session {})", url, session_id);
        let handshake = self.connector.connect(&url);
        let router = MessageRouter::new(Arc::clone(&self.registry));

        state.tasks.spawn_session(run_session(
            Arc::downgrade(self),
            session_id,
            handshake,
            commands,
            router,
            self.options.heartbeat_interval,
            on_open,
        ));
        None
    }

    fn disconnect(&self) {
        let mut state = self.lock();

        state.backoff.exhaust();
        if state.tasks.cancel_reconnect() {
            tracing::debug!("Cancelled pending reconnect");
        }

        let Some(session) = state.session.take() else {
            tracing::debug!("Disconnect requested with no transport");
            return;
        };

        if state.connection == ConnectionState::Open {
            tracing::info!("Disconnecting (session {})", session.id);
            session.close();
            state.closing = Some(session.id);
            state.tasks.detach_session();
            state.set_connection(ConnectionState::Closing);
        } else {
            tracing::info!("Abandoning connection attempt (session {})", session.id);
            state.tasks.abort_session();
            state.set_connection(ConnectionState::Closed);
        }
    }

    fn send(&self, message: OutboundMessage) -> bool {
        let text = match message.into_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to encode outbound message: {}", e);
                return false;
            }
        };

        let state = self.lock();
        if !state.connection.is_open() {
            tracing::debug!("Dropping send while {:?}", state.connection);
            return false;
        }

        let Some(session) = state.session.as_ref() else {
            return false;
        };
        match session.send_text(text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to queue outbound message: {}", e);
                false
            }
        }
    }

    /// Handshake finished. Returns `false` if the session was superseded.
    fn mark_open(&self, session_id: Uuid) -> bool {
        let mut state = self.lock();
        if state.session_id() != Some(session_id) || state.connection != ConnectionState::Connecting
        {
            return false;
        }

        state.backoff.reset();
        state.set_connection(ConnectionState::Open);
        tracing::info!("Connected (session {})", session_id);
        true
    }

    /// Transport ended on its own. Decides whether to schedule a reconnect.
    fn handle_close(self: &Arc<Self>, session_id: Uuid, kind: CloseKind) {
        let mut state = self.lock();
        if state.session_id() != Some(session_id) {
            tracing::debug!("Ignoring close of superseded session {}", session_id);
            return;
        }

        state.session = None;
        state.tasks.detach_session();
        state.set_connection(ConnectionState::Closed);

        if kind == CloseKind::Intentional {
            tracing::info!("Connection closed normally, not reconnecting");
            return;
        }

        let Some(delay) = state.backoff.next_delay() else {
            tracing::warn!(
                "Giving up after {} reconnect attempts",
                state.backoff.max_attempts()
            );
            return;
        };

        tracing::info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            state.backoff.attempts(),
            state.backoff.max_attempts()
        );
        let channel = Arc::downgrade(self);
        state.tasks.schedule_reconnect(delay, move |timer| {
            if let Some(inner) = channel.upgrade() {
                inner.reconnect_now(timer);
            }
        });
    }

    /// Fired reconnect timer. A `disconnect()` or `connect()` that got the
    /// lock first has already withdrawn `timer`, in which case nothing happens.
    fn reconnect_now(self: &Arc<Self>, timer: TimerId) {
        let mut state = self.lock();
        if !state.tasks.claim_reconnect(timer) {
            tracing::debug!("Reconnect timer withdrawn before it ran");
            return;
        }

        tracing::info!("Attempting to reconnect...");
        // Retries carry no on_open, so there is nothing to run afterwards
        self.connect_locked(&mut state, None);
    }

    /// Close frame flushed after `disconnect()`
    fn finish_close(&self, session_id: Uuid) {
        let mut state = self.lock();
        if state.closing != Some(session_id) {
            return;
        }

        state.closing = None;
        if state.connection == ConnectionState::Closing {
            state.set_connection(ConnectionState::Closed);
        }
        tracing::info!("Disconnected (session {})", session_id);
    }
}

fn run_on_open(on_open: OnOpen) {
    if catch_unwind(AssertUnwindSafe(on_open)).is_err() {
        tracing::error!("on_open callback panicked");
    }
}

/// How a session's pump loop ended
enum SessionEnd {
    /// Transport dropped or was closed by the peer
    Dropped(CloseKind),
    /// Closed on request of `disconnect()` (or the channel was dropped)
    Released,
}

async fn run_session(
    channel: Weak<Inner>,
    session_id: Uuid,
    handshake: BoxFuture<'static, Result<Transport>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    router: MessageRouter,
    heartbeat_interval: Option<Duration>,
    on_open: Option<OnOpen>,
) {
    let transport = match handshake.await {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!("Failed to open transport: {}", e);
            if let Some(inner) = channel.upgrade() {
                inner.handle_close(session_id, CloseKind::Unintentional);
            }
            return;
        }
    };

    match channel.upgrade() {
        Some(inner) if inner.mark_open(session_id) => {}
        _ => {
            tracing::debug!("Session {} superseded before opening", session_id);
            return;
        }
    }

    if let Some(on_open) = on_open {
        run_on_open(on_open);
    }

    let heartbeat = heartbeat_interval.map(Heartbeat::new);
    let end = pump(transport, &mut commands, &router, heartbeat).await;

    let Some(inner) = channel.upgrade() else {
        return;
    };
    match end {
        SessionEnd::Dropped(kind) => inner.handle_close(session_id, kind),
        SessionEnd::Released => inner.finish_close(session_id),
    }
}

async fn pump(
    transport: Transport,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    router: &MessageRouter,
    mut heartbeat: Option<Heartbeat>,
) -> SessionEnd {
    let Transport {
        mut sink,
        mut stream,
    } = transport;

    tracing::debug!("Starting session loop");
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Frame(frame)) => {
                    if let Err(e) = sink.send(frame).await {
                        tracing::error!("WebSocket write error: {}", e);
                        return SessionEnd::Dropped(CloseKind::Unintentional);
                    }
                }
                Some(Command::Close) | None => {
                    let close = async {
                        match sink.send(Command::close_frame()).await {
                            Ok(()) => sink.close().await,
                            Err(e) => Err(e),
                        }
                    };
                    match tokio::time::timeout(Duration::from_millis(CLOSE_TIMEOUT), close).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::debug!("Close handshake error: {}", e),
                        Err(_) => tracing::debug!("Close handshake timed out"),
                    }
                    return SessionEnd::Released;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(frame)) => {
                    if let Some(heartbeat) = heartbeat.as_mut() {
                        heartbeat.record_activity();
                    }
                    if let Routed::Closed(kind) = router.route(frame) {
                        return SessionEnd::Dropped(kind);
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("WebSocket read error: {}", e);
                    return SessionEnd::Dropped(CloseKind::Unintentional);
                }
                None => {
                    tracing::warn!("WebSocket stream ended");
                    return SessionEnd::Dropped(CloseKind::Unintentional);
                }
            },
            beat = Heartbeat::tick_opt(&mut heartbeat) => match beat {
                Beat::SendPing => {
                    if let Err(e) = sink.send(Message::Ping(Vec::new().into())).await {
                        tracing::error!("Failed to send heartbeat: {}", e);
                        return SessionEnd::Dropped(CloseKind::Unintentional);
                    }
                    tracing::debug!("Sent heartbeat ping");
                }
                Beat::TimedOut => {
                    tracing::warn!("Heartbeat timeout detected, dropping connection");
                    return SessionEnd::Dropped(CloseKind::Unintentional);
                }
            },
        }
    }
}
