use super::core::{Inner, RealtimeChannel};
use super::state::ChannelState;
use crate::infrastructure::{ReconnectBackoff, TaskManager};
use crate::messaging::SubscriptionRegistry;
use crate::types::{
    API_URL_ENV, BASE_RECONNECT_DELAY, HEARTBEAT_INTERVAL, MAX_RECONNECT_ATTEMPTS, RealtimeError,
    Result,
};
use crate::websocket::{Connector, WebSocketFactory};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;

#[derive(Debug, Clone)]
pub struct RealtimeChannelOptions {
    /// Backend base address (`https://…`, `http://…` or a bare host).
    /// `None` targets the local default endpoint.
    pub base_url: Option<String>,
    /// Automatic reconnect attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt; doubled per attempt
    pub base_delay: Duration,
    /// Ping interval for dead-peer detection; `None` disables keepalive
    pub heartbeat_interval: Option<Duration>,
}

impl Default for RealtimeChannelOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_RECONNECT_DELAY),
            heartbeat_interval: Some(Duration::from_millis(HEARTBEAT_INTERVAL)),
        }
    }
}

impl RealtimeChannelOptions {
    /// Defaults with the base address taken from `ADMIN_API_URL`
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var(API_URL_ENV).ok(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.base_delay.is_zero() {
            return Err(RealtimeError::Config(
                "base_delay must be greater than zero".to_string(),
            ));
        }
        if self.heartbeat_interval.is_some_and(|interval| interval.is_zero()) {
            return Err(RealtimeError::Config(
                "heartbeat_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for RealtimeChannel that handles initialization
pub struct RealtimeChannelBuilder {
    options: RealtimeChannelOptions,
    connector: Arc<dyn Connector>,
    runtime: Handle,
}

impl RealtimeChannelBuilder {
    /// Create a new builder
    ///
    /// Must be called from within a tokio runtime; the channel spawns its
    /// session and timer tasks on it.
    pub fn new(options: RealtimeChannelOptions) -> Result<Self> {
        options.validate()?;

        let runtime = Handle::try_current().map_err(|e| RealtimeError::Runtime(e.to_string()))?;

        Ok(Self {
            options,
            connector: Arc::new(WebSocketFactory),
            runtime,
        })
    }

    /// Replace the transport connector (defaults to [`WebSocketFactory`])
    pub fn with_connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Build the channel. No connection is attempted until `connect()`.
    pub fn build(self) -> RealtimeChannel {
        let backoff =
            ReconnectBackoff::new(self.options.max_reconnect_attempts, self.options.base_delay);
        let state = ChannelState::new(backoff, TaskManager::new(self.runtime));

        RealtimeChannel {
            inner: Arc::new(Inner {
                options: self.options,
                connector: self.connector,
                registry: Arc::new(SubscriptionRegistry::new()),
                state: Mutex::new(state),
            }),
        }
    }
}
