use thiserror::Error;

/// Errors produced inside the realtime channel.
///
/// The channel's runtime operations never surface these to callers; they are
/// logged at their origin. They are returned from construction and from the
/// standalone helpers (endpoint derivation, envelope parsing).
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Inbound frame that is not a valid event envelope
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Base address uses a scheme that cannot be mapped to a socket scheme
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Rejected channel options
    #[error("Configuration error: {0}")]
    Config(String),

    /// No tokio runtime available to drive the channel
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
