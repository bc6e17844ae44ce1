// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{RealtimeChannelBuilder, RealtimeChannelOptions};
pub use connection::ConnectionState;
pub use core::{OnOpen, RealtimeChannel};
