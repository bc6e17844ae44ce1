//! # Admin Realtime
//!
//! Realtime notification channel for the store administration dashboard.
//!
//! One [`RealtimeChannel`] keeps a single WebSocket open to the admin
//! backend, fans server-pushed `{"type": ..., ...}` events out to any number
//! of subscribers keyed by event name, and reconnects with bounded
//! exponential backoff (500 ms doubling, five attempts by default) when the
//! connection drops unexpectedly.
//!
//! ## Example
//!
//! ```no_run
//! use admin_realtime::{EventKind, RealtimeChannel, RealtimeChannelOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = RealtimeChannel::new(
//!         RealtimeChannelOptions::default().with_base_url("https://api.shop.example"),
//!     )?;
//!
//!     let orders = channel.on(EventKind::NewOrder, |order| {
//!         println!("order {:?} placed", order.get("id"));
//!     });
//!
//!     channel.connect_then(|| println!("connected"));
//!     // ...
//!     channel.off(EventKind::NewOrder, orders);
//!     channel.disconnect();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use client::{ConnectionState, RealtimeChannel, RealtimeChannelBuilder, RealtimeChannelOptions};
pub use messaging::{EventKind, EventStream, SubscriptionId};
pub use types::{Envelope, OutboundMessage, Payload, RealtimeError, Result};
pub use websocket::{CloseKind, Connector, Transport, WebSocketFactory};
