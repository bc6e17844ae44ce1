pub mod factory;

pub use factory::{CloseKind, Connector, FrameSink, FrameStream, Transport, WebSocketFactory};
