use super::SubscriptionRegistry;
use crate::types::Envelope;
use crate::websocket::CloseKind;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// What the session loop should do after a frame was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Envelope delivered to this many subscribers
    Dispatched(usize),
    /// Frame consumed without dispatch (control frame, malformed payload)
    Ignored,
    /// Peer closed the transport
    Closed(CloseKind),
}

/// Routes inbound frames to the subscription registry
pub struct MessageRouter {
    registry: Arc<SubscriptionRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Routes one frame. Never fails: malformed input is logged and dropped.
    pub fn route(&self, frame: Message) -> Routed {
        match frame {
            Message::Text(text) => self.route_text(text.as_str()),
            Message::Close(frame) => {
                let kind = match &frame {
                    Some(close_frame) if close_frame.code == CloseCode::Normal => {
                        tracing::info!("Server closed connection normally");
                        CloseKind::Intentional
                    }
                    Some(close_frame) => {
                        tracing::warn!(
                            "Server closed connection: code={:?}, reason='{}'",
                            close_frame.code,
                            close_frame.reason
                        );
                        CloseKind::Unintentional
                    }
                    None => {
                        tracing::warn!("Server closed connection without close frame");
                        CloseKind::Unintentional
                    }
                };
                Routed::Closed(kind)
            }
            Message::Ping(data) => {
                tracing::debug!("Received ping ({} bytes)", data.len());
                Routed::Ignored
            }
            Message::Pong(data) => {
                tracing::debug!("Received pong ({} bytes)", data.len());
                Routed::Ignored
            }
            Message::Binary(data) => {
                tracing::warn!(
                    "Received unexpected binary message ({} bytes)",
                    data.len()
                );
                Routed::Ignored
            }
            Message::Frame(_) => {
                tracing::debug!("Received raw frame (internal)");
                Routed::Ignored
            }
        }
    }

    fn route_text(&self, text: &str) -> Routed {
        match Envelope::parse(text) {
            Ok(envelope) => {
                if envelope.kind.is_custom() {
                    tracing::debug!("Routing unrecognised event {}", envelope.kind);
                } else {
                    tracing::debug!(
                        "Routing event {} ({} payload fields)",
                        envelope.kind,
                        envelope.payload.len()
                    );
                }
                Routed::Dispatched(self.registry.dispatch(&envelope))
            }
            Err(e) => {
                tracing::warn!("Failed to parse message: {} - Raw: {}", e, text);
                Routed::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::EventKind;
    use crate::types::Payload;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    fn router_with_counter(kind: &str) -> (MessageRouter, Arc<AtomicUsize>) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        registry.register(
            &EventKind::parse(kind),
            Arc::new(move |_: &Payload| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (MessageRouter::new(registry), hits)
    }

    #[test]
    fn test_text_frame_is_dispatched() {
        let (router, hits) = router_with_counter("order_changed");

        let routed = router.route(Message::Text(
            r#"{"type":"order_changed","id":5}"#.into(),
        ));

        assert_eq!(routed, Routed::Dispatched(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unrecognised_event_still_dispatches() {
        let (router, hits) = router_with_counter("stock_alert");

        let routed = router.route(Message::Text(r#"{"type":"stock_alert","sku":"A1"}"#.into()));

        assert_eq!(routed, Routed::Dispatched(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_text_is_ignored() {
        let (router, hits) = router_with_counter("order_changed");

        assert_eq!(router.route(Message::Text("{oops".into())), Routed::Ignored);
        assert_eq!(
            router.route(Message::Text(r#"{"type":"order_changed"}"#.into())),
            Routed::Dispatched(1)
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_frames_are_classified() {
        let (router, _) = router_with_counter("x");

        let normal = Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        }));
        let going_away = Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "restart".into(),
        }));

        assert_eq!(router.route(normal), Routed::Closed(CloseKind::Intentional));
        assert_eq!(
            router.route(going_away),
            Routed::Closed(CloseKind::Unintentional)
        );
        assert_eq!(
            router.route(Message::Close(None)),
            Routed::Closed(CloseKind::Unintentional)
        );
    }

    #[test]
    fn test_control_and_binary_frames_are_ignored() {
        let (router, hits) = router_with_counter("x");

        assert_eq!(router.route(Message::Ping(Vec::new().into())), Routed::Ignored);
        assert_eq!(router.route(Message::Pong(Vec::new().into())), Routed::Ignored);
        assert_eq!(
            router.route(Message::Binary(br#"{"type":"x"}"#.to_vec().into())),
            Routed::Ignored
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
