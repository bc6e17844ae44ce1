use super::EventKind;
use crate::types::{Envelope, Payload};
use futures::Stream;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Subscriber callback. Receives the envelope payload with `type` stripped.
pub type Callback = Arc<dyn Fn(&Payload) + Send + Sync + 'static>;

/// Handle identifying one registration, used with `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber {
    id: SubscriptionId,
    // Cleared on removal; dispatch re-checks it right before each call
    active: AtomicBool,
    callback: Callback,
}

/// Maps event names to their subscribers, in registration order.
///
/// Subscriptions are independent of the transport: they survive reconnects
/// and are only dropped through [`unregister`](Self::unregister).
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    bindings: RwLock<HashMap<String, Vec<Arc<Subscriber>>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            bindings: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Arc<Subscriber>>>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Arc<Subscriber>>>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a callback for `kind`. Duplicate callbacks are not merged.
    pub fn register(&self, kind: &EventKind, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber {
            id,
            active: AtomicBool::new(true),
            callback,
        });

        self.write()
            .entry(kind.as_str().to_string())
            .or_default()
            .push(subscriber);

        tracing::debug!("Registered {} for event {}", id, kind);
        id
    }

    /// Removes one registration. Returns `false` if it was not registered
    /// under `kind`.
    pub fn unregister(&self, kind: &EventKind, id: SubscriptionId) -> bool {
        let mut bindings = self.write();
        let Some(subscribers) = bindings.get_mut(kind.as_str()) else {
            return false;
        };
        let Some(index) = subscribers.iter().position(|s| s.id == id) else {
            return false;
        };

        let removed = subscribers.remove(index);
        removed.active.store(false, Ordering::Release);
        if subscribers.is_empty() {
            bindings.remove(kind.as_str());
        }

        tracing::debug!("Unregistered {} from event {}", id, kind);
        true
    }

    /// Number of live registrations for `kind`.
    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.read().get(kind.as_str()).map_or(0, Vec::len)
    }

    /// Invokes every subscriber of the envelope's kind, in registration order.
    ///
    /// Returns how many callbacks ran. A panicking callback is logged and
    /// does not stop the remaining ones.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let snapshot = match self.read().get(envelope.kind.as_str()) {
            Some(subscribers) => subscribers.clone(),
            None => {
                tracing::debug!("No subscribers for event {}", envelope.kind);
                return 0;
            }
        };

        let mut invoked = 0;
        for subscriber in snapshot {
            if !subscriber.active.load(Ordering::Acquire) {
                continue;
            }

            let call = catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(&envelope.payload)));
            if call.is_err() {
                tracing::error!(
                    "Subscriber {} panicked while handling event {}",
                    subscriber.id,
                    envelope.kind
                );
            }
            invoked += 1;
        }
        invoked
    }

    /// Registers a channel-backed subscriber. Dropping the returned stream
    /// unregisters it.
    pub fn stream(self: &Arc<Self>, kind: &EventKind) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let event = kind.clone();
        let id = self.register(
            kind,
            Arc::new(move |payload: &Payload| {
                if tx.send(payload.clone()).is_err() {
                    tracing::debug!("Event stream for {} already closed", event);
                }
            }),
        );

        EventStream {
            id,
            kind: kind.clone(),
            rx,
            registry: Arc::downgrade(self),
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Async view over one subscription.
///
/// Yields payloads in dispatch order. Also usable as a [`Stream`].
pub struct EventStream {
    id: SubscriptionId,
    kind: EventKind,
    rx: mpsc::UnboundedReceiver<Payload>,
    registry: Weak<SubscriptionRegistry>,
}

impl EventStream {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Waits for the next payload.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Returns a payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = Payload;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.kind, self.id);
        }
    }
}
