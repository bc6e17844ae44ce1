pub mod event;
pub mod registry;
pub mod router;

pub use event::EventKind;
pub use registry::{Callback, EventStream, SubscriptionId, SubscriptionRegistry};
pub use router::{MessageRouter, Routed};
