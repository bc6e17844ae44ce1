// Infrastructure module - Background tasks, timers and endpoint handling
pub mod endpoint;
pub mod heartbeat;
pub mod task_manager;
pub mod timer;

pub use endpoint::socket_endpoint;
pub use heartbeat::{Beat, Heartbeat};
pub use task_manager::{TaskManager, TimerId};
pub use timer::ReconnectBackoff;
