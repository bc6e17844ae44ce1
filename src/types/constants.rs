/// Event names pushed by the admin backend (magic strings layer)
pub mod admin_events {
    pub const PROFILE_UPDATE: &str = "profile_update";
    pub const PRODUCT_CREATED: &str = "product_created";
    pub const PRODUCT_UPDATED: &str = "product_updated";
    pub const PRODUCT_DELETED: &str = "product_deleted";
    pub const PRODUCT_VISIBILITY_CHANGED: &str = "product_visibility_changed";
    pub const CATEGORY_CHANGED: &str = "category_changed";
    pub const ORDER_CHANGED: &str = "order_changed";
    pub const NEW_ORDER: &str = "new_order";
    pub const RETURN_REQUEST_CREATED: &str = "return_request_created";
    pub const RETURN_STATUS_UPDATED: &str = "return_status_updated";
    pub const USER_CHANGED: &str = "user_changed";
    pub const LOYALTY_CHANGED: &str = "loyalty_changed";
}

/// Envelope discriminator field
pub const TYPE_FIELD: &str = "type";

/// Environment variable holding the backend base address
pub const API_URL_ENV: &str = "ADMIN_API_URL";

/// Fallback socket address when no base address is configured
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:5000";

/// Default reconnect budget
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base reconnect delay (milliseconds), doubled per attempt
pub const BASE_RECONNECT_DELAY: u64 = 500;

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 25000;

/// Time allowed to flush the close frame on disconnect (milliseconds)
pub const CLOSE_TIMEOUT: u64 = 5000;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
