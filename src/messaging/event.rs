use crate::types::constants::admin_events;

/// Type-safe event kinds pushed by the admin backend.
///
/// The catalog mirrors what the dashboard screens listen for. Anything the
/// server sends that is not listed here is carried as [`EventKind::Custom`],
/// so new server-side events never break the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Admin profile edited
    ProfileUpdate,

    /// Product catalog changes
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    ProductVisibilityChanged,

    /// Category tree changed
    CategoryChanged,

    /// Existing order changed (status, payment, shipment)
    OrderChanged,

    /// Order placed by a customer
    NewOrder,

    /// Return workflow
    ReturnRequestCreated,
    ReturnStatusUpdated,

    /// Customer account notifications
    UserChanged,
    LoyaltyChanged,

    /// Server-defined event the client has no variant for
    Custom(String),
}

impl EventKind {
    /// Parse a wire name into an EventKind
    pub fn parse(s: &str) -> Self {
        match s {
            admin_events::PROFILE_UPDATE => Self::ProfileUpdate,
            admin_events::PRODUCT_CREATED => Self::ProductCreated,
            admin_events::PRODUCT_UPDATED => Self::ProductUpdated,
            admin_events::PRODUCT_DELETED => Self::ProductDeleted,
            admin_events::PRODUCT_VISIBILITY_CHANGED => Self::ProductVisibilityChanged,
            admin_events::CATEGORY_CHANGED => Self::CategoryChanged,
            admin_events::ORDER_CHANGED => Self::OrderChanged,
            admin_events::NEW_ORDER => Self::NewOrder,
            admin_events::RETURN_REQUEST_CREATED => Self::ReturnRequestCreated,
            admin_events::RETURN_STATUS_UPDATED => Self::ReturnStatusUpdated,
            admin_events::USER_CHANGED => Self::UserChanged,
            admin_events::LOYALTY_CHANGED => Self::LoyaltyChanged,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Wire name used as the registry key
    pub fn as_str(&self) -> &str {
        match self {
            Self::ProfileUpdate => admin_events::PROFILE_UPDATE,
            Self::ProductCreated => admin_events::PRODUCT_CREATED,
            Self::ProductUpdated => admin_events::PRODUCT_UPDATED,
            Self::ProductDeleted => admin_events::PRODUCT_DELETED,
            Self::ProductVisibilityChanged => admin_events::PRODUCT_VISIBILITY_CHANGED,
            Self::CategoryChanged => admin_events::CATEGORY_CHANGED,
            Self::OrderChanged => admin_events::ORDER_CHANGED,
            Self::NewOrder => admin_events::NEW_ORDER,
            Self::ReturnRequestCreated => admin_events::RETURN_REQUEST_CREATED,
            Self::ReturnStatusUpdated => admin_events::RETURN_STATUS_UPDATED,
            Self::UserChanged => admin_events::USER_CHANGED,
            Self::LoyaltyChanged => admin_events::LOYALTY_CHANGED,
            Self::Custom(s) => s,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&EventKind> for EventKind {
    fn from(kind: &EventKind) -> Self {
        kind.clone()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
