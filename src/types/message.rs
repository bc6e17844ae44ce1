use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::constants::TYPE_FIELD;
use super::error::{RealtimeError, Result};
use crate::messaging::EventKind;

/// Event payload handed to subscribers: the envelope with `type` removed.
pub type Payload = Map<String, Value>;

/// Inbound `{type, ...payload}` frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: EventKind,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(kind: impl Into<EventKind>, payload: Payload) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Parses a text frame into an envelope.
    ///
    /// The frame must be a JSON object carrying a string `type` field; every
    /// other field becomes the payload.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut payload) = value else {
            return Err(RealtimeError::Protocol(
                "envelope is not a JSON object".to_string(),
            ));
        };

        match payload.remove(TYPE_FIELD) {
            Some(Value::String(kind)) => Ok(Self::new(kind, payload)),
            Some(other) => Err(RealtimeError::Protocol(format!(
                "envelope `type` must be a string, got {}",
                other
            ))),
            None => Err(RealtimeError::Protocol(
                "envelope is missing `type`".to_string(),
            )),
        }
    }

    /// Deserializes the payload into a typed event body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.payload.clone()))?)
    }
}

/// Outbound message accepted by [`RealtimeChannel::send`](crate::RealtimeChannel::send).
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Sent verbatim
    Text(String),
    /// JSON-encoded before sending
    Json(Value),
}

impl OutboundMessage {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Renders the frame text.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Json(value) => Ok(serde_json::to_string(&value)?),
        }
    }
}

impl From<&str> for OutboundMessage {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Value> for OutboundMessage {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
