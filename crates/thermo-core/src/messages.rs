//! Messages exchanged with real-time subscribers.
//!
//! Every message is a JSON object tagged by a `type` field.
//!
//! ```text
//! server -> client   connected{message} | reading{data} | subscribed{sensorId}
//!                    | unsubscribed{sensorId} | error{message}
//! client -> server   subscribe{sensorId} | unsubscribe{}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use thermo_types::Reading;

/// Greeting sent to every new connection.
pub const WELCOME_MESSAGE: &str = "Connected to temperature monitor WebSocket";

/// Reply text for payloads that cannot be parsed.
pub const INVALID_MESSAGE: &str = "invalid message";

/// Messages sent from the server to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a new connection.
    Connected { message: String },
    /// A live reading.
    Reading { data: Reading },
    /// The connection's filter is now `sensor_id`.
    Subscribed {
        #[serde(rename = "sensorId")]
        sensor_id: i64,
    },
    /// The connection's filter was cleared; carries the previous filter.
    Unsubscribed {
        #[serde(rename = "sensorId")]
        sensor_id: Option<i64>,
    },
    /// A control message was rejected.
    Error { message: String },
}

impl ServerMessage {
    /// The greeting for a new connection.
    pub fn connected() -> Self {
        ServerMessage::Connected {
            message: WELCOME_MESSAGE.to_string(),
        }
    }

    /// An error reply.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Control messages sent from a subscriber to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Restrict delivery to one sensor. `sensor_id` is `None` when the field
    /// was missing or not an integer.
    Subscribe { sensor_id: Option<i64> },
    /// Receive every reading again.
    Unsubscribe,
    /// A well-formed message of a kind the server does not handle.
    Unknown(String),
}

/// Why a control payload could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload is not JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload is JSON but not an object with a string `type`.
    #[error("missing message type")]
    MissingType,
}

impl ClientMessage {
    /// Parse a raw text payload.
    ///
    /// JSON that is not an object, or whose `type` is not a string (for
    /// example `[1,2]` or `{"type":7}`), fails with
    /// [`MessageError::MissingType`] and is answered as an invalid message
    /// rather than an unknown type.
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(raw)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(MessageError::MissingType)?;

        Ok(match kind {
            "subscribe" => ClientMessage::Subscribe {
                sensor_id: value.get("sensorId").and_then(Value::as_i64),
            },
            "unsubscribe" => ClientMessage::Unsubscribe,
            other => ClientMessage::Unknown(other.to_string()),
        })
    }
}
