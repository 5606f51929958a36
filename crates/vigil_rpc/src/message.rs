//! Wire messages.
//!
//! ```text
//! request       {"id": 1, "topic": "run", "payload": {...}}
//! response      {"id": 1, "result": [...]}
//!               {"id": 1, "error": {"kind": "cancelled", "message": "..."}}
//! notification  {"topic": "cancel", "payload": {...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// A single message on the channel.
///
/// The variants are distinguished by their fields: requests carry both `id`
/// and `topic`, responses carry `id` only, notifications carry `topic` only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A call expecting exactly one response.
    Request(Request),
    /// The answer to an earlier request.
    Response(Response),
    /// A fire-and-forget message.
    Notification(Notification),
}

/// A call expecting exactly one response with the same id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id, unique per sender.
    pub id: u64,
    /// Which handler should process the request.
    pub topic: String,
    /// Topic-specific arguments.
    #[serde(default)]
    pub payload: Value,
}

/// The answer to a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the request being answered.
    pub id: u64,
    /// The handler's result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The handler's error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl Response {
    /// Builds a response from a handler outcome.
    pub fn from_outcome(id: u64, outcome: Result<Value, RemoteError>) -> Self {
        match outcome {
            Ok(value) => Self {
                id,
                result: Some(value),
                error: None,
            },
            Err(error) => Self {
                id,
                result: None,
                error: Some(error),
            },
        }
    }

    /// Converts back into a handler outcome. A missing result reads as `null`.
    pub fn into_outcome(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A fire-and-forget message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Which handler should process the notification.
    pub topic: String,
    /// Topic-specific arguments.
    #[serde(default)]
    pub payload: Value,
}
