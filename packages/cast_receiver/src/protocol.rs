//! Wire-level message shapes exchanged with senders.
//!
//! Inbound frames are arbitrary JSON; the dispatcher only recognizes the
//! `request` field. Outbound frames are single-key objects, matching what
//! sender applications already parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement sent to every open channel after a title change.
pub const TITLE_CHANGED_RESPONSE: &str = "title changed.";

/// Outbound message to a sender. Serializes without any envelope:
/// `{"response": "..."}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReceiverMessage {
    Response { response: String },
    Error { error: String },
}

/// Extract a usable request value: present, a string, and non-empty.
/// Everything else falls through to the invalid-message path.
pub fn request_field(payload: &Value) -> Option<&str> {
    match payload.get("request") {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Render the `command` field for the invalid-message error text.
///
/// The recognized message shape never defines `command`; the historical error
/// text names it anyway, so this usually renders `none`.
pub fn command_label(payload: &Value) -> String {
    match payload.get("command") {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}
