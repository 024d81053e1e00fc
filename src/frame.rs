//! Frame — the JSON envelope for every websocket message.
//!
//! ARCHITECTURE
//! ============
//! Clients send one frame per text message. The websocket handler routes on
//! the `syscall` prefix (`presence:`, `cursor:`, `stroke:`, `op:`) and hands
//! the flat `data` map to the room actor. Outbound events use the same shape
//! so a client needs exactly one decoder.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`.
//! - Inbound frames may omit everything except `syscall`; `id` and `ts` are
//!   stamped by the server when missing or not of the expected type.
//! - Field accessors never fail. A missing or mistyped field reads as `None`
//!   and the caller decides on a default or drops the event.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default = "Uuid::new_v4", deserialize_with = "lenient_id")]
    pub id: Uuid,
    /// Milliseconds since Unix epoch.
    #[serde(default = "now_ms", deserialize_with = "lenient_ts")]
    pub ts: i64,
    /// Room key this frame belongs to. Set on every outbound room event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Originating connection, stamped by the server on inbound frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub syscall: String,
    #[serde(default)]
    pub data: Data,
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Client-supplied ids that are not UUIDs are replaced, not rejected.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|_| Uuid::new_v4()))
}

/// Non-integer timestamps are replaced with the receive time.
fn lenient_ts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_i64().unwrap_or_else(now_ms))
}

impl Frame {
    /// Create a frame for `syscall` carrying `data`.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self { id: Uuid::new_v4(), ts: now_ms(), room: None, from: None, syscall: syscall.into(), data }
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// ROUTING
// =============================================================================

impl Frame {
    /// Extract the syscall prefix (everything before the first ':').
    #[must_use]
    pub fn prefix(&self) -> &str {
        let Some((prefix, _)) = self.syscall.split_once(':') else {
            return &self.syscall;
        };
        prefix
    }

    /// Extract the syscall operation (everything after the first ':').
    #[must_use]
    pub fn op(&self) -> &str {
        self.syscall.split_once(':').map_or("", |(_, op)| op)
    }
}

// =============================================================================
// FIELD ACCESS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(serde_json::Value::as_f64)
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
