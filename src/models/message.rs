//! Inbound wire message types.
//!
//! One JSON object arrives per WebSocket frame:
//!
//! ```json
//! {
//!   "type": "location_update",
//!   "sessionId": "s1",
//!   "data": {"latitude": 10.0, "longitude": 20.0, "accuracy": 5.0, "timestamp": 1000},
//!   "state": {"isTracking": true, "sessionId": "s1", "deliveryId": "d1", "startTime": 900}
//! }
//! ```
//!
//! Field presence rules beyond what the JSON shape enforces are checked
//! by [`crate::protocol::validation`].

use serde::{Deserialize, Serialize};

use super::deserialize_null_as_default;

/// Message type tag carried in the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Begin a tracking session.
    Start,
    /// End a tracking session.
    Stop,
    /// Telemetry sample for an active session.
    LocationUpdate,
    /// Tag not understood by this server.
    Unknown(String),
}

impl MessageType {
    /// Wire representation of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::LocationUpdate => "location_update",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "location_update" => Self::LocationUpdate,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Unknown(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

/// One geolocation observation reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    /// Degrees north, `[-90, 90]`.
    pub latitude: f64,
    /// Degrees east, `[-180, 180]`.
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    /// Client capture time, milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    /// Ground speed in meters per second.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Course over ground in degrees.
    #[serde(default)]
    pub heading: Option<f64>,
}

/// Client-side view of the tracking session, sent with every message.
///
/// Informational only; the server never trusts it for state transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStateSnapshot {
    /// Whether the client believes it is tracking.
    #[serde(deserialize_with = "deserialize_null_as_default")]
    pub is_tracking: bool,
    /// Session identifier as known to the client.
    #[serde(deserialize_with = "deserialize_null_as_default")]
    pub session_id: String,
    /// Delivery the session belongs to.
    #[serde(deserialize_with = "deserialize_null_as_default")]
    pub delivery_id: String,
    /// Client-reported start time in epoch milliseconds.
    #[serde(rename = "startTime")]
    pub start_time_ms: Option<i64>,
    /// Client-reported time of the last sample in epoch milliseconds.
    #[serde(rename = "lastUpdateTime")]
    pub last_update_time_ms: Option<i64>,
}

impl SessionStateSnapshot {
    /// Client-reported session duration in milliseconds, if both bounds are known.
    #[must_use]
    pub fn reported_duration_ms(&self) -> Option<i64> {
        match (self.start_time_ms, self.last_update_time_ms) {
            (Some(start), Some(last)) => Some(last.saturating_sub(start)),
            _ => None,
        }
    }
}

/// Decoded inbound frame, prior to validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Message tag; `None` when the key is absent or `null`.
    #[serde(rename = "type", default)]
    pub message_type: Option<MessageType>,
    /// Session the message refers to.
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub session_id: String,
    /// Telemetry payload; required for `location_update`.
    #[serde(default)]
    pub data: Option<LocationSample>,
    /// Client session snapshot.
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub state: SessionStateSnapshot,
}
