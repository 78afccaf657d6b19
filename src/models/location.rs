//! Location update models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::LocationSample;
use crate::{AppError, Result};

/// Location sample accepted for persistence but not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocationUpdate {
    /// Owning session.
    pub session_id: String,
    /// Delivery reported by the client alongside the sample.
    pub delivery_id: String,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    /// Ground speed in meters per second.
    pub speed: Option<f64>,
    /// Course over ground in degrees.
    pub heading: Option<f64>,
    /// Client capture time.
    pub recorded_at: DateTime<Utc>,
}

impl NewLocationUpdate {
    /// Build a candidate row from a wire sample.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedPayload` if the sample timestamp is
    /// outside the representable date range.
    pub fn from_sample(sample: &LocationSample, session_id: &str, delivery_id: &str) -> Result<Self> {
        let recorded_at = DateTime::from_timestamp_millis(sample.timestamp_ms).ok_or_else(|| {
            AppError::MalformedPayload(format!(
                "timestamp out of range: {}",
                sample.timestamp_ms
            ))
        })?;

        Ok(Self {
            session_id: session_id.to_owned(),
            delivery_id: delivery_id.to_owned(),
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy,
            speed: sample.speed,
            heading: sample.heading,
            recorded_at,
        })
    }

    /// Attach the store-assigned identity, producing the persisted row.
    #[must_use]
    pub fn into_persisted(self, id: i64, created_at: DateTime<Utc>) -> LocationUpdate {
        LocationUpdate {
            id,
            session_id: self.session_id,
            delivery_id: self.delivery_id,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            speed: self.speed,
            heading: self.heading,
            recorded_at: self.recorded_at,
            created_at,
        }
    }
}

/// Append-only telemetry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// Server-assigned sequence number.
    pub id: i64,
    /// Owning session.
    pub session_id: String,
    /// Delivery reported alongside the sample.
    pub delivery_id: String,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    /// Ground speed in meters per second.
    pub speed: Option<f64>,
    /// Course over ground in degrees.
    pub heading: Option<f64>,
    /// Client capture time.
    pub recorded_at: DateTime<Utc>,
    /// Server insert time.
    pub created_at: DateTime<Utc>,
}
