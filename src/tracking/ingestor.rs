//! Location ingestion: validate, check session state, persist.

use std::sync::Arc;

use tracing::debug;

use crate::models::location::{LocationUpdate, NewLocationUpdate};
use crate::models::message::LocationSample;
use crate::persistence::LocationStore;
use crate::protocol::validation;
use crate::{AppError, Result};

use super::lifecycle::SessionLifecycle;

/// Accepts telemetry samples for active sessions.
#[derive(Clone)]
pub struct LocationIngestor {
    sessions: SessionLifecycle,
    store: Arc<dyn LocationStore>,
}

impl LocationIngestor {
    /// Create an ingestor over the given lifecycle and location store.
    #[must_use]
    pub fn new(sessions: SessionLifecycle, store: Arc<dyn LocationStore>) -> Self {
        Self { sessions, store }
    }

    /// Persist one sample for `session_id`.
    ///
    /// Bounds are re-checked here so callers outside the WebSocket path
    /// cannot bypass them. The store re-checks the session state in the
    /// same statement as the insert, so a concurrent stop wins cleanly.
    ///
    /// # Errors
    ///
    /// - `AppError::Validation` if the sample is out of range.
    /// - `AppError::MalformedPayload` if the timestamp is unrepresentable.
    /// - `AppError::SessionNotFound` if the session does not exist.
    /// - `AppError::SessionInactive` if the session was stopped.
    /// - `AppError::Persistence` if the write fails.
    pub async fn record(
        &self,
        sample: &LocationSample,
        session_id: &str,
        delivery_id: &str,
    ) -> Result<LocationUpdate> {
        validation::validate_sample(sample)?;
        let candidate = NewLocationUpdate::from_sample(sample, session_id, delivery_id)?;

        if !self.sessions.is_active(session_id).await? {
            return Err(AppError::SessionInactive(session_id.to_owned()));
        }

        let stored = self.store.create(&candidate).await?;
        debug!(session_id, id = stored.id, "location update stored");
        Ok(stored)
    }

    /// Full route of a session, oldest sample first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the query fails.
    pub async fn session_route(&self, session_id: &str) -> Result<Vec<LocationUpdate>> {
        self.store.get_by_session_id(session_id).await
    }

    /// Every sample recorded for a delivery, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the query fails.
    pub async fn delivery_route(&self, delivery_id: &str) -> Result<Vec<LocationUpdate>> {
        self.store.get_by_delivery_id(delivery_id).await
    }

    /// Most recent sample of a session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the query fails.
    pub async fn latest(&self, session_id: &str) -> Result<Option<LocationUpdate>> {
        self.store.get_latest_by_session_id(session_id).await
    }

    /// Samples within `radius_meters` of a point.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Persistence` if the query fails.
    pub async fn within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Result<Vec<LocationUpdate>> {
        self.store
            .get_within_radius(latitude, longitude, radius_meters)
            .await
    }
}
