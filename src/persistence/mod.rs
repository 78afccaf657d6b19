//! Persistence boundary: store contracts and their `SQLite` implementations.
//!
//! Services depend only on the [`SessionStore`] and [`LocationStore`]
//! traits so that tests and alternative backends can be injected at
//! construction time.

pub mod db;
pub mod location_repo;
pub mod schema;
pub mod session_repo;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, SubsecRound, Utc};

use crate::models::location::{LocationUpdate, NewLocationUpdate};
use crate::models::session::TrackingSession;
use crate::Result;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable storage for [`TrackingSession`] records.
///
/// Implementations must be safe for concurrent use from many
/// connections and must apply each write as a single atomic row
/// operation.
pub trait SessionStore: Send + Sync {
    /// Insert a new session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Persistence`](crate::AppError::Persistence) if the
    /// write is rejected, including duplicate session ids.
    fn create<'a>(&'a self, session: &'a TrackingSession) -> StoreFuture<'a, ()>;

    /// Load a session by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SessionNotFound`](crate::AppError::SessionNotFound)
    /// when no row exists, or `Persistence` on storage failure.
    fn get_by_id<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, TrackingSession>;

    /// Mark an active session stopped at `end_time`.
    ///
    /// The write only applies while the row is still active, so
    /// concurrent stops cannot overwrite each other. Returns `false`
    /// when the session was already stopped.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no row exists, or `Persistence` on
    /// storage failure.
    fn stop<'a>(&'a self, session_id: &'a str, end_time: DateTime<Utc>)
        -> StoreFuture<'a, bool>;

    /// Overwrite the mutable fields of an existing session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no row matched, or `Persistence` on
    /// storage failure.
    fn update<'a>(&'a self, session: &'a TrackingSession) -> StoreFuture<'a, ()>;
}

/// Append-only storage for [`LocationUpdate`] rows.
pub trait LocationStore: Send + Sync {
    /// Insert a sample, assigning `id` and `created_at`.
    ///
    /// The row is only written while its session is active; the check
    /// and the insert are one statement.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session does not exist,
    /// `SessionInactive` if it was stopped, or `Persistence` if the
    /// write fails.
    fn create<'a>(&'a self, update: &'a NewLocationUpdate) -> StoreFuture<'a, LocationUpdate>;

    /// All samples for a session, oldest `recorded_at` first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn get_by_session_id<'a>(&'a self, session_id: &'a str)
        -> StoreFuture<'a, Vec<LocationUpdate>>;

    /// All samples for a delivery across its sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn get_by_delivery_id<'a>(
        &'a self,
        delivery_id: &'a str,
    ) -> StoreFuture<'a, Vec<LocationUpdate>>;

    /// Most recently recorded sample for a session.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn get_latest_by_session_id<'a>(
        &'a self,
        session_id: &'a str,
    ) -> StoreFuture<'a, Option<LocationUpdate>>;

    /// Samples within `radius_meters` great-circle distance of a point.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn get_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> StoreFuture<'_, Vec<LocationUpdate>>;
}

/// Current time truncated to the precision timestamps are stored at.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text so lexical order matches chronological order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Parse a stored timestamp column back into UTC.
pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| crate::AppError::Persistence(format!("invalid {column}: {e}")))
}
