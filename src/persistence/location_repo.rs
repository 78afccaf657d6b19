//! Location update repository for `SQLite` persistence.
//!
//! Rows are append-only. Radius queries narrow candidates with a
//! latitude/longitude bounding box in SQL, then apply the exact
//! haversine distance in Rust.

use std::sync::Arc;

use crate::models::location::{LocationUpdate, NewLocationUpdate};
use crate::{AppError, Result};

use super::db::Database;
use super::{format_timestamp, now, parse_timestamp, LocationStore, StoreFuture};

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Meters spanned by one degree of latitude.
const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

const SELECT_COLUMNS: &str = "SELECT id, session_id, delivery_id, latitude, longitude, accuracy, \
     speed, heading, recorded_at, created_at FROM location_update";

/// Repository wrapper around `SQLite` for location update records.
#[derive(Clone)]
pub struct LocationRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct LocationRow {
    id: i64,
    session_id: String,
    delivery_id: String,
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    speed: Option<f64>,
    heading: Option<f64>,
    recorded_at: String,
    created_at: String,
}

impl LocationRow {
    fn into_location(self) -> Result<LocationUpdate> {
        Ok(LocationUpdate {
            id: self.id,
            recorded_at: parse_timestamp("recorded_at", &self.recorded_at)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            session_id: self.session_id,
            delivery_id: self.delivery_id,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            speed: self.speed,
            heading: self.heading,
        })
    }
}

fn into_locations(rows: Vec<LocationRow>) -> Result<Vec<LocationUpdate>> {
    rows.into_iter().map(LocationRow::into_location).collect()
}

/// Great-circle distance between two points, in meters.
#[must_use]
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
}

/// Bounding box `(min_lat, max_lat, min_lon, max_lon)` that contains
/// every point within `radius_meters` of the center.
///
/// Longitude bounds widen to the full range near the poles or when the
/// box would cross the antimeridian.
fn bounding_box(latitude: f64, longitude: f64, radius_meters: f64) -> (f64, f64, f64, f64) {
    let d_lat = radius_meters / METERS_PER_DEGREE;
    let min_lat = (latitude - d_lat).max(-90.0);
    let max_lat = (latitude + d_lat).min(90.0);

    let cos_lat = latitude.to_radians().cos();
    if min_lat <= -90.0 || max_lat >= 90.0 || cos_lat <= f64::EPSILON {
        return (min_lat, max_lat, -180.0, 180.0);
    }

    let d_lon = d_lat / cos_lat;
    let min_lon = longitude - d_lon;
    let max_lon = longitude + d_lon;
    if min_lon < -180.0 || max_lon > 180.0 {
        return (min_lat, max_lat, -180.0, 180.0);
    }
    (min_lat, max_lat, min_lon, max_lon)
}

impl LocationRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn insert(&self, update: &NewLocationUpdate) -> Result<LocationUpdate> {
        let created_at = now();
        let result = sqlx::query(
            "INSERT INTO location_update (session_id, delivery_id, latitude, longitude,
             accuracy, speed, heading, recorded_at, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
             WHERE EXISTS (
                 SELECT 1 FROM tracking_session WHERE session_id = ?1 AND is_active = 1
             )",
        )
        .bind(&update.session_id)
        .bind(&update.delivery_id)
        .bind(update.latitude)
        .bind(update.longitude)
        .bind(update.accuracy)
        .bind(update.speed)
        .bind(update.heading)
        .bind(format_timestamp(update.recorded_at))
        .bind(format_timestamp(created_at))
        .execute(self.db.as_ref())
        .await
        .map_err(|err| {
            AppError::Persistence(format!("failed to create location update entry: {err}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(self.rejection(&update.session_id).await?);
        }

        Ok(update
            .clone()
            .into_persisted(result.last_insert_rowid(), created_at))
    }

    /// Why a conditional insert wrote nothing.
    async fn rejection(&self, session_id: &str) -> Result<AppError> {
        let active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM tracking_session WHERE session_id = ?1")
                .bind(session_id)
                .fetch_optional(self.db.as_ref())
                .await?;
        Ok(match active {
            None => AppError::SessionNotFound(session_id.to_owned()),
            Some(_) => AppError::SessionInactive(session_id.to_owned()),
        })
    }

    async fn list_for_session(&self, session_id: &str) -> Result<Vec<LocationUpdate>> {
        let rows: Vec<LocationRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE session_id = ?1 ORDER BY recorded_at ASC, id ASC"
        ))
        .bind(session_id)
        .fetch_all(self.db.as_ref())
        .await?;
        into_locations(rows)
    }

    async fn list_for_delivery(&self, delivery_id: &str) -> Result<Vec<LocationUpdate>> {
        let rows: Vec<LocationRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE delivery_id = ?1 ORDER BY recorded_at ASC, id ASC"
        ))
        .bind(delivery_id)
        .fetch_all(self.db.as_ref())
        .await?;
        into_locations(rows)
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<LocationUpdate>> {
        let row: Option<LocationRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE session_id = ?1 ORDER BY recorded_at DESC, id DESC LIMIT 1"
        ))
        .bind(session_id)
        .fetch_optional(self.db.as_ref())
        .await?;
        row.map(LocationRow::into_location).transpose()
    }

    async fn list_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> Result<Vec<LocationUpdate>> {
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Ok(Vec::new());
        }

        let (min_lat, max_lat, min_lon, max_lon) = bounding_box(latitude, longitude, radius_meters);
        let rows: Vec<LocationRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4
             ORDER BY recorded_at ASC, id ASC"
        ))
        .bind(min_lat)
        .bind(max_lat)
        .bind(min_lon)
        .bind(max_lon)
        .fetch_all(self.db.as_ref())
        .await?;

        let mut found = into_locations(rows)?;
        found.retain(|loc| {
            haversine_meters(latitude, longitude, loc.latitude, loc.longitude) <= radius_meters
        });
        Ok(found)
    }
}

impl LocationStore for LocationRepo {
    fn create<'a>(&'a self, update: &'a NewLocationUpdate) -> StoreFuture<'a, LocationUpdate> {
        Box::pin(self.insert(update))
    }

    fn get_by_session_id<'a>(
        &'a self,
        session_id: &'a str,
    ) -> StoreFuture<'a, Vec<LocationUpdate>> {
        Box::pin(self.list_for_session(session_id))
    }

    fn get_by_delivery_id<'a>(
        &'a self,
        delivery_id: &'a str,
    ) -> StoreFuture<'a, Vec<LocationUpdate>> {
        Box::pin(self.list_for_delivery(delivery_id))
    }

    fn get_latest_by_session_id<'a>(
        &'a self,
        session_id: &'a str,
    ) -> StoreFuture<'a, Option<LocationUpdate>> {
        Box::pin(self.latest_for_session(session_id))
    }

    fn get_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_meters: f64,
    ) -> StoreFuture<'_, Vec<LocationUpdate>> {
        Box::pin(self.list_within_radius(latitude, longitude, radius_meters))
    }
}
