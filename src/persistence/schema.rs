//! `SQLite` schema bootstrap logic.
//!
//! Every statement is idempotent and runs on each startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Persistence` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS tracking_session (
    session_id      TEXT PRIMARY KEY NOT NULL,
    delivery_id     TEXT NOT NULL,
    start_time      TEXT NOT NULL,
    end_time        TEXT,
    is_active       INTEGER NOT NULL CHECK(is_active IN (0, 1)),
    CHECK ((is_active = 1 AND end_time IS NULL) OR (is_active = 0 AND end_time IS NOT NULL))
);

CREATE TABLE IF NOT EXISTS location_update (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id      TEXT NOT NULL REFERENCES tracking_session(session_id),
    delivery_id     TEXT NOT NULL,
    latitude        REAL NOT NULL CHECK(latitude BETWEEN -90 AND 90),
    longitude       REAL NOT NULL CHECK(longitude BETWEEN -180 AND 180),
    accuracy        REAL NOT NULL CHECK(accuracy >= 0),
    speed           REAL,
    heading         REAL,
    recorded_at     TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_location_session ON location_update(session_id, recorded_at);
CREATE INDEX IF NOT EXISTS idx_location_delivery ON location_update(delivery_id, recorded_at);
CREATE INDEX IF NOT EXISTS idx_location_coords ON location_update(latitude, longitude);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
