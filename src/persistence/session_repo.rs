//! Tracking session repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::session::TrackingSession;
use crate::{AppError, Result};

use super::db::Database;
use super::{format_timestamp, parse_timestamp, SessionStore, StoreFuture};

/// Repository wrapper around `SQLite` for tracking session records.
#[derive(Clone)]
pub struct SessionRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    delivery_id: String,
    start_time: String,
    end_time: Option<String>,
    is_active: bool,
}

impl SessionRow {
    fn into_session(self) -> Result<TrackingSession> {
        let start_time = parse_timestamp("start_time", &self.start_time)?;
        let end_time = self
            .end_time
            .as_deref()
            .map(|raw| parse_timestamp("end_time", raw))
            .transpose()?;

        Ok(TrackingSession {
            session_id: self.session_id,
            delivery_id: self.delivery_id,
            start_time,
            end_time,
            is_active: self.is_active,
        })
    }
}

impl SessionRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn insert(&self, session: &TrackingSession) -> Result<()> {
        sqlx::query(
            "INSERT INTO tracking_session (session_id, delivery_id, start_time, end_time, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session.session_id)
        .bind(&session.delivery_id)
        .bind(format_timestamp(session.start_time))
        .bind(session.end_time.map(format_timestamp))
        .bind(session.is_active)
        .execute(self.db.as_ref())
        .await
        .map_err(|err| {
            AppError::Persistence(format!(
                "failed to create session {}: {err}",
                session.session_id
            ))
        })?;
        Ok(())
    }

    async fn fetch(&self, session_id: &str) -> Result<TrackingSession> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT session_id, delivery_id, start_time, end_time, is_active
             FROM tracking_session WHERE session_id = ?1",
        )
        .bind(session_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.ok_or_else(|| AppError::SessionNotFound(session_id.to_owned()))?
            .into_session()
    }

    async fn close(&self, session_id: &str, end_time: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE tracking_session SET end_time = ?2, is_active = 0
             WHERE session_id = ?1 AND is_active = 1",
        )
        .bind(session_id)
        .bind(format_timestamp(end_time))
        .execute(self.db.as_ref())
        .await
        .map_err(|err| {
            AppError::Persistence(format!("failed to stop session {session_id}: {err}"))
        })?;

        if result.rows_affected() == 0 {
            // Absent rows surface as SessionNotFound.
            self.fetch(session_id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    async fn overwrite(&self, session: &TrackingSession) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tracking_session
             SET delivery_id = ?2, start_time = ?3, end_time = ?4, is_active = ?5
             WHERE session_id = ?1",
        )
        .bind(&session.session_id)
        .bind(&session.delivery_id)
        .bind(format_timestamp(session.start_time))
        .bind(session.end_time.map(format_timestamp))
        .bind(session.is_active)
        .execute(self.db.as_ref())
        .await
        .map_err(|err| {
            AppError::Persistence(format!(
                "failed to update session {}: {err}",
                session.session_id
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::SessionNotFound(session.session_id.clone()));
        }
        Ok(())
    }
}

impl SessionStore for SessionRepo {
    fn create<'a>(&'a self, session: &'a TrackingSession) -> StoreFuture<'a, ()> {
        Box::pin(self.insert(session))
    }

    fn get_by_id<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, TrackingSession> {
        Box::pin(self.fetch(session_id))
    }

    fn stop<'a>(
        &'a self,
        session_id: &'a str,
        end_time: DateTime<Utc>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(self.close(session_id, end_time))
    }

    fn update<'a>(&'a self, session: &'a TrackingSession) -> StoreFuture<'a, ()> {
        Box::pin(self.overwrite(session))
    }
}
