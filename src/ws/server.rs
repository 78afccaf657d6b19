//! HTTP router and listener.
//!
//! Serves the WebSocket upgrade endpoint, a `/health` probe, and a
//! read-only route lookup per session.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::connection;
use super::dispatch::Dispatcher;
use super::ErrorFrame;
use crate::config::GlobalConfig;
use crate::models::location::LocationUpdate;
use crate::persistence::{LocationStore, SessionStore};
use crate::tracking::{LocationIngestor, SessionLifecycle};
use crate::{AppError, Result};

/// Shared state handed to every request and connection.
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration.
    pub config: Arc<GlobalConfig>,
    /// Session start/stop service.
    pub sessions: SessionLifecycle,
    /// Location ingestion and query service.
    pub ingestor: LocationIngestor,
    /// Server-wide shutdown signal; each connection takes a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire services over the given stores.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        session_store: Arc<dyn SessionStore>,
        location_store: Arc<dyn LocationStore>,
        shutdown: CancellationToken,
    ) -> Self {
        let sessions = SessionLifecycle::new(session_store);
        let ingestor = LocationIngestor::new(sessions.clone(), location_store);
        Self {
            config,
            sessions,
            ingestor,
            shutdown,
        }
    }

    /// Frame dispatcher over this state's services.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.sessions.clone(), self.ingestor.clone())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::SessionInactive(_) => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::Transport(_) | Self::Config(_) | Self::Io(_) => {
                error!(err = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorFrame::new(self.client_message()))).into_response()
    }
}

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    ws.on_upgrade(move |socket| connection::serve_connection(socket, state, remote_addr))
}

/// `GET /sessions/{session_id}/route`: the session's samples, oldest first.
async fn session_route(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<LocationUpdate>>> {
    state.sessions.get(&session_id).await?;
    let route = state.ingestor.session_route(&session_id).await?;
    Ok(Json(route))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let ws_path = state.config.ws_path.clone();
    Router::new()
        .route(&ws_path, get(ws_upgrade))
        .route("/health", get(health))
        .route("/sessions/{session_id}/route", get(session_route))
        .with_state(state)
}

/// Bind `config.bind_addr()` and serve until the shutdown token fires.
///
/// # Errors
///
/// Returns `AppError::Io` if the listener cannot be bound or the server
/// fails.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| AppError::Io(format!("failed to bind {addr}: {err}")))?;
    serve_with_listener(listener, state).await
}

/// Serve on an already bound listener until the shutdown token fires.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails.
pub async fn serve_with_listener(listener: TcpListener, state: AppState) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .map_err(|err| AppError::Io(format!("failed to read local address: {err}")))?;
    info!(%local_addr, ws_path = %state.config.ws_path, "http server listening");

    let shutdown = state.shutdown.clone();
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|err| AppError::Io(format!("http server error: {err}")))?;

    info!("http server shut down");
    Ok(())
}
