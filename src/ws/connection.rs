//! One client connection from upgrade through close.
//!
//! The read loop and the keepalive task share the send half of the
//! socket and a single [`CancellationToken`]. Frames are handled one at a
//! time in arrival order. Downstream errors are reported to the client as
//! `{"error": ...}` frames and never end the connection; only transport
//! failure, read timeout, keepalive failure, a close frame, or server
//! shutdown do.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use super::dispatch::Dispatcher;
use super::keepalive::{KeepaliveSupervisor, ProbeSender};
use super::server::AppState;
use super::ErrorFrame;
use crate::{AppError, Result};

/// Lifecycle of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgrade in progress.
    Connecting,
    /// Serving frames.
    Open,
    /// Tearing down: token raised, keepalive being joined.
    Closing,
    /// Transport closed; terminal.
    Closed,
}

/// Why a connection left the `Open` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a close frame.
    ClientClosed,
    /// The stream ended without a close frame.
    StreamEnded,
    /// No frame arrived within the read timeout.
    ReadTimeout,
    /// Reading a frame failed.
    ReadFailed(String),
    /// Writing an error frame failed.
    SendFailed(String),
    /// The connection token was cancelled by keepalive or server shutdown.
    Cancelled,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientClosed => write!(f, "client closed"),
            Self::StreamEnded => write!(f, "stream ended"),
            Self::ReadTimeout => write!(f, "read timeout"),
            Self::ReadFailed(err) => write!(f, "read failed: {err}"),
            Self::SendFailed(err) => write!(f, "send failed: {err}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Send half of a connection, shared with the keepalive task.
pub struct WsSender {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSender {
    fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Report `err` to the client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the frame cannot be written.
    pub async fn send_error(&self, err: &AppError) -> Result<()> {
        let body = serde_json::to_string(&ErrorFrame::new(err.client_message()))
            .map_err(|err| AppError::Transport(format!("failed to encode error frame: {err}")))?;
        self.sink
            .lock()
            .await
            .send(Message::Text(body.into()))
            .await?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(err) = self.sink.lock().await.close().await {
            debug!(%err, "error closing websocket transport");
        }
    }
}

impl ProbeSender for WsSender {
    fn send_probe(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.sink
                .lock()
                .await
                .send(Message::Ping(Bytes::new()))
                .await?;
            Ok(())
        })
    }
}

struct ConnectionSupervisor {
    state: ConnectionState,
    dispatcher: Dispatcher,
    sender: Arc<WsSender>,
    cancel: CancellationToken,
    read_timeout: Duration,
}

impl ConnectionSupervisor {
    fn transition(&mut self, next: ConnectionState) {
        debug!(from = ?self.state, to = ?next, "connection state change");
        self.state = next;
    }

    async fn read_loop(&mut self, mut stream: SplitStream<WebSocket>) -> CloseReason {
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return CloseReason::Cancelled,
                next = tokio::time::timeout(self.read_timeout, stream.next()) => next,
            };

            let frame = match next {
                Err(_) => return CloseReason::ReadTimeout,
                Ok(None) => return CloseReason::StreamEnded,
                Ok(Some(Err(err))) => return CloseReason::ReadFailed(err.to_string()),
                Ok(Some(Ok(frame))) => frame,
            };

            let outcome = match frame {
                Message::Text(text) => self.dispatcher.handle_text(text.as_str()).await,
                Message::Binary(data) => match std::str::from_utf8(&data) {
                    Ok(text) => self.dispatcher.handle_text(text).await,
                    Err(_) => Err(AppError::MalformedPayload(format!(
                        "binary frame of {} bytes is not valid UTF-8",
                        data.len()
                    ))),
                },
                Message::Ping(_) => {
                    trace!("ping received");
                    Ok(())
                }
                Message::Pong(_) => {
                    trace!("pong received");
                    Ok(())
                }
                Message::Close(_) => return CloseReason::ClientClosed,
            };

            if let Err(err) = outcome {
                if let Err(send_err) = self.report(&err).await {
                    return CloseReason::SendFailed(send_err.to_string());
                }
            }
        }
    }

    async fn report(&self, err: &AppError) -> Result<()> {
        match err {
            AppError::Persistence(_) => error!(%err, "frame rejected"),
            _ => warn!(%err, "frame rejected"),
        }
        self.sender.send_error(err).await
    }
}

/// Serve one upgraded WebSocket until it closes.
pub async fn serve_connection(socket: WebSocket, state: AppState, remote_addr: SocketAddr) {
    let connection_id = Uuid::new_v4();
    let span = info_span!("ws_connection", %connection_id, %remote_addr);
    run(socket, state).instrument(span).await;
}

async fn run(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let keepalive = &state.config.keepalive;
    let sender = Arc::new(WsSender::new(sink));
    let cancel = state.shutdown.child_token();

    let mut supervisor = ConnectionSupervisor {
        state: ConnectionState::Connecting,
        dispatcher: state.dispatcher(),
        sender: Arc::clone(&sender),
        cancel: cancel.clone(),
        read_timeout: keepalive.read_timeout(),
    };
    supervisor.transition(ConnectionState::Open);
    info!("client connected");

    let keepalive_handle = KeepaliveSupervisor::new(
        keepalive.ping_interval(),
        keepalive.ping_send_timeout(),
        Arc::clone(&sender) as Arc<dyn ProbeSender>,
        cancel.clone(),
    )
    .spawn();

    let reason = supervisor.read_loop(stream).await;

    supervisor.transition(ConnectionState::Closing);
    cancel.cancel();
    if let Some(exit) = keepalive_handle.shutdown().await {
        debug!(?exit, "keepalive stopped");
    }
    sender.close().await;
    supervisor.transition(ConnectionState::Closed);

    info!(%reason, "client disconnected");
}
