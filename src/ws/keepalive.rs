//! Per-connection liveness probing.
//!
//! A [`KeepaliveSupervisor`] sends a transport ping every
//! `ping_interval`, each bounded by `send_timeout`. A failed or late
//! ping cancels the connection's token so the read loop tears the
//! connection down. Once the token is cancelled, from either side, the
//! task exits without attempting another send; an in-flight ping is
//! abandoned.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, trace, warn, Instrument};

use crate::Result;

/// Capability to emit one liveness probe on a connection.
pub trait ProbeSender: Send + Sync {
    /// Write a single ping control frame.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) if the
    /// write fails.
    fn send_probe(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Why the keepalive task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveExit {
    /// The connection's cancellation token was raised.
    Cancelled {
        /// Probes successfully sent before exit.
        probes_sent: u64,
    },
    /// A probe failed or missed its deadline; the token was raised.
    ProbeFailed {
        /// Probes successfully sent before the failure.
        probes_sent: u64,
    },
}

/// Builder for the keepalive task of one connection.
///
/// Call [`spawn`](Self::spawn) to start the background timer.
pub struct KeepaliveSupervisor {
    ping_interval: Duration,
    send_timeout: Duration,
    probe: Arc<dyn ProbeSender>,
    cancel: CancellationToken,
}

impl KeepaliveSupervisor {
    /// Construct a supervisor (does not start the timer yet).
    #[must_use]
    pub fn new(
        ping_interval: Duration,
        send_timeout: Duration,
        probe: Arc<dyn ProbeSender>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ping_interval,
            send_timeout,
            probe,
            cancel,
        }
    }

    /// Spawn the background probe task.
    #[must_use]
    pub fn spawn(self) -> KeepaliveHandle {
        let cancel = self.cancel.clone();
        let join_handle = tokio::spawn(self.run().instrument(info_span!("keepalive")));
        KeepaliveHandle {
            join_handle: Some(join_handle),
            cancel,
        }
    }

    async fn run(self) -> KeepaliveExit {
        let start = Instant::now() + self.ping_interval;
        let mut ticker = tokio::time::interval_at(start, self.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut probes_sent: u64 = 0;

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!(probes_sent, "keepalive cancelled");
                    return KeepaliveExit::Cancelled { probes_sent };
                }
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    debug!(probes_sent, "keepalive cancelled during probe");
                    return KeepaliveExit::Cancelled { probes_sent };
                }
                outcome = tokio::time::timeout(self.send_timeout, self.probe.send_probe()) => outcome,
            };

            match outcome {
                Ok(Ok(())) => {
                    probes_sent += 1;
                    trace!(probes_sent, "ping sent");
                }
                Ok(Err(err)) => {
                    warn!(%err, "error sending ping; closing connection");
                    self.cancel.cancel();
                    return KeepaliveExit::ProbeFailed { probes_sent };
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.send_timeout.as_secs(),
                        "ping send timed out; closing connection"
                    );
                    self.cancel.cancel();
                    return KeepaliveExit::ProbeFailed { probes_sent };
                }
            }
        }
    }
}

/// Handle returned from [`KeepaliveSupervisor::spawn`].
///
/// Dropping the handle cancels the connection token.
pub struct KeepaliveHandle {
    join_handle: Option<JoinHandle<KeepaliveExit>>,
    cancel: CancellationToken,
}

impl Drop for KeepaliveHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl KeepaliveHandle {
    /// Cancel the task and wait for it to exit.
    ///
    /// Returns `None` if the task panicked or was already joined.
    pub async fn shutdown(mut self) -> Option<KeepaliveExit> {
        self.cancel.cancel();
        let handle = self.join_handle.take()?;
        handle.await.ok()
    }
}
