//! Keepalive probing on a paused clock with scripted probe senders.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use trackline::ws::keepalive::{KeepaliveExit, KeepaliveSupervisor, ProbeSender};
use trackline::{AppError, Result};

const INTERVAL: Duration = Duration::from_secs(30);
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy)]
enum Behaviour {
    Succeed,
    Fail,
    Hang,
}

struct MockProbe {
    behaviour: Behaviour,
    calls: AtomicU64,
}

impl MockProbe {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicU64::new(0),
        })
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProbeSender for MockProbe {
    fn send_probe(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour;
        Box::pin(async move {
            match behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(AppError::Transport("broken pipe".into())),
                Behaviour::Hang => std::future::pending().await,
            }
        })
    }
}

fn spawn(probe: &Arc<MockProbe>, cancel: &CancellationToken) -> trackline::ws::keepalive::KeepaliveHandle {
    KeepaliveSupervisor::new(
        INTERVAL,
        SEND_TIMEOUT,
        Arc::clone(probe) as Arc<dyn ProbeSender>,
        cancel.clone(),
    )
    .spawn()
}

#[tokio::test(start_paused = true)]
async fn sends_one_probe_per_interval() {
    let probe = MockProbe::new(Behaviour::Succeed);
    let cancel = CancellationToken::new();
    let handle = spawn(&probe, &cancel);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(probe.calls(), 1);

    tokio::time::sleep(Duration::from_secs(64)).await;
    assert_eq!(probe.calls(), 3);

    let exit = handle.shutdown().await;
    assert_eq!(exit, Some(KeepaliveExit::Cancelled { probes_sent: 3 }));
}

#[tokio::test(start_paused = true)]
async fn no_probes_after_cancellation() {
    let probe = MockProbe::new(Behaviour::Succeed);
    let cancel = CancellationToken::new();
    let handle = spawn(&probe, &cancel);

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert_eq!(probe.calls(), 1);

    cancel.cancel();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(probe.calls(), 1);

    let exit = handle.shutdown().await;
    assert_eq!(exit, Some(KeepaliveExit::Cancelled { probes_sent: 1 }));
}

#[tokio::test(start_paused = true)]
async fn failed_probe_cancels_connection() {
    let probe = MockProbe::new(Behaviour::Fail);
    let cancel = CancellationToken::new();
    let handle = spawn(&probe, &cancel);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(cancel.is_cancelled());

    let exit = handle.shutdown().await;
    assert_eq!(exit, Some(KeepaliveExit::ProbeFailed { probes_sent: 0 }));
    assert_eq!(probe.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn hung_probe_times_out_and_cancels() {
    let probe = MockProbe::new(Behaviour::Hang);
    let cancel = CancellationToken::new();
    let handle = spawn(&probe, &cancel);

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert!(!cancel.is_cancelled(), "send deadline not reached yet");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(cancel.is_cancelled());

    let exit = handle.shutdown().await;
    assert_eq!(exit, Some(KeepaliveExit::ProbeFailed { probes_sent: 0 }));
}

#[tokio::test(start_paused = true)]
async fn external_cancel_abandons_in_flight_probe() {
    let probe = MockProbe::new(Behaviour::Hang);
    let cancel = CancellationToken::new();
    let handle = spawn(&probe, &cancel);

    tokio::time::sleep(Duration::from_secs(32)).await;
    assert_eq!(probe.calls(), 1);
    cancel.cancel();

    let exit = handle.shutdown().await;
    assert_eq!(exit, Some(KeepaliveExit::Cancelled { probes_sent: 0 }));
}
