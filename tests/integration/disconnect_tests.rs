//! Connection teardown: read timeout, keepalive pings, client close, and
//! server shutdown.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use trackline::config::KeepaliveConfig;

use super::test_helpers::{
    connect, expect_closed, send_text, spawn_server, spawn_server_with, start_frame, sync,
    test_config, FRAME_TIMEOUT,
};

fn fast_keepalive() -> trackline::GlobalConfig {
    let mut config = test_config();
    config.keepalive = KeepaliveConfig {
        ping_interval_seconds: 1,
        ping_send_timeout_seconds: 1,
        read_timeout_seconds: 2,
    };
    config
}

#[tokio::test]
async fn server_pings_open_connections() {
    let server = spawn_server_with(fast_keepalive()).await;
    let mut client = connect(&server).await;

    let frame = tokio::time::timeout(FRAME_TIMEOUT, client.next())
        .await
        .expect("ping within timeout")
        .expect("stream open")
        .expect("frame read");
    assert!(matches!(frame, Message::Ping(_)), "{frame:?}");

    server.shutdown().await;
}

#[tokio::test]
async fn silent_client_is_dropped_after_read_timeout() {
    let server = spawn_server_with(fast_keepalive()).await;
    let mut client = connect(&server).await;

    // Not polling the client means pings are never answered.
    tokio::time::sleep(Duration::from_secs(3)).await;
    expect_closed(&mut client, FRAME_TIMEOUT).await;

    server.shutdown().await;
}

#[tokio::test]
async fn responsive_client_outlives_read_timeout() {
    let server = spawn_server_with(fast_keepalive()).await;
    let mut client = connect(&server).await;

    // Reading lets the client answer every ping with a pong.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(4);
    while tokio::time::Instant::now() < deadline {
        let remaining = deadline - tokio::time::Instant::now();
        if let Ok(frame) = tokio::time::timeout(remaining, client.next()).await {
            let frame = frame.expect("stream open").expect("frame read");
            assert!(matches!(frame, Message::Ping(_)), "{frame:?}");
        }
    }

    send_text(&mut client, &start_frame("s1", "d1")).await;
    sync(&mut client).await;

    server.shutdown().await;
}

#[tokio::test]
async fn client_close_ends_connection_and_server_keeps_serving() {
    let server = spawn_server().await;

    let mut first = connect(&server).await;
    first.send(Message::Close(None)).await.expect("close sent");
    expect_closed(&mut first, FRAME_TIMEOUT).await;

    let mut second = connect(&server).await;
    send_text(&mut second, &start_frame("s2", "d2")).await;
    sync(&mut second).await;

    server.shutdown().await;
}

#[tokio::test]
async fn server_shutdown_closes_open_connections() {
    let server = spawn_server().await;
    let mut client = connect(&server).await;
    send_text(&mut client, &start_frame("s1", "d1")).await;
    sync(&mut client).await;

    server.state.shutdown.cancel();
    expect_closed(&mut client, FRAME_TIMEOUT).await;

    server.shutdown().await;
}
