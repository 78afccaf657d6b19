use std::sync::Arc;

use chrono::{DateTime, Utc};

use trackline::models::location::NewLocationUpdate;
use trackline::models::session::TrackingSession;
use trackline::persistence::location_repo::{haversine_meters, LocationRepo};
use trackline::persistence::session_repo::SessionRepo;
use trackline::persistence::{db, LocationStore, SessionStore};
use trackline::AppError;

async fn repos() -> (SessionRepo, LocationRepo) {
    let pool = Arc::new(db::connect_memory().await.expect("db connect"));
    (
        SessionRepo::new(Arc::clone(&pool)),
        LocationRepo::new(pool),
    )
}

async fn seed_session(sessions: &SessionRepo, session_id: &str, delivery_id: &str) {
    let session = TrackingSession::start(session_id.into(), delivery_id.into(), Utc::now());
    sessions.create(&session).await.expect("create session");
}

fn candidate(session_id: &str, delivery_id: &str, lat: f64, lon: f64, ts_ms: i64) -> NewLocationUpdate {
    NewLocationUpdate {
        session_id: session_id.into(),
        delivery_id: delivery_id.into(),
        latitude: lat,
        longitude: lon,
        accuracy: 5.0,
        speed: None,
        heading: None,
        recorded_at: DateTime::from_timestamp_millis(ts_ms).expect("valid timestamp"),
    }
}

#[tokio::test]
async fn create_assigns_increasing_ids() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    let first = locations
        .create(&candidate("s1", "d1", 10.0, 20.0, 1000))
        .await
        .expect("first insert");
    let second = locations
        .create(&candidate("s1", "d1", 10.1, 20.1, 2000))
        .await
        .expect("second insert");

    assert!(second.id > first.id);
    assert_eq!(first.session_id, "s1");
    assert_eq!(first.delivery_id, "d1");
    assert_eq!(first.recorded_at.timestamp_millis(), 1000);
}

#[tokio::test]
async fn optional_fields_round_trip() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    let mut with_motion = candidate("s1", "d1", 1.0, 2.0, 1000);
    with_motion.speed = Some(0.0);
    with_motion.heading = Some(270.0);
    locations.create(&with_motion).await.expect("insert");

    let stored = locations
        .get_latest_by_session_id("s1")
        .await
        .expect("query")
        .expect("row present");
    assert_eq!(stored.speed, Some(0.0));
    assert_eq!(stored.heading, Some(270.0));
}

#[tokio::test]
async fn session_route_is_ordered_by_recorded_at() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    for ts in [3000, 1000, 2000] {
        locations
            .create(&candidate("s1", "d1", 10.0, 20.0, ts))
            .await
            .expect("insert");
    }

    let route = locations.get_by_session_id("s1").await.expect("query");
    let stamps: Vec<i64> = route
        .iter()
        .map(|loc| loc.recorded_at.timestamp_millis())
        .collect();
    assert_eq!(stamps, vec![1000, 2000, 3000]);
}

#[tokio::test]
async fn delivery_query_spans_sessions() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;
    seed_session(&sessions, "s2", "d1").await;
    seed_session(&sessions, "s3", "d2").await;

    locations.create(&candidate("s1", "d1", 0.0, 0.0, 1000)).await.expect("insert");
    locations.create(&candidate("s2", "d1", 0.0, 0.0, 2000)).await.expect("insert");
    locations.create(&candidate("s3", "d2", 0.0, 0.0, 3000)).await.expect("insert");

    let d1 = locations.get_by_delivery_id("d1").await.expect("query");
    assert_eq!(d1.len(), 2);
    assert_eq!(d1[0].session_id, "s1");
    assert_eq!(d1[1].session_id, "s2");
}

#[tokio::test]
async fn latest_is_none_for_empty_session() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    let latest = locations.get_latest_by_session_id("s1").await.expect("query");
    assert!(latest.is_none());
}

#[tokio::test]
async fn latest_returns_newest_sample() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    locations.create(&candidate("s1", "d1", 1.0, 1.0, 5000)).await.expect("insert");
    locations.create(&candidate("s1", "d1", 2.0, 2.0, 4000)).await.expect("insert");

    let latest = locations
        .get_latest_by_session_id("s1")
        .await
        .expect("query")
        .expect("row present");
    assert_eq!(latest.recorded_at.timestamp_millis(), 5000);
}

#[tokio::test]
async fn within_radius_filters_by_great_circle_distance() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    // Roughly 111 m and 1.1 km north of the origin.
    locations.create(&candidate("s1", "d1", 0.001, 0.0, 1000)).await.expect("insert");
    locations.create(&candidate("s1", "d1", 0.01, 0.0, 2000)).await.expect("insert");
    locations.create(&candidate("s1", "d1", 45.0, 45.0, 3000)).await.expect("insert");

    let near = locations.get_within_radius(0.0, 0.0, 500.0).await.expect("query");
    assert_eq!(near.len(), 1);
    assert_eq!(near[0].recorded_at.timestamp_millis(), 1000);

    let wider = locations.get_within_radius(0.0, 0.0, 2000.0).await.expect("query");
    assert_eq!(wider.len(), 2);
}

#[tokio::test]
async fn within_radius_crosses_antimeridian() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    locations.create(&candidate("s1", "d1", 0.0, -179.999, 1000)).await.expect("insert");

    let found = locations.get_within_radius(0.0, 179.999, 1000.0).await.expect("query");
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn negative_radius_matches_nothing() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;
    locations.create(&candidate("s1", "d1", 0.0, 0.0, 1000)).await.expect("insert");

    let found = locations.get_within_radius(0.0, 0.0, -1.0).await.expect("query");
    assert!(found.is_empty());
}

#[tokio::test]
async fn created_row_matches_stored_row() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;

    let created = locations
        .create(&candidate("s1", "d1", 10.0, 20.0, 1000))
        .await
        .expect("insert");
    let route = locations.get_by_session_id("s1").await.expect("query");
    assert_eq!(route, vec![created]);
}

#[tokio::test]
async fn sample_for_unknown_session_is_not_found() {
    let (_sessions, locations) = repos().await;
    let err = locations
        .create(&candidate("ghost", "d1", 0.0, 0.0, 1000))
        .await
        .expect_err("no session");
    assert!(matches!(err, AppError::SessionNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn sample_for_stopped_session_is_inactive() {
    let (sessions, locations) = repos().await;
    seed_session(&sessions, "s1", "d1").await;
    assert!(sessions.stop("s1", Utc::now()).await.expect("stop"));

    let err = locations
        .create(&candidate("s1", "d1", 0.0, 0.0, 1000))
        .await
        .expect_err("stopped");
    assert!(matches!(err, AppError::SessionInactive(id) if id == "s1"));
    assert!(locations.get_by_session_id("s1").await.expect("query").is_empty());
}

#[test]
fn haversine_matches_known_distance() {
    // London to Paris, about 343.5 km.
    let meters = haversine_meters(51.5074, -0.1278, 48.8566, 2.3522);
    assert!((meters - 343_500.0).abs() < 1_500.0, "{meters}");
}
