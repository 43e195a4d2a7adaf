//! End-to-end session tests: sample stream in, persisted journey out.
//!
//! Uses a paused tokio clock so the 1 s duration tick and 5 s persistence
//! tick run deterministically, and temp-file SQLite databases so the
//! stop-ordering guarantee can be checked through a second connection.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use tempfile::TempDir;

use journeyrs::{
    EngineConfig, EngineError, FeelingLevel, JourneySession, JourneyStore, LocationAuthorization,
    PlaceNameProvider, RawSample,
};

// ~1 m of latitude in degrees.
const LAT_METER: f64 = 1.0 / 111_320.0;

fn raw(lat: f64, lon: f64, accuracy: f64, at: DateTime<Utc>) -> RawSample {
    RawSample {
        lat,
        lon,
        altitude: 170.0,
        horizontal_accuracy: accuracy,
        vertical_accuracy: 8.0,
        timestamp: at,
    }
}

fn temp_db() -> (TempDir, String) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir
        .path()
        .join("journeys.db")
        .to_str()
        .expect("non-utf8 temp path")
        .to_string();
    (dir, path)
}

async fn step_one_second(session: &JourneySession, sample: Option<RawSample>) {
    if let Some(s) = sample {
        session.submit_sample(s).unwrap();
    }
    tokio::time::advance(Duration::from_secs(1)).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

struct StubProvider {
    name: String,
    calls: Arc<AtomicU32>,
}

impl PlaceNameProvider for StubProvider {
    fn resolve(&self, _lat: f64, _lon: f64) -> BoxFuture<'static, Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = self.name.clone();
        async move { Some(name) }.boxed()
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_minute_session_end_to_end() {
    let (_dir, db_path) = temp_db();
    let session = JourneySession::start(
        EngineConfig::default(),
        &db_path,
        LocationAuthorization::Authorized,
    )
    .unwrap();

    let t0 = Utc::now();
    let step = 1.4 * LAT_METER;
    for i in 0..180i64 {
        let sample = raw(
            48.2 + step * i as f64,
            16.37,
            10.0,
            t0 + ChronoDuration::seconds(i),
        );
        step_one_second(&session, Some(sample)).await;
    }

    let journey = session.stop().await.unwrap();
    assert!(journey.is_completed());
    assert!(journey.end_time.is_some());

    let distance = journey.distance_meters;
    assert!(
        (distance - 252.0).abs() / 252.0 < 0.05,
        "distance {} outside 5% of 252 m",
        distance
    );
    let duration = journey.duration_seconds;
    assert!(
        (178..=182).contains(&duration),
        "duration {} not ~180 s",
        duration
    );
    // ~11:54 min/km at 1.4 m/s.
    let pace = duration as f64 / 60.0 / (distance / 1000.0);
    assert!((pace - 11.9).abs() / 11.9 < 0.05, "pace {} off", pace);
    assert_eq!(journey.path.len(), 180);
    assert!(journey.hesitations.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_ordering_guarantee() {
    let (_dir, db_path) = temp_db();
    let session = JourneySession::start(
        EngineConfig::default(),
        &db_path,
        LocationAuthorization::Authorized,
    )
    .unwrap();
    let journey_id = session.journey_id().to_string();

    let t0 = Utc::now();
    for i in 0..20i64 {
        let sample = raw(
            48.2 + 1.4 * LAT_METER * i as f64,
            16.37,
            10.0,
            t0 + ChronoDuration::seconds(i),
        );
        step_one_second(&session, Some(sample)).await;
    }
    session.record_feeling(FeelingLevel::Okay).unwrap();
    session.stop().await.unwrap();

    // The final write completed before stop() returned: a fresh connection
    // must see the completed record immediately.
    let store = JourneyStore::open(&db_path).unwrap();
    let stored = store.load_journey(&journey_id).unwrap().unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.path.len(), 20);
    assert_eq!(stored.checkpoints.len(), 1);
    assert!(stored.sync.needs_sync);
    assert!(!stored.sync.is_synced);
}

#[tokio::test(start_paused = true)]
async fn test_persisted_shape_matches_session() {
    let (_dir, db_path) = temp_db();
    let session = JourneySession::start(
        EngineConfig::default(),
        &db_path,
        LocationAuthorization::Authorized,
    )
    .unwrap();
    let journey_id = session.journey_id().to_string();

    let t0 = Utc::now();
    // Dwell in place for 30 s: one hesitation event.
    for i in 0..30i64 {
        let sample = raw(48.2, 16.37, 10.0, t0 + ChronoDuration::seconds(i));
        step_one_second(&session, Some(sample)).await;
        if i == 10 {
            session.record_feeling(FeelingLevel::Good).unwrap();
        }
        if i == 20 {
            session.record_feeling(FeelingLevel::Anxious).unwrap();
        }
    }

    let journey = session.stop().await.unwrap();
    assert_eq!(journey.hesitations.len(), 1);
    assert!(journey.hesitations[0].duration_seconds >= 15);
    assert_eq!(journey.checkpoints.len(), 2);

    let store = JourneyStore::open(&db_path).unwrap();
    let stored = store.load_journey(&journey_id).unwrap().unwrap();
    assert_eq!(stored.path.len(), journey.path.len());
    assert_eq!(stored.checkpoints.len(), 2);
    assert_eq!(stored.hesitations.len(), 1);

    // Anxious checkpoint cuts the safe area to the prefix before it.
    let safe = store.safe_area_points(&journey_id).unwrap();
    let cutoff = stored.checkpoints[1].timestamp;
    assert!(safe.iter().all(|p| p.timestamp < cutoff));
    assert!(safe.len() < stored.path.len());
}

#[tokio::test(start_paused = true)]
async fn test_low_accuracy_sample_never_surfaces() {
    let (_dir, db_path) = temp_db();
    let session = JourneySession::start(
        EngineConfig::default(),
        &db_path,
        LocationAuthorization::Authorized,
    )
    .unwrap();
    let journey_id = session.journey_id().to_string();

    let t0 = Utc::now();
    for i in 0..10i64 {
        let sample = raw(
            48.2 + 1.4 * LAT_METER * i as f64,
            16.37,
            10.0,
            t0 + ChronoDuration::seconds(i),
        );
        step_one_second(&session, Some(sample)).await;
    }
    // A wildly wrong position with accuracy 75 must be ignored entirely.
    let bogus = raw(49.0, 17.0, 75.0, t0 + ChronoDuration::seconds(10));
    step_one_second(&session, Some(bogus)).await;

    let journey = session.stop().await.unwrap();
    assert_eq!(journey.path.len(), 10);
    // Accepting the bogus point would have added ~100 km.
    assert!(journey.distance_meters < 100.0);

    let stored = JourneyStore::open(&db_path)
        .unwrap()
        .load_journey(&journey_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.path.len(), 10);
    assert!(stored.hesitations.iter().all(|h| h.anchor_lat < 48.5));
}

#[tokio::test(start_paused = true)]
async fn test_place_name_lookup_is_rate_limited_best_effort() {
    let (_dir, db_path) = temp_db();
    let calls = Arc::new(AtomicU32::new(0));
    let provider = Arc::new(StubProvider {
        name: "Stadtpark, Wien".into(),
        calls: calls.clone(),
    });
    let session = JourneySession::start_with_provider(
        EngineConfig::default(),
        &db_path,
        LocationAuthorization::Authorized,
        Some(provider),
    )
    .unwrap();

    let t0 = Utc::now();
    for i in 0..30i64 {
        let sample = raw(
            48.2 + 1.4 * LAT_METER * i as f64,
            16.37,
            10.0,
            t0 + ChronoDuration::seconds(i),
        );
        step_one_second(&session, Some(sample)).await;
    }

    let journey = session.stop().await.unwrap();
    assert_eq!(journey.place_name.as_deref(), Some("Stadtpark, Wien"));

    // Hints fire every 5th sample but the 10 s minimum interval holds:
    // 30 samples allow at most 4 lookups.
    let n = calls.load(Ordering::SeqCst);
    assert!((1..=4).contains(&n), "{} lookups", n);
}

#[tokio::test(start_paused = true)]
async fn test_status_stream_updates() {
    let (_dir, db_path) = temp_db();
    let session = JourneySession::start(
        EngineConfig::default(),
        &db_path,
        LocationAuthorization::Authorized,
    )
    .unwrap();
    let status_rx = session.status();
    assert!(status_rx.borrow().tracking);
    assert_eq!(status_rx.borrow().duration_seconds, 0);

    let t0 = Utc::now();
    for i in 0..10i64 {
        let sample = raw(
            48.2 + 1.4 * LAT_METER * i as f64,
            16.37,
            10.0,
            t0 + ChronoDuration::seconds(i),
        );
        step_one_second(&session, Some(sample)).await;
    }

    {
        let status = status_rx.borrow();
        assert!(status.tracking);
        assert!((9..=11).contains(&status.duration_seconds));
        assert!(status.distance_meters > 0.0);
        assert!(status.last_lat.is_some());
        assert!(!status.duration_text.is_empty());
    }

    session.stop().await.unwrap();
    assert!(!status_rx.borrow().tracking);
}

#[tokio::test]
async fn test_denied_authorization_refuses_start() {
    let (_dir, db_path) = temp_db();
    for auth in [
        LocationAuthorization::Denied,
        LocationAuthorization::Restricted,
        LocationAuthorization::NotDetermined,
    ] {
        let result = JourneySession::start(EngineConfig::default(), &db_path, auth);
        assert!(matches!(result, Err(EngineError::AuthorizationDenied)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_duration_advances_during_signal_gap() {
    let (_dir, db_path) = temp_db();
    let session = JourneySession::start(
        EngineConfig::default(),
        &db_path,
        LocationAuthorization::Authorized,
    )
    .unwrap();

    let t0 = Utc::now();
    step_one_second(&session, Some(raw(48.2, 16.37, 10.0, t0))).await;
    // 30 s without any sample: the displayed duration keeps climbing.
    for _ in 0..30 {
        step_one_second(&session, None).await;
    }

    let journey = session.stop().await.unwrap();
    assert!(journey.duration_seconds >= 30);
    assert_eq!(journey.path.len(), 1);
}
