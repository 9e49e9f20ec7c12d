//! End-to-end recovery flow: a tracking session buffers samples, the
//! process "dies" (every in-memory component is dropped), and a fresh
//! launch rebuilds the tracking draft from the durable queue.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use waymark::location::NoopLeaseProvider;
use waymark::{
    AccuracyProfile, AuthorizationStatus, Coordinate, Database, LocationAdapter,
    LocationSample, LocationTrackingManager, MapFeature, RecordStore, RecoveryOutcome,
    SettingsStore, WorkingPolylineManager,
};

#[derive(Default)]
struct MemoryRecordStore {
    inserted: Mutex<Vec<MapFeature>>,
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, record: &MapFeature) -> Result<()> {
        self.inserted.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn delete(&self, _record: &MapFeature) -> Result<()> {
        Ok(())
    }

    fn save(&self) -> Result<()> {
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        Ok(())
    }
}

struct StubAdapter;

impl LocationAdapter for StubAdapter {
    fn authorization(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn request_authorization(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn configure(&self, _profile: AccuracyProfile) {}
    fn start(&self) {}
    fn stop(&self) {}

    fn current_fix(&self) -> Option<LocationSample> {
        None
    }
}

struct Paths {
    db: PathBuf,
    settings: PathBuf,
}

fn temp_paths() -> Paths {
    let _ = env_logger::builder().is_test(true).try_init();
    let tag = Uuid::new_v4();
    let dir = std::env::temp_dir();
    Paths {
        db: dir.join(format!("waymark-recovery-{tag}.db")),
        settings: dir.join(format!("waymark-recovery-{tag}.json")),
    }
}

fn launch(paths: &Paths) -> (LocationTrackingManager, Database) {
    let db = Database::new(paths.db.clone()).unwrap();
    let settings = Arc::new(SettingsStore::new(paths.settings.clone()).unwrap());
    let manager = LocationTrackingManager::new(
        Arc::new(StubAdapter),
        db.clone(),
        settings,
        Arc::new(NoopLeaseProvider),
    );
    (manager, db)
}

fn fix(lat: f64, lon: f64, secs: i64) -> LocationSample {
    LocationSample {
        coordinate: Coordinate::new(lat, lon),
        recorded_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    }
}

#[tokio::test]
async fn interrupted_session_is_rebuilt_in_timestamp_order() {
    let paths = temp_paths();
    let c1 = Coordinate::new(48.858, 2.294);
    let c2 = Coordinate::new(48.859, 2.295);

    // First launch: record two samples, then drop everything without
    // stopping the session.
    let interrupted_id = {
        let (tracking, _db) = launch(&paths);
        tracking.start_tracking().unwrap();
        tracking
            .handle_sample(fix(c1.latitude, c1.longitude, 1))
            .unwrap()
            .await
            .unwrap();
        tracking
            .handle_sample(fix(c2.latitude, c2.longitude, 2))
            .unwrap()
            .await
            .unwrap();
        tracking.active_session_id().unwrap()
    };

    // Second launch: fresh manager and store handles over the same
    // files.
    let (tracking, db) = launch(&paths);
    let mut polylines = WorkingPolylineManager::new(Arc::new(MemoryRecordStore::default()));

    let outcome = waymark::recover_pending_session(&tracking, &mut polylines, &db)
        .await
        .unwrap();

    let (restored, session_id) = match outcome {
        RecoveryOutcome::Resumed {
            restored,
            session_id,
        } => (restored, session_id),
        other => panic!("expected a resumed session, got {other:?}"),
    };
    assert_eq!(restored, 2);
    assert_ne!(session_id, interrupted_id);

    let working = polylines.working().expect("tracking draft rebuilt");
    assert!(working.tracked);
    assert_eq!(working.coordinates, vec![c1, c2]);

    // The drained samples are gone; the old id is fully retired.
    assert!(db
        .samples_for_session(&interrupted_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(tracking.active_session_id(), Some(session_id));
}

#[tokio::test]
async fn failed_clear_still_resumes_and_leaves_samples_for_redelivery() {
    let paths = temp_paths();

    {
        let (tracking, _db) = launch(&paths);
        tracking.start_tracking().unwrap();
        tracking.handle_sample(fix(1.0, 1.0, 1)).unwrap().await.unwrap();
        tracking.handle_sample(fix(2.0, 2.0, 2)).unwrap().await.unwrap();
    }

    let (tracking, db) = launch(&paths);
    // Read the interrupted id before recovery replaces it.
    let interrupted_id = SettingsStore::new(paths.settings.clone())
        .unwrap()
        .tracking()
        .session_id
        .unwrap();

    // Hold the write lock from a second connection: the drain (a read)
    // succeeds, the clear (a delete) fails.
    let blocker = rusqlite::Connection::open(&paths.db).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let mut polylines = WorkingPolylineManager::new(Arc::new(MemoryRecordStore::default()));
    let outcome = waymark::recover_pending_session(&tracking, &mut polylines, &db)
        .await
        .unwrap();

    // The clear failure is logged and tolerated: the draft is rebuilt
    // and tracking resumes, at the cost of possible redelivery later.
    let restored = match outcome {
        RecoveryOutcome::Resumed { restored, .. } => restored,
        other => panic!("expected a resumed session, got {other:?}"),
    };
    assert_eq!(restored, 2);
    assert_eq!(polylines.working().unwrap().coordinates.len(), 2);

    blocker.execute_batch("ROLLBACK;").unwrap();

    // The uncleared samples are still buffered under the retired id:
    // never silently lost, only redeliverable.
    assert_eq!(db.samples_for_session(&interrupted_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn stale_flags_without_samples_are_cleared() {
    let paths = temp_paths();

    {
        let (tracking, _db) = launch(&paths);
        // Session started but no samples ever arrived before the
        // "crash".
        tracking.start_tracking().unwrap();
    }

    let (tracking, db) = launch(&paths);
    let mut polylines = WorkingPolylineManager::new(Arc::new(MemoryRecordStore::default()));

    let outcome = waymark::recover_pending_session(&tracking, &mut polylines, &db)
        .await
        .unwrap();

    assert_eq!(outcome, RecoveryOutcome::StaleSessionCleared);
    assert!(polylines.working().is_none());
    assert!(tracking.active_session_id().is_none());

    // A third launch sees nothing pending.
    let (tracking, db) = launch(&paths);
    let mut polylines = WorkingPolylineManager::new(Arc::new(MemoryRecordStore::default()));
    let outcome = waymark::recover_pending_session(&tracking, &mut polylines, &db)
        .await
        .unwrap();
    assert_eq!(outcome, RecoveryOutcome::NoPendingSession);
}

#[tokio::test]
async fn clean_shutdown_leaves_nothing_to_recover() {
    let paths = temp_paths();

    {
        let (tracking, _db) = launch(&paths);
        tracking.start_tracking().unwrap();
        tracking
            .handle_sample(fix(1.0, 1.0, 1))
            .unwrap()
            .await
            .unwrap();
        tracking.stop_tracking().unwrap();
    }

    let (tracking, db) = launch(&paths);
    let mut polylines = WorkingPolylineManager::new(Arc::new(MemoryRecordStore::default()));
    let outcome = waymark::recover_pending_session(&tracking, &mut polylines, &db)
        .await
        .unwrap();

    assert_eq!(outcome, RecoveryOutcome::NoPendingSession);
    assert!(polylines.working().is_none());
}
