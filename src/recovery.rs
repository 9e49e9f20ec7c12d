//! Launch-time recovery of an interrupted tracking session.
//!
//! Run once per process launch, before the location adapter starts
//! delivering: by then the old session id has been retired, so the
//! drain here can never race a concurrent append under the same id.

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::db::Database;
use crate::location::LocationTrackingManager;
use crate::stores::RecordStore;
use crate::working::WorkingPolylineManager;

/// What the recovery pass found and did.
#[derive(Debug, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No session was left active; nothing to do.
    NoPendingSession,
    /// A session was flagged active but had no buffered samples; its
    /// stale flags were cleared and no draft was created.
    StaleSessionCleared,
    /// A tracking draft was rebuilt from buffered samples and live
    /// tracking resumed under a fresh session id.
    Resumed {
        restored: usize,
        session_id: String,
    },
}

/// Detect an unfinished tracking session and, if one exists, replay its
/// buffered samples into a freshly-created tracking draft, clear the
/// drained samples, and resume live capture under a new session id.
///
/// Drain-then-clear is not atomic across a crash: if the process dies
/// between the two steps the same samples are redelivered on the next
/// launch. A clear failure after a successful drain is logged and
/// tolerated for the same reason; a drained sample is never silently
/// lost.
pub async fn recover_pending_session<R: RecordStore>(
    tracking: &LocationTrackingManager,
    polylines: &mut WorkingPolylineManager<R>,
    db: &Database,
) -> Result<RecoveryOutcome> {
    let Some(session_id) = tracking.check_for_pending_session() else {
        return Ok(RecoveryOutcome::NoPendingSession);
    };
    info!("found pending tracking session {session_id}");

    let samples = db
        .samples_for_session(&session_id)
        .await
        .context("failed to drain pending samples")?;

    if samples.is_empty() {
        info!("pending session {session_id} has no buffered samples; clearing stale flags");
        tracking.clear_stale_session()?;
        return Ok(RecoveryOutcome::StaleSessionCleared);
    }

    let restored = samples.len();
    polylines.start_tracked_with_origin(samples[0].recorded_at);
    for sample in &samples {
        polylines.append_tracked_coordinate(sample.coordinate);
    }
    info!("rebuilt tracking draft from {restored} buffered sample(s)");

    if let Err(err) = db.clear_session(&session_id).await {
        // The draft already holds the samples; leaving them in the
        // store risks redelivery on the next launch, not loss.
        error!("failed to clear drained session {session_id}: {err:?}");
    }

    // The old id is retired once drained; live capture resumes under a
    // fresh one.
    tracking.start_tracking()?;
    let new_session_id = tracking
        .active_session_id()
        .context("tracking restart left no active session id")?;
    if new_session_id == session_id {
        warn!("resumed session id matches the retired one");
    }

    Ok(RecoveryOutcome::Resumed {
        restored,
        session_id: new_session_id,
    })
}
