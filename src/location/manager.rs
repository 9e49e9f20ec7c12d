use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::Database;
use crate::geo::Coordinate;
use crate::models::PendingSample;
use crate::settings::{SettingsStore, TrackingSettings};
use crate::{log_info, log_warn};

use super::adapter::{AccuracyProfile, AuthorizationStatus, LocationAdapter, LocationSample};
use super::lease::LeaseProvider;

// Per-sample logging for the delivery path; flip off if a tight distance
// filter makes this too chatty.
const ENABLE_LOGS: bool = true;

#[derive(Default)]
struct TrackingState {
    passive_active: bool,
    session_id: Option<String>,
    last_known: Option<LocationSample>,
}

struct SamplePump {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

/// Owns the live tracking session: switches the platform adapter between
/// the passive and tracking profiles, tags each accepted sample with the
/// session id on its way into the durable store, and persists the
/// continuity flags a relaunch needs to detect an unfinished session.
///
/// Passive ("show me") mode and active tracking are independent toggles;
/// while tracking, the high-rate profile supersedes the passive one.
#[derive(Clone)]
pub struct LocationTrackingManager {
    adapter: Arc<dyn LocationAdapter>,
    db: Database,
    settings: Arc<SettingsStore>,
    leases: Arc<dyn LeaseProvider>,
    state: Arc<Mutex<TrackingState>>,
    pump: Arc<Mutex<Option<SamplePump>>>,
}

impl LocationTrackingManager {
    pub fn new(
        adapter: Arc<dyn LocationAdapter>,
        db: Database,
        settings: Arc<SettingsStore>,
        leases: Arc<dyn LeaseProvider>,
    ) -> Self {
        Self {
            adapter,
            db,
            settings,
            leases,
            state: Arc::new(Mutex::new(TrackingState::default())),
            pump: Arc::new(Mutex::new(None)),
        }
    }

    /// Request authorization and, on grant, start the low-rate passive
    /// stream. The passive flag is persisted so a later launch can
    /// restore it without re-prompting. Returns whether passive updates
    /// are now on.
    pub fn show_user_location(&self) -> Result<bool> {
        let status = match self.adapter.authorization() {
            AuthorizationStatus::NotDetermined => self.adapter.request_authorization(),
            status => status,
        };

        if !status.is_authorized() {
            info!("location authorization {status:?}; passive updates stay off");
            self.state.lock().unwrap().passive_active = false;
            self.settings.set_show_user_location(false)?;
            return Ok(false);
        }

        let tracking = {
            let mut state = self.state.lock().unwrap();
            state.passive_active = true;
            state.session_id.is_some()
        };
        // An active session already runs the high-rate background
        // profile, which supersedes passive updates; only record the
        // flag in that case and leave the adapter alone.
        if !tracking {
            self.adapter.configure(AccuracyProfile::PASSIVE);
            self.adapter.start();
        }
        self.settings.set_show_user_location(true)?;
        Ok(true)
    }

    pub fn hide_user_location(&self) -> Result<()> {
        let tracking = self.state.lock().unwrap().session_id.is_some();
        if !tracking {
            self.adapter.stop();
        }
        self.state.lock().unwrap().passive_active = false;
        self.settings.set_show_user_location(false)
    }

    /// Begin a new tracking session: fresh session id, high-rate
    /// background-capable profile, continuity flags persisted before any
    /// sample arrives. Returns the best currently-known coordinate (live
    /// fix, else last cached fix, else none).
    pub fn start_tracking(&self) -> Result<Option<Coordinate>> {
        let session_id = Uuid::new_v4().to_string();

        self.settings
            .update_tracking(TrackingSettings {
                active: true,
                session_id: Some(session_id.clone()),
            })
            .context("failed to persist tracking session flags")?;

        self.adapter.configure(AccuracyProfile::TRACKING);
        self.adapter.start();

        let mut state = self.state.lock().unwrap();
        state.session_id = Some(session_id.clone());
        info!("started tracking session {session_id}");

        let best = self.adapter.current_fix().or(state.last_known);
        Ok(best.map(|sample| sample.coordinate))
    }

    /// End the active session: clear the persisted and in-memory flags
    /// and drop back to the passive profile, or stop updates entirely if
    /// passive mode is off.
    pub fn stop_tracking(&self) -> Result<()> {
        let passive_active = {
            let mut state = self.state.lock().unwrap();
            if let Some(session_id) = state.session_id.take() {
                info!("stopped tracking session {session_id}");
            }
            state.passive_active
        };

        self.settings
            .clear_tracking()
            .context("failed to clear tracking session flags")?;

        if passive_active {
            self.adapter.configure(AccuracyProfile::PASSIVE);
            self.adapter.start();
        } else {
            self.adapter.stop();
        }
        Ok(())
    }

    /// One sample off the adapter stream. Updates the last-known fix;
    /// when a session is active the sample is written through to the
    /// durable store, fire-and-forget, under a background-execution
    /// lease held until the write completes. Write failures are logged
    /// and the sample is dropped rather than blocking or crashing the
    /// delivery path.
    ///
    /// The returned handle is the in-flight write, for callers that want
    /// to observe completion; the delivery path ignores it.
    pub fn handle_sample(&self, sample: LocationSample) -> Option<JoinHandle<()>> {
        let session_id = {
            let mut state = self.state.lock().unwrap();
            state.last_known = Some(sample);
            state.session_id.clone()
        }?;

        let pending = PendingSample {
            session_id,
            coordinate: sample.coordinate,
            recorded_at: sample.recorded_at,
        };

        let db = self.db.clone();
        let lease = self.leases.acquire("pending-sample-write");

        Some(tokio::spawn(async move {
            if let Err(err) = db.insert_sample(&pending).await {
                log_warn!(
                    "dropping location sample for session {}: {err:?}",
                    pending.session_id
                );
            }
            drop(lease);
        }))
    }

    /// Read the persisted continuity flags; if a session was left
    /// active, restore the in-memory session id and return it so the
    /// recovery coordinator can decide what to do. Does not touch the
    /// adapter.
    pub fn check_for_pending_session(&self) -> Option<String> {
        let tracking = self.settings.tracking();
        if !tracking.active {
            return None;
        }
        let session_id = tracking.session_id?;
        self.state.lock().unwrap().session_id = Some(session_id.clone());
        Some(session_id)
    }

    /// Drop a pending session that turned out to have no buffered
    /// samples: clear both the persisted and in-memory flags.
    pub fn clear_stale_session(&self) -> Result<()> {
        self.state.lock().unwrap().session_id = None;
        self.settings
            .clear_tracking()
            .context("failed to clear stale session flags")
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.state.lock().unwrap().session_id.clone()
    }

    pub fn last_known_location(&self) -> Option<LocationSample> {
        self.state.lock().unwrap().last_known
    }

    /// Spawn the pump that feeds adapter samples into `handle_sample`
    /// until the channel closes or `shutdown` is called.
    pub fn start_sample_loop(&self, rx: mpsc::Receiver<LocationSample>) -> Result<()> {
        let mut guard = self.pump.lock().unwrap();
        if guard.is_some() {
            bail!("sample loop already running");
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(sample_loop(self.clone(), rx, token.clone()));
        *guard = Some(SamplePump { handle, token });
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        let pump = self.pump.lock().unwrap().take();
        if let Some(pump) = pump {
            pump.token.cancel();
            pump.handle
                .await
                .context("sample loop task failed to join")?;
        }
        Ok(())
    }
}

async fn sample_loop(
    manager: LocationTrackingManager,
    mut rx: mpsc::Receiver<LocationSample>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log_info!("sample loop shutting down");
                break;
            }
            sample = rx.recv() => match sample {
                Some(sample) => {
                    manager.handle_sample(sample);
                }
                None => {
                    log_info!("location adapter channel closed; sample loop exiting");
                    break;
                }
            }
        }
    }
}
