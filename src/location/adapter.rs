use chrono::{DateTime, Utc};

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

impl AuthorizationStatus {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationStatus::Authorized)
    }
}

/// A raw fix delivered by the platform location stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    pub recorded_at: DateTime<Utc>,
}

/// Accuracy knobs for the platform stream. `PASSIVE` is the low-rate
/// profile used to show the user's position; `TRACKING` trades battery
/// for a tight distance filter and keeps delivering while backgrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyProfile {
    pub accuracy_m: f64,
    pub distance_filter_m: f64,
    pub allow_background: bool,
}

impl AccuracyProfile {
    pub const PASSIVE: AccuracyProfile = AccuracyProfile {
        accuracy_m: 100.0,
        distance_filter_m: 50.0,
        allow_background: false,
    };

    pub const TRACKING: AccuracyProfile = AccuracyProfile {
        accuracy_m: 5.0,
        distance_filter_m: 5.0,
        allow_background: true,
    };
}

/// Seam over the platform's live-location service. Implementations push
/// raw samples into whatever channel the host wires to
/// [`LocationTrackingManager::start_sample_loop`]; this trait only covers
/// the control surface.
///
/// [`LocationTrackingManager::start_sample_loop`]:
/// crate::location::LocationTrackingManager::start_sample_loop
pub trait LocationAdapter: Send + Sync {
    fn authorization(&self) -> AuthorizationStatus;

    /// Prompt for authorization if still undetermined; returns the
    /// resulting status either way.
    fn request_authorization(&self) -> AuthorizationStatus;

    fn configure(&self, profile: AccuracyProfile);
    fn start(&self);
    fn stop(&self);

    /// The most recent fix the platform holds, if any.
    fn current_fix(&self) -> Option<LocationSample>;
}
