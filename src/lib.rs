//! Draft lifecycle and crash-safe location tracking core for map
//! sketching apps.
//!
//! The hosting app owns map rendering, gestures, and the persistent
//! record/attachment stores; this crate owns the in-progress feature
//! lifecycle: single-slot working drafts with undo logs, the live
//! tracking session with its durable pending-sample queue, and the
//! launch-time recovery that rebuilds an interrupted tracking draft.

pub mod db;
pub mod error;
pub mod geo;
pub mod location;
pub mod models;
pub mod recovery;
pub mod settings;
pub mod stores;
pub mod utils;
pub mod working;

pub use db::Database;
pub use error::{AttachmentError, AttachmentPurgeError, FinalizeError, ValidationError};
pub use geo::Coordinate;
pub use location::{
    AccuracyProfile, AuthorizationStatus, LocationAdapter, LocationSample,
    LocationTrackingManager,
};
pub use models::{
    AnnotationRecord, Attachment, AttachmentKind, MapFeature, PendingSample, PolylineRecord,
};
pub use recovery::{recover_pending_session, RecoveryOutcome};
pub use settings::{SettingsStore, TrackingSettings};
pub use stores::{AttachmentStore, RecordStore};
pub use working::{WorkingAnnotationManager, WorkingPolylineManager};
