use thiserror::Error;

/// Draft validation failures surfaced by `finalize`.
///
/// Always returned synchronously and never retried; callers map these to
/// short user-facing messages, distinct from resource failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the marker has no coordinate yet")]
    NoCoordinate,
    #[error("the title must not be empty")]
    EmptyTitle,
    #[error("a path needs at least {required} points, have {have}")]
    TooFewCoordinates { required: usize, have: usize },
}

/// Failure kinds reported by the external attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("attachment file not found")]
    NotFound,
    #[error("failed to write attachment: {0}")]
    WriteFailed(String),
    #[error("failed to compress attachment: {0}")]
    CompressionFailed(String),
}

/// Result of a best-effort attachment purge that hit non-recoverable
/// failures. `NotFound` is swallowed during the purge and never appears
/// here; everything else is accumulated per attachment while the purge
/// continues with the rest.
#[derive(Debug, Error)]
#[error("failed to delete {} attachment(s)", failures.len())]
pub struct AttachmentPurgeError {
    pub failures: Vec<(String, AttachmentError)>,
}

/// Errors from converting a working draft into a persisted record.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to persist record")]
    Store(#[source] anyhow::Error),
}

impl FinalizeError {
    /// True when the failure is user-correctable rather than a storage
    /// fault, so callers can pick the right notification style.
    pub fn is_validation(&self) -> bool {
        matches!(self, FinalizeError::Validation(_))
    }
}
