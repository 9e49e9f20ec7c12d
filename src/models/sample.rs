use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A location fix buffered to durable storage during a tracking session.
/// Append-only: samples are never mutated, only inserted or bulk-deleted
/// by session id once consumed into a working polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSample {
    pub session_id: String,
    pub coordinate: Coordinate,
    pub recorded_at: DateTime<Utc>,
}
