use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A persisted path. `tracked` records whether the points came from a
/// live location session rather than hand drawing; it is fixed at draft
/// creation and carried through finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolylineRecord {
    pub id: String,
    pub title: String,
    pub notes: String,
    pub coordinates: Vec<Coordinate>,
    pub tracked: bool,
    pub created_at: DateTime<Utc>,
    pub edited_at: DateTime<Utc>,
}
