use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentKind {
    Image,
    Video,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "Image",
            AttachmentKind::Video => "Video",
        }
    }
}

/// Opaque reference to a stored photo or video. The bytes live in the
/// external attachment store; whichever feature holds the reference owns
/// it and must cascade-delete it when the feature is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub kind: AttachmentKind,
    pub created_at: DateTime<Utc>,
}

/// A persisted point marker. Created only by finalizing a working
/// annotation; edited in place afterwards with an explicit save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub id: String,
    pub title: String,
    pub notes: String,
    pub coordinate: Coordinate,
    pub created_at: DateTime<Utc>,
    pub edited_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
}
