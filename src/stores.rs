use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::error::AttachmentError;
use crate::models::{Attachment, AttachmentKind, MapFeature};

/// Contract for the persistent record store. The core only creates,
/// updates, and deletes records; querying persisted features for display
/// is the host's concern.
///
/// `save` commits staged changes; `rollback` discards unsaved edits made
/// directly on persisted records.
pub trait RecordStore {
    fn insert(&self, record: &MapFeature) -> Result<()>;
    fn delete(&self, record: &MapFeature) -> Result<()>;
    fn save(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}

/// Contract for the external attachment byte store. The core tracks
/// `Attachment` references only; actual media bytes never pass through
/// the working managers beyond the initial handoff.
pub trait AttachmentStore {
    fn store(&self, kind: AttachmentKind, data: Vec<u8>) -> Result<Attachment, AttachmentError>;
    fn delete(&self, attachment: &Attachment) -> Result<(), AttachmentError>;
    fn resolve_url(&self, attachment: &Attachment) -> Result<PathBuf, AttachmentError>;
    fn exists(&self, attachment: &Attachment) -> bool;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn insert(&self, record: &MapFeature) -> Result<()> {
        (**self).insert(record)
    }

    fn delete(&self, record: &MapFeature) -> Result<()> {
        (**self).delete(record)
    }

    fn save(&self) -> Result<()> {
        (**self).save()
    }

    fn rollback(&self) -> Result<()> {
        (**self).rollback()
    }
}

impl<S: AttachmentStore + ?Sized> AttachmentStore for Arc<S> {
    fn store(&self, kind: AttachmentKind, data: Vec<u8>) -> Result<Attachment, AttachmentError> {
        (**self).store(kind, data)
    }

    fn delete(&self, attachment: &Attachment) -> Result<(), AttachmentError> {
        (**self).delete(attachment)
    }

    fn resolve_url(&self, attachment: &Attachment) -> Result<PathBuf, AttachmentError> {
        (**self).resolve_url(attachment)
    }

    fn exists(&self, attachment: &Attachment) -> bool {
        (**self).exists(attachment)
    }
}
