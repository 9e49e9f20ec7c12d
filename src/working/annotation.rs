use anyhow::{bail, Result};
use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::error::{AttachmentError, AttachmentPurgeError, FinalizeError, ValidationError};
use crate::geo::Coordinate;
use crate::models::{AnnotationRecord, Attachment, AttachmentKind, MapFeature};
use crate::stores::{AttachmentStore, RecordStore};

use super::undo::AnnotationUndo;

/// The single in-progress marker draft. Exists from the first coordinate
/// placement until finalize or discard; never persisted itself.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingAnnotation {
    pub coordinate: Coordinate,
    pub title: String,
    pub notes: String,
    pub attachments: Vec<Attachment>,
}

impl WorkingAnnotation {
    fn at(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            title: String::new(),
            notes: String::new(),
            attachments: Vec::new(),
        }
    }
}

/// Owns the single working-annotation slot, its undo log, and the
/// finalize/discard transitions. Callers pass the manager around rather
/// than reaching for a global; all mutation goes through one owner on
/// the control thread.
pub struct WorkingAnnotationManager<R, A> {
    records: R,
    attachments: A,
    working: Option<WorkingAnnotation>,
    undo_log: Vec<AnnotationUndo>,
    show_options: bool,
}

impl<R: RecordStore, A: AttachmentStore> WorkingAnnotationManager<R, A> {
    pub fn new(records: R, attachments: A) -> Self {
        Self {
            records,
            attachments,
            working: None,
            undo_log: Vec::new(),
            show_options: false,
        }
    }

    pub fn working(&self) -> Option<&WorkingAnnotation> {
        self.working.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_log.is_empty()
    }

    pub fn show_options(&self) -> bool {
        self.show_options
    }

    pub fn dismiss_options(&mut self) {
        self.show_options = false;
    }

    /// Replace whatever draft exists with a fresh one at `coordinate`.
    /// The old draft's attachments are purged best-effort first; purge
    /// failures are logged and do not block the new draft.
    pub fn start_new(&mut self, coordinate: Coordinate) {
        if let Some(previous) = self.working.take() {
            let failures = self.purge_attachments(&previous.attachments);
            for (id, err) in failures {
                warn!("failed to purge attachment {id} from discarded draft: {err}");
            }
        }

        self.working = Some(WorkingAnnotation::at(coordinate));
        self.undo_log.clear();
        self.show_options = true;
    }

    /// Move the draft marker. Placing the very first coordinate creates
    /// the draft; subsequent moves record the previous position on the
    /// undo log.
    pub fn change_coordinate(&mut self, coordinate: Coordinate) {
        match &mut self.working {
            Some(working) => {
                self.undo_log.push(AnnotationUndo::Move {
                    previous: working.coordinate,
                });
                working.coordinate = coordinate;
            }
            None => {
                self.working = Some(WorkingAnnotation::at(coordinate));
            }
        }
        self.show_options = true;
    }

    /// Pop the last coordinate move. No-op on an empty log.
    pub fn undo(&mut self) {
        let Some(action) = self.undo_log.pop() else {
            return;
        };
        match action {
            AnnotationUndo::Move { previous } => {
                if let Some(working) = &mut self.working {
                    working.coordinate = previous;
                }
            }
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if let Some(working) = &mut self.working {
            working.title = title.into();
        }
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        if let Some(working) = &mut self.working {
            working.notes = notes.into();
        }
    }

    /// Discard the draft. With `remove_attachments`, every attachment is
    /// deleted first: missing files are swallowed, other store failures
    /// are accumulated and returned while the purge continues with the
    /// rest. The draft is discarded either way.
    pub fn clear(&mut self, remove_attachments: bool) -> Result<(), AttachmentPurgeError> {
        let working = self.working.take();
        self.undo_log.clear();
        self.show_options = false;

        if remove_attachments {
            if let Some(working) = working {
                let failures = self.purge_attachments(&working.attachments);
                if !failures.is_empty() {
                    return Err(AttachmentPurgeError { failures });
                }
            }
        }
        Ok(())
    }

    /// Validate the draft and convert it into a persisted record. The
    /// draft's attachments transfer to the record, so the draft is
    /// cleared without purging them.
    pub fn finalize(&mut self) -> Result<AnnotationRecord, FinalizeError> {
        let working = match self.working.take() {
            None => return Err(ValidationError::NoCoordinate.into()),
            Some(working) if working.title.is_empty() => {
                self.working = Some(working);
                return Err(ValidationError::EmptyTitle.into());
            }
            Some(working) => working,
        };
        self.undo_log.clear();
        self.show_options = false;

        let now = Utc::now();
        let record = AnnotationRecord {
            id: Uuid::new_v4().to_string(),
            title: working.title,
            notes: working.notes,
            coordinate: working.coordinate,
            created_at: now,
            edited_at: now,
            attachments: working.attachments,
        };

        let feature = MapFeature::Annotation(record.clone());
        if let Err(err) = self.records.insert(&feature).and_then(|_| self.records.save()) {
            // Put the draft back so a store fault does not lose the
            // user's work or orphan its attachment references. The
            // undo history stays cleared.
            self.working = Some(WorkingAnnotation {
                coordinate: record.coordinate,
                title: record.title,
                notes: record.notes,
                attachments: record.attachments,
            });
            self.show_options = true;
            return Err(FinalizeError::Store(err));
        }

        Ok(record)
    }

    /// Store new media against the working draft. Not undo-logged.
    pub fn add_attachment(&mut self, kind: AttachmentKind, data: Vec<u8>) -> Result<Attachment> {
        if self.working.is_none() {
            bail!("no working annotation to attach to");
        }
        let attachment = self.attachments.store(kind, data)?;
        info!(
            "stored {} attachment {} on the working annotation",
            attachment.kind.as_str(),
            attachment.id
        );
        if let Some(working) = &mut self.working {
            working.attachments.push(attachment.clone());
        }
        Ok(attachment)
    }

    /// Remove an attachment from the working draft and the store.
    pub fn delete_attachment(&mut self, attachment_id: &str) -> Result<()> {
        let Some(working) = &mut self.working else {
            bail!("no working annotation");
        };
        let Some(position) = working
            .attachments
            .iter()
            .position(|a| a.id == attachment_id)
        else {
            bail!("attachment {attachment_id} is not on the working annotation");
        };

        self.attachments.delete(&working.attachments[position])?;
        working.attachments.remove(position);
        Ok(())
    }

    /// Store new media against an already-persisted record and save it
    /// immediately. Symmetric to the working-draft path, and likewise
    /// outside the undo log.
    pub fn add_attachment_to_record(
        &self,
        record: &mut AnnotationRecord,
        kind: AttachmentKind,
        data: Vec<u8>,
    ) -> Result<Attachment> {
        let attachment = self.attachments.store(kind, data)?;
        record.attachments.push(attachment.clone());
        record.edited_at = Utc::now();
        self.records.save()?;
        Ok(attachment)
    }

    /// Remove an attachment from a persisted record and save immediately.
    pub fn delete_attachment_from_record(
        &self,
        record: &mut AnnotationRecord,
        attachment_id: &str,
    ) -> Result<()> {
        let Some(position) = record
            .attachments
            .iter()
            .position(|a| a.id == attachment_id)
        else {
            bail!("attachment {attachment_id} is not on record {}", record.id);
        };

        self.attachments.delete(&record.attachments[position])?;
        record.attachments.remove(position);
        record.edited_at = Utc::now();
        self.records.save()
    }

    /// Commit direct edits made to a persisted record.
    pub fn save_record(&self) -> Result<()> {
        self.records.save()
    }

    /// Throw away unsaved direct edits to persisted records.
    pub fn discard_record_changes(&self) -> Result<()> {
        self.records.rollback()
    }

    /// Explicit user-initiated delete: the record's attachments are
    /// removed first with failures propagated (no best-effort here),
    /// then the record itself.
    pub fn delete_record(&self, record: &AnnotationRecord) -> Result<()> {
        for attachment in &record.attachments {
            self.attachments.delete(attachment)?;
        }
        self.records.delete(&MapFeature::Annotation(record.clone()))?;
        self.records.save()
    }

    /// Per-item best-effort delete sweep: `NotFound` is swallowed,
    /// everything else is collected while the sweep continues.
    fn purge_attachments(
        &self,
        attachments: &[Attachment],
    ) -> Vec<(String, AttachmentError)> {
        let mut failures = Vec::new();
        for attachment in attachments {
            match self.attachments.delete(attachment) {
                Ok(()) | Err(AttachmentError::NotFound) => {}
                Err(err) => failures.push((attachment.id.clone(), err)),
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct MockRecordStore {
        inserted: Mutex<Vec<MapFeature>>,
        deleted: Mutex<Vec<String>>,
        saves: Mutex<usize>,
        rollbacks: Mutex<usize>,
        fail_inserts: Mutex<bool>,
    }

    impl RecordStore for MockRecordStore {
        fn insert(&self, record: &MapFeature) -> Result<()> {
            if *self.fail_inserts.lock().unwrap() {
                anyhow::bail!("record store offline");
            }
            self.inserted.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn delete(&self, record: &MapFeature) -> Result<()> {
            self.deleted.lock().unwrap().push(record.id().to_string());
            Ok(())
        }

        fn save(&self) -> Result<()> {
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }

        fn rollback(&self) -> Result<()> {
            *self.rollbacks.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockAttachmentStore {
        stored: Mutex<HashSet<String>>,
        fail_with: Mutex<Option<AttachmentError>>,
        next_id: Mutex<usize>,
    }

    impl MockAttachmentStore {
        fn contains(&self, id: &str) -> bool {
            self.stored.lock().unwrap().contains(id)
        }

        fn fail_deletes_with(&self, err: AttachmentError) {
            *self.fail_with.lock().unwrap() = Some(err);
        }
    }

    impl AttachmentStore for MockAttachmentStore {
        fn store(
            &self,
            kind: AttachmentKind,
            _data: Vec<u8>,
        ) -> Result<Attachment, AttachmentError> {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            let id = format!("att-{}", *next);
            self.stored.lock().unwrap().insert(id.clone());
            Ok(Attachment {
                id,
                kind,
                created_at: Utc::now(),
            })
        }

        fn delete(&self, attachment: &Attachment) -> Result<(), AttachmentError> {
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
                return Err(err);
            }
            if self.stored.lock().unwrap().remove(&attachment.id) {
                Ok(())
            } else {
                Err(AttachmentError::NotFound)
            }
        }

        fn resolve_url(&self, attachment: &Attachment) -> Result<std::path::PathBuf, AttachmentError> {
            if self.exists(attachment) {
                Ok(std::path::PathBuf::from(format!("/tmp/{}", attachment.id)))
            } else {
                Err(AttachmentError::NotFound)
            }
        }

        fn exists(&self, attachment: &Attachment) -> bool {
            self.contains(&attachment.id)
        }
    }

    type Manager = WorkingAnnotationManager<Arc<MockRecordStore>, Arc<MockAttachmentStore>>;

    fn manager() -> (Manager, Arc<MockRecordStore>, Arc<MockAttachmentStore>) {
        let records = Arc::new(MockRecordStore::default());
        let attachments = Arc::new(MockAttachmentStore::default());
        (
            WorkingAnnotationManager::new(records.clone(), attachments.clone()),
            records,
            attachments,
        )
    }

    const C1: Coordinate = Coordinate {
        latitude: 10.0,
        longitude: 20.0,
    };
    const C2: Coordinate = Coordinate {
        latitude: 11.0,
        longitude: 21.0,
    };

    #[test]
    fn first_change_coordinate_creates_the_draft() {
        let (mut manager, _, _) = manager();
        assert!(manager.working().is_none());

        manager.change_coordinate(C1);
        assert_eq!(manager.working().unwrap().coordinate, C1);
        assert!(!manager.can_undo());
        assert!(manager.show_options());
    }

    #[test]
    fn undo_restores_previous_coordinate_exactly_once() {
        let (mut manager, _, _) = manager();
        manager.change_coordinate(C1);
        manager.change_coordinate(C2);

        manager.undo();
        assert_eq!(manager.working().unwrap().coordinate, C1);

        // Log is empty now; a second undo leaves the coordinate alone.
        manager.undo();
        assert_eq!(manager.working().unwrap().coordinate, C1);
        assert!(!manager.can_undo());
    }

    #[test]
    fn finalize_without_draft_reports_no_coordinate() {
        let (mut manager, _, _) = manager();
        let err = manager.finalize().unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(
            err,
            FinalizeError::Validation(ValidationError::NoCoordinate)
        ));
    }

    #[test]
    fn finalize_without_title_reports_empty_title() {
        let (mut manager, _, _) = manager();
        manager.change_coordinate(C1);

        let err = manager.finalize().unwrap_err();
        assert!(matches!(
            err,
            FinalizeError::Validation(ValidationError::EmptyTitle)
        ));
        // The draft survives a failed finalize.
        assert!(manager.working().is_some());
    }

    #[test]
    fn finalize_persists_the_record_and_clears_the_draft() {
        let (mut manager, records, attachments) = manager();
        manager.change_coordinate(C1);
        manager.set_title("Summit cairn");
        manager.add_attachment(AttachmentKind::Image, vec![1, 2, 3]).unwrap();

        let record = manager.finalize().unwrap();
        assert_eq!(record.title, "Summit cairn");
        assert_eq!(record.coordinate, C1);
        assert_eq!(record.attachments.len(), 1);

        assert!(manager.working().is_none());
        assert!(!manager.can_undo());
        assert_eq!(records.inserted.lock().unwrap().len(), 1);
        assert_eq!(*records.saves.lock().unwrap(), 1);
        // Attachments transfer to the record rather than being purged.
        assert!(attachments.contains(&record.attachments[0].id));
    }

    #[test]
    fn store_failure_during_finalize_restores_the_draft() {
        let (mut manager, records, attachments) = manager();
        manager.change_coordinate(C1);
        manager.set_title("Summit cairn");
        let attachment = manager.add_attachment(AttachmentKind::Image, vec![0]).unwrap();

        *records.fail_inserts.lock().unwrap() = true;
        let err = manager.finalize().unwrap_err();
        assert!(!err.is_validation());

        // The draft and its attachment references survive the fault.
        let working = manager.working().unwrap();
        assert_eq!(working.coordinate, C1);
        assert_eq!(working.title, "Summit cairn");
        assert_eq!(working.attachments[0].id, attachment.id);
        assert!(attachments.contains(&attachment.id));

        *records.fail_inserts.lock().unwrap() = false;
        assert!(manager.finalize().is_ok());
    }

    #[test]
    fn start_new_purges_the_previous_drafts_attachments() {
        let (mut manager, _, attachments) = manager();
        manager.change_coordinate(C1);
        let old = manager.add_attachment(AttachmentKind::Video, vec![0]).unwrap();

        manager.start_new(C2);
        assert!(!attachments.contains(&old.id));
        assert_eq!(manager.working().unwrap().coordinate, C2);
        assert!(manager.working().unwrap().attachments.is_empty());
    }

    #[test]
    fn clear_with_remove_accumulates_hard_failures_but_still_discards() {
        let (mut manager, _, attachments) = manager();
        manager.change_coordinate(C1);
        manager.add_attachment(AttachmentKind::Image, vec![0]).unwrap();
        manager.add_attachment(AttachmentKind::Image, vec![1]).unwrap();

        attachments.fail_deletes_with(AttachmentError::WriteFailed("disk full".into()));
        let err = manager.clear(true).unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert!(manager.working().is_none());
    }

    #[test]
    fn clear_swallows_missing_files() {
        let (mut manager, _, attachments) = manager();
        manager.change_coordinate(C1);
        let attachment = manager.add_attachment(AttachmentKind::Image, vec![0]).unwrap();

        // Simulate the file vanishing out from under us.
        attachments.stored.lock().unwrap().remove(&attachment.id);

        assert!(manager.clear(true).is_ok());
        assert!(manager.working().is_none());
    }

    #[test]
    fn deleting_a_record_cascades_to_its_attachments() {
        let (mut manager, records, attachments) = manager();
        manager.change_coordinate(C1);
        manager.set_title("Old bridge");
        manager.add_attachment(AttachmentKind::Image, vec![0]).unwrap();
        let mut record = manager.finalize().unwrap();

        // Unsaved direct edits do not shield the attachments.
        record.title = "Renamed".into();

        manager.delete_record(&record).unwrap();
        for attachment in &record.attachments {
            assert!(!attachments.exists(attachment));
        }
        assert_eq!(records.deleted.lock().unwrap()[0], record.id);
    }

    #[test]
    fn persisted_attachment_edits_save_immediately() {
        let (mut manager, records, _) = manager();
        manager.change_coordinate(C1);
        manager.set_title("Viewpoint");
        let mut record = manager.finalize().unwrap();
        let saves_after_finalize = *records.saves.lock().unwrap();

        manager
            .add_attachment_to_record(&mut record, AttachmentKind::Image, vec![0])
            .unwrap();
        assert_eq!(*records.saves.lock().unwrap(), saves_after_finalize + 1);
        assert_eq!(record.attachments.len(), 1);

        let id = record.attachments[0].id.clone();
        manager
            .delete_attachment_from_record(&mut record, &id)
            .unwrap();
        assert_eq!(*records.saves.lock().unwrap(), saves_after_finalize + 2);
        assert!(record.attachments.is_empty());
    }

    #[test]
    fn discard_record_changes_rolls_back() {
        let (manager, records, _) = manager();
        manager.discard_record_changes().unwrap();
        assert_eq!(*records.rollbacks.lock().unwrap(), 1);
    }
}
