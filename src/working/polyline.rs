use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use uuid::Uuid;

use crate::error::{FinalizeError, ValidationError};
use crate::geo::Coordinate;
use crate::models::{MapFeature, PolylineRecord};
use crate::stores::RecordStore;

use super::undo::PolylineUndo;

const MIN_COORDINATES: usize = 2;

/// The single in-progress path draft. `tracked` is fixed at creation:
/// a hand-drawn draft never accepts device samples and a tracked draft
/// never accepts manual edits, so the durable sample queue and the
/// in-memory draft cannot drift apart mid-capture.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingPolyline {
    pub title: String,
    pub notes: String,
    pub coordinates: Vec<Coordinate>,
    pub tracked: bool,
}

impl WorkingPolyline {
    fn drawing() -> Self {
        Self {
            title: String::new(),
            notes: String::new(),
            coordinates: Vec::new(),
            tracked: false,
        }
    }

    fn tracked_from(origin: DateTime<Utc>) -> Self {
        Self {
            title: format!("Tracked path {}", origin.format("%Y-%m-%d %H:%M")),
            notes: String::new(),
            coordinates: Vec::new(),
            tracked: true,
        }
    }
}

/// Owns the single working-polyline slot: the absent/drawing/tracking
/// state machine, the undo log for hand edits, and the
/// finalize/discard transitions.
pub struct WorkingPolylineManager<R> {
    records: R,
    working: Option<WorkingPolyline>,
    undo_log: Vec<PolylineUndo>,
    show_options: bool,
}

impl<R: RecordStore> WorkingPolylineManager<R> {
    pub fn new(records: R) -> Self {
        Self {
            records,
            working: None,
            undo_log: Vec::new(),
            show_options: false,
        }
    }

    pub fn working(&self) -> Option<&WorkingPolyline> {
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

    /// Install an empty hand-drawn draft, replacing any existing one.
    pub fn start_new_working_polyline(&mut self) {
        self.working = Some(WorkingPolyline::drawing());
        self.undo_log.clear();
        self.show_options = false;
    }

    /// Install an empty tracking draft titled with the current date and
    /// time, replacing any existing draft.
    pub fn start_new_location_tracked_polyline(&mut self) {
        self.start_tracked_with_origin(Utc::now());
    }

    /// Tracking draft titled from an explicit origin instant. Recovery
    /// uses this so a rebuilt draft is named after the interrupted
    /// session's first sample, not the relaunch time.
    pub fn start_tracked_with_origin(&mut self, origin: DateTime<Utc>) {
        self.working = Some(WorkingPolyline::tracked_from(origin));
        self.undo_log.clear();
        self.show_options = false;
    }

    /// Hand-drawn append. The first point creates a drawing draft;
    /// on a tracking draft the call is rejected and logged.
    pub fn append_coordinate(&mut self, coordinate: Coordinate) {
        let working = self
            .working
            .get_or_insert_with(WorkingPolyline::drawing);
        if working.tracked {
            warn!("ignoring manual append on a location-tracked polyline");
            return;
        }

        working.coordinates.push(coordinate);
        self.undo_log.push(PolylineUndo::Append { count: 1 });
        self.show_options = true;
    }

    /// Move a point in place. Rejected (logged, ignored) on a tracking
    /// draft or when `index` is out of bounds.
    pub fn move_coordinate(&mut self, index: usize, to: Coordinate) {
        let Some(working) = &mut self.working else {
            warn!("ignoring move: no working polyline");
            return;
        };
        if working.tracked {
            warn!("ignoring manual move on a location-tracked polyline");
            return;
        }
        let Some(slot) = working.coordinates.get_mut(index) else {
            warn!(
                "ignoring move: index {index} out of bounds (len {})",
                working.coordinates.len()
            );
            return;
        };

        self.undo_log.push(PolylineUndo::Move {
            index,
            previous: *slot,
        });
        *slot = to;
        self.show_options = true;
    }

    /// Device-sourced append for a tracking draft. Not undo-logged — the
    /// point came from the device, not a user gesture. Rejected (logged)
    /// when there is no draft or the draft is hand-drawn.
    pub fn append_tracked_coordinate(&mut self, coordinate: Coordinate) {
        let Some(working) = &mut self.working else {
            warn!("dropping tracked coordinate: no working polyline");
            return;
        };
        if !working.tracked {
            warn!("dropping tracked coordinate: working polyline is hand-drawn");
            return;
        }
        working.coordinates.push(coordinate);
    }

    /// Pop the last hand edit. `Append` removes the appended points,
    /// `Move` restores the previous position. No-op on an empty log.
    pub fn undo(&mut self) {
        let Some(action) = self.undo_log.pop() else {
            return;
        };
        let Some(working) = &mut self.working else {
            return;
        };

        match action {
            PolylineUndo::Append { count } => {
                let len = working.coordinates.len();
                working.coordinates.truncate(len.saturating_sub(count));
            }
            PolylineUndo::Move { index, previous } => {
                if let Some(slot) = working.coordinates.get_mut(index) {
                    *slot = previous;
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

    /// Discard the draft and its undo log. Deliberately leaves any
    /// underlying tracking session alone; callers stop the tracking
    /// manager separately.
    pub fn clear(&mut self) {
        self.working = None;
        self.undo_log.clear();
        self.show_options = false;
    }

    /// Validate the draft and convert it into a persisted record
    /// carrying the tracked flag.
    pub fn finalize(&mut self) -> Result<PolylineRecord, FinalizeError> {
        let working = match self.working.take() {
            None => return Err(ValidationError::EmptyTitle.into()),
            Some(working) if working.title.is_empty() => {
                self.working = Some(working);
                return Err(ValidationError::EmptyTitle.into());
            }
            Some(working) if working.coordinates.len() < MIN_COORDINATES => {
                let have = working.coordinates.len();
                self.working = Some(working);
                return Err(ValidationError::TooFewCoordinates {
                    required: MIN_COORDINATES,
                    have,
                }
                .into());
            }
            Some(working) => working,
        };
        self.undo_log.clear();
        self.show_options = false;

        let now = Utc::now();
        let record = PolylineRecord {
            id: Uuid::new_v4().to_string(),
            title: working.title,
            notes: working.notes,
            coordinates: working.coordinates,
            tracked: working.tracked,
            created_at: now,
            edited_at: now,
        };

        let feature = MapFeature::Polyline(record.clone());
        if let Err(err) = self.records.insert(&feature).and_then(|_| self.records.save()) {
            // Put the draft back so a store fault does not lose the
            // path. The undo history stays cleared.
            self.working = Some(WorkingPolyline {
                title: record.title,
                notes: record.notes,
                coordinates: record.coordinates,
                tracked: record.tracked,
            });
            self.show_options = true;
            return Err(FinalizeError::Store(err));
        }

        Ok(record)
    }

    /// Explicit delete of a persisted path.
    pub fn delete_record(&self, record: &PolylineRecord) -> Result<()> {
        self.records.delete(&MapFeature::Polyline(record.clone()))?;
        self.records.save()
    }
}
