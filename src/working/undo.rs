use crate::geo::Coordinate;

/// One undoable edit to the working annotation. The log lives as long as
/// the draft it belongs to and is cleared with it.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationUndo {
    Move { previous: Coordinate },
}

/// One undoable edit to the working polyline. Tracked appends never
/// enter the log: they originate from the device, not a user gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum PolylineUndo {
    Append { count: usize },
    Move { index: usize, previous: Coordinate },
}
