pub mod annotation;
pub mod polyline;
pub mod undo;

pub use annotation::{WorkingAnnotation, WorkingAnnotationManager};
pub use polyline::{WorkingPolyline, WorkingPolylineManager};
pub use undo::{AnnotationUndo, PolylineUndo};
