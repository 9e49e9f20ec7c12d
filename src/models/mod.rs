mod annotation;
mod feature;
mod polyline;
mod sample;

pub use annotation::{AnnotationRecord, Attachment, AttachmentKind};
pub use feature::MapFeature;
pub use polyline::PolylineRecord;
pub use sample::PendingSample;
