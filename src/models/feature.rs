use std::slice;

use crate::geo::Coordinate;
use crate::models::{AnnotationRecord, PolylineRecord};

/// A persisted map feature of either kind. Closed variant: the only
/// capabilities shared across kinds are the display coordinates, the
/// title, and a short tag for labelling.
#[derive(Debug, Clone, PartialEq)]
pub enum MapFeature {
    Annotation(AnnotationRecord),
    Polyline(PolylineRecord),
}

impl MapFeature {
    pub fn display_coordinates(&self) -> &[Coordinate] {
        match self {
            MapFeature::Annotation(record) => slice::from_ref(&record.coordinate),
            MapFeature::Polyline(record) => &record.coordinates,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            MapFeature::Annotation(record) => &record.title,
            MapFeature::Polyline(record) => &record.title,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            MapFeature::Annotation(_) => "annotation",
            MapFeature::Polyline(_) => "polyline",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            MapFeature::Annotation(record) => &record.id,
            MapFeature::Polyline(record) => &record.id,
        }
    }
}
