use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

use super::warning::MeasurementWarning;

/// Outcome of one analysis call.
///
/// Every exit point of the pipeline produces one of these; fields that could
/// not be computed keep their defaults and `warnings` says why.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub tree_height_m: f64,
    pub dbh_cm: f64,
    pub boxes: MeasuredBoxes,
    /// In order of occurrence.
    pub warnings: Vec<String>,
}

/// Boxes the measurement was derived from, in image pixel coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasuredBoxes {
    pub person: Option<BoundingBox>,
    pub tree: Option<BoundingBox>,
}

impl MeasurementResult {
    pub fn person_box(&self) -> Option<BoundingBox> {
        self.boxes.person
    }

    pub fn tree_box(&self) -> Option<BoundingBox> {
        self.boxes.tree
    }

    pub fn has_warning(&self, warning: &MeasurementWarning) -> bool {
        let text = warning.to_string();
        self.warnings.iter().any(|w| *w == text)
    }

    pub(crate) fn warn(&mut self, warning: MeasurementWarning) {
        let text = warning.to_string();
        log::warn!("{}", text);
        self.warnings.push(text);
    }
}
