//! Analysis pipeline.
//!
//! One call runs the linear state machine
//! `calibrate -> select target -> height -> DBH`, exiting early with a
//! partial result wherever a step cannot proceed. Only image decoding can fail
//! the call; every other problem is recorded as a warning.

use std::sync::Arc;

use anyhow::Result;

use crate::config::AnalyzerConfig;
use crate::detect::{BackendRegistry, DetectionCapability, ObjectClass};
use crate::frame::ImageFrame;
use crate::geometry::BoundingBox;
use crate::measure::{
    estimate_dbh, estimate_height_m, fallback_reference_box, select_reference, select_target,
    MeasurementResult, MeasurementWarning, ScaleFrame,
};

/// Per-call inputs besides the image.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeasurementRequest {
    /// Real-world reference height; the analyzer's configured default when `None`.
    pub reference_height_cm: Option<f64>,
    /// Bypasses person detection.
    pub person_box: Option<BoundingBox>,
    /// Bypasses tree detection.
    pub tree_box: Option<BoundingBox>,
}

impl MeasurementRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference_height(mut self, height_cm: f64) -> Self {
        self.reference_height_cm = Some(height_cm);
        self
    }

    pub fn with_person_box(mut self, bbox: BoundingBox) -> Self {
        self.person_box = Some(bbox);
        self
    }

    pub fn with_tree_box(mut self, bbox: BoundingBox) -> Self {
        self.tree_box = Some(bbox);
        self
    }
}

/// Measures trees in images using the collaborators in a [`BackendRegistry`].
///
/// Holds no per-call state; share it across threads behind an `Arc`.
pub struct TreeAnalyzer {
    registry: Arc<BackendRegistry>,
    config: AnalyzerConfig,
}

impl TreeAnalyzer {
    pub fn new(registry: Arc<BackendRegistry>, config: AnalyzerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Decode `image_bytes` and measure. Fails only on undecodable input.
    pub fn analyze(
        &self,
        image_bytes: &[u8],
        request: &MeasurementRequest,
    ) -> Result<MeasurementResult> {
        let frame = ImageFrame::decode(image_bytes)?;
        log::debug!("decoded {}x{} image", frame.width(), frame.height());
        Ok(self.analyze_frame(&frame, request))
    }

    /// Measure an already decoded frame. Always returns a well-formed result.
    pub fn analyze_frame(
        &self,
        frame: &ImageFrame,
        request: &MeasurementRequest,
    ) -> MeasurementResult {
        let mut result = MeasurementResult::default();
        let reference_height_cm = request
            .reference_height_cm
            .unwrap_or(self.config.reference_height_cm);

        let person_box = match self.reference_box(frame, request, &mut result) {
            Some(bbox) => bbox,
            None => {
                result.warn(MeasurementWarning::NoReference);
                return result;
            }
        };
        result.boxes.person = Some(person_box);
        let scale = ScaleFrame::calibrate(&person_box, reference_height_cm);
        log::debug!(
            "reference {} -> {:.4} cm/px, ground at y={}",
            person_box,
            scale.cm_per_pixel,
            scale.ground_y
        );

        let tree_box = match self.target_box(frame, request, &mut result) {
            Some(bbox) => bbox,
            None => {
                result.warn(MeasurementWarning::TreeNotFound);
                return result;
            }
        };
        result.boxes.tree = Some(tree_box);
        result.tree_height_m = estimate_height_m(&tree_box, &scale);
        log::debug!("tree {} -> {:.3} m", tree_box, result.tree_height_m);

        if !self.registry.has_segmenter() {
            result.warn(MeasurementWarning::SegmenterUnavailable);
            return result;
        }

        let outcome = estimate_dbh(frame, &scale, &tree_box, &self.config.trunk, |crop| {
            self.registry.segment(crop)
        });
        if let Some(warning) = outcome.warning() {
            result.warn(warning);
        }
        if let Some(dbh_cm) = outcome.dbh_cm() {
            result.dbh_cm = dbh_cm;
        }

        log::info!(
            "measured tree: height {:.2} m, DBH {:.1} cm ({} warnings)",
            result.tree_height_m,
            result.dbh_cm,
            result.warnings.len()
        );
        result
    }

    fn reference_box(
        &self,
        frame: &ImageFrame,
        request: &MeasurementRequest,
        result: &mut MeasurementResult,
    ) -> Option<BoundingBox> {
        if let Some(bbox) = request.person_box {
            return Some(bbox);
        }
        if !self
            .registry
            .has_capability(DetectionCapability::PersonDetection)
        {
            return None;
        }

        let detections = match self.registry.detect_class(
            frame.image(),
            ObjectClass::Person,
            self.config.person_min_confidence,
        ) {
            Ok(detections) => detections,
            Err(err) => {
                log::error!("person detection failed: {:#}", err);
                result.warn(MeasurementWarning::PersonDetectorFailed(format!("{:#}", err)));
                Vec::new()
            }
        };

        match select_reference(&detections) {
            Some(bbox) => Some(bbox),
            None => {
                result.warn(MeasurementWarning::PersonNotFound);
                Some(fallback_reference_box(frame.height()))
            }
        }
    }

    fn target_box(
        &self,
        frame: &ImageFrame,
        request: &MeasurementRequest,
        result: &mut MeasurementResult,
    ) -> Option<BoundingBox> {
        if let Some(bbox) = request.tree_box {
            return Some(bbox);
        }
        if !self
            .registry
            .has_capability(DetectionCapability::TreeDetection)
        {
            return None;
        }

        match self.registry.detect_class(
            frame.image(),
            ObjectClass::Tree,
            self.config.tree_min_confidence,
        ) {
            Ok(detections) => select_target(&detections),
            Err(err) => {
                log::error!("tree detection failed: {:#}", err);
                result.warn(MeasurementWarning::TreeDetectorFailed(format!("{:#}", err)));
                None
            }
        }
    }
}
