use anyhow::Result;
use image::RgbImage;

use crate::detect::result::{Detection, Instance, ObjectClass};

/// Detection capabilities a backend can advertise.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    PersonDetection,
    TreeDetection,
}

impl DetectionCapability {
    pub fn for_class(class: ObjectClass) -> Self {
        match class {
            ObjectClass::Person => DetectionCapability::PersonDetection,
            ObjectClass::Tree => DetectionCapability::TreeDetection,
        }
    }
}

/// Object detector collaborator.
///
/// Implementations wrap an external model. Model loading and device selection
/// happen when the backend is constructed, not per call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Detect objects of `class` in the full image.
    ///
    /// Detections below `min_confidence` should be dropped. Boxes are in
    /// full-image pixel coordinates and may extend past the image border.
    fn detect(
        &mut self,
        image: &RgbImage,
        class: ObjectClass,
        min_confidence: f32,
    ) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Trunk instance-segmenter collaborator.
///
/// # Contract
///
/// - `crop` is at least 32x32 pixels.
/// - Instances are returned in descending score order.
/// - Masks, when present, have exactly the crop's dimensions.
pub trait SegmenterBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Segment trunk instances in a crop.
    fn segment(&mut self, crop: &RgbImage) -> Result<Vec<Instance>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
