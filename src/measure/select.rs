//! Reference and target box selection policies.

use crate::detect::Detection;
use crate::geometry::{pixel_height, BoundingBox};

/// Horizontal inset of the fallback reference box from the left image edge.
pub const FALLBACK_REFERENCE_INSET_PX: i32 = 10;

/// Pick the tallest detection as the scale reference.
///
/// The tallest person is assumed to be closest to the camera. Ties keep the
/// first detection encountered.
pub fn select_reference(detections: &[Detection]) -> Option<BoundingBox> {
    let mut best: Option<&Detection> = None;
    for det in detections {
        if best.map_or(true, |b| pixel_height(&det.bbox) > pixel_height(&b.bbox)) {
            best = Some(det);
        }
    }
    best.map(|d| d.bbox)
}

/// Pick the most confident detection as the measurement target. Ties keep the
/// first detection encountered.
pub fn select_target(detections: &[Detection]) -> Option<BoundingBox> {
    let mut best: Option<&Detection> = None;
    for det in detections {
        if best.map_or(true, |b| det.confidence > b.confidence) {
            best = Some(det);
        }
    }
    best.map(|d| d.bbox)
}

/// Stand-in reference used when the person detector finds nobody.
///
/// A person one third of the image tall standing at the bottom-left corner,
/// one third as wide as tall. This is a low-confidence guess, not a
/// measurement; results derived from it carry a warning.
pub fn fallback_reference_box(image_height: u32) -> BoundingBox {
    let h = i32::try_from(image_height).unwrap_or(i32::MAX);
    let dummy_h = h / 3;
    BoundingBox::new(
        FALLBACK_REFERENCE_INSET_PX,
        h - dummy_h,
        FALLBACK_REFERENCE_INSET_PX + dummy_h / 3,
        h,
    )
}
