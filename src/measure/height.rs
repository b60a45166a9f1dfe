use crate::geometry::{pixel_height, BoundingBox};

use super::scale::ScaleFrame;

/// Tree height in meters: box pixel height converted through the scale frame.
///
/// A degenerate frame yields `0.0`.
pub fn estimate_height_m(tree_box: &BoundingBox, scale: &ScaleFrame) -> f64 {
    scale.to_cm(pixel_height(tree_box) as f64) / 100.0
}
