use crate::geometry::{pixel_height, BoundingBox};

/// Default real-world height of the reference person.
pub const DEFAULT_REFERENCE_HEIGHT_CM: f64 = 170.0;

/// Height above ground at which trunk diameter is measured.
pub const BREAST_HEIGHT_CM: f64 = 130.0;

/// Pixel-to-centimeter calibration derived from the reference box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFrame {
    /// Always `>= 0`; `0` when the reference box has no pixel height.
    pub cm_per_pixel: f64,
    /// Ground line: bottom edge of the reference box.
    pub ground_y: i32,
}

impl ScaleFrame {
    pub fn calibrate(reference: &BoundingBox, reference_height_cm: f64) -> Self {
        let px = pixel_height(reference);
        let cm_per_pixel = if px > 0 {
            reference_height_cm / px as f64
        } else {
            0.0
        };
        let cm_per_pixel = if cm_per_pixel.is_finite() && cm_per_pixel > 0.0 {
            cm_per_pixel
        } else {
            0.0
        };
        Self {
            cm_per_pixel,
            ground_y: reference.y2,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.cm_per_pixel <= 0.0
    }

    pub fn to_cm(&self, pixels: f64) -> f64 {
        pixels * self.cm_per_pixel
    }

    /// Global pixel row lying `height_cm` above the ground line, truncated
    /// toward zero. `None` for a degenerate frame.
    pub fn row_above_ground(&self, height_cm: f64) -> Option<i64> {
        if self.is_degenerate() {
            return None;
        }
        let offset_px = height_cm / self.cm_per_pixel;
        Some((f64::from(self.ground_y) - offset_px).trunc() as i64)
    }

    /// Row at 1.30 m above the ground line.
    pub fn breast_height_row(&self) -> Option<i64> {
        self.row_above_ground(BREAST_HEIGHT_CM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrates_from_reference_height() {
        let frame = ScaleFrame::calibrate(&BoundingBox::new(10, 100, 60, 400), 170.0);
        assert_eq!(frame.cm_per_pixel, 170.0 / 300.0);
        assert_eq!(frame.ground_y, 400);
        assert!(!frame.is_degenerate());
    }

    #[test]
    fn zero_height_reference_is_degenerate() {
        let flat = ScaleFrame::calibrate(&BoundingBox::new(10, 100, 60, 100), 170.0);
        assert_eq!(flat.cm_per_pixel, 0.0);
        assert!(flat.is_degenerate());
        assert_eq!(flat.breast_height_row(), None);

        let inverted = ScaleFrame::calibrate(&BoundingBox::new(10, 300, 60, 100), 170.0);
        assert_eq!(inverted.cm_per_pixel, 0.0);
    }

    #[test]
    fn breast_height_row_sits_above_ground() {
        // 2 cm per pixel: 130 cm is 65 px above the ground line.
        let frame = ScaleFrame::calibrate(&BoundingBox::new(0, 315, 30, 400), 170.0);
        assert_eq!(frame.cm_per_pixel, 2.0);
        assert_eq!(frame.breast_height_row(), Some(335));
    }

    #[test]
    fn tiny_reference_height_saturates_row() {
        let frame = ScaleFrame::calibrate(&BoundingBox::new(10, 100, 60, 190), 1e-300);
        assert!(!frame.is_degenerate());
        assert_eq!(frame.breast_height_row(), Some(i64::MIN));
    }

    #[test]
    fn breast_height_row_truncates() {
        // 170/300 cm per pixel: 130 cm is ~229.41 px, row 400 - 229.41 = 170.59.
        let frame = ScaleFrame::calibrate(&BoundingBox::new(10, 100, 60, 400), 170.0);
        assert_eq!(frame.breast_height_row(), Some(170));
    }
}
