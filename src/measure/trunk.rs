//! Trunk width (DBH) estimation.
//!
//! The tree box is clamped and cropped, the crop is handed to the trunk
//! segmenter, and the best instance's mask is sliced around the breast-height
//! row. Row widths in a thin window are averaged; when the mask cannot be used
//! the instance box width stands in for it.
//!
//! Failures never escape as errors: each exit is a [`DbhOutcome`] variant.

use anyhow::Result;
use image::RgbImage;

use crate::detect::{Instance, TrunkMask};
use crate::frame::ImageFrame;
use crate::geometry::{clamp_box, fits_segmenter, pixel_width, BoundingBox, MIN_CROP_SIDE_PX};

use super::scale::{ScaleFrame, BREAST_HEIGHT_CM};
use super::warning::MeasurementWarning;

/// Rows taken above and below the breast-height row.
pub const SLICE_HALF_HEIGHT: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrunkParams {
    pub min_crop_side: u32,
    pub slice_half_height: usize,
    pub breast_height_cm: f64,
}

impl Default for TrunkParams {
    fn default() -> Self {
        Self {
            min_crop_side: MIN_CROP_SIDE_PX,
            slice_half_height: SLICE_HALF_HEIGHT,
            breast_height_cm: BREAST_HEIGHT_CM,
        }
    }
}

/// Where a trunk width in pixels came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WidthSource {
    Mask,
    /// Mask had no trunk pixels in the window; instance box width used.
    MaskGap,
    /// Instance had no mask; instance box width used.
    NoMask,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrunkWidth {
    pub pixels: f64,
    pub source: WidthSource,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DbhOutcome {
    Measured { dbh_cm: f64, width: TrunkWidth },
    CropTooSmall { width: i64, height: i64 },
    DegenerateScale,
    NoTrunk,
    SegmenterFailed(String),
}

impl DbhOutcome {
    pub fn dbh_cm(&self) -> Option<f64> {
        match self {
            DbhOutcome::Measured { dbh_cm, .. } => Some(*dbh_cm),
            _ => None,
        }
    }

    /// Warning to record for this outcome, if any.
    pub fn warning(&self) -> Option<MeasurementWarning> {
        match self {
            DbhOutcome::Measured { width, .. } => match width.source {
                WidthSource::Mask => None,
                WidthSource::MaskGap => Some(MeasurementWarning::MaskGap),
                WidthSource::NoMask => Some(MeasurementWarning::NoMask),
            },
            DbhOutcome::CropTooSmall { width, height } => Some(MeasurementWarning::CropTooSmall {
                width: *width,
                height: *height,
            }),
            DbhOutcome::DegenerateScale => Some(MeasurementWarning::DegenerateScale),
            DbhOutcome::NoTrunk => Some(MeasurementWarning::NoTrunk),
            DbhOutcome::SegmenterFailed(err) => {
                Some(MeasurementWarning::SegmenterFailed(err.clone()))
            }
        }
    }
}

/// Mean inclusive trunk width over the rows `local_y ± half_height`.
///
/// `local_y` is clamped into the mask first. Rows without trunk pixels are
/// left out of the mean; `None` when every row in the window is empty.
pub fn slice_width(mask: &TrunkMask, local_y: i64, half_height: usize) -> Option<f64> {
    if mask.height() == 0 {
        return None;
    }
    let last_row = (mask.height() - 1) as i64;
    let safe_y = local_y.clamp(0, last_row) as usize;
    let y_start = safe_y.saturating_sub(half_height);
    let y_end = mask.height().min(safe_y + half_height + 1);

    let widths: Vec<usize> = (y_start..y_end).filter_map(|y| mask.row_width(y)).collect();
    if widths.is_empty() {
        return None;
    }
    Some(widths.iter().sum::<usize>() as f64 / widths.len() as f64)
}

/// Trunk width for one instance, falling back to its box width.
pub fn instance_width(instance: &Instance, local_y: i64, half_height: usize) -> TrunkWidth {
    let box_width = pixel_width(&instance.bbox) as f64;
    match &instance.mask {
        Some(mask) => match slice_width(mask, local_y, half_height) {
            Some(pixels) => {
                log::info!("DBH from mask: {:.2}px", pixels);
                TrunkWidth {
                    pixels,
                    source: WidthSource::Mask,
                }
            }
            None => TrunkWidth {
                pixels: box_width,
                source: WidthSource::MaskGap,
            },
        },
        None => TrunkWidth {
            pixels: box_width,
            source: WidthSource::NoMask,
        },
    }
}

/// Highest-scoring instance, first on ties.
///
/// Segmenters return instances sorted by score, so this is normally the first
/// one; the scan keeps the choice correct for backends that do not sort.
pub fn best_instance(instances: &[Instance]) -> Option<&Instance> {
    let mut best: Option<&Instance> = None;
    for inst in instances {
        if best.map_or(true, |b| inst.score > b.score) {
            best = Some(inst);
        }
    }
    best
}

/// Measure DBH for `tree_box` in `frame`.
///
/// `segment` is only invoked when the clamped crop is large enough and the
/// scale frame can place the breast-height row.
pub fn estimate_dbh<F>(
    frame: &ImageFrame,
    scale: &ScaleFrame,
    tree_box: &BoundingBox,
    params: &TrunkParams,
    segment: F,
) -> DbhOutcome
where
    F: FnOnce(&RgbImage) -> Result<Vec<Instance>>,
{
    // Size is checked before the scale: a tiny crop reports its size even when
    // the reference is degenerate.
    let clamped = clamp_box(tree_box, frame.width(), frame.height());
    if !fits_segmenter(&clamped, params.min_crop_side) {
        return DbhOutcome::CropTooSmall {
            width: clamped.width(),
            height: clamped.height(),
        };
    }

    let dbh_row = match scale.row_above_ground(params.breast_height_cm) {
        Some(row) => row,
        None => return DbhOutcome::DegenerateScale,
    };

    let crop = frame.crop(&clamped);
    let instances = match segment(&crop.image) {
        Ok(instances) => instances,
        Err(err) => {
            log::error!("trunk segmentation failed: {:#}", err);
            return DbhOutcome::SegmenterFailed(format!("{:#}", err));
        }
    };

    let best = match best_instance(&instances) {
        Some(best) => best,
        None => return DbhOutcome::NoTrunk,
    };

    let local_y = dbh_row.saturating_sub(i64::from(crop.bbox.y1));
    let width = instance_width(best, local_y, params.slice_half_height);
    DbhOutcome::Measured {
        dbh_cm: scale.to_cm(width.pixels),
        width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use image::Rgb;

    fn column_mask(width: usize, height: usize, x_start: usize, x_end: usize) -> TrunkMask {
        let mut mask = TrunkMask::empty(width, height);
        for y in 0..height {
            mask.fill_span(y, x_start, x_end);
        }
        mask
    }

    fn instance(mask: Option<TrunkMask>) -> Instance {
        Instance {
            score: 0.9,
            bbox: BoundingBox::new(4, 0, 19, 50),
            mask,
        }
    }

    #[test]
    fn uniform_window_has_no_averaging_drift() {
        let mask = column_mask(40, 60, 10, 22);
        assert_eq!(slice_width(&mask, 30, 2), Some(12.0));
    }

    #[test]
    fn window_averages_included_rows_only() {
        let mut mask = TrunkMask::empty(30, 20);
        mask.fill_span(8, 5, 15); // 10
        mask.fill_span(9, 5, 17); // 12
        mask.fill_span(11, 4, 18); // 14
        mask.fill_span(13, 0, 30); // outside the window
        assert_eq!(slice_width(&mask, 10, 2), Some(12.0));
        assert_eq!(slice_width(&mask, 10, 1), Some(13.0));
    }

    #[test]
    fn row_width_spans_outer_edges() {
        let mut mask = TrunkMask::empty(20, 5);
        mask.set(3, 2, true);
        mask.set(9, 2, true);
        assert_eq!(slice_width(&mask, 2, 0), Some(7.0));
    }

    #[test]
    fn window_is_clamped_to_mask() {
        let mask = column_mask(20, 10, 2, 8);
        assert_eq!(slice_width(&mask, -500, 2), Some(6.0));
        assert_eq!(slice_width(&mask, 500, 2), Some(6.0));
        assert_eq!(slice_width(&TrunkMask::empty(5, 0), 0, 2), None);
    }

    #[test]
    fn mask_gap_falls_back_to_box_width() {
        let mut mask = TrunkMask::empty(40, 60);
        mask.fill_span(0, 5, 30);
        let width = instance_width(&instance(Some(mask)), 40, 2);
        assert_eq!(width.source, WidthSource::MaskGap);
        assert_eq!(width.pixels, 15.0);
    }

    #[test]
    fn missing_mask_falls_back_to_box_width() {
        let width = instance_width(&instance(None), 40, 2);
        assert_eq!(width.source, WidthSource::NoMask);
        assert_eq!(width.pixels, 15.0);
    }

    #[test]
    fn best_instance_prefers_score() {
        let mut low = instance(None);
        low.score = 0.2;
        let high = instance(Some(column_mask(4, 4, 0, 1)));
        let instances = vec![low, high.clone()];
        assert_eq!(best_instance(&instances), Some(&high));
        assert_eq!(best_instance(&[]), None);
    }

    fn frame(width: u32, height: u32) -> ImageFrame {
        ImageFrame::from_rgb(RgbImage::from_pixel(width, height, Rgb([80, 60, 40])))
    }

    fn scale_2cm() -> ScaleFrame {
        // 2 cm/px, ground at 400: breast height row is 335.
        ScaleFrame::calibrate(&BoundingBox::new(0, 315, 30, 400), 170.0)
    }

    #[test]
    fn small_crop_never_calls_segmenter() {
        let mut called = false;
        let outcome = estimate_dbh(
            &frame(500, 500),
            &scale_2cm(),
            &BoundingBox::new(100, 100, 120, 140),
            &TrunkParams::default(),
            |_| {
                called = true;
                Ok(Vec::new())
            },
        );
        assert!(!called);
        assert_eq!(outcome, DbhOutcome::CropTooSmall { width: 20, height: 40 });
        assert_eq!(outcome.dbh_cm(), None);
    }

    #[test]
    fn measures_from_mask_in_crop_coordinates() {
        let tree_box = BoundingBox::new(100, 200, 160, 400);
        let outcome = estimate_dbh(
            &frame(500, 500),
            &scale_2cm(),
            &tree_box,
            &TrunkParams::default(),
            |crop| {
                assert_eq!(crop.dimensions(), (60, 200));
                // Trunk is 10 px wide only around local row 135 (global 335).
                let mut mask = TrunkMask::empty(60, 200);
                for y in 133..=137 {
                    mask.fill_span(y, 20, 30);
                }
                Ok(vec![Instance {
                    score: 0.99,
                    bbox: BoundingBox::new(18, 0, 33, 200),
                    mask: Some(mask),
                }])
            },
        );
        match outcome {
            DbhOutcome::Measured { dbh_cm, width } => {
                assert_eq!(width.source, WidthSource::Mask);
                assert_eq!(width.pixels, 10.0);
                assert_eq!(dbh_cm, 20.0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn segmenter_error_becomes_outcome() {
        let outcome = estimate_dbh(
            &frame(500, 500),
            &scale_2cm(),
            &BoundingBox::new(100, 200, 160, 400),
            &TrunkParams::default(),
            |_| Err(anyhow!("model exploded")),
        );
        assert_eq!(outcome, DbhOutcome::SegmenterFailed("model exploded".to_string()));
        assert_eq!(
            outcome.warning().unwrap().to_string(),
            "Trunk segmentation failed: model exploded"
        );
    }

    #[test]
    fn empty_segmentation_is_no_trunk() {
        let outcome = estimate_dbh(
            &frame(500, 500),
            &scale_2cm(),
            &BoundingBox::new(100, 200, 160, 400),
            &TrunkParams::default(),
            |_| Ok(Vec::new()),
        );
        assert_eq!(outcome, DbhOutcome::NoTrunk);
    }

    #[test]
    fn tiny_crop_wins_over_degenerate_scale() {
        let flat = ScaleFrame::calibrate(&BoundingBox::new(0, 400, 30, 400), 170.0);
        let outcome = estimate_dbh(
            &frame(500, 500),
            &flat,
            &BoundingBox::new(100, 100, 120, 140),
            &TrunkParams::default(),
            |_| panic!("segmenter must not run"),
        );
        assert_eq!(outcome, DbhOutcome::CropTooSmall { width: 20, height: 40 });
    }

    #[test]
    fn far_away_breast_height_row_clamps_into_mask() {
        // A near-zero reference height puts breast height at i64::MIN.
        let scale = ScaleFrame::calibrate(&BoundingBox::new(10, 100, 60, 190), 1e-300);
        let outcome = estimate_dbh(
            &frame(500, 500),
            &scale,
            &BoundingBox::new(100, 200, 160, 400),
            &TrunkParams::default(),
            |_| {
                Ok(vec![Instance {
                    score: 0.8,
                    bbox: BoundingBox::new(10, 0, 40, 200),
                    mask: Some(column_mask(60, 200, 20, 32)),
                }])
            },
        );
        match outcome {
            DbhOutcome::Measured { dbh_cm, width } => {
                assert_eq!(width.source, WidthSource::Mask);
                assert_eq!(width.pixels, 12.0);
                assert!(dbh_cm.is_finite() && dbh_cm >= 0.0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn degenerate_scale_skips_segmenter() {
        let flat = ScaleFrame::calibrate(&BoundingBox::new(0, 400, 30, 400), 170.0);
        let mut called = false;
        let outcome = estimate_dbh(
            &frame(500, 500),
            &flat,
            &BoundingBox::new(100, 200, 160, 400),
            &TrunkParams::default(),
            |_| {
                called = true;
                Ok(Vec::new())
            },
        );
        assert!(!called);
        assert_eq!(outcome, DbhOutcome::DegenerateScale);
    }
}
