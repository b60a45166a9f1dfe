use std::fmt;

/// Non-fatal conditions recorded on a [`MeasurementResult`](super::MeasurementResult).
///
/// The `Display` text is what ends up in the result's `warnings` list.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementWarning {
    /// No override and no person detector: nothing can be calibrated.
    NoReference,
    /// Person detector ran but found nobody; the fallback box was used.
    PersonNotFound,
    PersonDetectorFailed(String),
    TreeNotFound,
    TreeDetectorFailed(String),
    SegmenterUnavailable,
    /// Reference box has no pixel height, so breast height has no pixel row.
    DegenerateScale,
    CropTooSmall { width: i64, height: i64 },
    NoTrunk,
    /// Mask present but empty around breast height.
    MaskGap,
    /// Instance carried no mask.
    NoMask,
    SegmenterFailed(String),
}

impl fmt::Display for MeasurementWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementWarning::NoReference => {
                write!(f, "No reference person available. Cannot calibrate scale.")
            }
            MeasurementWarning::PersonNotFound => write!(f, "Person not found. Using dummy box."),
            MeasurementWarning::PersonDetectorFailed(err) => {
                write!(f, "Person detector failed: {}", err)
            }
            MeasurementWarning::TreeNotFound => write!(f, "Tree not found."),
            MeasurementWarning::TreeDetectorFailed(err) => {
                write!(f, "Tree detector failed: {}", err)
            }
            MeasurementWarning::SegmenterUnavailable => write!(f, "Trunk segmenter not ready."),
            MeasurementWarning::DegenerateScale => write!(
                f,
                "Reference box has no pixel height. Cannot locate breast height."
            ),
            MeasurementWarning::CropTooSmall { width, height } => write!(
                f,
                "Tree too small/far ({}x{}px) for trunk segmentation.",
                width, height
            ),
            MeasurementWarning::NoTrunk => write!(f, "No trunk found in the crop."),
            MeasurementWarning::MaskGap => {
                write!(f, "Gap in trunk mask at 1.3m, falling back to instance box.")
            }
            MeasurementWarning::NoMask => {
                write!(f, "No trunk mask output, falling back to instance box.")
            }
            MeasurementWarning::SegmenterFailed(err) => {
                write!(f, "Trunk segmentation failed: {}", err)
            }
        }
    }
}
