//! Scale-based dendrometric measurement engine.
//!
//! - `scale`: pixel-to-centimeter calibration from the reference box
//! - `select`: reference and target box selection policies
//! - `height`: tree height from the target box
//! - `trunk`: DBH from the trunk mask around breast height
//!
//! All functions here are pure; model calls are passed in by the pipeline.

mod height;
mod result;
mod scale;
mod select;
mod trunk;
mod warning;

pub use height::estimate_height_m;
pub use result::{MeasuredBoxes, MeasurementResult};
pub use scale::{ScaleFrame, BREAST_HEIGHT_CM, DEFAULT_REFERENCE_HEIGHT_CM};
pub use select::{
    fallback_reference_box, select_reference, select_target, FALLBACK_REFERENCE_INSET_PX,
};
pub use trunk::{
    best_instance, estimate_dbh, instance_width, slice_width, DbhOutcome, TrunkParams,
    TrunkWidth, WidthSource, SLICE_HALF_HEIGHT,
};
pub use warning::MeasurementWarning;
