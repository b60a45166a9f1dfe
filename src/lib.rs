//! Dendrometer
//!
//! Estimates the height and diameter at breast height (DBH) of a standing tree
//! from a single photo that also shows a person of known height.
//!
//! # Architecture
//!
//! The engine never runs models itself. Person/tree detectors and the trunk
//! segmenter are collaborators registered in a [`BackendRegistry`]; the
//! [`TreeAnalyzer`] calls them and turns their outputs into measurements:
//!
//! 1. **Calibrate**: the reference box height gives centimeters per pixel, its
//!    bottom edge gives the ground line.
//! 2. **Select target**: the most confident tree detection (or an override).
//! 3. **Height**: tree box pixel height through the scale.
//! 4. **DBH**: the trunk mask is sliced around the row 1.30 m above ground.
//!
//! Every step degrades to a partial result plus warnings. Only an undecodable
//! image is reported as an error.
//!
//! # Module Structure
//!
//! - `geometry`: boxes, clamping, minimum crop size
//! - `frame`: image decoding and cropping
//! - `detect`: collaborator traits, outputs, registry, stub/replay backends
//! - `measure`: calibration, selection, height and DBH estimation
//! - `pipeline`: the per-image state machine
//! - `allometry`, `overlay`: derived estimates and annotated previews

pub mod allometry;
pub mod config;
pub mod detect;
pub mod frame;
pub mod geometry;
pub mod measure;
pub mod overlay;
pub mod pipeline;

pub use config::AnalyzerConfig;
pub use detect::{
    BackendRegistry, Detection, DetectionCapability, DetectorBackend, Instance, ObjectClass,
    SegmenterBackend, TrunkMask,
};
pub use frame::ImageFrame;
pub use geometry::{clamp_box, pixel_height, BoundingBox, MIN_CROP_SIDE_PX};
pub use measure::{MeasurementResult, MeasurementWarning, ScaleFrame};
pub use pipeline::{MeasurementRequest, TreeAnalyzer};
