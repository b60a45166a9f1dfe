//! Model collaborators: detector and segmenter interfaces, their outputs, and
//! the registry that owns loaded backends.

mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{DetectionCapability, DetectorBackend, SegmenterBackend};
pub use backends::{ReplayFile, StubBackend, StubSegmenter};
pub use registry::BackendRegistry;
pub use result::{Detection, Instance, MaskRle, ObjectClass, TrunkMask};
