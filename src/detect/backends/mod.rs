pub mod replay;
pub mod stub;

pub use replay::{ReplayBackend, ReplayFile, ReplaySegmenter};
pub use stub::{StubBackend, StubSegmenter};
