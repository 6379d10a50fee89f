mod model;
mod postprocess;
pub mod types;

pub use model::{Segmenter, SegmenterSettings};
pub use postprocess::postprocess;
pub use types::Mask;
