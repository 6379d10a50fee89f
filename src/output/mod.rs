mod loopback;

pub use loopback::LoopbackOutput;

use anyhow::Result;
use image::RgbImage;

/// Destination for finished frames.
///
/// The sink converts to whatever wire format its consumer needs; callers
/// always hand over RGB at the pipeline resolution.
pub trait OutputSink {
    /// Deliver one frame.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Resolution the sink was configured for.
    fn resolution(&self) -> (u32, u32);
}
