mod v4l_capture;

pub use v4l_capture::WebcamCapture;

use anyhow::Result;
use image::RgbImage;

/// Source of live camera frames.
///
/// Implementations must yield successive frames at a fixed resolution and
/// channel layout for the pipeline's lifetime; the blocking read here sets
/// the loop's cadence.
pub trait CaptureSource {
    /// Block until the next frame is available and return it as RGB.
    fn capture_frame(&mut self) -> Result<RgbImage>;

    /// Resolution every captured frame is delivered at.
    fn resolution(&self) -> (u32, u32);
}
