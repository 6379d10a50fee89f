use anyhow::Result;
use image::RgbImage;

/// A decoded video source at its native resolution and rate.
///
/// Implementations handle their own bounds on `seek_to`; positions past the
/// end may wrap or clamp per the underlying container.
pub trait ClipSource {
    /// Decode the next native frame. `None` signals end of stream, which is
    /// the caller's loop trigger, not an error.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Reposition to the first frame.
    fn rewind(&mut self) -> Result<()>;

    /// Reposition to an absolute frame index.
    fn seek_to(&mut self, frame_index: u64) -> Result<()>;

    /// Native resolution.
    fn resolution(&self) -> (u32, u32);

    /// Native playback rate in frames per second.
    fn frame_rate(&self) -> f64;
}
