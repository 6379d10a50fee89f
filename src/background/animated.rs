use anyhow::{anyhow, Result};
use image::{imageops, RgbImage};

use super::clip::ClipSource;
use crate::config::FrameSpec;
use crate::imgproc;

/// A looping video clip running at its native rate, independent of the
/// camera rate. No frame-rate conversion is attempted: a mismatched clip
/// plays faster or slower than real time.
pub struct AnimatedBackground {
    clip: Box<dyn ClipSource>,
    spec: FrameSpec,
    needs_resize: bool,
    native_fps: f64,
    /// 1-based index of the last frame returned; re-established after a loop.
    frame_index: u64,
    /// Discovered only after the first full traversal; container metadata is
    /// not trusted for this.
    total_frames: Option<u64>,
    blur_level: u32,
}

impl AnimatedBackground {
    pub fn new(clip: Box<dyn ClipSource>, spec: &FrameSpec) -> Self {
        let native_res = clip.resolution();
        let needs_resize = native_res != spec.resolution();
        if needs_resize {
            tracing::warn!(
                "clip resolution {}x{} != camera resolution {}x{}, resizing every frame \
                 (performance will be degraded)",
                native_res.0,
                native_res.1,
                spec.width,
                spec.height
            );
        }
        let native_fps = clip.frame_rate();
        if native_fps < spec.fps as f64 {
            tracing::warn!(
                "clip rate {:.1} fps < camera rate {} fps, background will play faster than real time",
                native_fps,
                spec.fps
            );
        } else if native_fps > spec.fps as f64 {
            tracing::warn!(
                "clip rate {:.1} fps > camera rate {} fps, background will play slower than real time",
                native_fps,
                spec.fps
            );
        }
        Self {
            clip,
            spec: *spec,
            needs_resize,
            native_fps,
            frame_index: 0,
            total_frames: None,
            blur_level: 0,
        }
    }

    /// Next background frame at camera resolution. Reading past the last
    /// native frame rewinds to position zero and records the just-discovered
    /// total frame count.
    pub fn get_frame(&mut self) -> Result<RgbImage> {
        let native = match self.clip.next_frame()? {
            Some(frame) => {
                self.frame_index += 1;
                frame
            }
            None => {
                self.total_frames = Some(self.frame_index);
                self.clip.rewind()?;
                let frame = self
                    .clip
                    .next_frame()?
                    .ok_or_else(|| anyhow!("clip yielded no frames after rewind"))?;
                self.frame_index = 1;
                frame
            }
        };
        let frame = if self.needs_resize {
            imageops::resize(
                &native,
                self.spec.width,
                self.spec.height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            native
        };
        // Content differs per frame, so blur cannot be cached.
        Ok(if self.blur_level > 0 {
            imgproc::box_blur_rgb(&frame, self.blur_level)
        } else {
            frame
        })
    }

    /// Advance playback by `seconds` at the clip's native rate. Before the
    /// first full loop the total length is unknown and the target is handed
    /// to the clip's own bounds handling unwrapped.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        let step = (self.native_fps * seconds).round() as i64;
        let mut target = (self.frame_index as i64 + step).max(0) as u64;
        match self.total_frames {
            Some(total) if total > 0 => target %= total,
            _ => tracing::debug!("seeking before first loop completion, clip length unknown"),
        }
        self.clip.seek_to(target)?;
        self.frame_index = target;
        Ok(())
    }

    pub fn set_blur_level(&mut self, level: u32) {
        self.blur_level = level;
    }

    pub fn blur_level(&self) -> u32 {
        self.blur_level
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }
}
