use anyhow::Result;
use image::RgbImage;

use crate::background::BackgroundSource;
use crate::compose;
use crate::config::FrameSpec;
use crate::effects::{Effect, EffectCtx, TextOverlay};
use crate::segmentation::{postprocess, Segmenter, SegmenterSettings};

/// Blur control: step per invocation, wrapping to zero past the maximum.
const BLUR_STEP: u32 = 3;
const BLUR_MAX: u32 = 20;
/// Seconds the animated background advances per seek request.
const SEEK_STEP_SECS: f64 = 5.0;

/// Drives one iteration per camera frame: fetch background, compute and
/// clean the mask, run effects, composite, hand the output frame back.
///
/// Owns all iteration-to-iteration state: the segmenter's learning
/// countdown, the background's playback cursor, the effect list, and the
/// replacement/advisory toggles.
pub struct Pipeline {
    segmenter: Segmenter,
    background: BackgroundSource,
    effects: Vec<Effect>,
    replacement_enabled: bool,
    advisories_active: bool,
    advisory_overlays: [Effect; 2],
}

impl Pipeline {
    pub fn new(spec: &FrameSpec, background: BackgroundSource) -> Self {
        let advisory_overlays = [
            Effect::Text(TextOverlay::new("Recording background", (10, 10))),
            Effect::Text(TextOverlay::new(
                "Move away from the camera!",
                (10, 10 + spec.height / 12),
            )),
        ];
        Self {
            segmenter: Segmenter::new(SegmenterSettings::default()),
            background,
            effects: Vec::new(),
            replacement_enabled: true,
            advisories_active: false,
            advisory_overlays,
        }
    }

    pub fn add_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn is_learning(&self) -> bool {
        self.segmenter.is_learning()
    }

    #[cfg(test)]
    fn advisories_active(&self) -> bool {
        self.advisories_active
    }

    /// One pipeline iteration. The step order is fixed; no step is skipped
    /// even while replacement is disabled, so segmenter and background state
    /// stay consistent for re-enabling.
    pub fn process_frame(&mut self, camera: &RgbImage) -> Result<RgbImage> {
        let mut background = self.background.get_frame()?;
        let raw = self.segmenter.compute_mask(camera);
        let mask = postprocess(&raw);

        if self.segmenter.is_learning() {
            self.advisories_active = true;
            tracing::info!("learning scene model ({})", self.segmenter.frame_count());
        } else if self.advisories_active {
            self.advisories_active = false;
            tracing::info!("scene model locked");
        }

        let mut output = camera.clone();
        let mut ctx = EffectCtx {
            background: &mut background,
            output: &mut output,
            mask: &mask,
        };
        for effect in &self.effects {
            effect.apply(&mut ctx);
        }
        if self.advisories_active {
            for overlay in &self.advisory_overlays {
                overlay.apply(&mut ctx);
            }
        }

        if self.replacement_enabled {
            output = compose::composite(&output, &background, &mask);
        }
        Ok(output)
    }

    /// Set an exact background blur level, used for startup configuration.
    pub fn set_blur_level(&mut self, level: u32) {
        self.background.set_blur_level(level);
    }

    /// Step the background blur level, wrapping back to zero past the
    /// maximum. Returns the new level.
    pub fn cycle_blur_level(&mut self) -> u32 {
        let level = self.background.blur_level();
        let next = if level < BLUR_MAX { level + BLUR_STEP } else { 0 };
        self.background.set_blur_level(next);
        next
    }

    /// Toggle background replacement. Returns true when replacement is now
    /// enabled.
    pub fn toggle_replacement(&mut self) -> bool {
        self.replacement_enabled = !self.replacement_enabled;
        self.replacement_enabled
    }

    /// Advance an animated background by the fixed seek step.
    pub fn advance_background(&mut self) -> Result<()> {
        self.background.seek(SEEK_STEP_SECS)
    }

    /// Discard the scene model and re-enter the learning phase.
    pub fn reset_model(&mut self) {
        tracing::info!("scene model cleared");
        self.segmenter.forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::path::PathBuf;

    fn spec() -> FrameSpec {
        FrameSpec::new(64, 48, 30)
    }

    fn static_background(dir: &tempfile::TempDir, color: Rgb<u8>) -> BackgroundSource {
        let path: PathBuf = dir.path().join("bg.png");
        RgbImage::from_pixel(64, 48, color).save(&path).unwrap();
        BackgroundSource::open(&path, &spec()).unwrap()
    }

    fn camera_frame() -> RgbImage {
        RgbImage::from_pixel(64, 48, Rgb([120, 110, 100]))
    }

    #[test]
    fn advisories_follow_the_learning_phase() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(&spec(), static_background(&dir, Rgb([5, 5, 5])));
        let frame = camera_frame();

        pipeline.process_frame(&frame).unwrap();
        assert!(pipeline.advisories_active());
        for _ in 0..29 {
            pipeline.process_frame(&frame).unwrap();
        }
        assert!(!pipeline.is_learning());
        assert!(!pipeline.advisories_active());

        // Explicit reset re-arms learning and the advisories.
        pipeline.reset_model();
        pipeline.process_frame(&frame).unwrap();
        assert!(pipeline.advisories_active());
    }

    #[test]
    fn disabled_replacement_passes_camera_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(&spec(), static_background(&dir, Rgb([5, 5, 5])));
        let frame = camera_frame();
        assert!(!pipeline.toggle_replacement());
        let out = pipeline.process_frame(&frame).unwrap();
        assert_eq!(out, frame);
        assert!(pipeline.toggle_replacement());
    }

    #[test]
    fn static_scene_is_fully_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let bg_color = Rgb([5, 200, 5]);
        let mut pipeline = Pipeline::new(&spec(), static_background(&dir, bg_color));
        let frame = camera_frame();
        let mut out = pipeline.process_frame(&frame).unwrap();
        for _ in 0..30 {
            out = pipeline.process_frame(&frame).unwrap();
        }
        // Steady phase, empty mask, no advisories: pure background.
        assert_eq!(out.get_pixel(32, 40), &bg_color);
        assert_eq!(out.get_pixel(63, 47), &bg_color);
    }

    #[test]
    fn blur_level_steps_and_wraps() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = Pipeline::new(&spec(), static_background(&dir, Rgb([5, 5, 5])));
        let levels: Vec<u32> = (0..9).map(|_| pipeline.cycle_blur_level()).collect();
        assert_eq!(levels, vec![3, 6, 9, 12, 15, 18, 21, 0, 3]);
    }
}
