use image::{imageops, RgbImage};
use std::path::Path;

use super::BackgroundError;
use crate::config::FrameSpec;
use crate::imgproc;

/// A single still image, decoded and resized to camera resolution once at
/// construction. The blurred derivative is cached because the source never
/// changes, so blur only needs recomputing when the level does.
#[derive(Debug)]
pub struct StaticBackground {
    original: RgbImage,
    cached: RgbImage,
    blur_level: u32,
}

impl StaticBackground {
    pub fn open(path: &Path, spec: &FrameSpec) -> Result<Self, BackgroundError> {
        if !path.exists() {
            return Err(BackgroundError::NotFound(path.to_path_buf()));
        }
        let decoded = image::open(path)
            .map_err(|e| BackgroundError::Decode(e.into()))?
            .to_rgb8();
        let original = if decoded.dimensions() != spec.resolution() {
            imageops::resize(
                &decoded,
                spec.width,
                spec.height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            decoded
        };
        Ok(Self {
            cached: original.clone(),
            original,
            blur_level: 0,
        })
    }

    /// Defensive copy: callers may not observe later blur-level changes
    /// through a previously returned frame.
    pub fn get_frame(&self) -> RgbImage {
        self.cached.clone()
    }

    pub fn set_blur_level(&mut self, level: u32) {
        self.blur_level = level;
        self.cached = if level > 0 {
            imgproc::box_blur_rgb(&self.original, level)
        } else {
            self.original.clone()
        };
    }

    pub fn blur_level(&self) -> u32 {
        self.blur_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_test_image(dir: &tempfile::TempDir, name: &str, w: u32, h: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut img = RgbImage::from_pixel(w, h, Rgb([10, 60, 200]));
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.save(&path).unwrap();
        path
    }

    fn spec() -> FrameSpec {
        FrameSpec::new(16, 12, 30)
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = StaticBackground::open(Path::new("/nonexistent/bg.png"), &spec()).unwrap_err();
        assert!(matches!(err, BackgroundError::NotFound(_)));
    }

    #[test]
    fn decodes_and_resizes_to_camera_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(&dir, "bg.png", 32, 24);
        let bg = StaticBackground::open(&path, &spec()).unwrap();
        assert_eq!(bg.get_frame().dimensions(), (16, 12));
    }

    #[test]
    fn blur_is_deterministic_and_reversible() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(&dir, "bg.png", 16, 12);
        let mut bg = StaticBackground::open(&path, &spec()).unwrap();
        let unblurred = bg.get_frame();

        bg.set_blur_level(7);
        let first = bg.get_frame();
        bg.set_blur_level(7);
        let second = bg.get_frame();
        assert_eq!(first, second);
        assert_ne!(first, unblurred);

        bg.set_blur_level(0);
        assert_eq!(bg.get_frame(), unblurred);
    }

    #[test]
    fn returned_frame_is_a_defensive_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(&dir, "bg.png", 16, 12);
        let mut bg = StaticBackground::open(&path, &spec()).unwrap();
        let before = bg.get_frame();
        bg.set_blur_level(9);
        // The frame handed out earlier must not observe the recompute.
        assert_ne!(before, bg.get_frame());
    }
}
