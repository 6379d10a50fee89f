mod animated;
mod clip;
#[cfg(feature = "clip-ffmpeg")]
mod clip_ffmpeg;
mod static_image;

pub use animated::AnimatedBackground;
pub use clip::ClipSource;
#[cfg(feature = "clip-ffmpeg")]
pub use clip_ffmpeg::FfmpegClip;
pub use static_image::StaticBackground;

use anyhow::Result;
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::FrameSpec;

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("background file not found: {0}")]
    NotFound(PathBuf),
    #[error("unsupported background format '.{0}': valid extensions are jpg, jpeg, png, mp4")]
    UnsupportedFormat(String),
    #[error("animated backgrounds require building with the clip-ffmpeg feature")]
    AnimatedUnavailable,
    #[error("failed to decode background")]
    Decode(#[source] anyhow::Error),
}

/// Replacement background supplier: a still image or a looping clip. Either
/// way `get_frame` yields a frame at camera resolution.
pub enum BackgroundSource {
    Static(StaticBackground),
    Animated(AnimatedBackground),
}

// By hand because decoder-backed clips carry no useful Debug state.
impl std::fmt::Debug for BackgroundSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("BackgroundSource::Static"),
            Self::Animated(_) => f.write_str("BackgroundSource::Animated"),
        }
    }
}

impl BackgroundSource {
    /// Load a background from a file, dispatching on the extension. Image
    /// extensions become `Static`, the video container extension becomes
    /// `Animated`; anything else is a configuration error.
    pub fn open(path: &Path, spec: &FrameSpec) -> Result<Self, BackgroundError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "jpg" | "jpeg" | "png" => {
                Ok(Self::Static(StaticBackground::open(path, spec)?))
            }
            "mp4" => Self::open_animated(path, spec),
            _ => Err(BackgroundError::UnsupportedFormat(extension)),
        }
    }

    #[cfg(feature = "clip-ffmpeg")]
    fn open_animated(path: &Path, spec: &FrameSpec) -> Result<Self, BackgroundError> {
        if !path.exists() {
            return Err(BackgroundError::NotFound(path.to_path_buf()));
        }
        let clip = FfmpegClip::open(path).map_err(BackgroundError::Decode)?;
        Ok(Self::Animated(AnimatedBackground::new(Box::new(clip), spec)))
    }

    #[cfg(not(feature = "clip-ffmpeg"))]
    fn open_animated(path: &Path, _spec: &FrameSpec) -> Result<Self, BackgroundError> {
        if !path.exists() {
            return Err(BackgroundError::NotFound(path.to_path_buf()));
        }
        Err(BackgroundError::AnimatedUnavailable)
    }

    pub fn get_frame(&mut self) -> Result<RgbImage> {
        match self {
            Self::Static(bg) => Ok(bg.get_frame()),
            Self::Animated(bg) => bg.get_frame(),
        }
    }

    /// Advance an animated background; a no-op (logged) for still images.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        match self {
            Self::Static(_) => {
                tracing::info!("cannot seek on a static image");
                Ok(())
            }
            Self::Animated(bg) => bg.seek(seconds),
        }
    }

    pub fn set_blur_level(&mut self, level: u32) {
        match self {
            Self::Static(bg) => bg.set_blur_level(level),
            Self::Animated(bg) => bg.set_blur_level(level),
        }
    }

    pub fn blur_level(&self) -> u32 {
        match self {
            Self::Static(bg) => bg.blur_level(),
            Self::Animated(bg) => bg.blur_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> FrameSpec {
        FrameSpec::new(16, 12, 30)
    }

    #[test]
    fn unsupported_extension_is_a_configuration_error() {
        let err = BackgroundSource::open(Path::new("scene.gif"), &spec()).unwrap_err();
        assert!(matches!(err, BackgroundError::UnsupportedFormat(ext) if ext == "gif"));
    }

    #[test]
    fn missing_extension_is_rejected() {
        let err = BackgroundSource::open(Path::new("scene"), &spec()).unwrap_err();
        assert!(matches!(err, BackgroundError::UnsupportedFormat(_)));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.PNG");
        image::RgbImage::from_pixel(16, 12, image::Rgb([1, 2, 3]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        let mut bg = BackgroundSource::open(&path, &spec()).unwrap();
        assert!(matches!(bg, BackgroundSource::Static(_)));
        assert_eq!(bg.get_frame().unwrap().dimensions(), (16, 12));
    }

    // Both halves of the open() result must be Debug so test assertions can
    // unwrap either way.
    #[test]
    fn source_and_error_are_debug_printable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        image::RgbImage::from_pixel(16, 12, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();
        let bg = BackgroundSource::open(&path, &spec()).unwrap();
        assert_eq!(format!("{:?}", bg), "BackgroundSource::Static");
        let err = BackgroundSource::open(Path::new("scene.gif"), &spec()).unwrap_err();
        assert!(format!("{:?}", err).contains("UnsupportedFormat"));
    }

    #[test]
    fn seek_on_static_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        image::RgbImage::from_pixel(16, 12, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();
        let mut bg = BackgroundSource::open(&path, &spec()).unwrap();
        let before = bg.get_frame().unwrap();
        bg.seek(5.0).unwrap();
        assert_eq!(bg.get_frame().unwrap(), before);
    }
}
