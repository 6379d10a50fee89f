use super::CaptureSource;
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

use crate::config::FrameSpec;

pub struct WebcamCapture {
    camera: Camera,
    spec: FrameSpec,
}

impl WebcamCapture {
    /// Open the camera at the configured resolution and rate. The pipeline's
    /// contract fixes both for its lifetime, so the closest supported format
    /// is requested rather than the highest.
    pub fn new(device_index: u32, spec: &FrameSpec) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{}@{}",
            device_index,
            spec.width,
            spec.height,
            spec.fps
        );

        let index = CameraIndex::Index(device_index);
        let format = CameraFormat::new(
            Resolution::new(spec.width, spec.height),
            FrameFormat::MJPEG,
            spec.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        tracing::info!("Webcam initialized successfully");

        Ok(Self {
            camera,
            spec: *spec,
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        let frame = self.camera.frame().context("Failed to capture frame")?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        // The scene model requires a fixed resolution; normalize here if the
        // driver delivered a different format than requested.
        if decoded.dimensions() != self.spec.resolution() {
            return Ok(image::imageops::resize(
                &decoded,
                self.spec.width,
                self.spec.height,
                image::imageops::FilterType::Lanczos3,
            ));
        }
        Ok(decoded)
    }

    fn resolution(&self) -> (u32, u32) {
        self.spec.resolution()
    }
}
