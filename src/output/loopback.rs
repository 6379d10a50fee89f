use super::OutputSink;
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Writes frames into a v4l2loopback device so downstream applications see
/// a regular camera. Frames are packed as YUYV (4:2:2) and written straight
/// to the device file.
pub struct LoopbackOutput {
    file: File,
    width: u32,
    height: u32,
}

impl LoopbackOutput {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Negotiate the output format up front so readers of the loopback
        // device see the right resolution and pixel format.
        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let format = Format::new(width, height, FourCC::new(b"YUYV"));
        Output::set_format(&device, &format)
            .context("Failed to set v4l2loopback output format")?;
        drop(device);

        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width,
            height,
        })
    }

    /// Pack an RGB frame into YUYV: one luma per pixel, chroma shared by
    /// each horizontal pixel pair. Odd-width frames duplicate the last pixel
    /// to close the final pair.
    fn pack_yuyv(frame: &RgbImage) -> Vec<u8> {
        let (width, height) = frame.dimensions();
        let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

        for y in 0..height {
            for x in (0..width).step_by(2) {
                let left = frame.get_pixel(x, y);
                let right = if x + 1 < width {
                    frame.get_pixel(x + 1, y)
                } else {
                    left
                };

                let (y0, u0, v0) = rgb_to_yuv(left[0], left[1], left[2]);
                let (y1, u1, v1) = rgb_to_yuv(right[0], right[1], right[2]);

                let u = ((u0 as u16 + u1 as u16) / 2) as u8;
                let v = ((v0 as u16 + v1 as u16) / 2) as u8;

                yuyv.extend_from_slice(&[y0, u, y1, v]);
            }
        }

        yuyv
    }
}

/// BT.601 RGB to YUV, offset-binary chroma.
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for LoopbackOutput {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        // Producers are contracted to the configured resolution; normalize
        // anyway rather than corrupt the stream layout.
        let frame = if frame.dimensions() != (self.width, self.height) {
            image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Lanczos3,
            )
        } else {
            frame.clone()
        };

        let yuyv = Self::pack_yuyv(&frame);
        self.file
            .write_all(&yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
