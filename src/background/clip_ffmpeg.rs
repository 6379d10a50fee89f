//! FFmpeg-backed clip decoding, enabled by the `clip-ffmpeg` feature.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::path::Path;

use super::clip::ClipSource;

pub struct FfmpegClip {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    width: u32,
    height: u32,
    fps: f64,
    at_eof: bool,
}

impl FfmpegClip {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open clip '{}'", path.display()))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("'{}' has no video track", path.display()))?;
        let stream_index = stream.index();
        let fps = f64::from(stream.avg_frame_rate());
        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create RGB scaler")?;

        let width = decoder.width();
        let height = decoder.height();
        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
            width,
            height,
            fps,
            at_eof: false,
        })
    }

    fn receive_rgb(&mut self) -> Result<Option<RgbImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb)
            .context("scale frame to RGB")?;

        let stride = rgb.stride(0);
        let data = rgb.data(0);
        let row_len = self.width as usize * 3;
        let mut pixels = Vec::with_capacity(row_len * self.height as usize);
        for y in 0..self.height as usize {
            let start = y * stride;
            pixels.extend_from_slice(&data[start..start + row_len]);
        }
        let image = RgbImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| anyhow!("decoded frame has unexpected size"))?;
        Ok(Some(image))
    }
}

impl ClipSource for FfmpegClip {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.at_eof {
            return Ok(None);
        }
        loop {
            if let Some(frame) = self.receive_rgb()? {
                return Ok(Some(frame));
            }
            let packet = self
                .input
                .packets()
                .find(|(stream, _)| stream.index() == self.stream_index);
            match packet {
                Some((_, packet)) => {
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to video decoder")?;
                }
                None => {
                    let _ = self.decoder.send_eof();
                    let frame = self.receive_rgb()?;
                    if frame.is_none() {
                        self.at_eof = true;
                    }
                    return Ok(frame);
                }
            }
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.input.seek(0, ..=0).context("rewind clip")?;
        self.decoder.flush();
        self.at_eof = false;
        Ok(())
    }

    fn seek_to(&mut self, frame_index: u64) -> Result<()> {
        let seconds = if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        };
        let ts = (seconds * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
        self.input.seek(ts, ..=ts).context("seek clip")?;
        self.decoder.flush();
        self.at_eof = false;
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }
}
