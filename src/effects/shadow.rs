use image::RgbImage;

use crate::imgproc;
use crate::segmentation::Mask;

/// How far the foreground mask spreads before becoming shadow.
const SPREAD_SIZE: usize = 20;

/// Simulates a drop shadow cast by the foreground onto the background.
///
/// The foreground mask is dilated (shadow spread), inverted and scaled by the
/// opacity into a darkening multiplier, blurred for a soft edge, then
/// translated by the displacement so the shadow falls offset from the
/// subject. The multiplier is applied to the background frame before
/// compositing.
#[derive(Debug, Clone)]
pub struct Shadow {
    opacity: f32,
    blur: usize,
    displacement: (i32, i32),
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            opacity: 0.7,
            blur: 100,
            displacement: (30, 10),
        }
    }
}

impl Shadow {
    pub fn new(opacity: f32, blur: usize) -> Self {
        Self {
            opacity,
            blur,
            ..Self::default()
        }
    }

    pub fn set_displacement(&mut self, x: i32, y: i32) {
        self.displacement = (x, y);
    }

    pub fn apply(&self, background: &mut RgbImage, mask: &Mask) {
        if self.opacity == 0.0 {
            return;
        }
        let (width, height) = mask.dimensions();
        let (w, h) = (width as usize, height as usize);

        let spread = imgproc::dilate_plane(mask.as_slice(), w, h, SPREAD_SIZE);
        let darkening: Vec<f32> = spread.iter().map(|&v| 1.0 - v * self.opacity).collect();
        let darkening = imgproc::box_blur_plane(&darkening, w, h, self.blur);
        let darkening = imgproc::translate_plane(
            &darkening,
            w,
            h,
            self.displacement.0,
            self.displacement.1,
            1.0,
        );

        for y in 0..height {
            for x in 0..width {
                let factor = darkening[y as usize * w + x as usize];
                let px = background.get_pixel_mut(x, y);
                for c in 0..3 {
                    px[c] = (px[c] as f32 * factor).round().clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn subject_mask(w: u32, h: u32) -> Mask {
        let mut mask = Mask::new(w, h);
        for y in 10..20 {
            for x in 10..20 {
                mask.set(x, y, 1.0);
            }
        }
        mask
    }

    #[test]
    fn zero_opacity_leaves_frame_byte_identical() {
        let mut background = RgbImage::from_pixel(40, 40, Rgb([180, 170, 160]));
        let before = background.clone();
        Shadow::new(0.0, 100).apply(&mut background, &subject_mask(40, 40));
        assert_eq!(background, before);
    }

    #[test]
    fn shadow_darkens_offset_from_subject() {
        let mut background = RgbImage::from_pixel(60, 60, Rgb([200, 200, 200]));
        let mut shadow = Shadow::new(0.7, 5);
        shadow.set_displacement(8, 8);
        shadow.apply(&mut background, &subject_mask(60, 60));
        // Under the displaced subject region the background is darkened.
        assert!(background.get_pixel(22, 22)[0] < 200);
        // Far corner stays untouched.
        assert_eq!(background.get_pixel(59, 0), &Rgb([200, 200, 200]));
    }
}
