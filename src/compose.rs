//! Alpha compositing of foreground camera pixels over the replacement
//! background. Straight per-channel blend in the stored color encoding, no
//! gamma correction or color-space conversion.

use image::RgbImage;

use crate::segmentation::Mask;

/// `output[c] = camera[c] * mask + background[c] * (1 - mask)`.
///
/// Panics if the three inputs disagree on dimensions; producers are
/// responsible for delivering same-resolution frames and masks.
pub fn composite(camera: &RgbImage, background: &RgbImage, mask: &Mask) -> RgbImage {
    let (width, height) = camera.dimensions();
    assert_eq!(background.dimensions(), (width, height), "background resolution mismatch");
    assert_eq!(mask.dimensions(), (width, height), "mask resolution mismatch");

    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let alpha = mask.get(x, y);
            let fg = camera.get_pixel(x, y);
            let bg = background.get_pixel(x, y);
            let mut px = [0u8; 3];
            for c in 0..3 {
                let blended = fg[c] as f32 * alpha + bg[c] as f32 * (1.0 - alpha);
                px[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
            out.put_pixel(x, y, image::Rgb(px));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(w: u32, h: u32, seed: u8) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([seed.wrapping_add(x as u8), (y * 7) as u8, x as u8 ^ y as u8])
        })
    }

    #[test]
    fn full_mask_yields_camera_frame() {
        let camera = gradient(9, 7, 3);
        let background = gradient(9, 7, 190);
        let mask = Mask::from_raw(9, 7, vec![1.0; 63]);
        assert_eq!(composite(&camera, &background, &mask), camera);
    }

    #[test]
    fn empty_mask_yields_background_frame() {
        let camera = gradient(9, 7, 3);
        let background = gradient(9, 7, 190);
        let mask = Mask::from_raw(9, 7, vec![0.0; 63]);
        assert_eq!(composite(&camera, &background, &mask), background);
    }

    #[test]
    fn half_mask_averages_channels() {
        let camera = RgbImage::from_pixel(2, 2, Rgb([200, 0, 100]));
        let background = RgbImage::from_pixel(2, 2, Rgb([0, 100, 100]));
        let mask = Mask::from_raw(2, 2, vec![0.5; 4]);
        let out = composite(&camera, &background, &mask);
        assert_eq!(out.get_pixel(0, 0), &Rgb([100, 50, 100]));
    }

    #[test]
    #[should_panic(expected = "mask resolution mismatch")]
    fn mismatched_mask_is_rejected() {
        let camera = gradient(4, 4, 0);
        let background = gradient(4, 4, 0);
        let mask = Mask::new(3, 4);
        composite(&camera, &background, &mask);
    }
}
