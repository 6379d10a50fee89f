use image::RgbImage;
use rand::Rng;

use crate::imgproc;

/// Scanline band geometry: rows darkened / rows left alone.
const BAND_LENGTH: u32 = 2;
const BAND_GAP: u32 = 3;
/// Ghost copy displacement along both diagonals.
const GHOST_SHIFT: i32 = 5;

/// Stylizes the whole frame into an oversaturated holographic look: a
/// cool-tone false-color map, randomly darkened scanline bands, two
/// diagonally shifted ghost copies, then a weighted blend back over the
/// original.
#[derive(Debug, Clone, Default)]
pub struct Hologram;

impl Hologram {
    pub fn apply(&self, output: &mut RgbImage) {
        let mut rng = rand::thread_rng();
        self.apply_with(output, &mut rng);
    }

    fn apply_with<R: Rng>(&self, output: &mut RgbImage, rng: &mut R) {
        let (width, height) = output.dimensions();

        // Cool-tone map over luminance: blue fades as green rises.
        let mut holo = RgbImage::new(width, height);
        for (x, y, px) in output.enumerate_pixels() {
            let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            let t = luma.clamp(0.0, 255.0);
            holo.put_pixel(
                x,
                y,
                image::Rgb([0, t as u8, (255.0 - t / 2.0) as u8]),
            );
        }

        // Halftone bands at random intensity.
        for y in 0..height {
            if y % (BAND_LENGTH + BAND_GAP) < BAND_LENGTH {
                let dim: f32 = rng.gen_range(0.1..0.3);
                for x in 0..width {
                    let px = holo.get_pixel_mut(x, y);
                    for c in 0..3 {
                        px[c] = (px[c] as f32 * dim) as u8;
                    }
                }
            }
        }

        // Ghosting: blend in two diagonally shifted copies.
        let ghosted = add_weighted(
            &holo,
            0.2,
            &imgproc::shift_rgb(&holo, GHOST_SHIFT, GHOST_SHIFT),
            0.8,
        );
        let ghosted = add_weighted(
            &ghosted,
            0.4,
            &imgproc::shift_rgb(&holo, -GHOST_SHIFT, -GHOST_SHIFT),
            0.6,
        );

        // Oversaturated recombination with the original (weights sum > 1,
        // saturating at white).
        *output = add_weighted(output, 0.5, &ghosted, 0.6);
    }
}

fn add_weighted(a: &RgbImage, wa: f32, b: &RgbImage, wb: f32) -> RgbImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let (width, height) = a.dimensions();
    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let pa = a.get_pixel(x, y);
            let pb = b.get_pixel(x, y);
            let mut px = [0u8; 3];
            for c in 0..3 {
                px[c] = (pa[c] as f32 * wa + pb[c] as f32 * wb)
                    .round()
                    .clamp(0.0, 255.0) as u8;
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
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn stylizes_frame_in_place() {
        let mut frame = RgbImage::from_pixel(20, 20, Rgb([200, 120, 40]));
        let before = frame.clone();
        let mut rng = StdRng::seed_from_u64(7);
        Hologram.apply_with(&mut frame, &mut rng);
        assert_eq!(frame.dimensions(), (20, 20));
        assert_ne!(frame, before);
    }

    #[test]
    fn is_deterministic_for_a_fixed_seed() {
        let base = RgbImage::from_pixel(16, 16, Rgb([90, 150, 210]));
        let mut a = base.clone();
        let mut b = base;
        Hologram.apply_with(&mut a, &mut StdRng::seed_from_u64(42));
        Hologram.apply_with(&mut b, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn add_weighted_saturates() {
        let a = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let b = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let out = add_weighted(&a, 0.5, &b, 0.6);
        assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }
}
