//! Shared pixel kernels used by the segmenter, backgrounds and effects.
//!
//! Everything here is a plain CPU loop over row-major buffers. Blurs are
//! separable box filters with the window truncated at the image edge, so a
//! kernel of size `k` averages at most `k` samples per axis.

use image::RgbImage;

/// Box blur over an RGB image. `k` is the kernel size in pixels; `k <= 1`
/// returns the input unchanged.
pub fn box_blur_rgb(img: &RgbImage, k: u32) -> RgbImage {
    if k <= 1 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    let k = k as usize;

    let mut horiz = vec![0.0f32; w * h * 3];
    for y in 0..h {
        for x in 0..w {
            let (lo, hi) = window(x, w, k);
            let mut sum = [0.0f32; 3];
            for sx in lo..hi {
                let p = img.get_pixel(sx as u32, y as u32);
                sum[0] += p[0] as f32;
                sum[1] += p[1] as f32;
                sum[2] += p[2] as f32;
            }
            let n = (hi - lo) as f32;
            let idx = (y * w + x) * 3;
            horiz[idx] = sum[0] / n;
            horiz[idx + 1] = sum[1] / n;
            horiz[idx + 2] = sum[2] / n;
        }
    }

    let mut out = RgbImage::new(w as u32, h as u32);
    for y in 0..h {
        let (lo, hi) = window(y, h, k);
        for x in 0..w {
            let mut sum = [0.0f32; 3];
            for sy in lo..hi {
                let idx = (sy * w + x) * 3;
                sum[0] += horiz[idx];
                sum[1] += horiz[idx + 1];
                sum[2] += horiz[idx + 2];
            }
            let n = (hi - lo) as f32;
            out.put_pixel(
                x as u32,
                y as u32,
                image::Rgb([
                    (sum[0] / n).round().clamp(0.0, 255.0) as u8,
                    (sum[1] / n).round().clamp(0.0, 255.0) as u8,
                    (sum[2] / n).round().clamp(0.0, 255.0) as u8,
                ]),
            );
        }
    }
    out
}

/// Box blur over a single-channel f32 plane.
pub fn box_blur_plane(data: &[f32], w: usize, h: usize, k: usize) -> Vec<f32> {
    debug_assert_eq!(data.len(), w * h);
    if k <= 1 {
        return data.to_vec();
    }

    let mut horiz = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let (lo, hi) = window(x, w, k);
            let mut sum = 0.0;
            for sx in lo..hi {
                sum += data[y * w + sx];
            }
            horiz[y * w + x] = sum / (hi - lo) as f32;
        }
    }

    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        let (lo, hi) = window(y, h, k);
        for x in 0..w {
            let mut sum = 0.0;
            for sy in lo..hi {
                sum += horiz[sy * w + x];
            }
            out[y * w + x] = sum / (hi - lo) as f32;
        }
    }
    out
}

/// Shift an RGB image by `(dx, dy)` pixels, filling the exposed border with
/// black.
pub fn shift_rgb(img: &RgbImage, dx: i32, dy: i32) -> RgbImage {
    let (w, h) = img.dimensions();
    let mut out = RgbImage::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let sx = x - dx;
            let sy = y - dy;
            if sx >= 0 && sx < w as i32 && sy >= 0 && sy < h as i32 {
                out.put_pixel(x as u32, y as u32, *img.get_pixel(sx as u32, sy as u32));
            }
        }
    }
    out
}

/// Translate a single-channel f32 plane by `(dx, dy)`, filling the exposed
/// border with `border`.
pub fn translate_plane(
    data: &[f32],
    w: usize,
    h: usize,
    dx: i32,
    dy: i32,
    border: f32,
) -> Vec<f32> {
    debug_assert_eq!(data.len(), w * h);
    let mut out = vec![border; w * h];
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let sx = x - dx;
            let sy = y - dy;
            if sx >= 0 && sx < w as i32 && sy >= 0 && sy < h as i32 {
                out[y as usize * w + x as usize] = data[sy as usize * w + sx as usize];
            }
        }
    }
    out
}

/// 3x3 median filter over an f32 plane. Window is clamped at the edges, so
/// border pixels take the median of their in-bounds neighborhood.
pub fn median3_plane(data: &[f32], w: usize, h: usize) -> Vec<f32> {
    debug_assert_eq!(data.len(), w * h);
    let mut out = vec![0.0f32; w * h];
    let mut neigh = [0.0f32; 9];
    for y in 0..h {
        for x in 0..w {
            let (xlo, xhi) = window(x, w, 3);
            let (ylo, yhi) = window(y, h, 3);
            let mut n = 0;
            for sy in ylo..yhi {
                for sx in xlo..xhi {
                    neigh[n] = data[sy * w + sx];
                    n += 1;
                }
            }
            neigh[..n].sort_by(|a, b| a.partial_cmp(b).unwrap());
            out[y * w + x] = neigh[n / 2];
        }
    }
    out
}

/// Morphological erosion: each pixel becomes the minimum over a `k`x`k`
/// window. Shrinks the foreground of a binary plane.
pub fn erode_plane(data: &[f32], w: usize, h: usize, k: usize) -> Vec<f32> {
    morph(data, w, h, k, f32::min, f32::INFINITY)
}

/// Morphological dilation: each pixel becomes the maximum over a `k`x`k`
/// window. Grows the foreground of a binary plane.
pub fn dilate_plane(data: &[f32], w: usize, h: usize, k: usize) -> Vec<f32> {
    morph(data, w, h, k, f32::max, f32::NEG_INFINITY)
}

fn morph(
    data: &[f32],
    w: usize,
    h: usize,
    k: usize,
    fold: fn(f32, f32) -> f32,
    init: f32,
) -> Vec<f32> {
    debug_assert_eq!(data.len(), w * h);
    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        let (ylo, yhi) = window(y, h, k);
        for x in 0..w {
            let (xlo, xhi) = window(x, w, k);
            let mut acc = init;
            for sy in ylo..yhi {
                for sx in xlo..xhi {
                    acc = fold(acc, data[sy * w + sx]);
                }
            }
            out[y * w + x] = acc;
        }
    }
    out
}

/// Truncated window `[lo, hi)` of size at most `k` centered on `i`.
fn window(i: usize, len: usize, k: usize) -> (usize, usize) {
    let half = k / 2;
    let lo = i.saturating_sub(half);
    let hi = (i + k - half).min(len);
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_of_uniform_plane_is_identity() {
        let data = vec![0.5f32; 16];
        let out = box_blur_plane(&data, 4, 4, 3);
        for v in out {
            assert!((v - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn blur_kernel_one_is_noop() {
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(1, 1, image::Rgb([200, 10, 30]));
        assert_eq!(box_blur_rgb(&img, 1), img);
    }

    #[test]
    fn blur_spreads_impulse() {
        let mut data = vec![0.0f32; 25];
        data[12] = 1.0;
        let out = box_blur_plane(&data, 5, 5, 3);
        // Center 3x3 neighborhood all receive 1/9 of the impulse.
        for y in 1..4 {
            for x in 1..4 {
                assert!((out[y * 5 + x] - 1.0 / 9.0).abs() < 1e-6);
            }
        }
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn shift_zero_fills_border() {
        let mut img = RgbImage::new(4, 4);
        img.put_pixel(0, 0, image::Rgb([255, 255, 255]));
        let out = shift_rgb(&img, 2, 1);
        assert_eq!(out.get_pixel(2, 1), &image::Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(0, 0), &image::Rgb([0, 0, 0]));
    }

    #[test]
    fn median_removes_speckle() {
        let mut data = vec![0.0f32; 25];
        data[12] = 1.0;
        let out = median3_plane(&data, 5, 5);
        assert_eq!(out[12], 0.0);
    }

    #[test]
    fn erode_then_dilate_removes_isolated_pixel() {
        let mut data = vec![0.0f32; 49];
        data[3 * 7 + 3] = 1.0;
        let eroded = erode_plane(&data, 7, 7, 3);
        assert!(eroded.iter().all(|&v| v == 0.0));
        let dilated = dilate_plane(&data, 7, 7, 3);
        assert_eq!(dilated[2 * 7 + 2], 1.0);
    }

    #[test]
    fn translate_uses_border_value() {
        let data = vec![0.0f32; 9];
        let out = translate_plane(&data, 3, 3, 1, 0, 1.0);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 0.0);
    }
}
