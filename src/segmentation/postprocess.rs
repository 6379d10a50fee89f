//! Turns the classifier's raw mask into a blend-ready one.
//!
//! The stages run in a fixed order, each feeding the next: median denoise,
//! hard threshold, erosion (strips the halo the classifier emits around
//! high-contrast edges), hole filling, feathering blur. Pure function of the
//! input mask and the constants below.

use std::collections::VecDeque;

use super::types::Mask;
use crate::imgproc;

/// Cutoff separating confident foreground from the mid-gray fringe.
const THRESHOLD: f32 = 120.0 / 255.0;
/// Erosion footprint.
const ERODE_SIZE: usize = 6;
/// Feathering blur kernel.
const FEATHER_SIZE: usize = 7;

pub fn postprocess(raw: &Mask) -> Mask {
    let (width, height) = raw.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut data = imgproc::median3_plane(raw.as_slice(), w, h);
    for v in data.iter_mut() {
        *v = if *v > THRESHOLD { 1.0 } else { 0.0 };
    }
    data = imgproc::erode_plane(&data, w, h, ERODE_SIZE);
    fill_holes(&mut data, w, h);
    data = imgproc::box_blur_plane(&data, w, h, FEATHER_SIZE);
    for v in data.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
    Mask::from_raw(width, height, data)
}

/// Reclassify enclosed background regions as foreground.
///
/// Flood fills from every background pixel on the image border; background
/// pixels the fill never reaches are topologically enclosed by foreground and
/// get set to 1.0. O(pixels) with a visited buffer the size of the plane.
pub(crate) fn fill_holes(data: &mut [f32], w: usize, h: usize) {
    debug_assert_eq!(data.len(), w * h);
    if w == 0 || h == 0 {
        return;
    }
    let mut reachable = vec![false; w * h];
    let mut queue = VecDeque::new();

    let seed = |x: usize, y: usize, queue: &mut VecDeque<(usize, usize)>, reachable: &mut Vec<bool>| {
        let idx = y * w + x;
        if data[idx] == 0.0 && !reachable[idx] {
            reachable[idx] = true;
            queue.push_back((x, y));
        }
    };
    for x in 0..w {
        seed(x, 0, &mut queue, &mut reachable);
        seed(x, h - 1, &mut queue, &mut reachable);
    }
    for y in 0..h {
        seed(0, y, &mut queue, &mut reachable);
        seed(w - 1, y, &mut queue, &mut reachable);
    }

    while let Some((x, y)) = queue.pop_front() {
        let neighbors = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbors {
            if nx >= w || ny >= h {
                continue;
            }
            let idx = ny * w + nx;
            if data[idx] == 0.0 && !reachable[idx] {
                reachable[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    for (idx, v) in data.iter_mut().enumerate() {
        if *v == 0.0 && !reachable[idx] {
            *v = 1.0;
        }
    }
}
