use image::RgbImage;
use ndarray::{Array3, Array4};

use super::types::Mask;
use crate::imgproc;

/// Tuning knobs for the adaptive scene model.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterSettings {
    /// Frames after construction/reset during which the model adapts at full
    /// rate. The operator is assumed to be out of frame for this window.
    pub learning_frames: u32,
    /// Gaussian components per pixel.
    pub mixtures: usize,
    /// Match threshold in standard deviations.
    pub match_sigma: f32,
    /// Portion of total weight that counts as background.
    pub background_ratio: f32,
    /// Variance assigned to a freshly created component.
    pub initial_variance: f32,
    /// Lower bound on component variance.
    pub variance_floor: f32,
    /// Kernel size of the sensor-noise pre-blur, 0/1 disables it.
    pub pre_blur: u32,
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            learning_frames: 30,
            mixtures: 3,
            match_sigma: 2.5,
            background_ratio: 0.75,
            initial_variance: 225.0,
            variance_floor: 4.0,
            pre_blur: 5,
        }
    }
}

/// Per-pixel mixture parameters. Component axis first so a pixel's components
/// are a strided column through the arrays.
struct SceneModel {
    width: u32,
    height: u32,
    /// (K, H, W)
    weights: Array3<f32>,
    /// (K, H, W, channel)
    means: Array4<f32>,
    /// (K, H, W), spherical over the three channels.
    variances: Array3<f32>,
}

impl SceneModel {
    fn new(frame: &RgbImage, settings: &SegmenterSettings) -> Self {
        let (width, height) = frame.dimensions();
        let (k, h, w) = (settings.mixtures, height as usize, width as usize);
        let mut weights = Array3::zeros((k, h, w));
        let mut means = Array4::zeros((k, h, w, 3));
        let mut variances = Array3::from_elem((k, h, w), settings.initial_variance);
        for y in 0..h {
            for x in 0..w {
                let px = frame.get_pixel(x as u32, y as u32);
                weights[[0, y, x]] = 1.0;
                for c in 0..3 {
                    means[[0, y, x, c]] = px[c] as f32;
                }
                variances[[0, y, x]] = settings.initial_variance;
            }
        }
        Self {
            width,
            height,
            weights,
            means,
            variances,
        }
    }

    /// Feed one observation at (x, y). Updates the mixture when `alpha > 0`
    /// and returns the foreground confidence for this pixel.
    fn observe(&mut self, x: usize, y: usize, color: [f32; 3], alpha: f32, settings: &SegmenterSettings) -> f32 {
        let k_count = settings.mixtures;
        let match_d2 = settings.match_sigma * settings.match_sigma;

        // Find the closest matching component, if any.
        let mut matched: Option<(usize, f32)> = None;
        for k in 0..k_count {
            if self.weights[[k, y, x]] <= 0.0 {
                continue;
            }
            let var = self.variances[[k, y, x]];
            let mut d2 = 0.0;
            for c in 0..3 {
                let d = color[c] - self.means[[k, y, x, c]];
                d2 += d * d;
            }
            if d2 < match_d2 * var && matched.map_or(true, |(_, best)| d2 / var < best) {
                matched = Some((k, d2 / var));
            }
        }

        if alpha > 0.0 {
            match matched {
                Some((m, _)) => {
                    let mut d2 = 0.0;
                    for c in 0..3 {
                        let d = color[c] - self.means[[m, y, x, c]];
                        d2 += d * d;
                    }
                    for k in 0..k_count {
                        let hit = if k == m { 1.0 } else { 0.0 };
                        let w = self.weights[[k, y, x]];
                        self.weights[[k, y, x]] = (1.0 - alpha) * w + alpha * hit;
                    }
                    let rho = alpha;
                    for c in 0..3 {
                        let mean = self.means[[m, y, x, c]];
                        self.means[[m, y, x, c]] = mean + rho * (color[c] - mean);
                    }
                    let var = self.variances[[m, y, x]];
                    self.variances[[m, y, x]] =
                        ((1.0 - rho) * var + rho * d2).max(settings.variance_floor);
                }
                None => {
                    // Replace the weakest component with the new observation.
                    let mut weakest = 0;
                    for k in 1..k_count {
                        if self.weights[[k, y, x]] < self.weights[[weakest, y, x]] {
                            weakest = k;
                        }
                    }
                    self.weights[[weakest, y, x]] = alpha;
                    for c in 0..3 {
                        self.means[[weakest, y, x, c]] = color[c];
                    }
                    self.variances[[weakest, y, x]] = settings.initial_variance;
                }
            }
            let total: f32 = (0..k_count).map(|k| self.weights[[k, y, x]]).sum();
            if total > 0.0 {
                for k in 0..k_count {
                    self.weights[[k, y, x]] /= total;
                }
            }
        }

        let Some((m, _)) = matched else {
            return 1.0;
        };
        if self.is_background(x, y, m, settings) {
            0.0
        } else {
            1.0
        }
    }

    /// Background components are the best-supported ones (weight over spread)
    /// whose cumulative weight covers `background_ratio` of the total.
    fn is_background(&self, x: usize, y: usize, component: usize, settings: &SegmenterSettings) -> bool {
        let k_count = settings.mixtures;
        let mut order: Vec<usize> = (0..k_count).collect();
        order.sort_by(|&a, &b| {
            let fa = self.weights[[a, y, x]] / self.variances[[a, y, x]].sqrt();
            let fb = self.weights[[b, y, x]] / self.variances[[b, y, x]].sqrt();
            fb.partial_cmp(&fa).unwrap()
        });
        let total: f32 = (0..k_count).map(|k| self.weights[[k, y, x]]).sum();
        let mut cumulative = 0.0;
        for &k in &order {
            if k == component {
                return true;
            }
            cumulative += self.weights[[k, y, x]];
            if cumulative >= settings.background_ratio * total {
                break;
            }
        }
        false
    }
}

/// Adaptive foreground/background classifier.
///
/// Learns a statistical model of the stationary scene for the first
/// `learning_frames` frames, then locks adaptation so the operator is not
/// absorbed into the background. `forget` re-enters the learning phase.
pub struct Segmenter {
    settings: SegmenterSettings,
    model: Option<SceneModel>,
    frame_count: u32,
}

impl Segmenter {
    pub fn new(settings: SegmenterSettings) -> Self {
        Self {
            settings,
            model: None,
            frame_count: 0,
        }
    }

    /// True while the scene model is still adapting.
    pub fn is_learning(&self) -> bool {
        self.frame_count < self.settings.learning_frames
    }

    /// Frames consumed since construction or the last `forget`.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Discard the scene model and re-enter the learning phase. Used when the
    /// physical background changes.
    pub fn forget(&mut self) {
        self.model = None;
        self.frame_count = 0;
    }

    /// Classify one camera frame into a raw foreground-confidence mask.
    ///
    /// Panics if the frame resolution differs from the resolution the model
    /// was established with; resolution is fixed for the model's lifetime.
    pub fn compute_mask(&mut self, frame: &RgbImage) -> Mask {
        let (width, height) = frame.dimensions();
        if let Some(model) = &self.model {
            assert_eq!(
                (width, height),
                (model.width, model.height),
                "frame resolution changed under an established scene model"
            );
        }

        let observed = if self.settings.pre_blur > 1 {
            imgproc::box_blur_rgb(frame, self.settings.pre_blur)
        } else {
            frame.clone()
        };

        if self.model.is_none() {
            self.model = Some(SceneModel::new(&observed, &self.settings));
        }

        let alpha = if self.frame_count < self.settings.learning_frames {
            self.frame_count += 1;
            1.0 / self.frame_count as f32
        } else {
            0.0
        };

        let settings = self.settings;
        let model = self.model.as_mut().unwrap();
        let (w, h) = (width as usize, height as usize);
        let mut data = vec![0.0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                let px = observed.get_pixel(x as u32, y as u32);
                let color = [px[0] as f32, px[1] as f32, px[2] as f32];
                data[y * w + x] = model.observe(x, y, color, alpha, &settings);
            }
        }
        Mask::from_raw(width, height, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat_frame(w: u32, h: u32, v: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([v, v, v]))
    }

    #[test]
    fn learning_spans_exactly_thirty_frames() {
        let mut seg = Segmenter::new(SegmenterSettings::default());
        let frame = flat_frame(8, 6, 90);
        for _ in 0..29 {
            seg.compute_mask(&frame);
            assert!(seg.is_learning());
        }
        seg.compute_mask(&frame);
        assert!(!seg.is_learning());
    }

    #[test]
    fn forget_rearms_learning() {
        let mut seg = Segmenter::new(SegmenterSettings::default());
        let frame = flat_frame(8, 6, 90);
        for _ in 0..30 {
            seg.compute_mask(&frame);
        }
        assert!(!seg.is_learning());
        seg.forget();
        assert!(seg.is_learning());
        assert_eq!(seg.frame_count(), 0);
    }

    #[test]
    fn static_scene_is_classified_background() {
        let mut seg = Segmenter::new(SegmenterSettings::default());
        let frame = flat_frame(10, 10, 120);
        let mut mask = seg.compute_mask(&frame);
        for _ in 0..29 {
            mask = seg.compute_mask(&frame);
        }
        assert!(mask.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn scene_change_after_learning_is_foreground() {
        let mut seg = Segmenter::new(SegmenterSettings::default());
        let scene = flat_frame(10, 10, 40);
        for _ in 0..30 {
            seg.compute_mask(&scene);
        }
        let intruder = flat_frame(10, 10, 220);
        let mask = seg.compute_mask(&intruder);
        assert!(mask.as_slice().iter().all(|&v| v == 1.0));
        // Steady phase: the model must not have absorbed the intruder.
        let back = seg.compute_mask(&scene);
        assert!(back.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn mask_values_stay_normalized() {
        let mut seg = Segmenter::new(SegmenterSettings::default());
        let mut frame = flat_frame(12, 9, 30);
        frame.put_pixel(5, 5, Rgb([250, 10, 80]));
        let mask = seg.compute_mask(&frame);
        assert_eq!(mask.dimensions(), (12, 9));
        assert!(mask.as_slice().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    #[should_panic(expected = "resolution changed")]
    fn resolution_change_is_a_contract_violation() {
        let mut seg = Segmenter::new(SegmenterSettings::default());
        seg.compute_mask(&flat_frame(8, 6, 90));
        seg.compute_mask(&flat_frame(6, 8, 90));
    }
}
