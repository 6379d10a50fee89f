mod font5x7;
mod hologram;
mod shadow;
mod text;

pub use hologram::Hologram;
pub use shadow::Shadow;
pub use text::TextOverlay;

use image::RgbImage;

use crate::segmentation::Mask;

/// Frame state an effect may mutate during one iteration, before
/// compositing. Shadow and text work on the background frame (they must show
/// through where the mask is background); hologram stylizes the pre-blend
/// output frame so the composite blends the stylized foreground.
pub struct EffectCtx<'a> {
    pub background: &'a mut RgbImage,
    pub output: &'a mut RgbImage,
    pub mask: &'a Mask,
}

/// Closed set of effect variants, applied in registration order.
pub enum Effect {
    Shadow(Shadow),
    Hologram(Hologram),
    Text(TextOverlay),
}

impl Effect {
    pub fn apply(&self, ctx: &mut EffectCtx<'_>) {
        match self {
            Effect::Shadow(e) => e.apply(ctx.background, ctx.mask),
            Effect::Hologram(e) => e.apply(ctx.output),
            Effect::Text(e) => e.draw(ctx.background),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn shadow_variant_touches_background_only() {
        let mut background = RgbImage::from_pixel(40, 40, Rgb([100, 100, 100]));
        let mut output = RgbImage::from_pixel(40, 40, Rgb([50, 50, 50]));
        let mut mask = Mask::new(40, 40);
        for y in 5..15 {
            for x in 5..15 {
                mask.set(x, y, 1.0);
            }
        }
        let output_before = output.clone();
        let effect = Effect::Shadow(Shadow::new(0.7, 5));
        effect.apply(&mut EffectCtx {
            background: &mut background,
            output: &mut output,
            mask: &mask,
        });
        assert_eq!(output, output_before);
        assert!(background.pixels().any(|p| p[0] < 100));
    }

    #[test]
    fn hologram_variant_touches_output_only() {
        let mut background = RgbImage::from_pixel(20, 20, Rgb([100, 100, 100]));
        let mut output = RgbImage::from_pixel(20, 20, Rgb([50, 90, 130]));
        let mask = Mask::new(20, 20);
        let background_before = background.clone();
        let output_before = output.clone();
        let effect = Effect::Hologram(Hologram);
        effect.apply(&mut EffectCtx {
            background: &mut background,
            output: &mut output,
            mask: &mask,
        });
        assert_eq!(background, background_before);
        assert_ne!(output, output_before);
    }
}
