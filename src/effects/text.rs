use image::{Rgb, RgbImage};

use super::font5x7;

const DEFAULT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const DEFAULT_SCALE: u32 = 2;

/// Draws literal text at a fixed position. Stateless beyond its parameters.
#[derive(Debug, Clone)]
pub struct TextOverlay {
    text: String,
    position: (u32, u32),
    color: Rgb<u8>,
    scale: u32,
}

impl TextOverlay {
    pub fn new(text: impl Into<String>, position: (u32, u32)) -> Self {
        Self {
            text: text.into(),
            position,
            color: DEFAULT_COLOR,
            scale: DEFAULT_SCALE,
        }
    }

    pub fn with_color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }

    /// Render onto the frame, clipping at the frame edges. Characters outside
    /// the font table advance the cursor without drawing.
    pub fn draw(&self, frame: &mut RgbImage) {
        let (fw, fh) = frame.dimensions();
        let advance = (font5x7::GLYPH_WIDTH + 1) * self.scale;
        let mut pen_x = self.position.0;
        let pen_y = self.position.1;

        for c in self.text.chars() {
            if let Some(columns) = font5x7::glyph(c) {
                for (col, bits) in columns.iter().enumerate() {
                    for row in 0..font5x7::GLYPH_HEIGHT {
                        if bits & (1 << row) == 0 {
                            continue;
                        }
                        for sx in 0..self.scale {
                            for sy in 0..self.scale {
                                let x = pen_x + col as u32 * self.scale + sx;
                                let y = pen_y + row * self.scale + sy;
                                if x < fw && y < fh {
                                    frame.put_pixel(x, y, self.color);
                                }
                            }
                        }
                    }
                }
            }
            pen_x += advance;
        }
    }
}
