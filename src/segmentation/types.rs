/// Per-pixel foreground confidence: 0.0 = background, 1.0 = foreground.
/// Dimensions always match the frame the mask was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    /// Wrap an existing row-major plane. Panics if the buffer length does not
    /// match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize,
            "mask buffer length must equal width * height"
        );
        Self {
            width,
            height,
            data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_checks_length() {
        let mask = Mask::from_raw(2, 3, vec![0.0; 6]);
        assert_eq!(mask.dimensions(), (2, 3));
        assert_eq!(mask.get(1, 2), 0.0);
    }

    #[test]
    #[should_panic(expected = "mask buffer length")]
    fn from_raw_rejects_wrong_length() {
        let _ = Mask::from_raw(2, 3, vec![0.0; 5]);
    }
}
