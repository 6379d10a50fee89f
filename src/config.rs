/// Resolution and frame rate of the capture device, fixed for the lifetime
/// of the pipeline. Established once at startup and passed by reference into
/// every component that needs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl FrameSpec {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
