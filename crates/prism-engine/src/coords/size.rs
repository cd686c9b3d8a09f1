/// Drawable size in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero-area sizes occur while a window is minimized; nothing can be
    /// allocated or drawn at that size.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `height / width`, the ratio the projection frustum is keyed on.
    ///
    /// Returns `1.0` for empty sizes so callers never divide by zero.
    #[inline]
    pub fn inverse_aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.height as f32 / self.width as f32
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for PixelSize {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}
