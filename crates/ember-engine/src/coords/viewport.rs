/// Viewport rectangle in device pixels.
///
/// The windowing layer reports this whenever the drawable changes size. A new
/// context may come with a different surface, so a canvas drops its cached
/// viewport on context detach.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Full-surface viewport anchored at the origin.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width over height; `1.0` for degenerate viewports.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_valid() {
            self.width as f32 / self.height as f32
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_is_invalid() {
        assert!(!Viewport::from_size(0, 10).is_valid());
        assert!(!Viewport::from_size(10, 0).is_valid());
        assert!(Viewport::from_size(1, 1).is_valid());
    }

    #[test]
    fn aspect_of_degenerate_viewport_is_one() {
        assert_eq!(Viewport::from_size(0, 0).aspect(), 1.0);
        assert_eq!(Viewport::new(5, 5, 200, 100).aspect(), 2.0);
    }
}
