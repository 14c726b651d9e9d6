use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Logical size of a layer, surface or texture in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are at least one pixel
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of a tightly packed buffer with `channels` bytes per texel
    #[inline]
    pub fn byte_len(&self, channels: usize) -> usize {
        self.pixel_count() * channels
    }

    #[inline]
    pub fn as_uvec2(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[inline]
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Larger of the two dimensions
    #[inline]
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Axis-aligned integer pixel region
///
/// Bounds handed to a surface are expected to lie inside it; helpers such as
/// [`Bounds::clamp_to`] produce a possibly empty region when they do not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole surface of the given size
    pub const fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge, saturating at `u32::MAX`
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    #[inline]
    pub fn origin(&self) -> UVec2 {
        UVec2::new(self.x, self.y)
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.size().pixel_count()
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when the region lies entirely inside a surface of `size`
    #[inline]
    pub fn fits_within(&self, size: Size) -> bool {
        let fits = |start: u32, len: u32, limit: u32| start.checked_add(len).is_some_and(|end| end <= limit);
        fits(self.x, self.width, size.width) && fits(self.y, self.height, size.height)
    }

    /// Intersection of two regions (empty when they do not overlap)
    pub fn intersect(&self, other: &Bounds) -> Bounds {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return Bounds::new(x0, y0, 0, 0);
        }
        Bounds::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Smallest region containing both; empty operands are ignored
    pub fn union(&self, other: &Bounds) -> Bounds {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Bounds::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Union of two optional regions
    pub fn union_opt(a: Option<Bounds>, b: Option<Bounds>) -> Option<Bounds> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// Clip to a surface of `size`
    pub fn clamp_to(&self, size: Size) -> Bounds {
        self.intersect(&Bounds::full(size))
    }

    /// Shift by `offset` in the positive direction
    pub fn translate(&self, offset: UVec2) -> Bounds {
        Bounds::new(
            self.x.saturating_add(offset.x),
            self.y.saturating_add(offset.y),
            self.width,
            self.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_and_union() {
        let a = Bounds::new(0, 0, 10, 10);
        let b = Bounds::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Bounds::new(5, 5, 5, 5));
        assert_eq!(a.union(&b), Bounds::new(0, 0, 15, 15));

        let c = Bounds::new(20, 20, 2, 2);
        assert!(a.intersect(&c).is_empty());
        assert_eq!(Bounds::default().union(&c), c);
    }

    #[test]
    fn test_clamp_and_fit() {
        let size = Size::new(8, 6);
        let b = Bounds::new(6, 4, 5, 5);
        assert!(!b.fits_within(size));
        assert_eq!(b.clamp_to(size), Bounds::new(6, 4, 2, 2));
        assert!(Bounds::new(10, 0, 1, 1).clamp_to(size).is_empty());
        assert!(Bounds::full(size).fits_within(size));
    }

    #[test]
    fn test_edges_near_u32_max() {
        let b = Bounds::new(u32::MAX, 0, 2, 1);
        assert_eq!(b.right(), u32::MAX);
        assert!(!b.fits_within(Size::new(u32::MAX, 1)));
        assert!(!Bounds::new(0, u32::MAX - 1, 1, 2).fits_within(Size::new(1, u32::MAX)));
        assert!(Bounds::new(u32::MAX - 1, 0, 1, 1).fits_within(Size::new(u32::MAX, 1)));

        let near = Bounds::new(u32::MAX - 4, u32::MAX - 4, 10, 10);
        assert_eq!(near.intersect(&Bounds::new(0, 0, 4, 4)), Bounds::new(u32::MAX - 4, u32::MAX - 4, 0, 0));
        assert_eq!(
            near.union(&Bounds::new(u32::MAX - 6, u32::MAX - 6, 1, 1)),
            Bounds::new(u32::MAX - 6, u32::MAX - 6, 6, 6)
        );
    }

    #[test]
    fn test_union_opt() {
        let a = Some(Bounds::new(1, 1, 2, 2));
        assert_eq!(Bounds::union_opt(a, None), a);
        assert_eq!(Bounds::union_opt(None, a), a);
        assert_eq!(
            Bounds::union_opt(a, Some(Bounds::new(4, 0, 1, 1))),
            Some(Bounds::new(1, 0, 4, 3))
        );
    }

    #[test]
    fn test_size_helpers() {
        let size = Size::new(3, 2);
        assert_eq!(size.byte_len(4), 24);
        assert_eq!(size.max_dimension(), 3);
        assert!(!Size::new(0, 2).is_valid());
    }
}
