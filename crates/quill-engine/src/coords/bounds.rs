use super::Vec2;

/// Axis-aligned bounding box of a stroke, in stroke-local pixels.
///
/// Stored as min/max corners, matching what the stroke-geometry producer emits.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    #[inline]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min: Vec2::new(min_x, min_y),
            max: Vec2::new(max_x, max_y),
        }
    }

    #[inline]
    pub fn width(self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// True when `max` lies left of or above `min`.
    ///
    /// Zero-area boxes are not inverted: a straight stroke may have no height.
    #[inline]
    pub fn is_inverted(self) -> bool {
        self.width() < 0.0 || self.height() < 0.0
    }

    /// Side of the square that the fixed raster covers.
    ///
    /// The raster is square, so the longer side wins; degenerate (zero-height,
    /// zero-width) strokes still get a one-pixel extent.
    #[inline]
    pub fn square_extent(self) -> f32 {
        self.width().max(self.height()).max(1.0)
    }

    /// Grows the box by `amount` on every side.
    #[inline]
    pub fn inflated(self, amount: f32) -> Self {
        Self {
            min: Vec2::new(self.min.x - amount, self.min.y - amount),
            max: Vec2::new(self.max.x + amount, self.max.y + amount),
        }
    }

    /// Smallest box containing all `points`, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Self { min: first, max: first };
        for p in iter {
            b.min.x = b.min.x.min(p.x);
            b.min.y = b.min.y.min(p.y);
            b.max.x = b.max.x.max(p.x);
            b.max.y = b.max.y.max(p.y);
        }
        Some(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x0: f32, y0: f32, x1: f32, y1: f32) -> Bounds { Bounds::new(x0, y0, x1, y1) }

    // ── extent ────────────────────────────────────────────────────────────

    #[test]
    fn square_extent_uses_longer_side() {
        assert_eq!(b(0.0, -5.0, 100.0, 5.0).square_extent(), 100.0);
        assert_eq!(b(0.0, 0.0, 3.0, 40.0).square_extent(), 40.0);
    }

    #[test]
    fn square_extent_of_degenerate_box_is_one() {
        assert_eq!(b(4.0, 4.0, 4.0, 4.0).square_extent(), 1.0);
    }

    // ── orientation ───────────────────────────────────────────────────────

    #[test]
    fn swapped_corners_are_inverted() {
        assert!(b(10.0, 0.0, 0.0, 10.0).is_inverted());
        assert!(b(0.0, 10.0, 10.0, 0.0).is_inverted());
        assert!(!b(0.0, 0.0, 1.0, 1.0).is_inverted());
    }

    #[test]
    fn flat_box_is_not_inverted() {
        assert!(!b(0.0, 5.0, 100.0, 5.0).is_inverted());
    }

    #[test]
    fn nan_corner_is_not_finite() {
        assert!(!b(f32::NAN, 0.0, 1.0, 1.0).is_finite());
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn from_points_covers_all() {
        let bb = Bounds::from_points([
            Vec2::new(3.0, -1.0),
            Vec2::new(-2.0, 4.0),
            Vec2::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bb, b(-2.0, -1.0, 3.0, 4.0));
    }

    #[test]
    fn from_no_points_is_none() {
        assert!(Bounds::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn inflated_grows_every_side() {
        assert_eq!(b(0.0, 0.0, 10.0, 2.0).inflated(1.5), b(-1.5, -1.5, 11.5, 3.5));
    }
}
