#![forbid(unsafe_code)]

//! Geometric primitives in screen space.
//!
//! All coordinates are `f32` points in a space shared by the button layout
//! and the popup renderer (origin at top-left, `y` grows downward).

use std::ops::{Add, Sub};

/// A 2D point (or translation vector) in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    /// Create a new size.
    #[inline]
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle used for button bounds and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: f32,
    /// Top edge (inclusive).
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when the rectangle has no area.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point is inside the rectangle (half-open on right/bottom).
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Grow the rectangle by `fraction` of its own size on every side.
    ///
    /// A fraction of `1.0` adds a full button width to the left and to the
    /// right (and a full height above and below). Zero or negative fractions
    /// return the rectangle unchanged.
    #[must_use]
    pub fn expanded_by_fraction(&self, fraction: f32) -> Rect {
        if !(fraction > 0.0) {
            return *self;
        }
        let dx = self.width * fraction;
        let dy = self.height * fraction;
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(29.9, 29.9)));
        assert!(!r.contains(Point::new(30.0, 15.0)));
        assert!(!r.contains(Point::new(15.0, 30.0)));
        assert!(!r.contains(Point::new(9.9, 15.0)));
    }

    #[test]
    fn expanded_by_full_fraction_adds_one_size_per_side() {
        let r = Rect::new(100.0, 0.0, 40.0, 40.0);
        let e = r.expanded_by_fraction(1.0);
        assert_eq!(e, Rect::new(60.0, -40.0, 120.0, 120.0));
    }

    #[test]
    fn zero_fraction_is_identity() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(r.expanded_by_fraction(0.0), r);
        assert_eq!(r.expanded_by_fraction(-0.5), r);
        assert_eq!(r.expanded_by_fraction(f32::NAN), r);
    }

    #[test]
    fn center_and_edges() {
        let r = Rect::new(100.0, 0.0, 40.0, 40.0);
        assert_eq!(r.center(), Point::new(120.0, 20.0));
        assert_eq!(r.right(), 140.0);
        assert_eq!(r.bottom(), 40.0);
        assert_eq!(r.size(), Size::new(40.0, 40.0));
    }

    #[test]
    fn point_arithmetic() {
        let a = Point::new(5.0, 7.0);
        let b = Point::new(2.0, 10.0);
        assert_eq!(a - b, Point::new(3.0, -3.0));
        assert_eq!(a + b, Point::new(7.0, 17.0));
        assert_eq!(Point::from((1.0, 2.0)), Point::new(1.0, 2.0));
    }

    #[test]
    fn empty_rect() {
        assert!(Rect::default().is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
