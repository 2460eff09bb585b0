#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Coordinates are signed 32-bit integers in screen space, origin at the
//! top-left. A [`Rectangle`] is half-open: `min` is inside, `max` is not.

use std::ops::{Add, Div, Mul, Sub};

/// Largest coordinate magnitude used by the "huge" clip rectangle.
pub const HUGE: i32 = 0x3FFF_FFFF;

/// Largest pixel area accepted by [`Rectangle::is_bad`].
pub const MAX_AREA: i64 = 1 << 28;

/// A point in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// The origin.
    pub const ZERO: Point = Point { x: 0, y: 0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Check if the point lies inside `r`.
    #[inline]
    pub const fn in_rect(self, r: Rectangle) -> bool {
        self.x >= r.min.x && self.x < r.max.x && self.y >= r.min.y && self.y < r.max.y
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x.wrapping_add(rhs.x), self.y.wrapping_add(rhs.y))
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x.wrapping_sub(rhs.x), self.y.wrapping_sub(rhs.y))
    }
}

impl Mul<i32> for Point {
    type Output = Point;

    fn mul(self, k: i32) -> Point {
        Point::new(self.x.wrapping_mul(k), self.y.wrapping_mul(k))
    }
}

impl Div<i32> for Point {
    type Output = Point;

    fn div(self, k: i32) -> Point {
        if k == 0 {
            return self;
        }
        Point::new(self.x / k, self.y / k)
    }
}

/// An axis-aligned rectangle, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub min: Point,
    pub max: Point,
}

impl Rectangle {
    /// The empty rectangle at the origin.
    pub const ZERO: Rectangle = Rectangle::new(0, 0, 0, 0);

    /// The canonical clip rectangle of a replicated image.
    pub const HUGE: Rectangle = Rectangle::new(-HUGE, -HUGE, HUGE, HUGE);

    /// Create a rectangle from its corner coordinates (no canonicalization).
    #[inline]
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: Point::new(x0, y0),
            max: Point::new(x1, y1),
        }
    }

    /// Create a rectangle from two corner points.
    #[inline]
    pub const fn from_points(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Create a rectangle at `min` with the given size.
    #[inline]
    pub const fn with_size(min: Point, width: i32, height: i32) -> Self {
        Self::new(min.x, min.y, min.x + width, min.y + height)
    }

    /// Width in pixels.
    #[inline]
    pub const fn dx(&self) -> i32 {
        self.max.x - self.min.x
    }

    /// Height in pixels.
    #[inline]
    pub const fn dy(&self) -> i32 {
        self.max.y - self.min.y
    }

    /// Size as a point (`dx`, `dy`).
    #[inline]
    pub const fn size(&self) -> Point {
        Point::new(self.dx(), self.dy())
    }

    /// Check if the rectangle has no pixels.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.dx() <= 0 || self.dy() <= 0
    }

    /// Check if the rectangle is unusable as an image bound: zero or
    /// negative extent in either axis, or an area above 2^28 pixels.
    pub fn is_bad(&self) -> bool {
        let x = i64::from(self.max.x) - i64::from(self.min.x);
        let y = i64::from(self.max.y) - i64::from(self.min.y);
        if x <= 0 || y <= 0 {
            return true;
        }
        x.saturating_mul(y) > MAX_AREA
    }

    /// Return the rectangle with `min` and `max` swapped per axis where needed.
    #[must_use]
    pub fn canon(&self) -> Rectangle {
        let mut r = *self;
        if r.max.x < r.min.x {
            std::mem::swap(&mut r.min.x, &mut r.max.x);
        }
        if r.max.y < r.min.y {
            std::mem::swap(&mut r.min.y, &mut r.max.y);
        }
        r
    }

    /// Translate by `p`.
    #[must_use]
    pub fn add_pt(&self, p: Point) -> Rectangle {
        Rectangle::from_points(self.min + p, self.max + p)
    }

    /// Translate by `-p`.
    #[must_use]
    pub fn sub_pt(&self, p: Point) -> Rectangle {
        Rectangle::from_points(self.min - p, self.max - p)
    }

    /// Shrink by `n` on every side (grow when `n` is negative).
    ///
    /// An axis narrower than `2n` collapses to a zero-width strip at its
    /// midpoint.
    #[must_use]
    pub fn inset(&self, n: i32) -> Rectangle {
        let mut r = *self;
        if self.dx() < 2 * n {
            let mid = (self.min.x + self.max.x) / 2;
            r.min.x = mid;
            r.max.x = mid;
        } else {
            r.min.x += n;
            r.max.x -= n;
        }
        if self.dy() < 2 * n {
            let mid = (self.min.y + self.max.y) / 2;
            r.min.y = mid;
            r.max.y = mid;
        } else {
            r.min.y += n;
            r.max.y -= n;
        }
        r
    }

    /// Check if the two rectangles share at least one pixel.
    #[inline]
    pub const fn overlaps(&self, other: &Rectangle) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Check if `other` lies entirely inside this rectangle.
    #[inline]
    pub const fn contains_rect(&self, other: &Rectangle) -> bool {
        self.min.x <= other.min.x
            && other.max.x <= self.max.x
            && self.min.y <= other.min.y
            && other.max.y <= self.max.y
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub const fn contains(&self, p: Point) -> bool {
        p.in_rect(*self)
    }

    /// Clip this rectangle to `container` in place.
    ///
    /// Returns `false` (leaving `self` unchanged) when they do not overlap.
    pub fn clip(&mut self, container: &Rectangle) -> bool {
        if !self.overlaps(container) {
            return false;
        }
        *self = self.intersection(container);
        true
    }

    /// Intersection of the two rectangles, possibly empty.
    #[must_use]
    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        Rectangle::new(
            self.min.x.max(other.min.x),
            self.min.y.max(other.min.y),
            self.max.x.min(other.max.x),
            self.max.y.min(other.max.y),
        )
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn combine(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rectangle::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
        )
    }
}

/// Map `x` into `[min, max)` as if the interval tiled the whole line.
///
/// Degenerate intervals (`max <= min`) map everything to `min`.
pub fn drawreplxy(min: i32, max: i32, x: i32) -> i32 {
    let span = i64::from(max) - i64::from(min);
    if span <= 0 {
        return min;
    }
    let sx = (i64::from(x) - i64::from(min)).rem_euclid(span);
    (sx + i64::from(min)) as i32
}

/// Map `p` into `r` by tiling, per axis.
pub fn drawrepl(r: Rectangle, p: Point) -> Point {
    Point::new(
        drawreplxy(r.min.x, r.max.x, p.x),
        drawreplxy(r.min.y, r.max.y, p.y),
    )
}
