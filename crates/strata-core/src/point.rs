//! The [`Point`] position key.

use std::fmt;
use std::ops::{Add, Sub};

/// An immutable 2D integer coordinate, used as the universal position key.
///
/// Equality and hashing are value-based, so `Point` is suitable as a hash
/// map key. Conversions to and from a flattened row-major index are
/// provided for array-backed grid storage.
///
/// # Examples
///
/// ```
/// use strata_core::Point;
///
/// let p = Point::new(3, 4);
/// assert_eq!(p + Point::new(1, 1), Point::new(4, 5));
/// assert_eq!(p.to_index(10), 43);
/// assert_eq!(Point::from_index(43, 10), p);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    /// Horizontal component.
    pub x: i32,
    /// Vertical component.
    pub y: i32,
}

impl Point {
    /// Create a point from its components.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Flatten to a row-major index for a grid of the given width.
    ///
    /// Callers are responsible for ensuring the point lies within the
    /// grid; no bounds check is performed here.
    pub const fn to_index(self, width: usize) -> usize {
        self.y as usize * width + self.x as usize
    }

    /// Reconstruct a point from a row-major index and grid width.
    pub const fn from_index(index: usize, width: usize) -> Self {
        Self {
            x: (index % width) as i32,
            y: (index / width) as i32,
        }
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

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
