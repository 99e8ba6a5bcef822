//! Grid view traits and the array-backed reference implementation.

use crate::point::Point;

/// Read access to a rectangular grid of values.
///
/// Positions run from `(0, 0)` (top-left) to `(width - 1, height - 1)`.
/// Accessing a position outside those bounds is a programmer error and
/// panics; use [`contains`](GridView::contains) to pre-check speculative
/// positions.
pub trait GridView<T: Copy> {
    /// Width of the grid in cells.
    fn width(&self) -> usize;

    /// Height of the grid in cells.
    fn height(&self) -> usize;

    /// The value at `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is outside the grid bounds.
    fn get(&self, pos: Point) -> T;

    /// Whether `pos` lies within the grid bounds.
    fn contains(&self, pos: Point) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && (pos.x as usize) < self.width()
            && (pos.y as usize) < self.height()
    }

    /// Total number of cells.
    fn cell_count(&self) -> usize {
        self.width() * self.height()
    }
}

/// Write access to a rectangular grid of values.
pub trait GridViewMut<T: Copy>: GridView<T> {
    /// Set the value at `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is outside the grid bounds.
    fn set(&mut self, pos: Point, value: T);

    /// Set every cell to `value`.
    fn fill(&mut self, value: T) {
        for y in 0..self.height() as i32 {
            for x in 0..self.width() as i32 {
                self.set(Point::new(x, y), value);
            }
        }
    }
}

/// A row-major `Vec`-backed grid view.
///
/// The reference implementation of [`GridViewMut`], used as the substrate
/// under `DiffAwareGridView` and throughout the test suites.
///
/// # Examples
///
/// ```
/// use strata_core::{ArrayView, GridView, GridViewMut, Point};
///
/// let mut view = ArrayView::new(4, 3, 0u8);
/// view.set(Point::new(2, 1), 7);
/// assert_eq!(view.get(Point::new(2, 1)), 7);
/// assert_eq!(view.get(Point::new(0, 0)), 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayView<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Copy> ArrayView<T> {
    /// Create a view of the given dimensions with every cell set to `fill`.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    /// Construct from existing row-major cell data.
    ///
    /// # Panics
    ///
    /// Panics if `cells.len() != width * height` or a dimension is zero.
    pub fn from_cells(width: usize, height: usize, cells: Vec<T>) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be non-zero");
        assert_eq!(
            cells.len(),
            width * height,
            "cell data length {} does not match {}x{}",
            cells.len(),
            width,
            height
        );
        Self {
            width,
            height,
            cells,
        }
    }

    /// The raw row-major cell slice.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    fn checked_index(&self, pos: Point) -> usize {
        assert!(
            GridView::contains(self, pos),
            "position {pos} out of bounds for {}x{} grid",
            self.width,
            self.height
        );
        pos.to_index(self.width)
    }
}

impl<T: Copy> GridView<T> for ArrayView<T> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn get(&self, pos: Point) -> T {
        self.cells[self.checked_index(pos)]
    }
}

impl<T: Copy> GridViewMut<T> for ArrayView<T> {
    fn set(&mut self, pos: Point, value: T) {
        let idx = self.checked_index(pos);
        self.cells[idx] = value;
    }
}
