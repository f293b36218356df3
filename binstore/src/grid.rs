//! Grid addressing: cell positions and the locator capability.

use std::fmt::{Display, Formatter};

/// A cell position in the grid. `x` is the column, `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
}

impl GridPoint {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Creates a point from a `(row, col)` pair.
    pub fn from_row_col(row: usize, col: usize) -> Self {
        Self { x: col, y: row }
    }

    pub fn row(&self) -> usize {
        self.y
    }

    pub fn col(&self) -> usize {
        self.x
    }
}

impl Display for GridPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(row {}, col {})", self.y, self.x)
    }
}

/// Maps grid positions onto a linear cell index.
///
/// Implementations describe the geometry of the grid a store is sized for.
/// How that geometry is derived (projection, planetary grid, ...) is up to
/// the caller.
pub trait Locator: Send + Sync {
    /// Linear index of the cell at `point`.
    fn row_col_to_index(&self, point: GridPoint) -> usize;

    /// Total number of cells addressed by this locator.
    fn num_cells(&self) -> usize;

    fn width(&self) -> usize;

    fn height(&self) -> usize;
}

/// A plain row-major `width x height` grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RectangularLocator {
    width: usize,
    height: usize,
}

impl RectangularLocator {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, point: GridPoint) -> bool {
        point.x < self.width && point.y < self.height
    }
}

impl Locator for RectangularLocator {
    fn row_col_to_index(&self, point: GridPoint) -> usize {
        point.y * self.width + point.x
    }

    fn num_cells(&self) -> usize {
        self.width * self.height
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }
}
