//! Core types of the quad-tree bin database.
//!
//! - Tile geometry derived from grid size and tile size
//! - Quadrant routing and child bounds
//! - Arena elements (nodes and leaves)
//! - Statistics and diagnostic extents

use std::path::PathBuf;

use crate::errors::{BinStoreError, BinStoreResult};
use crate::grid::GridPoint;

use super::qt_constants::QUADRANT_DIGITS;

/// Index of a node or leaf in the database arena
pub type ElementId = usize;

/// Index of a slot in the buffer pool
pub type SlotId = usize;

// ============================================================================
// Geometry
// ============================================================================

/// Depth and tile dimensions of a quad-tree over a `width x height` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Depth at which nodes stop splitting and become leaves (at least 1)
    pub num_layers: usize,
    /// Width of the largest leaf; also the row stride inside every tile file
    pub tile_width: usize,
    /// Height of the largest leaf
    pub tile_height: usize,
}

impl TileGeometry {
    /// `num_layers = ceil(log2(max(width, height) / tile_size))`, minimum 1.
    pub fn compute(width: usize, height: usize, tile_size: usize) -> BinStoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(BinStoreError::InvalidOperation(format!(
                "Grid must not be empty, got {}x{}",
                width, height
            )));
        }
        if tile_size == 0 {
            return Err(BinStoreError::InvalidOperation(
                "Tile size must be positive".to_string(),
            ));
        }

        // An overflowing span already covers any grid
        let extent = width.max(height);
        let mut num_layers = 1;
        let mut span = tile_size.checked_mul(2);
        while let Some(covered) = span {
            if covered >= extent {
                break;
            }
            num_layers += 1;
            span = covered.checked_mul(2);
        }

        let divisions = 1usize
            .checked_shl(num_layers as u32)
            .unwrap_or(usize::MAX);
        Ok(Self {
            num_layers,
            tile_width: width.div_ceil(divisions),
            tile_height: height.div_ceil(divisions),
        })
    }

    /// Number of floats held by one tile
    pub fn tile_len(&self, num_vars: usize) -> usize {
        self.tile_width * self.tile_height * num_vars
    }

    /// Slots needed so that a whole scanline of tiles fits in memory at once
    pub fn min_buffers(&self, width: usize) -> usize {
        width.div_ceil(self.tile_width) + 1
    }
}

// ============================================================================
// Bounds and quadrants
// ============================================================================

/// One of the four children of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthEast = 2,
    SouthWest = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
        Quadrant::SouthWest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn digit(self) -> char {
        QUADRANT_DIGITS[self.index()]
    }

    /// Layer index of this quadrant's child under `parent`.
    pub fn child_layer_index(self, parent: &str) -> String {
        let mut index = String::with_capacity(parent.len() + 1);
        index.push(self.digit());
        index.push_str(parent);
        index
    }
}

/// A rectangular region of the grid, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Bounds {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Split point of this region. West and north halves take the floor.
    pub fn split_point(&self) -> (usize, usize) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn quadrant_of(&self, pos: GridPoint) -> Quadrant {
        let (div_x, div_y) = self.split_point();
        match (pos.x < div_x, pos.y < div_y) {
            (true, true) => Quadrant::NorthWest,
            (false, true) => Quadrant::NorthEast,
            (false, false) => Quadrant::SouthEast,
            (true, false) => Quadrant::SouthWest,
        }
    }

    /// Bounds of the given child quadrant.
    pub fn quadrant_bounds(&self, quadrant: Quadrant) -> Bounds {
        let west = self.width / 2;
        let east = self.width - west;
        let north = self.height / 2;
        let south = self.height - north;
        let (div_x, div_y) = self.split_point();

        match quadrant {
            Quadrant::NorthWest => Bounds::new(self.x, self.y, west, north),
            Quadrant::NorthEast => Bounds::new(div_x, self.y, east, north),
            Quadrant::SouthEast => Bounds::new(div_x, div_y, east, south),
            Quadrant::SouthWest => Bounds::new(self.x, div_y, west, south),
        }
    }

    pub fn contains(&self, pos: GridPoint) -> bool {
        pos.x >= self.x
            && pos.y >= self.y
            && pos.x < self.x + self.width
            && pos.y < self.y + self.height
    }
}

// ============================================================================
// Arena elements
// ============================================================================

/// Internal quadrant splitter
#[derive(Debug)]
pub struct NodeElement {
    pub bounds: Bounds,
    pub layer_index: String,
    pub children: [Option<ElementId>; 4],
}

/// A tile backed by exactly one file
#[derive(Debug)]
pub struct LeafElement {
    pub bounds: Bounds,
    pub layer_index: String,
    pub path: PathBuf,
    /// Pool slot currently held, if any
    pub slot: Option<SlotId>,
}

impl LeafElement {
    /// Float offset of `pos` inside this tile's buffer.
    pub fn offset_of(&self, pos: GridPoint, tile_width: usize, num_vars: usize) -> usize {
        debug_assert!(self.bounds.contains(pos), "{} outside {:?}", pos, self.bounds);
        ((pos.y - self.bounds.y) * tile_width + (pos.x - self.bounds.x)) * num_vars
    }
}

#[derive(Debug)]
pub enum Element {
    Node(NodeElement),
    Leaf(LeafElement),
}

impl Element {
    pub fn layer_index(&self) -> &str {
        match self {
            Element::Node(node) => &node.layer_index,
            Element::Leaf(leaf) => &leaf.layer_index,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Element::Leaf(_))
    }
}

// ============================================================================
// Lifecycle, statistics, extents
// ============================================================================

/// Where a database handle is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Freshly created, no tile files yet
    Created,
    /// Reopened from an existing directory
    Opened,
    Closed,
    Deleted,
}

impl Lifecycle {
    pub fn is_active(self) -> bool {
        matches!(self, Lifecycle::Created | Lifecycle::Opened)
    }
}

/// Statistics about quad-tree operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadTreeStats {
    pub node_count: u64,
    pub leaf_count: u64,
    pub buffer_slots: u64,
    pub resident_buffers: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
    pub evictions: u64,
}

/// Inclusive row/column range touched by writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
}

impl Extent {
    pub fn of(pos: GridPoint) -> Self {
        Self {
            min_row: pos.y,
            max_row: pos.y,
            min_col: pos.x,
            max_col: pos.x,
        }
    }

    pub fn include(&mut self, pos: GridPoint) {
        self.min_row = self.min_row.min(pos.y);
        self.max_row = self.max_row.max(pos.y);
        self.min_col = self.min_col.min(pos.x);
        self.max_col = self.max_col.max(pos.x);
    }
}
