//! Disk-based quad-tree for bins that do not fit in memory.
//!
//! The grid is recursively split into quadrants down to a fixed depth. Each
//! quadrant at that depth is a tile stored in its own file. Only tiles that
//! were written to exist, and only a fixed number of them are held in memory
//! at any time:
//! - Tile files named by their path from the root (`1`=NW, `2`=NE, `3`=SE, `4`=SW)
//! - A buffer pool that evicts the oldest assignment, flushing it first
//! - Tree reconstruction from file names when reopening
//! - Text metadata describing the grid

pub mod qt_types;
pub mod qt_constants;
pub mod buffer_pool;
pub mod tile_storage;
pub mod metadata;
mod qt_impl;

pub use qt_types::{Bounds, Extent, Lifecycle, Quadrant, QuadTreeStats, TileGeometry};
pub use qt_constants::DEFAULT_TILE_SIZE;
pub use metadata::DatabaseMetadata;
pub use qt_impl::QuadTreeDatabase;
pub(crate) use qt_impl::ensure_directory;
