//! Storage strategies for bins behind one contract.
//!
//! - [`MemoryBinStore`]: dense array in memory, for grids that fit
//! - [`FileBinStore`]: dense array in one memory-mapped file
//! - [`QuadTreeBinStore`]: sparse tiles on disk through a bounded buffer pool
//!
//! [`BinStoreFactory`] picks one of them from the grid size, or from the
//! storage type tag persisted in a context when reopening.

use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::str::FromStr;

use crate::bin::Bin;
use crate::errors::{BinStoreError, BinStoreResult};
use crate::grid::{GridPoint, Locator};

pub mod factory;
pub mod file;
pub mod memory;
pub mod quadtree;

pub use factory::{BinStoreFactory, DEFAULT_MEMORY_THRESHOLD};
pub use file::FileBinStore;
pub use memory::MemoryBinStore;
pub use quadtree::QuadTreeBinStore;

/// A store of one bin per grid cell.
///
/// Cells that were never written read back as zero vectors.
pub trait BinStore: Send + Sync {
    /// Stores `bin` at `pos`.
    fn write(&self, pos: GridPoint, bin: &dyn Bin) -> BinStoreResult<()>;

    /// Loads the bin stored at `pos` into `bin`.
    fn read(&self, pos: GridPoint, bin: &mut dyn Bin) -> BinStoreResult<()>;

    /// Writes pending data to disk, if the store has any.
    fn flush(&self) -> BinStoreResult<()>;

    /// Flushes and closes this store. Further reads and writes fail.
    fn close(&self) -> BinStoreResult<()>;

    /// Closes this store and removes everything it persisted.
    fn delete(&self) -> BinStoreResult<()>;

    /// Number of floats per bin.
    fn num_vars(&self) -> usize;

    fn storage_type(&self) -> StorageType;
}

/// Tag identifying a [`BinStore`] implementation, persisted for reopening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StorageType {
    Memory,
    File,
    QuadTree,
}

impl StorageType {
    pub fn tag(self) -> &'static str {
        match self {
            StorageType::Memory => "memory",
            StorageType::File => "file",
            StorageType::QuadTree => "quadtree",
        }
    }
}

impl Display for StorageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for StorageType {
    type Err = BinStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "file" => Ok(StorageType::File),
            "quadtree" => Ok(StorageType::QuadTree),
            other => Err(BinStoreError::UnsupportedStorageType(other.to_string())),
        }
    }
}

/// Float range of the cell at `pos` in a dense, locator-indexed array.
pub(crate) fn cell_range(
    locator: &dyn Locator,
    pos: GridPoint,
    num_vars: usize,
) -> BinStoreResult<Range<usize>> {
    if pos.x >= locator.width() || pos.y >= locator.height() {
        return Err(BinStoreError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width: locator.width(),
            height: locator.height(),
        });
    }
    let index = locator.row_col_to_index(pos);
    if index >= locator.num_cells() {
        return Err(BinStoreError::InvalidOperation(format!(
            "Locator maps {} to cell {} but only has {} cells",
            pos,
            index,
            locator.num_cells()
        )));
    }
    let start = index * num_vars;
    Ok(start..start + num_vars)
}
