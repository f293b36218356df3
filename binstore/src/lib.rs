//! # Binstore - Out-of-Core Bin Storage for Large Grids
//!
//! This crate stores one fixed-length vector of floats ("bin") per cell of a
//! large 2D grid, such as a global binning grid of a satellite product, when
//! the full grid does not fit in memory.
//!
//! ## Features
//!
//! - **Sparse Tiles**: A quad-tree splits the grid into tiles; only tiles that were written exist on disk
//! - **Bounded Memory**: A fixed pool of tile buffers, flushed before reuse
//! - **Persistent**: Tile files and metadata survive process restarts
//! - **Thread Safe**: Stores are `Send + Sync` and usable through `&self`
//! - **Pluggable**: In-memory, flat-file and quad-tree stores behind one trait
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use binstore::{BinStoreFactory, DirectoryContext, GridPoint, RectangularLocator, VectorBin};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = DirectoryContext::new(Arc::new(RectangularLocator::new(4320, 2160)), "/tmp/bins");
//! let store = BinStoreFactory::default().create_temporal_store(&ctx, 3)?;
//!
//! store.write(GridPoint::from_row_col(1000, 2000), &VectorBin::from_values(vec![1.0, 2.0, 3.0]))?;
//!
//! let mut bin = VectorBin::new(3);
//! store.read(GridPoint::from_row_col(1000, 2000), &mut bin)?;
//! store.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Quad-Tree API
//!
//! ```rust,no_run
//! use binstore::{GridPoint, QuadTreeDatabase};
//! use tempfile::tempdir;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempdir()?;
//! let db = QuadTreeDatabase::create(dir.path(), 1000, 500, 64, 17, 2)?;
//!
//! db.write(GridPoint::new(10, 20), &[0.5, 1.5])?;
//! db.close()?;
//!
//! let db = QuadTreeDatabase::open(dir.path())?;
//! let mut values = [0.0f32; 2];
//! db.read(GridPoint::new(10, 20), &mut values)?;
//! # Ok(())
//! # }
//! ```

pub mod bin;
pub mod context;
pub mod errors;
pub mod grid;
pub mod properties;
pub mod quadtree;
pub mod store;

pub use bin::{Bin, VectorBin};
pub use context::{BinStoreContext, DirectoryContext};
pub use errors::{BinStoreError, BinStoreResult};
pub use grid::{GridPoint, Locator, RectangularLocator};
pub use quadtree::{DatabaseMetadata, QuadTreeDatabase, QuadTreeStats, TileGeometry};
pub use store::{
    BinStore, BinStoreFactory, FileBinStore, MemoryBinStore, QuadTreeBinStore, StorageType,
};
