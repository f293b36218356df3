//! Selection of a bin store implementation.

use log::debug;

use crate::context::BinStoreContext;
use crate::errors::{BinStoreError, BinStoreResult};
use crate::grid::Locator;
use crate::quadtree::{ensure_directory, DEFAULT_TILE_SIZE};

use super::{BinStore, FileBinStore, MemoryBinStore, QuadTreeBinStore, StorageType};

/// Grids with fewer floats than this are binned in memory
pub const DEFAULT_MEMORY_THRESHOLD: usize = 20_000_000;

/// Creates and reopens bin stores.
///
/// ## Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use binstore::{BinStoreFactory, DirectoryContext, RectangularLocator};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = DirectoryContext::new(Arc::new(RectangularLocator::new(8640, 4320)), "/tmp/l3");
/// let factory = BinStoreFactory::default();
///
/// let store = factory.create_temporal_store(&ctx, 5)?;
/// store.close()?;
///
/// let store = factory.open_store(&ctx)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BinStoreFactory {
    memory_threshold: usize,
    tile_size: usize,
}

impl Default for BinStoreFactory {
    fn default() -> Self {
        Self {
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl BinStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of floats below which spatial stores stay in memory
    pub fn with_memory_threshold(mut self, memory_threshold: usize) -> Self {
        self.memory_threshold = memory_threshold;
        self
    }

    /// Set the tile size of quad-tree stores
    pub fn with_tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn memory_threshold(&self) -> usize {
        self.memory_threshold
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Implementation a spatial store over this grid would use
    pub fn spatial_storage_type(&self, locator: &dyn Locator, num_vars: usize) -> StorageType {
        let floats = locator
            .width()
            .saturating_mul(locator.height())
            .saturating_mul(num_vars);
        if floats < self.memory_threshold {
            StorageType::Memory
        } else {
            StorageType::QuadTree
        }
    }

    /// Store for single-pass accumulation: in memory when the grid is small
    /// enough, otherwise a quad-tree in the context's directory.
    pub fn create_spatial_store(
        &self,
        ctx: &dyn BinStoreContext,
        num_vars: usize,
    ) -> BinStoreResult<Box<dyn BinStore>> {
        let locator = ctx.locator();
        let storage_type = self.spatial_storage_type(locator.as_ref(), num_vars);
        debug!(
            "Creating {} spatial store for {}x{} cells x {} vars",
            storage_type,
            locator.width(),
            locator.height(),
            num_vars
        );
        match storage_type {
            StorageType::Memory => Ok(Box::new(MemoryBinStore::new(locator, num_vars))),
            _ => Ok(Box::new(QuadTreeBinStore::create_with_tile_size(
                ctx.storage_dir(),
                locator.as_ref(),
                num_vars,
                self.tile_size,
            )?)),
        }
    }

    /// Store for persisted, multi-pass accumulation. Always a quad-tree; the
    /// storage type is recorded in the context for [`Self::open_store`].
    pub fn create_temporal_store(
        &self,
        ctx: &dyn BinStoreContext,
        num_vars: usize,
    ) -> BinStoreResult<Box<dyn BinStore>> {
        let locator = ctx.locator();
        ensure_directory(ctx.storage_dir())?;
        let store = QuadTreeBinStore::create_with_tile_size(
            ctx.storage_dir(),
            locator.as_ref(),
            num_vars,
            self.tile_size,
        )?;
        ctx.persist_storage_type(StorageType::QuadTree)?;
        debug!(
            "Created temporal store in {}",
            ctx.storage_dir().display()
        );
        Ok(Box::new(store))
    }

    /// Persisted dense store in a single file, recorded in the context.
    pub fn create_file_store(
        &self,
        ctx: &dyn BinStoreContext,
        num_vars: usize,
    ) -> BinStoreResult<Box<dyn BinStore>> {
        ensure_directory(ctx.storage_dir())?;
        let store = FileBinStore::create(ctx.storage_dir(), ctx.locator(), num_vars)?;
        ctx.persist_storage_type(StorageType::File)?;
        Ok(Box::new(store))
    }

    /// Reopen the store recorded in the context.
    pub fn open_store(&self, ctx: &dyn BinStoreContext) -> BinStoreResult<Box<dyn BinStore>> {
        let dir = ctx.storage_dir();
        if !dir.is_dir() {
            return Err(BinStoreError::ConfigDirectoryInvalid(dir.to_path_buf()));
        }

        let tag = ctx.storage_type_tag()?.unwrap_or_default();
        let storage_type: StorageType = tag.parse()?;
        debug!("Reopening {} store in {}", storage_type, dir.display());
        match storage_type {
            StorageType::QuadTree => Ok(Box::new(QuadTreeBinStore::open(dir)?)),
            StorageType::File => Ok(Box::new(FileBinStore::open(dir, ctx.locator())?)),
            StorageType::Memory => Err(BinStoreError::UnsupportedStorageType(tag)),
        }
    }
}
