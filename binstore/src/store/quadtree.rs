//! Bin store facade over a [`QuadTreeDatabase`].

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::bin::Bin;
use crate::errors::BinStoreResult;
use crate::grid::{GridPoint, Locator};
use crate::quadtree::{ensure_directory, QuadTreeDatabase, DEFAULT_TILE_SIZE};

use super::{BinStore, StorageType};

/// Name of the database directory created below the store directory
pub const DATABASE_DIR_NAME: &str = "quadtree";

/// Stores bins in a quad-tree database kept in the `quadtree` subdirectory
/// of the store directory.
pub struct QuadTreeBinStore {
    db: QuadTreeDatabase,
    /// Serialization buffer of `num_vars` floats
    scratch: Mutex<Vec<f32>>,
}

impl QuadTreeBinStore {
    /// Create a new store sized for `locator` with the default tile size.
    pub fn create(
        dir: impl AsRef<Path>,
        locator: &dyn Locator,
        num_vars: usize,
    ) -> BinStoreResult<Self> {
        Self::create_with_tile_size(dir, locator, num_vars, DEFAULT_TILE_SIZE)
    }

    /// Create with a custom tile size. Starts with one buffer per tile
    /// column plus one; the database may raise that when it opens.
    pub fn create_with_tile_size(
        dir: impl AsRef<Path>,
        locator: &dyn Locator,
        num_vars: usize,
        tile_size: usize,
    ) -> BinStoreResult<Self> {
        let dir = dir.as_ref();
        ensure_directory(dir)?;
        let num_buffers = locator.width() / tile_size.max(1) + 1;
        let db = QuadTreeDatabase::create(
            Self::database_dir(dir),
            locator.width(),
            locator.height(),
            tile_size,
            num_buffers,
            num_vars,
        )?;
        Ok(Self::wrap(db))
    }

    /// Reopen a store created earlier in `dir`. The number of variables is
    /// taken from the database metadata.
    pub fn open(dir: impl AsRef<Path>) -> BinStoreResult<Self> {
        let db = QuadTreeDatabase::open(Self::database_dir(dir.as_ref()))?;
        Ok(Self::wrap(db))
    }

    fn wrap(db: QuadTreeDatabase) -> Self {
        let num_vars = db.num_vars();
        Self {
            db,
            scratch: Mutex::new(vec![0.0; num_vars]),
        }
    }

    pub fn database_dir(dir: &Path) -> PathBuf {
        dir.join(DATABASE_DIR_NAME)
    }

    /// The underlying database, for statistics and diagnostics
    pub fn database(&self) -> &QuadTreeDatabase {
        &self.db
    }
}

impl BinStore for QuadTreeBinStore {
    fn write(&self, pos: GridPoint, bin: &dyn Bin) -> BinStoreResult<()> {
        let mut scratch = self.scratch.lock();
        scratch.fill(0.0);
        bin.save(&mut scratch);
        self.db.write(pos, &scratch)
    }

    fn read(&self, pos: GridPoint, bin: &mut dyn Bin) -> BinStoreResult<()> {
        let mut scratch = self.scratch.lock();
        self.db.read(pos, &mut scratch)?;
        bin.load(&scratch);
        Ok(())
    }

    fn flush(&self) -> BinStoreResult<()> {
        self.db.flush()
    }

    fn close(&self) -> BinStoreResult<()> {
        self.db.close()
    }

    fn delete(&self) -> BinStoreResult<()> {
        self.db.delete()
    }

    fn num_vars(&self) -> usize {
        self.db.num_vars()
    }

    fn storage_type(&self) -> StorageType {
        StorageType::QuadTree
    }
}
