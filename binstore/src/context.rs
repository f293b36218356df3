//! Where a store lives and how it was created.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{BinStoreError, BinStoreResult};
use crate::grid::Locator;
use crate::properties::{read_properties, write_properties};
use crate::store::StorageType;

/// Name of the file holding the storage type tag
pub const CONTEXT_FILE_NAME: &str = "store.properties";

const KEY_STORAGE_TYPE: &str = "storage_type";

/// Supplies the grid, the storage directory and the persisted storage type
/// a store is created or reopened with.
pub trait BinStoreContext {
    fn locator(&self) -> Arc<dyn Locator>;

    fn storage_dir(&self) -> &Path;

    /// Tag recorded when the store was created, if any.
    fn storage_type_tag(&self) -> BinStoreResult<Option<String>>;

    /// Record the tag used to reopen the store later.
    fn persist_storage_type(&self, storage_type: StorageType) -> BinStoreResult<()>;
}

/// A context backed by a directory; the tag is kept in
/// `<dir>/store.properties`.
#[derive(Clone)]
pub struct DirectoryContext {
    locator: Arc<dyn Locator>,
    dir: PathBuf,
}

impl DirectoryContext {
    pub fn new(locator: Arc<dyn Locator>, dir: impl Into<PathBuf>) -> Self {
        Self {
            locator,
            dir: dir.into(),
        }
    }

    fn context_file(&self) -> PathBuf {
        self.dir.join(CONTEXT_FILE_NAME)
    }
}

impl BinStoreContext for DirectoryContext {
    fn locator(&self) -> Arc<dyn Locator> {
        self.locator.clone()
    }

    fn storage_dir(&self) -> &Path {
        &self.dir
    }

    fn storage_type_tag(&self) -> BinStoreResult<Option<String>> {
        let path = self.context_file();
        if !path.is_file() {
            return Ok(None);
        }
        Ok(read_properties(&path)?.remove(KEY_STORAGE_TYPE))
    }

    fn persist_storage_type(&self, storage_type: StorageType) -> BinStoreResult<()> {
        if !self.dir.is_dir() {
            return Err(BinStoreError::ConfigDirectoryInvalid(self.dir.clone()));
        }
        write_properties(
            &self.context_file(),
            "bin store context",
            [(KEY_STORAGE_TYPE, storage_type.tag().to_string())],
        )
    }
}
