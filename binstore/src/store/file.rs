//! Dense bin store in a single memory-mapped file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::{ByteOrder, NativeEndian};
use log::debug;
use memmap2::{MmapMut, MmapOptions};
use parking_lot::RwLock;

use crate::bin::Bin;
use crate::errors::{BinStoreError, BinStoreResult};
use crate::grid::{GridPoint, Locator};
use crate::properties::{read_properties, write_properties};
use crate::quadtree::ensure_directory;

use super::{cell_range, BinStore, StorageType};

/// Name of the data file inside the store directory
pub const DATA_FILE_NAME: &str = "bins.dat";

/// Name of the metadata file inside the store directory
pub const METADATA_FILE_NAME: &str = "flatfile.properties";

const KEY_NUM_CELLS: &str = "num_cells";
const KEY_NUM_VARS: &str = "num_vars";

const ZERO_CHUNK: usize = 1 << 20;

/// Keeps every bin of the grid in `bins.dat`, `num_cells * num_vars`
/// native-endian floats addressed through the locator.
///
/// The file is fully allocated and zero-filled at creation. The operating
/// system pages it in and out; `flush` syncs the mapping to disk.
pub struct FileBinStore {
    dir: PathBuf,
    locator: Arc<dyn Locator>,
    num_vars: usize,
    mmap: RwLock<Option<MmapMut>>,
}

impl FileBinStore {
    /// Create a new zero-filled store in `dir`.
    pub fn create(
        dir: impl AsRef<Path>,
        locator: Arc<dyn Locator>,
        num_vars: usize,
    ) -> BinStoreResult<Self> {
        let dir = dir.as_ref();
        let num_cells = locator.num_cells();
        if num_cells == 0 || num_vars == 0 {
            return Err(BinStoreError::InvalidOperation(format!(
                "Cannot create a flat-file store for {} cells x {} vars",
                num_cells, num_vars
            )));
        }
        ensure_directory(dir)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(dir.join(DATA_FILE_NAME))?;
        let mut remaining = num_cells * num_vars * std::mem::size_of::<f32>();
        let zeros = vec![0u8; ZERO_CHUNK.min(remaining)];
        while remaining > 0 {
            let n = zeros.len().min(remaining);
            file.write_all(&zeros[..n])?;
            remaining -= n;
        }
        file.flush()?;

        write_properties(
            &dir.join(METADATA_FILE_NAME),
            "flat-file bin store",
            [
                (KEY_NUM_CELLS, num_cells.to_string()),
                (KEY_NUM_VARS, num_vars.to_string()),
            ],
        )?;
        debug!(
            "Created flat-file bin store at {} ({} cells x {} vars)",
            dir.display(),
            num_cells,
            num_vars
        );

        Self::map(dir, locator, num_vars, &file)
    }

    /// Open an existing store. The locator must describe the same number of
    /// cells the store was created with.
    pub fn open(dir: impl AsRef<Path>, locator: Arc<dyn Locator>) -> BinStoreResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(BinStoreError::ConfigDirectoryInvalid(dir.to_path_buf()));
        }

        let meta_path = dir.join(METADATA_FILE_NAME);
        if !meta_path.is_file() {
            return Err(BinStoreError::corrupt_metadata(&meta_path, KEY_NUM_CELLS));
        }
        let props = read_properties(&meta_path)?;
        let read_key = |key: &str| -> BinStoreResult<usize> {
            props
                .get(key)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| BinStoreError::corrupt_metadata(&meta_path, key))
        };
        let num_cells = read_key(KEY_NUM_CELLS)?;
        let num_vars = read_key(KEY_NUM_VARS)?;

        if num_cells != locator.num_cells() {
            return Err(BinStoreError::InvalidOperation(format!(
                "Store at {} holds {} cells but the locator describes {}",
                dir.display(),
                num_cells,
                locator.num_cells()
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(dir.join(DATA_FILE_NAME))?;
        let expected = (num_cells * num_vars * std::mem::size_of::<f32>()) as u64;
        if file.metadata()?.len() != expected {
            return Err(BinStoreError::InvalidOperation(format!(
                "{} is not {} bytes long",
                dir.join(DATA_FILE_NAME).display(),
                expected
            )));
        }

        debug!("Opened flat-file bin store at {}", dir.display());
        Self::map(dir, locator, num_vars, &file)
    }

    fn map(
        dir: &Path,
        locator: Arc<dyn Locator>,
        num_vars: usize,
        file: &File,
    ) -> BinStoreResult<Self> {
        let mmap = unsafe { MmapOptions::new().map_mut(file)? };
        Ok(Self {
            dir: dir.to_path_buf(),
            locator,
            num_vars,
            mmap: RwLock::new(Some(mmap)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn byte_range(&self, pos: GridPoint) -> BinStoreResult<std::ops::Range<usize>> {
        let range = cell_range(self.locator.as_ref(), pos, self.num_vars)?;
        let size = std::mem::size_of::<f32>();
        Ok(range.start * size..range.end * size)
    }
}

impl BinStore for FileBinStore {
    fn write(&self, pos: GridPoint, bin: &dyn Bin) -> BinStoreResult<()> {
        let range = self.byte_range(pos)?;
        let mut values = vec![0.0f32; self.num_vars];
        bin.save(&mut values);

        let mut guard = self.mmap.write();
        let mmap = guard.as_mut().ok_or(BinStoreError::Closed)?;
        NativeEndian::write_f32_into(&values, &mut mmap[range]);
        Ok(())
    }

    fn read(&self, pos: GridPoint, bin: &mut dyn Bin) -> BinStoreResult<()> {
        let range = self.byte_range(pos)?;
        let mut values = vec![0.0f32; self.num_vars];
        {
            let guard = self.mmap.read();
            let mmap = guard.as_ref().ok_or(BinStoreError::Closed)?;
            NativeEndian::read_f32_into(&mmap[range], &mut values);
        }
        bin.load(&values);
        Ok(())
    }

    fn flush(&self) -> BinStoreResult<()> {
        let guard = self.mmap.read();
        let mmap = guard.as_ref().ok_or(BinStoreError::Closed)?;
        mmap.flush()?;
        Ok(())
    }

    fn close(&self) -> BinStoreResult<()> {
        let mut guard = self.mmap.write();
        if let Some(mmap) = guard.take() {
            mmap.flush()?;
            debug!("Closed flat-file bin store at {}", self.dir.display());
        }
        Ok(())
    }

    fn delete(&self) -> BinStoreResult<()> {
        self.close()?;
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    fn num_vars(&self) -> usize {
        self.num_vars
    }

    fn storage_type(&self) -> StorageType {
        StorageType::File
    }
}
