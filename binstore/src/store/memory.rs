//! Dense in-memory bin store.

use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::bin::Bin;
use crate::errors::{BinStoreError, BinStoreResult};
use crate::grid::{GridPoint, Locator};

use super::{cell_range, BinStore, StorageType};

/// Keeps `num_cells * num_vars` floats in one vector.
///
/// Nothing is persisted: `flush` does nothing and `delete` just drops the
/// data. Used for single-pass accumulation over grids small enough to fit.
pub struct MemoryBinStore {
    locator: Arc<dyn Locator>,
    num_vars: usize,
    data: RwLock<Vec<f32>>,
    closed: RwLock<bool>,
}

impl MemoryBinStore {
    pub fn new(locator: Arc<dyn Locator>, num_vars: usize) -> Self {
        let len = locator.num_cells() * num_vars;
        debug!(
            "Allocating in-memory bin store for {} cells x {} vars",
            locator.num_cells(),
            num_vars
        );
        Self {
            locator,
            num_vars,
            data: RwLock::new(vec![0.0; len]),
            closed: RwLock::new(false),
        }
    }

    fn check_closed(&self) -> BinStoreResult<()> {
        if *self.closed.read() {
            Err(BinStoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl BinStore for MemoryBinStore {
    fn write(&self, pos: GridPoint, bin: &dyn Bin) -> BinStoreResult<()> {
        self.check_closed()?;
        let range = cell_range(self.locator.as_ref(), pos, self.num_vars)?;
        bin.save(&mut self.data.write()[range]);
        Ok(())
    }

    fn read(&self, pos: GridPoint, bin: &mut dyn Bin) -> BinStoreResult<()> {
        self.check_closed()?;
        let range = cell_range(self.locator.as_ref(), pos, self.num_vars)?;
        bin.load(&self.data.read()[range]);
        Ok(())
    }

    fn flush(&self) -> BinStoreResult<()> {
        self.check_closed()
    }

    fn close(&self) -> BinStoreResult<()> {
        *self.closed.write() = true;
        Ok(())
    }

    fn delete(&self) -> BinStoreResult<()> {
        self.close()?;
        let mut data = self.data.write();
        data.clear();
        data.shrink_to_fit();
        Ok(())
    }

    fn num_vars(&self) -> usize {
        self.num_vars
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}
