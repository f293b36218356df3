//! Disk layer for tile files.
//!
//! A tile file is a raw array of `tile_len` native-endian f32 values. Tiles
//! are always read and written whole, one seek to offset 0 and one transfer.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{ByteOrder, NativeEndian, ReadBytesExt};

use crate::errors::{BinStoreError, BinStoreResult};

/// Reads and writes whole tiles of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct TileStorage {
    tile_len: usize,
}

impl TileStorage {
    pub fn new(tile_len: usize) -> Self {
        Self { tile_len }
    }

    /// Size of a tile file in bytes
    pub fn file_size(&self) -> u64 {
        (self.tile_len * std::mem::size_of::<f32>()) as u64
    }

    /// Create the backing file of a new tile, explicitly filled with zeros.
    pub fn create(&self, path: &Path) -> BinStoreResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let zeros = vec![0u8; self.file_size() as usize];
        file.write_all(&zeros)?;
        Ok(())
    }

    /// Read a whole tile into `data`.
    pub fn read(&self, path: &Path, data: &mut [f32]) -> BinStoreResult<()> {
        self.check_len(data.len())?;
        let mut file = File::open(path)?;
        file.read_f32_into::<NativeEndian>(data)?;
        Ok(())
    }

    /// Overwrite a whole tile with `data`.
    pub fn write(&self, path: &Path, data: &[f32]) -> BinStoreResult<()> {
        self.check_len(data.len())?;
        let mut bytes = vec![0u8; self.file_size() as usize];
        NativeEndian::write_f32_into(data, &mut bytes);

        let mut file = OpenOptions::new().write(true).open(path)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bytes)?;
        Ok(())
    }

    fn check_len(&self, len: usize) -> BinStoreResult<()> {
        if len != self.tile_len {
            return Err(BinStoreError::VectorLength {
                expected: self.tile_len,
                actual: len,
            });
        }
        Ok(())
    }
}
