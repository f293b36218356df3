//! Persistence of the database metadata file.

use std::path::{Path, PathBuf};

use crate::errors::{BinStoreError, BinStoreResult};
use crate::properties::{read_properties, write_properties, Properties};

use super::qt_constants::{
    KEY_BUFFERS, KEY_HEIGHT, KEY_NUM_VARS, KEY_TILE_SIZE, KEY_WIDTH, METADATA_FILE_NAME,
};

/// Everything needed to rebuild a database from its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DatabaseMetadata {
    pub width: usize,
    pub height: usize,
    pub tile_size: usize,
    pub buffers: usize,
    pub num_vars: usize,
}

impl DatabaseMetadata {
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(METADATA_FILE_NAME)
    }

    /// Read metadata from `dir`. A missing file, a missing key or a value
    /// that is not a number is reported as corrupt metadata.
    pub fn read(dir: &Path) -> BinStoreResult<Self> {
        let path = Self::file_path(dir);
        if !path.is_file() {
            return Err(BinStoreError::corrupt_metadata(&path, KEY_WIDTH));
        }
        let props = read_properties(&path)?;

        Ok(Self {
            width: required(&props, &path, KEY_WIDTH)?,
            height: required(&props, &path, KEY_HEIGHT)?,
            tile_size: required(&props, &path, KEY_TILE_SIZE)?,
            buffers: required(&props, &path, KEY_BUFFERS)?,
            num_vars: required(&props, &path, KEY_NUM_VARS)?,
        })
    }

    pub fn write(&self, dir: &Path) -> BinStoreResult<()> {
        write_properties(
            &Self::file_path(dir),
            "quad-tree bin database",
            [
                (KEY_WIDTH, self.width.to_string()),
                (KEY_HEIGHT, self.height.to_string()),
                (KEY_TILE_SIZE, self.tile_size.to_string()),
                (KEY_BUFFERS, self.buffers.to_string()),
                (KEY_NUM_VARS, self.num_vars.to_string()),
            ],
        )
    }
}

fn required(props: &Properties, path: &Path, key: &str) -> BinStoreResult<usize> {
    props
        .get(key)
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| BinStoreError::corrupt_metadata(path, key))
}
