//! Error types shared by every bin store implementation.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while creating, opening or accessing a bin store
#[derive(Debug, Error)]
pub enum BinStoreError {
    /// The target directory is missing and could not be created, or it
    /// exists but is not a directory.
    #[error("Invalid storage directory: {0}")]
    ConfigDirectoryInvalid(PathBuf),

    /// A metadata file lacks a required key or holds an unreadable value.
    #[error("Corrupt metadata in {path}: missing or invalid key '{key}'")]
    CorruptMetadata { path: PathBuf, key: String },

    /// A persisted storage type tag names no known implementation.
    #[error("Unsupported storage type: {0}")]
    UnsupportedStorageType(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Cell ({x}, {y}) lies outside the {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("Expected a vector of {expected} values, got {actual}")]
    VectorLength { expected: usize, actual: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Store is closed")]
    Closed,
}

impl BinStoreError {
    pub(crate) fn corrupt_metadata(path: impl Into<PathBuf>, key: &str) -> Self {
        BinStoreError::CorruptMetadata {
            path: path.into(),
            key: key.to_string(),
        }
    }
}

/// Result type for bin store operations
pub type BinStoreResult<T> = Result<T, BinStoreError>;
