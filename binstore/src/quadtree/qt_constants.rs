//! Constants for the quad-tree bin database.

/// Default edge length of a tile in cells
pub const DEFAULT_TILE_SIZE: usize = 64;

/// Name of the metadata file inside a database directory
pub const METADATA_FILE_NAME: &str = "quadtree.properties";

/// Extension of tile files (without the dot)
pub const TILE_FILE_EXTENSION: &str = "dat";

/// Metadata keys
pub const KEY_WIDTH: &str = "width";
pub const KEY_HEIGHT: &str = "height";
pub const KEY_TILE_SIZE: &str = "tile_size";
pub const KEY_BUFFERS: &str = "buffers";
pub const KEY_NUM_VARS: &str = "num_vars";

/// Layer index digits, in quadrant order NW, NE, SE, SW
pub const QUADRANT_DIGITS: [char; 4] = ['1', '2', '3', '4'];
