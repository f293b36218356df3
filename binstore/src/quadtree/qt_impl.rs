//! QuadTreeDatabase implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::errors::{BinStoreError, BinStoreResult};
use crate::grid::GridPoint;

use super::buffer_pool::BufferPool;
use super::metadata::DatabaseMetadata;
use super::qt_constants::{QUADRANT_DIGITS, TILE_FILE_EXTENSION};
use super::qt_types::{
    Bounds, Element, ElementId, Extent, LeafElement, Lifecycle, NodeElement, Quadrant,
    QuadTreeStats, SlotId, TileGeometry,
};
use super::tile_storage::TileStorage;

const ROOT: ElementId = 0;

/// An out-of-core store of fixed-length float vectors over a 2D grid.
///
/// The grid is covered by a sparse quad-tree whose leaves are tiles, each
/// backed by one `<layer index>.dat` file in the database directory. Tiles
/// are paged in and out through a fixed pool of buffers; a tile only exists
/// once a cell inside it has been written.
///
/// The handle is `Send + Sync`: all state sits behind one mutex, so the
/// lazy creation of quadrants and the hand-off of buffers between tiles are
/// serialised.
pub struct QuadTreeDatabase {
    dir: PathBuf,
    state: Mutex<DatabaseState>,
}

struct DatabaseState {
    dir: PathBuf,
    metadata: DatabaseMetadata,
    geometry: TileGeometry,
    storage: TileStorage,
    /// Arena of nodes and leaves, the root is always at index 0
    elements: Vec<Element>,
    pool: BufferPool,
    lifecycle: Lifecycle,
    extent: Option<Extent>,
    disk_reads: u64,
    disk_writes: u64,
    evictions: u64,
}

impl QuadTreeDatabase {
    /// Create a new, empty database in `dir` and open it.
    ///
    /// The directory is created if needed. Tile files left over from an
    /// earlier database in the same directory are removed.
    pub fn create(
        dir: impl AsRef<Path>,
        width: usize,
        height: usize,
        tile_size: usize,
        num_buffers: usize,
        num_vars: usize,
    ) -> BinStoreResult<Self> {
        let dir = dir.as_ref();
        if num_vars == 0 {
            return Err(BinStoreError::InvalidOperation(
                "A bin needs at least one variable".to_string(),
            ));
        }
        // Validates the grid before anything touches the disk
        TileGeometry::compute(width, height, tile_size)?;

        ensure_directory(dir)?;
        let stale = remove_tile_files(dir)?;
        if stale > 0 {
            debug!("Removed {} stale tile files from {}", stale, dir.display());
        }

        let metadata = DatabaseMetadata {
            width,
            height,
            tile_size,
            buffers: num_buffers,
            num_vars,
        };
        metadata.write(dir)?;
        debug!(
            "Created quad-tree database at {} ({}x{}, tile size {}, {} vars)",
            dir.display(),
            width,
            height,
            tile_size,
            num_vars
        );

        Self::load(dir, Lifecycle::Created)
    }

    /// Open an existing database.
    ///
    /// Reads the metadata and rebuilds the tree skeleton from the tile file
    /// names. No tile data is read until a cell is accessed.
    pub fn open(dir: impl AsRef<Path>) -> BinStoreResult<Self> {
        Self::load(dir.as_ref(), Lifecycle::Opened)
    }

    fn load(dir: &Path, lifecycle: Lifecycle) -> BinStoreResult<Self> {
        if !dir.is_dir() {
            return Err(BinStoreError::ConfigDirectoryInvalid(dir.to_path_buf()));
        }

        let metadata = DatabaseMetadata::read(dir)?;
        let geometry = TileGeometry::compute(metadata.width, metadata.height, metadata.tile_size)?;
        if metadata.num_vars == 0 {
            return Err(BinStoreError::corrupt_metadata(
                DatabaseMetadata::file_path(dir),
                super::qt_constants::KEY_NUM_VARS,
            ));
        }

        let tile_len = geometry.tile_len(metadata.num_vars);
        let num_buffers = metadata.buffers.max(geometry.min_buffers(metadata.width));

        let root = Element::Node(NodeElement {
            bounds: Bounds::new(0, 0, metadata.width, metadata.height),
            layer_index: String::new(),
            children: [None; 4],
        });

        let mut state = DatabaseState {
            dir: dir.to_path_buf(),
            metadata,
            geometry,
            storage: TileStorage::new(tile_len),
            elements: vec![root],
            pool: BufferPool::new(num_buffers, tile_len),
            lifecycle,
            extent: None,
            disk_reads: 0,
            disk_writes: 0,
            evictions: 0,
        };

        let names = list_tile_names(dir)?;
        state.load_children(ROOT, &names)?;

        let leaves = state.elements.iter().filter(|e| e.is_leaf()).count();
        if leaves < names.len() {
            warn!(
                "Ignored {} tile files in {} that do not belong to the tree",
                names.len() - leaves,
                dir.display()
            );
        }
        debug!(
            "Opened quad-tree database at {} ({} layers, {}x{} tiles, {} leaves, {} buffers)",
            dir.display(),
            geometry.num_layers,
            geometry.tile_width,
            geometry.tile_height,
            leaves,
            num_buffers
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    /// Read the vector stored at `pos` into `data`.
    ///
    /// Cells in quadrants that were never written read as zeros.
    pub fn read(&self, pos: GridPoint, data: &mut [f32]) -> BinStoreResult<()> {
        let mut state = self.state.lock();
        state.check_access(pos, data.len())?;
        state.read(pos, data)
    }

    /// Store `data` at `pos`, creating the tile on first write.
    pub fn write(&self, pos: GridPoint, data: &[f32]) -> BinStoreResult<()> {
        let mut state = self.state.lock();
        state.check_access(pos, data.len())?;
        let mut extent = state.extent.unwrap_or_else(|| Extent::of(pos));
        extent.include(pos);
        state.extent = Some(extent);
        state.write(pos, data)
    }

    /// Write every resident tile to its file. Buffers stay resident.
    pub fn flush(&self) -> BinStoreResult<()> {
        let mut state = self.state.lock();
        state.check_active()?;
        state.flush_element(ROOT)
    }

    /// Persist metadata, write back every resident tile and release all
    /// buffers. Closing twice is a no-op.
    pub fn close(&self) -> BinStoreResult<()> {
        let mut state = self.state.lock();
        state.close()
    }

    /// Close the database and remove its directory.
    pub fn delete(&self) -> BinStoreResult<()> {
        let mut state = self.state.lock();
        if state.lifecycle == Lifecycle::Deleted {
            return Ok(());
        }
        state.close()?;
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        state.lifecycle = Lifecycle::Deleted;
        debug!("Deleted quad-tree database at {}", self.dir.display());
        Ok(())
    }

    /// Whether an element with this layer index sits at leaf depth
    pub fn is_leaf(&self, layer_index: &str) -> bool {
        self.state.lock().is_leaf(layer_index)
    }

    /// Path of the file backing the leaf with this layer index
    pub fn leaf_file_path(&self, layer_index: &str) -> PathBuf {
        leaf_file_path(&self.dir, layer_index)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata(&self) -> DatabaseMetadata {
        self.state.lock().metadata
    }

    pub fn geometry(&self) -> TileGeometry {
        self.state.lock().geometry
    }

    pub fn num_vars(&self) -> usize {
        self.state.lock().metadata.num_vars
    }

    /// Number of buffer slots after the scanline sizing rule was applied
    pub fn num_buffers(&self) -> usize {
        self.state.lock().pool.len()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    /// Rows and columns written since this handle was created or opened
    pub fn observed_extent(&self) -> Option<Extent> {
        self.state.lock().extent
    }

    /// Layer indices of all leaves currently in the tree, sorted
    pub fn leaf_layer_indices(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut indices: Vec<String> = state
            .elements
            .iter()
            .filter(|e| e.is_leaf())
            .map(|e| e.layer_index().to_string())
            .collect();
        indices.sort();
        indices
    }

    pub fn stats(&self) -> QuadTreeStats {
        let state = self.state.lock();
        let leaf_count = state.elements.iter().filter(|e| e.is_leaf()).count() as u64;
        QuadTreeStats {
            node_count: state.elements.len() as u64 - leaf_count,
            leaf_count,
            buffer_slots: state.pool.len() as u64,
            resident_buffers: state.pool.resident() as u64,
            disk_reads: state.disk_reads,
            disk_writes: state.disk_writes,
            evictions: state.evictions,
        }
    }
}

impl Drop for QuadTreeDatabase {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.lifecycle.is_active() {
            if let Err(e) = state.flush_element(ROOT) {
                warn!(
                    "Failed to flush quad-tree database at {} on drop: {}",
                    self.dir.display(),
                    e
                );
            }
        }
    }
}

impl DatabaseState {
    fn check_active(&self) -> BinStoreResult<()> {
        if self.lifecycle.is_active() {
            Ok(())
        } else {
            Err(BinStoreError::Closed)
        }
    }

    fn check_access(&self, pos: GridPoint, len: usize) -> BinStoreResult<()> {
        self.check_active()?;
        if pos.x >= self.metadata.width || pos.y >= self.metadata.height {
            return Err(BinStoreError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                width: self.metadata.width,
                height: self.metadata.height,
            });
        }
        if len != self.metadata.num_vars {
            return Err(BinStoreError::VectorLength {
                expected: self.metadata.num_vars,
                actual: len,
            });
        }
        Ok(())
    }

    fn is_leaf(&self, layer_index: &str) -> bool {
        layer_index.len() >= self.geometry.num_layers
    }

    fn leaf(&self, id: ElementId) -> &LeafElement {
        match &self.elements[id] {
            Element::Leaf(leaf) => leaf,
            Element::Node(_) => unreachable!("element {} is not a leaf", id),
        }
    }

    fn leaf_mut(&mut self, id: ElementId) -> &mut LeafElement {
        match &mut self.elements[id] {
            Element::Leaf(leaf) => leaf,
            Element::Node(_) => unreachable!("element {} is not a leaf", id),
        }
    }

    // ------------------------------------------------------------------------
    // Tree reconstruction
    // ------------------------------------------------------------------------

    /// Instantiate every child of `node_id` whose layer index is a suffix of
    /// at least one tile file name, then recurse into it.
    fn load_children(&mut self, node_id: ElementId, names: &[String]) -> BinStoreResult<()> {
        let (bounds, parent_index) = match &self.elements[node_id] {
            Element::Node(node) => (node.bounds, node.layer_index.clone()),
            Element::Leaf(_) => return Ok(()),
        };

        for quadrant in Quadrant::ALL {
            let candidate = quadrant.child_layer_index(&parent_index);
            let matched = names
                .iter()
                .any(|name| name.len() >= candidate.len() && name.ends_with(&candidate));
            if !matched {
                continue;
            }

            let child_bounds = bounds.quadrant_bounds(quadrant);
            let child = if self.is_leaf(&candidate) {
                let path = leaf_file_path(&self.dir, &candidate);
                if !path.is_file() {
                    continue;
                }
                Element::Leaf(LeafElement {
                    bounds: child_bounds,
                    layer_index: candidate,
                    path,
                    slot: None,
                })
            } else {
                Element::Node(NodeElement {
                    bounds: child_bounds,
                    layer_index: candidate,
                    children: [None; 4],
                })
            };

            let child_id = self.push_child(node_id, quadrant, child);
            self.load_children(child_id, names)?;
        }
        Ok(())
    }

    fn push_child(&mut self, parent: ElementId, quadrant: Quadrant, child: Element) -> ElementId {
        let child_id = self.elements.len();
        self.elements.push(child);
        if let Element::Node(node) = &mut self.elements[parent] {
            node.children[quadrant.index()] = Some(child_id);
        }
        child_id
    }

    // ------------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------------

    fn read(&mut self, pos: GridPoint, data: &mut [f32]) -> BinStoreResult<()> {
        let mut id = ROOT;
        loop {
            match &self.elements[id] {
                Element::Node(node) => {
                    let child = node.children[node.bounds.quadrant_of(pos).index()];
                    match child {
                        Some(child) => id = child,
                        None => {
                            data.fill(0.0);
                            return Ok(());
                        }
                    }
                }
                Element::Leaf(_) => return self.leaf_read(id, pos, data),
            }
        }
    }

    fn write(&mut self, pos: GridPoint, data: &[f32]) -> BinStoreResult<()> {
        let mut id = ROOT;
        loop {
            match &self.elements[id] {
                Element::Node(node) => {
                    let quadrant = node.bounds.quadrant_of(pos);
                    let child = node.children[quadrant.index()];
                    id = match child {
                        Some(child) => child,
                        None => self.create_child(id, quadrant)?,
                    };
                }
                Element::Leaf(_) => return self.leaf_write(id, pos, data),
            }
        }
    }

    /// Create the missing child of `parent_id` in `quadrant`. A leaf gets its
    /// zero-filled file before it is linked into the tree.
    fn create_child(&mut self, parent_id: ElementId, quadrant: Quadrant) -> BinStoreResult<ElementId> {
        let (bounds, parent_index) = match &self.elements[parent_id] {
            Element::Node(node) => (node.bounds, node.layer_index.as_str()),
            Element::Leaf(_) => unreachable!("leaf {} has no children", parent_id),
        };
        let child_bounds = bounds.quadrant_bounds(quadrant);
        let layer_index = quadrant.child_layer_index(parent_index);

        let child = if self.is_leaf(&layer_index) {
            let path = leaf_file_path(&self.dir, &layer_index);
            self.storage.create(&path)?;
            debug!("Created tile {} for {:?}", path.display(), child_bounds);
            Element::Leaf(LeafElement {
                bounds: child_bounds,
                layer_index,
                path,
                slot: None,
            })
        } else {
            Element::Node(NodeElement {
                bounds: child_bounds,
                layer_index,
                children: [None; 4],
            })
        };

        Ok(self.push_child(parent_id, quadrant, child))
    }

    // ------------------------------------------------------------------------
    // Leaf operations
    // ------------------------------------------------------------------------

    fn leaf_read(&mut self, id: ElementId, pos: GridPoint, data: &mut [f32]) -> BinStoreResult<()> {
        let slot = self.leaf_slot(id)?;
        let offset = self
            .leaf(id)
            .offset_of(pos, self.geometry.tile_width, self.metadata.num_vars);
        data.copy_from_slice(&self.pool.data(slot)[offset..offset + data.len()]);
        Ok(())
    }

    fn leaf_write(&mut self, id: ElementId, pos: GridPoint, data: &[f32]) -> BinStoreResult<()> {
        let slot = self.leaf_slot(id)?;
        let offset = self
            .leaf(id)
            .offset_of(pos, self.geometry.tile_width, self.metadata.num_vars);
        self.pool.data_mut(slot)[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn leaf_slot(&mut self, id: ElementId) -> BinStoreResult<SlotId> {
        match self.leaf(id).slot {
            Some(slot) => Ok(slot),
            None => self.get_cache_buffer(id),
        }
    }

    /// Hand the oldest buffer slot to `leaf_id`.
    ///
    /// A previous owner is flushed and only then released, since its slot
    /// still holds the data to write back. The slot is then filled from the
    /// new owner's file.
    fn get_cache_buffer(&mut self, leaf_id: ElementId) -> BinStoreResult<SlotId> {
        let slot = self.pool.oldest();
        if let Some(previous) = self.pool.owner(slot) {
            trace!(
                "Evicting tile {} from slot {} for tile {}",
                self.leaf(previous).layer_index,
                slot,
                self.leaf(leaf_id).layer_index
            );
            self.flush_leaf(previous)?;
            self.release_leaf(previous);
            self.evictions += 1;
        }

        let path = self.leaf(leaf_id).path.clone();
        self.storage.read(&path, self.pool.data_mut(slot))?;
        self.disk_reads += 1;

        self.pool.assign(slot, leaf_id);
        self.leaf_mut(leaf_id).slot = Some(slot);
        Ok(slot)
    }

    /// Unconditional full rewrite of the leaf's file while it holds a buffer
    fn flush_leaf(&mut self, id: ElementId) -> BinStoreResult<()> {
        let leaf = self.leaf(id);
        if let Some(slot) = leaf.slot {
            self.storage.write(&leaf.path, self.pool.data(slot))?;
            self.disk_writes += 1;
        }
        Ok(())
    }

    /// Drop the leaf's buffer without writing it back
    fn release_leaf(&mut self, id: ElementId) {
        if let Some(slot) = self.leaf_mut(id).slot.take() {
            self.pool.release(slot);
        }
    }

    fn flush_element(&mut self, id: ElementId) -> BinStoreResult<()> {
        let children = match &self.elements[id] {
            Element::Node(node) => node.children,
            Element::Leaf(_) => return self.flush_leaf(id),
        };
        for child in children.into_iter().flatten() {
            self.flush_element(child)?;
        }
        Ok(())
    }

    fn close(&mut self) -> BinStoreResult<()> {
        if !self.lifecycle.is_active() {
            return Ok(());
        }
        self.metadata.write(&self.dir)?;
        self.flush_element(ROOT)?;
        for (_, owner) in self.pool.owned() {
            self.release_leaf(owner);
        }
        self.lifecycle = Lifecycle::Closed;
        debug!(
            "Closed quad-tree database at {} ({} reads, {} writes, {} evictions)",
            self.dir.display(),
            self.disk_reads,
            self.disk_writes,
            self.evictions
        );
        Ok(())
    }
}

fn leaf_file_path(dir: &Path, layer_index: &str) -> PathBuf {
    dir.join(format!("{}.{}", layer_index, TILE_FILE_EXTENSION))
}

/// Create `dir` if it is missing. Fails if it cannot be created or if the
/// path exists but is not a directory.
pub(crate) fn ensure_directory(dir: &Path) -> BinStoreResult<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(BinStoreError::ConfigDirectoryInvalid(dir.to_path_buf()));
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| {
        warn!("Cannot create directory {}: {}", dir.display(), e);
        BinStoreError::ConfigDirectoryInvalid(dir.to_path_buf())
    })
}

/// Lower-cased file stems of every `*.dat` file in `dir`.
fn list_tile_names(dir: &Path) -> BinStoreResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_tile = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(TILE_FILE_EXTENSION));
        if !is_tile {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_lowercase());
        }
    }
    Ok(names)
}

/// Remove files in `dir` whose names are layer indices. Returns the count.
fn remove_tile_files(dir: &Path) -> BinStoreResult<usize> {
    let mut removed = 0;
    for name in list_tile_names(dir)? {
        if !name.is_empty() && name.chars().all(|c| QUADRANT_DIGITS.contains(&c)) {
            match fs::remove_file(leaf_file_path(dir, &name)) {
                Ok(()) => removed += 1,
                // Upper-case extension, never matched on reopen either
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(removed)
}

// ============================================================================
// Tests
// ============================================================================
