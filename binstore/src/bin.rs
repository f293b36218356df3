//! The bin serialization contract.

/// A per-cell accumulator that can be flattened into a fixed-length float
/// vector and restored from one.
///
/// Stores never interpret the values; they only move the vector produced by
/// [`Bin::save`] to disk and hand it back to [`Bin::load`].
pub trait Bin {
    /// Writes this bin's state into `data`.
    fn save(&self, data: &mut [f32]);

    /// Restores this bin's state from `data`.
    fn load(&mut self, data: &[f32]);
}

/// A bin that is nothing more than its float vector.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct VectorBin {
    values: Vec<f32>,
}

impl VectorBin {
    /// Creates a zeroed bin with `num_vars` values.
    pub fn new(num_vars: usize) -> Self {
        Self {
            values: vec![0.0; num_vars],
        }
    }

    pub fn from_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

impl Bin for VectorBin {
    fn save(&self, data: &mut [f32]) {
        let n = data.len().min(self.values.len());
        data[..n].copy_from_slice(&self.values[..n]);
        data[n..].fill(0.0);
    }

    fn load(&mut self, data: &[f32]) {
        self.values.clear();
        self.values.extend_from_slice(data);
    }
}
