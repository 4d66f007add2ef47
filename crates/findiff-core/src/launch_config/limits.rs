//! Per-group resource limits of an execution target.

/// Resource limits a launch geometry must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Maximum units (threads) per work group.
    pub max_units_per_group: usize,
    /// Maximum local tile size in bytes.
    pub max_tile_bytes: usize,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self::cuda_default()
    }
}

impl DeviceLimits {
    /// Limits of a CUDA device without opt-in shared memory.
    #[must_use]
    pub const fn cuda_default() -> Self {
        Self {
            max_units_per_group: 1024,
            max_tile_bytes: 48 * 1024, // 48 KB static shared memory
        }
    }

    /// No limits; for host targets whose tiles live on the heap.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_units_per_group: usize::MAX,
            max_tile_bytes: usize::MAX,
        }
    }

    /// Builder method to set the unit limit.
    #[must_use]
    pub fn with_max_units(mut self, units: usize) -> Self {
        self.max_units_per_group = units;
        self
    }

    /// Builder method to set the tile size limit.
    #[must_use]
    pub fn with_max_tile_bytes(mut self, bytes: usize) -> Self {
        self.max_tile_bytes = bytes;
        self
    }
}
