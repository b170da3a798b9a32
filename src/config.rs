use super::constants::{DEFAULT_BATCH_SIZE, DEFAULT_GROWTH_SHIFT};
use super::error::AllocError;

/// Tuning knobs for a sub-allocator. The defaults follow the classic two
/// level allocator and are fine for most uses.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PoolConfig {
    /// How many blocks a refill tries to carve for an empty size class.
    pub batch_size: usize,

    /// A new chunk is twice the batch being carved plus the total bytes
    /// obtained so far shifted right by this amount, so chunks grow with the
    /// heap.
    pub growth_shift: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            growth_shift: DEFAULT_GROWTH_SHIFT,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), AllocError> {
        if self.batch_size == 0 {
            return Err(AllocError::BadRequest);
        }

        Ok(())
    }
}
