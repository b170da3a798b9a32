/// A snapshot of what a sub-allocator has done so far.
///
/// Obtained by calling [`crate::PoolAllocator::metrics`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PoolMetrics {
    /// Number of times an empty size class had to be refilled.
    pub refills: u64,

    /// Chunks successfully obtained from the system allocator.
    pub chunk_allocs: u64,

    /// Chunk requests the system allocator refused.
    pub system_failures: u64,

    /// Blocks taken from a larger size class after the system allocator
    /// refused a chunk.
    pub scavenges: u64,

    /// Pool remainders too small for a refill that were pushed onto the
    /// free list of their own size.
    pub fragments_recycled: u64,

    /// Requests over the small object limit forwarded to the system allocator.
    pub large_allocs: u64,
    pub large_deallocs: u64,

    /// Total bytes obtained from the system allocator for chunks.
    pub heap_size: u64,
}
