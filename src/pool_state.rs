use super::chunk_pool::{Chunk, ChunkPool};
use super::constants::{ALIGN, FREE_LIST_COUNT, MAX_SMALL_SIZE};
use super::free_list::FreeList;
use super::metrics::PoolMetrics;
use super::size_class::{class_size, free_list_index, round_up};
use log::{debug, trace};
use std::ptr::NonNull;

/// Result of trying to serve a refill from the chunk pool alone.
pub enum Carve {
    /// The first block of the batch; the rest are already linked into the
    /// size class.
    Ready(NonNull<u8>),
    /// The pool is empty. A chunk of this many bytes is needed.
    Grow(usize),
}

/// Everything a sub-allocator mutates: one free list head per size class and
/// the chunk pool feeding them.
pub struct PoolState {
    free_lists: [FreeList; FREE_LIST_COUNT],
    pool: ChunkPool,
    metrics: PoolMetrics,
}

// The raw pointers inside only ever point at memory this state owns (chunks)
// or that callers handed back to it. Moving the state moves that ownership.
unsafe impl Send for PoolState {}

impl PoolState {
    pub fn new() -> Self {
        Self {
            free_lists: std::array::from_fn(|_| FreeList::new()),
            pool: ChunkPool::new(),
            metrics: PoolMetrics::default(),
        }
    }

    pub fn pop(&mut self, index: usize) -> Option<NonNull<u8>> {
        self.free_lists[index].pop()
    }

    /// # Safety
    ///
    /// `block` must be an unused block at least `class_size(index)` bytes long.
    pub unsafe fn push(&mut self, index: usize, block: NonNull<u8>) {
        self.free_lists[index].push(block);
    }

    pub fn free_list_len(&self, index: usize) -> usize {
        self.free_lists[index].len()
    }

    pub fn pool_bytes_left(&self) -> usize {
        self.pool.bytes_left()
    }

    /// Carves up to `batch` blocks for the size class at `index`. The first
    /// block is returned, the others are linked into the free list.
    pub fn take_batch(&mut self, index: usize, batch: usize, growth_shift: u32) -> Carve {
        let node_size = class_size(index);

        match self.pool.carve(node_size, batch) {
            Some((start, count)) => {
                trace!("carved {count} of {batch} blocks of {node_size} bytes");

                self.metrics.refills += 1;
                unsafe {
                    let rest = NonNull::new_unchecked(start.as_ptr().add(node_size));
                    self.free_lists[index].push_run(rest, node_size, count - 1);
                }

                Carve::Ready(start)
            }
            None => {
                self.recycle_fragment();

                Carve::Grow(self.grow_size(node_size, batch, growth_shift))
            }
        }
    }

    fn grow_size(&self, node_size: usize, batch: usize, growth_shift: u32) -> usize {
        let requested = node_size.saturating_mul(batch);
        let headroom = self.pool.heap_size().checked_shr(growth_shift).unwrap_or(0);

        requested.saturating_mul(2).saturating_add(round_up(headroom))
    }

    // Only called once the pool holds less than one block of the class being
    // refilled, so the remainder always fits a size class.
    fn recycle_fragment(&mut self) {
        if let Some((fragment, size)) = self.pool.take_fragment() {
            debug_assert!(size <= MAX_SMALL_SIZE);

            if size >= ALIGN {
                trace!("recycling {size} byte pool fragment");

                unsafe { self.push(free_list_index(size), fragment) };
                self.metrics.fragments_recycled += 1;
            }
        }
    }

    /// Makes a fresh chunk the pool. If the pool already holds a block of
    /// `node_size` again (another thread grew it meanwhile) the chunk is not
    /// needed and is handed back.
    pub fn install_chunk(&mut self, chunk: Chunk, node_size: usize) -> Option<Chunk> {
        if self.pool.bytes_left() >= node_size {
            return Some(chunk);
        }

        debug!(
            "installing {} byte chunk, heap size {}",
            chunk.get_size(),
            self.pool.heap_size() + chunk.get_size()
        );

        self.recycle_fragment();
        self.pool.install(chunk);
        self.metrics.chunk_allocs += 1;

        None
    }

    /// Called after the system allocator refused a chunk. Takes one block from
    /// the first non-empty size class of at least `node_size` bytes and makes
    /// it the pool. Returns false when there is nothing left to take.
    pub fn scavenge(&mut self, node_size: usize) -> bool {
        self.metrics.system_failures += 1;

        if self.pool.bytes_left() >= node_size {
            return true;
        }

        for index in free_list_index(node_size)..FREE_LIST_COUNT {
            if let Some(block) = self.free_lists[index].pop() {
                debug!("scavenged a {} byte block for {node_size} byte refill", class_size(index));

                self.recycle_fragment();
                self.pool.reset_to(block, class_size(index));
                self.metrics.scavenges += 1;

                return true;
            }
        }

        false
    }

    pub fn record_large_alloc(&mut self) {
        self.metrics.large_allocs += 1;
    }

    pub fn record_large_dealloc(&mut self) {
        self.metrics.large_deallocs += 1;
    }

    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            heap_size: self.pool.heap_size() as u64,
            ..self.metrics
        }
    }

    pub fn drain_chunks(&mut self) -> Vec<Chunk> {
        self.free_lists = std::array::from_fn(|_| FreeList::new());

        self.pool.drain_chunks()
    }
}
