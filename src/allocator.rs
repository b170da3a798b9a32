use super::chunk_pool::Chunk;
use super::config::PoolConfig;
use super::error::AllocError;
use super::metrics::PoolMetrics;
use super::pool_state::{Carve, PoolState};
use super::raw_alloc::{RawAlloc, SystemAlloc};
use super::size_class::{class_size, SizeClass};
use log::warn;
use std::cell::RefCell;
use std::ptr::NonNull;
use std::sync::{Mutex, OnceLock};

/// How an allocator gets exclusive access to its pool state for the
/// duration of one short critical section.
pub trait StateCell {
    fn new(state: PoolState) -> Self;
    fn with<R>(&self, f: impl FnOnce(&mut PoolState) -> R) -> R;
}

impl StateCell for RefCell<PoolState> {
    fn new(state: PoolState) -> Self {
        RefCell::new(state)
    }

    fn with<R>(&self, f: impl FnOnce(&mut PoolState) -> R) -> R {
        let mut state = self.borrow_mut();

        f(&mut *state)
    }
}

impl StateCell for Mutex<PoolState> {
    fn new(state: PoolState) -> Self {
        Mutex::new(state)
    }

    fn with<R>(&self, f: impl FnOnce(&mut PoolState) -> R) -> R {
        let mut state = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        f(&mut *state)
    }
}

// The state is only held while touching free lists or the pool, never while
// the system allocator runs. Growing or scavenging is followed by a carve in
// the same critical section, so a refill makes at most one system call and
// other threads cannot empty the pool in between.
fn refill<C: StateCell, S: RawAlloc>(
    cell: &C,
    system: &S,
    config: &PoolConfig,
    index: usize,
) -> Result<NonNull<u8>, AllocError> {
    let node_size = class_size(index);
    let take_batch =
        |state: &mut PoolState| state.take_batch(index, config.batch_size, config.growth_shift);

    let bytes = match cell.with(take_batch) {
        Carve::Ready(ptr) => return Ok(ptr),
        Carve::Grow(bytes) => bytes,
    };

    let carve = match system.allocate(bytes) {
        Ok(ptr) => {
            let (unused, carve) = cell.with(|state| {
                let unused = state.install_chunk(Chunk::new(ptr, bytes), node_size);

                (unused, take_batch(state))
            });

            if let Some(unused) = unused {
                unsafe { system.deallocate(unused.as_ptr(), unused.get_size()) };
            }

            Some(carve)
        }
        Err(_) => cell.with(|state| state.scavenge(node_size).then(|| take_batch(state))),
    };

    match carve {
        Some(Carve::Ready(ptr)) => Ok(ptr),
        _ => {
            warn!("out of memory refilling {node_size} byte blocks");

            Err(AllocError::OOM)
        }
    }
}

/// A segmented free-list allocator.
///
/// Requests of 1 to 128 bytes are served from sixteen size classes, 8 bytes
/// apart, each refilled in batches from a bump allocated chunk pool. Larger
/// requests go straight to the system allocator `S`. `C` decides how the
/// pool state is guarded; use the [`SubAllocator`] and [`SyncSubAllocator`]
/// aliases.
///
/// Dropping the allocator returns every chunk to `S`. Blocks still held by
/// callers dangle from that point on.
pub struct PoolAllocator<C: StateCell, S: RawAlloc = SystemAlloc> {
    state: C,
    system: S,
    config: PoolConfig,
}

/// No locking, for use from one thread.
pub type SubAllocator<S = SystemAlloc> = PoolAllocator<RefCell<PoolState>, S>;

/// The pool state behind a single mutex, for sharing between threads. The
/// lock is never held while the system allocator runs.
pub type SyncSubAllocator<S = SystemAlloc> = PoolAllocator<Mutex<PoolState>, S>;

/// The allocator picked by the `multi_threaded` feature.
#[cfg(not(feature = "multi_threaded"))]
pub type DefaultAllocator<S = SystemAlloc> = SubAllocator<S>;

#[cfg(feature = "multi_threaded")]
pub type DefaultAllocator<S = SystemAlloc> = SyncSubAllocator<S>;

impl<C: StateCell> PoolAllocator<C, SystemAlloc> {
    pub fn new() -> Self {
        Self::with_system(SystemAlloc)
    }
}

impl<C: StateCell> Default for PoolAllocator<C, SystemAlloc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: StateCell, S: RawAlloc> PoolAllocator<C, S> {
    pub fn with_system(system: S) -> Self {
        Self {
            state: C::new(PoolState::new()),
            system,
            config: PoolConfig::default(),
        }
    }

    pub fn with_config(system: S, config: PoolConfig) -> Result<Self, AllocError> {
        config.validate()?;

        Ok(Self {
            state: C::new(PoolState::new()),
            system,
            config,
        })
    }

    /// The configuration this allocator was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The allocator that chunks and large requests come from.
    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.state.with(|state| state.metrics())
    }

    /// Number of free blocks currently linked in the size class serving
    /// `n` byte requests. Zero for requests that bypass the free lists.
    pub fn free_blocks(&self, n: usize) -> usize {
        match SizeClass::get_for_size(n) {
            Ok(SizeClass::Small(index)) => self.state.with(|state| state.free_list_len(index)),
            _ => 0,
        }
    }

    /// Bytes left in the chunk pool, not yet committed to any size class.
    pub fn pool_bytes_left(&self) -> usize {
        self.state.with(|state| state.pool_bytes_left())
    }
}

impl<C: StateCell, S: RawAlloc> RawAlloc for PoolAllocator<C, S> {
    fn allocate(&self, n: usize) -> Result<NonNull<u8>, AllocError> {
        match SizeClass::get_for_size(n)? {
            SizeClass::Large => {
                let ptr = self.system.allocate(n)?;
                self.state.with(|state| state.record_large_alloc());

                Ok(ptr)
            }
            SizeClass::Small(index) => match self.state.with(|state| state.pop(index)) {
                Some(ptr) => Ok(ptr),
                None => refill(&self.state, &self.system, &self.config, index),
            },
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, n: usize) {
        match SizeClass::get_for_size(n) {
            Ok(SizeClass::Large) => {
                self.system.deallocate(ptr, n);
                self.state.with(|state| state.record_large_dealloc());
            }
            Ok(SizeClass::Small(index)) => self.state.with(|state| state.push(index, ptr)),
            // nothing is ever handed out for zero bytes
            Err(_) => debug_assert!(false, "deallocate called with zero bytes"),
        }
    }
}

impl<C: StateCell, S: RawAlloc> Drop for PoolAllocator<C, S> {
    fn drop(&mut self) {
        for chunk in self.state.with(|state| state.drain_chunks()) {
            unsafe { self.system.deallocate(chunk.as_ptr(), chunk.get_size()) };
        }
    }
}

/// A process-wide allocator over the system allocator, created on first use.
///
/// It is never dropped, so its chunks live until the process exits.
pub fn shared() -> &'static SyncSubAllocator {
    static SHARED: OnceLock<SyncSubAllocator> = OnceLock::new();

    SHARED.get_or_init(SyncSubAllocator::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size_class::free_list_index;
    use std::cell::Cell;

    /// Refuses every request, counting them.
    #[derive(Default)]
    struct Refusing {
        calls: Cell<usize>,
    }

    impl RawAlloc for Refusing {
        fn allocate(&self, _n: usize) -> Result<NonNull<u8>, AllocError> {
            self.calls.set(self.calls.get() + 1);

            Err(AllocError::OOM)
        }

        unsafe fn deallocate(&self, _ptr: NonNull<u8>, _n: usize) {}
    }

    /// Acts like another thread that grows the pool while our chunk request
    /// is in flight.
    struct GrowsMeanwhile<'a> {
        state: &'a RefCell<PoolState>,
        frees: Cell<usize>,
    }

    impl RawAlloc for GrowsMeanwhile<'_> {
        fn allocate(&self, n: usize) -> Result<NonNull<u8>, AllocError> {
            let theirs = SystemAlloc.allocate(n)?;
            self.state.with(|state| state.install_chunk(Chunk::new(theirs, n), 8));

            SystemAlloc.allocate(n)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, n: usize) {
            self.frees.set(self.frees.get() + 1);
            SystemAlloc.deallocate(ptr, n);
        }
    }

    #[test]
    fn one_chunk_request_per_refill() {
        let system = Refusing::default();
        let cell = RefCell::new(PoolState::new());

        let result = refill(&cell, &system, &PoolConfig::default(), free_list_index(16));

        assert_eq!(result, Err(AllocError::OOM));
        assert_eq!(system.calls.get(), 1);
        assert_eq!(cell.with(|state| state.metrics().system_failures), 1);
    }

    #[test]
    fn scavenged_block_is_carved_right_away() {
        let mut block = [0u64; 16];
        let block_ptr = NonNull::new(block.as_mut_ptr() as *mut u8).unwrap();
        let system = Refusing::default();
        let cell = RefCell::new(PoolState::new());
        unsafe { cell.with(|state| state.push(free_list_index(128), block_ptr)) };

        let result = refill(&cell, &system, &PoolConfig::default(), free_list_index(16));

        assert_eq!(result, Ok(block_ptr));
        assert_eq!(system.calls.get(), 1);
        assert_eq!(cell.with(|state| state.free_list_len(free_list_index(16))), 7);
    }

    #[test]
    fn fresh_chunk_is_carved_right_away() {
        let cell = RefCell::new(PoolState::new());
        let index = free_list_index(16);

        let ptr = refill(&cell, &SystemAlloc, &PoolConfig::default(), index).unwrap();

        let metrics = cell.with(|state| state.metrics());
        assert_eq!(metrics.chunk_allocs, 1);
        assert_eq!(metrics.refills, 1);
        assert_eq!(cell.with(|state| state.free_list_len(index)), 19);
        assert_eq!(cell.with(|state| state.pool_bytes_left()), 320);

        unsafe { cell.with(|state| state.push(index, ptr)) };
        for chunk in cell.with(|state| state.drain_chunks()) {
            unsafe { SystemAlloc.deallocate(chunk.as_ptr(), chunk.get_size()) };
        }
    }

    #[test]
    fn chunk_grown_meanwhile_is_used_and_ours_returned() {
        let cell = RefCell::new(PoolState::new());
        let system = GrowsMeanwhile {
            state: &cell,
            frees: Cell::new(0),
        };

        let result = refill(&cell, &system, &PoolConfig::default(), free_list_index(16));

        assert!(result.is_ok());
        assert_eq!(system.frees.get(), 1);
        assert_eq!(cell.with(|state| state.metrics().chunk_allocs), 1);

        for chunk in cell.with(|state| state.drain_chunks()) {
            unsafe { SystemAlloc.deallocate(chunk.as_ptr(), chunk.get_size()) };
        }
    }
}
