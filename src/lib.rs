//! A segmented free-list sub-allocator for small, frequent allocations.
//!
//! Requests of 1 to 128 bytes are rounded up to a multiple of 8 and served
//! from one of sixteen size classes. Each class is an intrusive free list of
//! same-sized blocks. When a class runs dry it is refilled with a batch of
//! blocks (20 by default) carved from a bump allocated chunk pool, and the
//! pool itself grows from the system allocator in chunks that get larger as
//! the heap does. Anything over 128 bytes goes straight to the system
//! allocator.
//!
//! ```rust
//! use segpool::{RawAlloc, SubAllocator};
//!
//! let pool = SubAllocator::new();
//!
//! let a = pool.allocate(24).unwrap();
//! unsafe { pool.deallocate(a, 24) };
//!
//! // freed blocks are reused last in, first out
//! let b = pool.allocate(20).unwrap();
//! assert_eq!(a, b);
//! # unsafe { pool.deallocate(b, 20) };
//! ```
//!
//! The allocator does not remember block sizes. Callers give the size back
//! on `deallocate`, and a size rounding to a different class, a double free
//! or a foreign pointer corrupts the free lists. None of this is checked.
//!
//! When the system allocator refuses a new chunk, the allocator takes a
//! spare block from a larger size class and carves that instead. Only when
//! every larger class is empty as well does `allocate` fail with
//! [`AllocError::OOM`].
//!
//! [`SubAllocator`] does no locking. [`SyncSubAllocator`] puts the same state
//! behind a mutex that is never held across a call into the system allocator.
//! The `multi_threaded` feature makes the latter the [`DefaultAllocator`].

mod allocator;
mod chunk_pool;
mod config;
mod constants;
mod error;
mod free_list;
mod metrics;
mod pool_state;
mod raw_alloc;
mod size_class;
mod typed;


pub use allocator::{shared, DefaultAllocator, PoolAllocator, SubAllocator, SyncSubAllocator};
pub use config::PoolConfig;
pub use constants::{ALIGN, DEFAULT_BATCH_SIZE, FREE_LIST_COUNT, MAX_SMALL_SIZE};
pub use error::AllocError;
pub use metrics::PoolMetrics;
pub use raw_alloc::{RawAlloc, SystemAlloc};
pub use typed::TypedAlloc;
