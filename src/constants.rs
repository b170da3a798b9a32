/// Granularity of every size class, and the alignment of every block handed out.
pub const ALIGN: usize = 8;

/// Requests above this many bytes bypass the free lists entirely.
pub const MAX_SMALL_SIZE: usize = 128;
pub const SMALL_OBJECT_MIN: usize = 1;
pub const LARGE_OBJECT_MIN: usize = MAX_SMALL_SIZE + 1;

pub const FREE_LIST_COUNT: usize = MAX_SMALL_SIZE / ALIGN;

pub const DEFAULT_BATCH_SIZE: usize = 20;

// chunk requests are 2x the batch plus heap_size >> DEFAULT_GROWTH_SHIFT
pub const DEFAULT_GROWTH_SHIFT: u32 = 4;
