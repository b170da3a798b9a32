use super::constants::{ALIGN, LARGE_OBJECT_MIN, MAX_SMALL_SIZE, SMALL_OBJECT_MIN};
use super::error::AllocError;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SizeClass {
    /// Served from the free list at this index.
    Small(usize),
    /// Forwarded to the system allocator.
    Large,
}

impl SizeClass {
    pub fn get_for_size(object_size: usize) -> Result<SizeClass, AllocError> {
        match object_size {
            SMALL_OBJECT_MIN..=MAX_SMALL_SIZE => Ok(SizeClass::Small(free_list_index(object_size))),
            LARGE_OBJECT_MIN.. => Ok(SizeClass::Large),
            _ => Err(AllocError::BadRequest),
        }
    }
}

/// Rounds `n` up to the next multiple of [`ALIGN`].
#[inline]
pub(crate) fn round_up(n: usize) -> usize {
    (n + ALIGN - 1) & !(ALIGN - 1)
}

/// Index of the free list serving requests of `n` bytes, `1 <= n <= 128`.
#[inline]
pub(crate) fn free_list_index(n: usize) -> usize {
    debug_assert!((SMALL_OBJECT_MIN..=MAX_SMALL_SIZE).contains(&n));

    (n + ALIGN - 1) / ALIGN - 1
}

/// Block size of the free list at `index`.
#[inline]
pub(crate) fn class_size(index: usize) -> usize {
    (index + 1) * ALIGN
}
