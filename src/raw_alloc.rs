use super::constants::ALIGN;
use super::error::AllocError;
use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

/// The byte-level contract shared by both allocator levels: hand out `n`
/// bytes aligned to [`ALIGN`], take them back given the same `n`.
///
/// The allocator never stores the size of a block. Callers pass it back on
/// `deallocate`, exactly as they asked for it on `allocate`.
pub trait RawAlloc {
    fn allocate(&self, n: usize) -> Result<NonNull<u8>, AllocError>;

    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this same allocator with
    /// a byte count of `n` (or, for the sub-allocator, any count rounding to
    /// the same size class), and must not have been deallocated since.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, n: usize);
}

impl<A: RawAlloc + ?Sized> RawAlloc for &A {
    fn allocate(&self, n: usize) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(n)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, n: usize) {
        (**self).deallocate(ptr, n)
    }
}

/// First level allocator: every call goes to the global Rust allocator.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemAlloc;

impl SystemAlloc {
    fn layout(n: usize) -> Result<Layout, AllocError> {
        if n == 0 {
            return Err(AllocError::BadRequest);
        }

        Layout::from_size_align(n, ALIGN).map_err(|_| AllocError::BadRequest)
    }
}

impl RawAlloc for SystemAlloc {
    fn allocate(&self, n: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = Self::layout(n)?;

        unsafe { NonNull::new(alloc(layout)).ok_or(AllocError::OOM) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, n: usize) {
        // a layout that failed here could never have been allocated
        if let Ok(layout) = Self::layout(n) {
            dealloc(ptr.as_ptr(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_alloc_round_trip() {
        let system = SystemAlloc;
        let ptr = system.allocate(1000).unwrap();

        assert_eq!(ptr.as_ptr() as usize % ALIGN, 0);

        unsafe {
            ptr.as_ptr().write_bytes(0xAB, 1000);
            assert_eq!(*ptr.as_ptr().add(999), 0xAB);
            system.deallocate(ptr, 1000);
        }
    }

    #[test]
    fn system_alloc_rejects_zero() {
        assert_eq!(SystemAlloc.allocate(0), Err(AllocError::BadRequest));
    }

    #[test]
    fn system_alloc_rejects_oversized_layout() {
        assert_eq!(SystemAlloc.allocate(usize::MAX), Err(AllocError::BadRequest));
    }
}
