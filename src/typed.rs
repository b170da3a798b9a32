use super::constants::ALIGN;
use super::error::AllocError;
use super::raw_alloc::RawAlloc;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

/// Element-count view over a byte allocator: `allocate(n)` asks for
/// `n * size_of::<T>()` bytes. This is the shape containers consume.
///
/// ```rust
/// use segpool::{SubAllocator, TypedAlloc};
///
/// let pool = SubAllocator::new();
/// let nodes: TypedAlloc<'_, [u64; 2], _> = TypedAlloc::new(&pool);
///
/// let node = nodes.allocate_one().unwrap();
/// unsafe {
///     node.as_ptr().write([1, 2]);
///     assert_eq!(*node.as_ptr(), [1, 2]);
///     nodes.deallocate_one(node);
/// }
/// ```
pub struct TypedAlloc<'a, T, A: RawAlloc> {
    alloc: &'a A,
    _marker: PhantomData<T>,
}

impl<'a, T, A: RawAlloc> Clone for TypedAlloc<'a, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, A: RawAlloc> Copy for TypedAlloc<'a, T, A> {}

impl<'a, T, A: RawAlloc> TypedAlloc<'a, T, A> {
    pub fn new(alloc: &'a A) -> Self {
        Self {
            alloc,
            _marker: PhantomData,
        }
    }

    /// The byte allocator this adapter hands requests to.
    pub fn inner(&self) -> &'a A {
        self.alloc
    }

    fn byte_count(n: usize) -> Result<usize, AllocError> {
        // blocks are only ever ALIGN aligned, and zero sized requests are meaningless
        if size_of::<T>() == 0 || align_of::<T>() > ALIGN || n == 0 {
            return Err(AllocError::BadRequest);
        }

        size_of::<T>().checked_mul(n).ok_or(AllocError::BadRequest)
    }

    /// Uninitialized room for `n` values of `T`.
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        let bytes = Self::byte_count(n)?;

        Ok(self.alloc.allocate(bytes)?.cast())
    }

    pub fn allocate_one(&self) -> Result<NonNull<T>, AllocError> {
        self.allocate(1)
    }

    /// # Safety
    ///
    /// `ptr` must come from [`TypedAlloc::allocate`] on an adapter over the
    /// same allocator with the same `n`. Any values in it are not dropped.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        if let Ok(bytes) = Self::byte_count(n) {
            self.alloc.deallocate(ptr.cast(), bytes);
        }
    }

    /// # Safety
    ///
    /// As [`TypedAlloc::deallocate`] with `n == 1`.
    pub unsafe fn deallocate_one(&self, ptr: NonNull<T>) {
        self.deallocate(ptr, 1)
    }
}
