use super::constants::ALIGN;
use std::ptr::{self, NonNull};

/// A region obtained from the system allocator. Kept so the owning allocator
/// can give it back when dropped.
pub struct Chunk {
    ptr: NonNull<u8>,
    size: usize,
}

impl Chunk {
    pub fn new(ptr: NonNull<u8>, size: usize) -> Self {
        Self { ptr, size }
    }

    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub fn get_size(&self) -> usize {
        self.size
    }
}

/// The bump region `[start, end)`. Bytes inside it belong to no size class yet.
pub struct ChunkPool {
    start: *mut u8,
    end: *mut u8,
    heap_size: usize,
    chunks: Vec<Chunk>,
}

impl ChunkPool {
    pub const fn new() -> Self {
        Self {
            start: ptr::null_mut(),
            end: ptr::null_mut(),
            heap_size: 0,
            chunks: Vec::new(),
        }
    }

    pub fn bytes_left(&self) -> usize {
        self.end as usize - self.start as usize
    }

    /// Total bytes ever obtained from the system allocator for chunks.
    pub fn heap_size(&self) -> usize {
        self.heap_size
    }

    /// Bumps off up to `batch` blocks of `node_size` bytes. Returns the start
    /// of the run and how many blocks it holds, or `None` if not even one fits.
    pub fn carve(&mut self, node_size: usize, batch: usize) -> Option<(NonNull<u8>, usize)> {
        let bytes_left = self.bytes_left();

        if bytes_left < node_size {
            return None;
        }

        let count = batch.min(bytes_left / node_size);
        let result = NonNull::new(self.start)?;

        self.start = unsafe { self.start.add(count * node_size) };

        Some((result, count))
    }

    /// Empties the pool, returning whatever was left in it.
    pub fn take_fragment(&mut self) -> Option<(NonNull<u8>, usize)> {
        let bytes_left = self.bytes_left();
        let fragment = NonNull::new(self.start).map(|start| (start, bytes_left));

        self.start = ptr::null_mut();
        self.end = ptr::null_mut();

        fragment.filter(|(_, size)| *size > 0)
    }

    /// Records a fresh chunk and makes it the whole pool. The previous
    /// remainder must have been taken out with [`ChunkPool::take_fragment`].
    pub fn install(&mut self, chunk: Chunk) {
        debug_assert_eq!(self.bytes_left(), 0);
        debug_assert_eq!(chunk.get_size() % ALIGN, 0);

        self.reset_to(chunk.as_ptr(), chunk.get_size());
        self.heap_size += chunk.get_size();
        self.chunks.push(chunk);
    }

    /// Makes `[block, block + size)` the pool without recording it as a chunk.
    /// Used for blocks scavenged from a free list.
    pub fn reset_to(&mut self, block: NonNull<u8>, size: usize) {
        self.start = block.as_ptr();
        self.end = unsafe { block.as_ptr().add(size) };
    }

    pub fn drain_chunks(&mut self) -> Vec<Chunk> {
        self.start = ptr::null_mut();
        self.end = ptr::null_mut();

        std::mem::take(&mut self.chunks)
    }
}
