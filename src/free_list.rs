use std::ptr::NonNull;

/// Overlaid on the first word of every unused block in a free list.
#[repr(C)]
pub struct Node {
    next: Option<NonNull<Node>>,
}

/// Intrusive LIFO list of same-sized free blocks. The list owns no memory;
/// it only threads through blocks that belong to the chunk pool or that a
/// caller gave back.
pub struct FreeList {
    head: Option<NonNull<Node>>,
    len: usize,
}

impl FreeList {
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        let node = self.head?;

        unsafe {
            self.head = (*node.as_ptr()).next;
        }
        self.len -= 1;

        Some(node.cast())
    }

    /// # Safety
    ///
    /// `block` must be at least a word long, word aligned, unused by anyone
    /// else and not already in any free list.
    pub unsafe fn push(&mut self, block: NonNull<u8>) {
        let node: NonNull<Node> = block.cast();

        node.as_ptr().write(Node { next: self.head });
        self.head = Some(node);
        self.len += 1;
    }

    /// Links `count` contiguous blocks of `block_size` bytes starting at
    /// `start` onto the list, lowest address first out.
    ///
    /// # Safety
    ///
    /// Same as [`FreeList::push`] for every one of the `count` blocks.
    pub unsafe fn push_run(&mut self, start: NonNull<u8>, block_size: usize, count: usize) {
        for i in (0..count).rev() {
            self.push(NonNull::new_unchecked(start.as_ptr().add(i * block_size)));
        }
    }
}
