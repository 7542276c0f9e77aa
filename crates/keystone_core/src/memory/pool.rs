//! # Pool Allocator
//!
//! Fixed-size block allocator over a caller-supplied memory region.
//!
//! Free blocks form an intrusive singly linked list: the first word of every
//! free block holds the index of the next free block. Allocation pops the
//! head, freeing pushes onto it. Both are O(1) and touch no heap.

use bytemuck::Pod;

use crate::error::{MemoryError, MemoryResult};

/// Size of the link word stored in every free block.
const LINK_SIZE: usize = std::mem::size_of::<usize>();

/// Bytes per storage word; the region start is aligned to this.
const WORD_SIZE: usize = std::mem::size_of::<u128>();

/// Link value that terminates the free list.
const END: usize = usize::MAX;

/// A pool allocator for fixed-size blocks.
///
/// There is no coalescing and no double-free detection: freeing a block twice
/// corrupts the free list, exactly like freeing twice through `free(3)`.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread.
///
/// # Example
///
/// ```rust
/// use keystone_core::PoolAllocator;
///
/// let mut pool = PoolAllocator::with_capacity("particles", 16, 64).unwrap();
///
/// let handle = pool.allocate().unwrap();
/// pool.write(handle, [1.0f32, 2.0, 3.0, 4.0]);
/// assert_eq!(pool.read::<[f32; 4]>(handle), [1.0, 2.0, 3.0, 4.0]);
///
/// pool.free(handle);
/// assert_eq!(pool.free_count(), 64);
/// ```
pub struct PoolAllocator {
    /// Name used in diagnostics.
    name: &'static str,
    /// The memory region, `block_size * block_count` bytes at least, 16-byte
    /// aligned.
    memory: Box<[u128]>,
    /// Size of one block in bytes.
    block_size: usize,
    /// Number of blocks.
    block_count: usize,
    /// Index of the first free block.
    free_head: Option<usize>,
    /// Number of free blocks.
    free_count: usize,
}

/// Handle to an allocated block in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    /// Index into the pool.
    index: usize,
}

impl PoolHandle {
    /// Block index inside the pool.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

impl PoolAllocator {
    /// Initializes a pool over `memory`.
    ///
    /// Every block starts out free, linked in ascending index order. Blocks
    /// of 16 bytes or more start on 16-byte boundaries.
    ///
    /// # Errors
    ///
    /// [`MemoryError::InvalidPoolLayout`] when `block_size` is not a power of
    /// two, is smaller than a link word, `block_count` is zero, or the blocks
    /// do not fit in `memory`.
    pub fn new(
        name: &'static str,
        memory: Box<[u128]>,
        block_size: usize,
        block_count: usize,
    ) -> MemoryResult<Self> {
        if !block_size.is_power_of_two() {
            return Err(MemoryError::InvalidPoolLayout("block size must be a power of two"));
        }
        if block_size < LINK_SIZE {
            return Err(MemoryError::InvalidPoolLayout(
                "block size must hold a free-list link",
            ));
        }
        if block_count == 0 {
            return Err(MemoryError::InvalidPoolLayout("block count must be non-zero"));
        }
        match block_size.checked_mul(block_count) {
            Some(total) if total <= memory.len() * WORD_SIZE => {}
            _ => {
                return Err(MemoryError::InvalidPoolLayout(
                    "blocks do not fit in the memory region",
                ))
            }
        }

        let mut pool = Self {
            name,
            memory,
            block_size,
            block_count,
            free_head: None,
            free_count: 0,
        };
        pool.reset();
        Ok(pool)
    }

    /// Reserves a fresh zeroed region and initializes a pool over it.
    ///
    /// # Errors
    ///
    /// See [`PoolAllocator::new`].
    pub fn with_capacity(
        name: &'static str,
        block_size: usize,
        block_count: usize,
    ) -> MemoryResult<Self> {
        let bytes = block_size
            .checked_mul(block_count)
            .ok_or(MemoryError::InvalidPoolLayout("pool size overflows"))?;
        let words = bytes.div_ceil(WORD_SIZE);
        Self::new(name, vec![0u128; words].into_boxed_slice(), block_size, block_count)
    }

    /// Returns the pool name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the block size in bytes.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the total number of blocks.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.block_count
    }

    /// Returns the number of free blocks.
    #[inline]
    #[must_use]
    pub const fn free_count(&self) -> usize {
        self.free_count
    }

    /// Returns the number of allocated blocks.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.block_count - self.free_count
    }

    /// Pops the head of the free list.
    ///
    /// The block content is whatever was there before, including the stale
    /// link word.
    ///
    /// # Errors
    ///
    /// [`MemoryError::PoolExhausted`] when no block is free.
    pub fn allocate(&mut self) -> MemoryResult<PoolHandle> {
        let Some(index) = self.free_head else {
            return Err(MemoryError::PoolExhausted {
                pool: self.name,
                block_count: self.block_count,
            });
        };

        let next = self.link(index);
        self.free_head = (next != END).then_some(next);
        self.free_count -= 1;

        Ok(PoolHandle { index })
    }

    /// Pushes a block back onto the free list.
    pub fn free(&mut self, handle: PoolHandle) {
        debug_assert!(handle.index < self.block_count, "foreign pool handle");
        let next = self.free_head.unwrap_or(END);
        self.set_link(handle.index, next);
        self.free_head = Some(handle.index);
        self.free_count += 1;
    }

    /// Relinks every block, discarding all allocations.
    pub fn reset(&mut self) {
        for index in 0..self.block_count {
            let next = if index + 1 < self.block_count { index + 1 } else { END };
            self.set_link(index, next);
        }
        self.free_head = Some(0);
        self.free_count = self.block_count;
    }

    /// Returns the bytes of a block.
    #[must_use]
    pub fn block(&self, handle: PoolHandle) -> &[u8] {
        let start = handle.index * self.block_size;
        &self.bytes()[start..start + self.block_size]
    }

    /// Returns the bytes of a block for writing.
    pub fn block_mut(&mut self, handle: PoolHandle) -> &mut [u8] {
        let start = handle.index * self.block_size;
        let block_size = self.block_size;
        &mut self.bytes_mut()[start..start + block_size]
    }

    /// Stores a value at the start of a block.
    ///
    /// # Panics
    ///
    /// Panics if `T` is larger than the block.
    pub fn write<T: Pod>(&mut self, handle: PoolHandle, value: T) {
        let bytes = bytemuck::bytes_of(&value);
        self.block_mut(handle)[..bytes.len()].copy_from_slice(bytes);
    }

    /// Loads a value from the start of a block.
    ///
    /// # Panics
    ///
    /// Panics if `T` is larger than the block.
    #[must_use]
    pub fn read<T: Pod>(&self, handle: PoolHandle) -> T {
        bytemuck::pod_read_unaligned(&self.block(handle)[..std::mem::size_of::<T>()])
    }

    fn link(&self, index: usize) -> usize {
        let start = index * self.block_size;
        let mut word = [0u8; LINK_SIZE];
        word.copy_from_slice(&self.bytes()[start..start + LINK_SIZE]);
        usize::from_ne_bytes(word)
    }

    fn set_link(&mut self, index: usize, next: usize) {
        let start = index * self.block_size;
        self.bytes_mut()[start..start + LINK_SIZE].copy_from_slice(&next.to_ne_bytes());
    }

    fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice::<u128, u8>(&self.memory[..])
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut::<u128, u8>(&mut self.memory[..])
    }
}

impl std::fmt::Debug for PoolAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("name", &self.name)
            .field("block_size", &self.block_size)
            .field("block_count", &self.block_count)
            .field("free_count", &self.free_count)
            .finish()
    }
}
