//! # Arena Allocator
//!
//! A bump allocator over a fixed, pre-reserved byte region. Memory is
//! reclaimed in bulk (reset, rewind or scope exit), never per object.
//!
//! Allocations hand out typed [`ArenaSlice`] handles instead of references,
//! so the arena can keep growing while earlier allocations stay addressable.
//! Every element type is `Pod`: zeroed memory is a valid value and stale
//! handles can only ever observe stale numbers, never invalid objects.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use bytemuck::Pod;

use crate::error::{MemoryError, MemoryResult};

/// A bump-pointer arena allocator.
///
/// Allocations are fast (align, bump, zero). Memory is freed all at once
/// when the arena is reset, rewound to a checkpoint, or when an
/// [`ArenaScope`] guard drops.
///
/// # Thread Safety
///
/// Allocation takes `&mut self`: only one writer can hold the arena.
///
/// # Example
///
/// ```rust
/// use keystone_core::Arena;
///
/// let mut arena = Arena::new("scratch", 1024);
/// let data = arena.allocate::<f32>(16).unwrap();
/// arena.get_mut(data)[3] = 1.5;
/// assert_eq!(arena.get(data)[3], 1.5);
///
/// arena.reset();
/// assert_eq!(arena.used(), 0);
/// ```
pub struct Arena {
    /// Name used in diagnostics.
    name: &'static str,
    /// The backing storage, reserved once. Words keep the base aligned.
    storage: Box<[u128]>,
    /// Total capacity in bytes.
    capacity: usize,
    /// Current allocation offset.
    size: usize,
}

impl Arena {
    /// Creates a new arena with the specified capacity in bytes.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let words = capacity.div_ceil(std::mem::size_of::<u128>());
        Self {
            name,
            storage: vec![0u128; words].into_boxed_slice(),
            capacity,
            size: 0,
        }
    }

    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u128, u8>(&self.storage)[..self.capacity]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        let capacity = self.capacity;
        &mut bytemuck::cast_slice_mut::<u128, u8>(&mut self.storage)[..capacity]
    }

    /// Returns the arena name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current used space in bytes.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.size
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.size
    }

    /// Allocates `count` zeroed elements aligned to `align_of::<T>()`.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ArenaExhausted`] if the allocation does not fit.
    #[inline]
    pub fn allocate<T: Pod>(&mut self, count: usize) -> MemoryResult<ArenaSlice<T>> {
        self.allocate_aligned(count, std::mem::align_of::<T>())
    }

    /// Allocates `count` zeroed elements aligned to `alignment` bytes.
    ///
    /// `alignment` must be a power of two (checked in debug builds). It is
    /// raised to `align_of::<T>()` when smaller.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ArenaExhausted`] if the allocation does not fit.
    pub fn allocate_aligned<T: Pod>(
        &mut self,
        count: usize,
        alignment: usize,
    ) -> MemoryResult<ArenaSlice<T>> {
        debug_assert!(
            alignment.is_power_of_two(),
            "arena alignment {alignment} is not a power of two"
        );
        let alignment = alignment.max(std::mem::align_of::<T>());

        // Align the absolute address so byte casts to `T` always succeed.
        let cursor = self.storage.as_ptr() as usize + self.size;
        let padding = cursor.wrapping_neg() & (alignment - 1);

        let requested = count
            .checked_mul(std::mem::size_of::<T>())
            .and_then(|bytes| bytes.checked_add(padding));
        let new_size = requested
            .and_then(|bytes| self.size.checked_add(bytes))
            .filter(|&size| size <= self.capacity());

        let Some(new_size) = new_size else {
            return Err(MemoryError::ArenaExhausted {
                arena: self.name,
                requested: requested.unwrap_or(usize::MAX),
                used: self.size,
                capacity: self.capacity(),
            });
        };

        let offset = self.size + padding;
        self.bytes_mut()[offset..new_size].fill(0);
        self.size = new_size;

        Ok(ArenaSlice::from_parts(offset, count))
    }

    /// Allocates room for `values` and copies them in.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ArenaExhausted`] if the copy does not fit.
    pub fn push_slice<T: Pod>(&mut self, values: &[T]) -> MemoryResult<ArenaSlice<T>> {
        let slice = self.allocate::<T>(values.len())?;
        self.get_mut(slice).copy_from_slice(values);
        Ok(slice)
    }

    /// Copies a raw byte blob into the arena.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ArenaExhausted`] if the copy does not fit.
    #[inline]
    pub fn copy_bytes(&mut self, bytes: &[u8]) -> MemoryResult<ArenaSlice<u8>> {
        self.push_slice(bytes)
    }

    /// Reads an allocation.
    #[must_use]
    pub fn get<T: Pod>(&self, slice: ArenaSlice<T>) -> &[T] {
        if slice.len == 0 {
            return &[];
        }
        debug_assert!(
            slice.byte_end() <= self.size,
            "stale slice into arena `{}`",
            self.name
        );
        bytemuck::cast_slice(&self.bytes()[slice.offset..slice.byte_end()])
    }

    /// Writes an allocation.
    pub fn get_mut<T: Pod>(&mut self, slice: ArenaSlice<T>) -> &mut [T] {
        if slice.len == 0 {
            return &mut [];
        }
        debug_assert!(
            slice.byte_end() <= self.size,
            "stale slice into arena `{}`",
            self.name
        );
        bytemuck::cast_slice_mut(&mut self.bytes_mut()[slice.offset..slice.byte_end()])
    }

    /// Resets the arena, invalidating all previous allocations.
    ///
    /// No memory is freed or reallocated.
    #[inline]
    pub fn reset(&mut self) {
        self.size = 0;
    }

    /// Captures the current size.
    #[inline]
    #[must_use]
    pub const fn checkpoint(&self) -> ArenaCheckpoint {
        ArenaCheckpoint(self.size)
    }

    /// Reclaims everything allocated since `checkpoint`.
    ///
    /// # Panics
    ///
    /// Panics if the arena was already rewound or reset past the checkpoint.
    pub fn rewind(&mut self, checkpoint: ArenaCheckpoint) {
        assert!(
            checkpoint.0 <= self.size,
            "checkpoint {} is ahead of arena `{}` size {}",
            checkpoint.0,
            self.name,
            self.size
        );
        self.size = checkpoint.0;
    }

    /// Opens an undo scope: every allocation made through the returned guard
    /// is reclaimed when it drops, however the scope is left.
    #[must_use]
    pub fn scoped(&mut self) -> ArenaScope<'_> {
        let restore = self.checkpoint();
        ArenaScope { arena: self, restore }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// A saved arena size, see [`Arena::checkpoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArenaCheckpoint(usize);

/// Guard returned by [`Arena::scoped`].
///
/// Dereferences to the arena; restores the arena size on drop.
pub struct ArenaScope<'a> {
    arena: &'a mut Arena,
    restore: ArenaCheckpoint,
}

impl Deref for ArenaScope<'_> {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        self.arena
    }
}

impl DerefMut for ArenaScope<'_> {
    fn deref_mut(&mut self) -> &mut Arena {
        self.arena
    }
}

impl Drop for ArenaScope<'_> {
    fn drop(&mut self) {
        self.arena.size = self.restore.0;
    }
}

/// Typed handle to `len` elements at a byte offset inside an arena.
///
/// The handle is only meaningful for the arena that produced it, and only
/// until that arena is reset or rewound below it.
pub struct ArenaSlice<T> {
    offset: usize,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaSlice<T> {
    /// An empty slice, valid in every arena.
    #[must_use]
    pub const fn empty() -> Self {
        Self::from_parts(0, 0)
    }

    pub(crate) const fn from_parts(offset: usize, len: usize) -> Self {
        Self {
            offset,
            len,
            _marker: PhantomData,
        }
    }

    /// Number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the slice has no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of the first element.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    const fn byte_end(&self) -> usize {
        self.offset + self.len * std::mem::size_of::<T>()
    }
}

impl<T> Clone for ArenaSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaSlice<T> {}

impl<T> Default for ArenaSlice<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> PartialEq for ArenaSlice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.len == other.len
    }
}

impl<T> Eq for ArenaSlice<T> {}

impl<T> fmt::Debug for ArenaSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaSlice")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
