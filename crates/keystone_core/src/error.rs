//! # Core Error Types
//!
//! Everything that can go wrong in arena memory or in the entity store.
//!
//! Capacity violations are never retried: the host is expected to treat them
//! as fatal (the release profile aborts on panic).

use thiserror::Error;

use crate::ecs::ComponentKind;

/// Errors raised by the arena and pool allocators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// An arena allocation would grow past the arena capacity.
    #[error("arena `{arena}` exhausted: requested {requested} bytes with {used} of {capacity} in use")]
    ArenaExhausted {
        /// Name of the arena.
        arena: &'static str,
        /// Bytes requested, including alignment padding.
        requested: usize,
        /// Bytes in use before the request.
        used: usize,
        /// Arena capacity in bytes.
        capacity: usize,
    },

    /// Every block of a pool is allocated.
    #[error("pool `{pool}` exhausted: all {block_count} blocks in use")]
    PoolExhausted {
        /// Name of the pool.
        pool: &'static str,
        /// Number of blocks in the pool.
        block_count: usize,
    },

    /// Pool parameters do not describe a usable layout.
    #[error("invalid pool layout: {0}")]
    InvalidPoolLayout(&'static str),
}

/// Errors raised by the entity-component store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The commit ran out of arena memory.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// An entity index outside `0..entity_count`.
    #[error("entity index {index} out of range (entity count {count})")]
    EntityOutOfRange {
        /// The offending index.
        index: usize,
        /// The current entity count.
        count: usize,
    },

    /// A component index outside the component column.
    #[error("{kind:?} component index {index} out of range (column length {len})")]
    ComponentOutOfRange {
        /// Component kind of the column.
        kind: ComponentKind,
        /// The offending index.
        index: usize,
        /// The column length.
        len: usize,
    },
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
