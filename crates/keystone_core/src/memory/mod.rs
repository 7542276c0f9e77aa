//! # Memory Management
//!
//! Pre-allocated arenas and pools for allocation-free frames.
//!
//! ## Design Philosophy
//!
//! All memory is reserved once when a level is created. During a frame:
//! - No heap allocations
//! - Memory is reclaimed in bulk (arena reset, rewind or scope exit)
//! - Predictable, flat latency

mod arena;
mod double_buffer;
mod pool;

pub use arena::{Arena, ArenaCheckpoint, ArenaScope, ArenaSlice};
pub use double_buffer::DoubleBufferedArena;
pub use pool::{PoolAllocator, PoolHandle};
