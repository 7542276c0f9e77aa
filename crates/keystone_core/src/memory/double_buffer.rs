//! # Double-Buffered Arena
//!
//! Two arenas of equal capacity with an explicit active selector.
//!
//! ## Architecture
//!
//! ```text
//!          ┌──────────────────────────────┐
//!          │     DoubleBufferedArena      │
//!          │  ┌─────────┐  ┌─────────┐    │
//!          │  │ Arena A │  │ Arena B │    │
//!          │  └────┬────┘  └────┬────┘    │
//!          │       └──── active ┘         │
//!          └──────────────────────────────┘
//!
//!   commit N:  read front ──merge──▶ write back  ──publish──▶ back becomes front
//! ```
//!
//! The front arena holds the published generation. A commit resets the back
//! arena, rebuilds into it while still reading the front, and publishes by
//! flipping the selector. The old front stays intact (and readable) until
//! the following commit resets it.

use super::arena::Arena;

/// Two arenas, one published and one being rebuilt.
#[derive(Debug)]
pub struct DoubleBufferedArena {
    /// The two arena halves.
    arenas: [Arena; 2],
    /// Index of the published half.
    active: usize,
    /// Number of publishes so far.
    generation: u64,
}

impl DoubleBufferedArena {
    /// Creates two arenas of `capacity` bytes each.
    #[must_use]
    pub fn new(names: [&'static str; 2], capacity: usize) -> Self {
        Self {
            arenas: [Arena::new(names[0], capacity), Arena::new(names[1], capacity)],
            active: 0,
            generation: 0,
        }
    }

    /// The published arena.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &Arena {
        &self.arenas[self.active]
    }

    /// The published arena, for in-place edits of published columns.
    #[inline]
    pub fn front_mut(&mut self) -> &mut Arena {
        &mut self.arenas[self.active]
    }

    /// The arena that held the previous generation.
    #[inline]
    #[must_use]
    pub fn back(&self) -> &Arena {
        &self.arenas[self.active ^ 1]
    }

    /// Resets the back arena and lends both halves for a rebuild.
    ///
    /// After this call the previous generation is gone.
    pub fn begin_swap(&mut self) -> (&Arena, &mut Arena) {
        let [a, b] = &mut self.arenas;
        let (front, back) = if self.active == 0 { (a, b) } else { (b, a) };
        back.reset();
        (front, back)
    }

    /// Makes the back arena the published one.
    pub fn publish(&mut self) {
        self.active ^= 1;
        self.generation += 1;
    }

    /// Number of publishes so far.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Capacity of each half in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arenas[0].capacity()
    }
}
