//! # KEYSTONE Core
//!
//! Arena memory and the columnar entity-component store:
//! - Bump arenas with scoped undo, a fixed-block pool and double-buffered
//!   arena halves
//! - In-place array and linked-list helpers
//! - Entities and their four optional components, rebuilt by a commit
//!
//! ## Architecture Rules
//!
//! 1. **Arena memory only** - columns live in pre-reserved arenas
//! 2. **Plain old data** - every column type is `Pod`, no destructors
//! 3. **Single writer** - every mutation goes through `&mut`
//!
//! ## Example
//!
//! ```rust
//! use keystone_core::{ComponentKind, EntityAddition, EntityStore, RenderComponent};
//!
//! let mut store = EntityStore::new(1 << 20);
//! store.add_entity(EntityAddition::new("crate").with_component(RenderComponent::new(0)));
//! store.add_entity(EntityAddition::new("marker"));
//! store.commit().unwrap();
//!
//! store.modify(0).unwrap().remove_entity();
//! store.commit().unwrap();
//!
//! let view = store.view();
//! assert_eq!(view.entity_count(), 1);
//! assert_eq!(view.component_count(ComponentKind::Render), 0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod collections;
pub mod ecs;
pub mod error;
pub mod memory;

pub use ecs::{
    AdditionId, AdditionQueue, BodyHandle, CollisionComponent, CollisionShape, CommitStats,
    Component, ComponentFlags, ComponentKind, ComponentPayloads, EntityAddition, EntityInfo,
    EntityModification, EntityStore, Light, LightComponent, PhysicsComponent, RenderComponent,
    StoreView,
};
pub use error::{MemoryError, MemoryResult, StoreError, StoreResult};
pub use memory::{Arena, ArenaCheckpoint, ArenaScope, ArenaSlice, DoubleBufferedArena, PoolAllocator, PoolHandle};
