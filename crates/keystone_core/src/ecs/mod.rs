//! # Entity Component Store
//!
//! A columnar entity-component database rebuilt from pending edits once per
//! frame.
//!
//! ## Design Philosophy
//!
//! - Entities are plain indices into parallel columns
//! - Each component kind is one dense column, ordered like its owners
//! - Edits are queued, then applied by a single commit
//! - Every generation lives in arena memory, double-buffered

mod component;
mod entity;
mod mutation;
mod store;

pub use component::{
    BodyHandle, CollisionComponent, CollisionShape, Component, ComponentKind, ComponentPayloads,
    Light, LightComponent, PhysicsComponent, RenderComponent,
};
pub use entity::{ComponentFlags, EntityInfo};
pub use mutation::{AdditionId, AdditionQueue, EntityAddition, EntityModification};
pub use store::{CommitStats, EntityStore, StoreView};
