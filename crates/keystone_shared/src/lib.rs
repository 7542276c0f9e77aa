//! # KEYSTONE Shared
//!
//! Common types used by both the entity store and the level.
//!
//! ## RULE
//!
//! This crate must NEVER depend on:
//! - a GPU backend
//! - a physics engine
//! - file formats
//!
//! Everything in here is plain old data that can live in an arena.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    ENTITY_NAME_CAPACITY, MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS,
};
pub use math::{Mat4, Quaternion, Transform, Vec2, Vec3, Vec4};
