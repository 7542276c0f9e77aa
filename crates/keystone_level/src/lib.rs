//! # KEYSTONE Level
//!
//! A level on top of the KEYSTONE entity store:
//! - Model library packed into one asset arena, with scene-graph traversal
//! - Skybox table and the active skybox
//! - JSON level files, read into the store and written back
//! - Per-frame render data: light collection, camera uniforms and one
//!   uniform block per drawn mesh node
//!
//! The GPU, the physics engine and the asset files sit behind
//! [`RenderBackend`], [`PhysicsWorld`] and [`AssetSource`]. Each comes with a
//! headless implementation for tools and tests.
//!
//! ## Example
//!
//! ```rust
//! use keystone_level::{
//!     AssetLibrary, HeadlessBackend, Level, LevelConfig, LevelDescription, RecordingPhysics,
//! };
//!
//! let description = LevelDescription::from_json_str(
//!     r#"{ "entities": [ { "name": "hero" } ], "player": { "entity_name": "hero" } }"#,
//! )
//! .unwrap();
//!
//! let config = LevelConfig {
//!     frame_arena_bytes: 1 << 16,
//!     entity_arena_bytes: 1 << 16,
//!     asset_arena_bytes: 1 << 16,
//!     ..LevelConfig::default()
//! };
//! let mut backend = HeadlessBackend::default();
//! let mut level = Level::from_description(
//!     &config,
//!     &description,
//!     &AssetLibrary::new(),
//!     &mut backend,
//!     &mut RecordingPhysics::new(),
//! )
//! .unwrap();
//!
//! let camera = level.player_camera(10.0, 0.3, 0.0, 16.0 / 9.0);
//! let frame = level.generate_render_data(&camera, &mut backend).unwrap();
//! assert_eq!(frame.models.len(), 0);
//! level.end_frame();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod assets;
pub mod backend;
pub mod camera;
pub mod config;
pub mod error;
pub mod level;
pub mod level_file;
pub mod model;
pub mod physics;
pub mod render_data;
pub mod traversal;

pub use assets::{AssetLibrary, AssetSource, ModelAsset, SkyboxAsset};
pub use backend::{FrameUniformBuffer, HeadlessBackend, ImageHandle, RenderBackend};
pub use camera::Camera;
pub use config::LevelConfig;
pub use error::{AssetError, BackendError, LevelError, LevelResult, ModelError};
pub use level::{Level, Skybox};
pub use level_file::LevelDescription;
pub use model::{Model, ModelLibrary, ModelNode, ModelView};
pub use physics::{PhysicsWorld, RecordingPhysics};
pub use render_data::{generate_render_data, LevelRenderData, MeshUniform};
pub use traversal::{count_mesh_nodes, traverse_scenes, traverse_scenes_with_transform};
