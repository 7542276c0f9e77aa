//! # Level Error Types
//!
//! Capacity violations and malformed data surface here as typed errors that
//! the host treats as fatal. Missing references inside otherwise valid data
//! (unknown model index, missing texture) are not errors: they degrade with a
//! warning where they are used.

use keystone_core::{MemoryError, StoreError};
use thiserror::Error;

/// Load-time violations of the model graph invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A scene root is not a node of the model.
    #[error("scene {scene} root {node} out of range ({node_count} nodes)")]
    SceneRootOutOfRange {
        /// Scene index.
        scene: usize,
        /// The offending root.
        node: u32,
        /// Number of nodes.
        node_count: usize,
    },

    /// A child index is not a node of the model.
    #[error("node {node} child {child} out of range ({node_count} nodes)")]
    ChildOutOfRange {
        /// Parent node.
        node: usize,
        /// The offending child.
        child: u32,
        /// Number of nodes.
        node_count: usize,
    },

    /// A node references a mesh that does not exist.
    #[error("node {node} mesh {mesh} out of range ({mesh_count} meshes)")]
    MeshOutOfRange {
        /// The node.
        node: usize,
        /// The offending mesh index.
        mesh: u32,
        /// Number of meshes.
        mesh_count: usize,
    },

    /// Vertex bytes of a mesh are not a whole number of vertices.
    #[error("mesh {mesh} has {len} vertex bytes, not a multiple of the vertex stride")]
    TornVertexData {
        /// The mesh.
        mesh: usize,
        /// Vertex byte length.
        len: usize,
    },

    /// A skin joint or root references a missing node.
    #[error("skin {skin} references node {node} out of range ({node_count} nodes)")]
    JointOutOfRange {
        /// The skin.
        skin: usize,
        /// The offending node index.
        node: u32,
        /// Number of nodes.
        node_count: usize,
    },

    /// A skin without joints.
    #[error("skin {skin} has no joints")]
    EmptySkin {
        /// The skin.
        skin: usize,
    },

    /// The node graph is not a forest: `node` is reachable twice.
    #[error("node {node} is reachable through more than one path")]
    NotATree {
        /// The node reached again.
        node: usize,
    },
}

/// Failure reported by an asset source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// No asset under this file name.
    #[error("asset `{0}` not found")]
    NotFound(String),

    /// The asset exists but cannot be decoded.
    #[error("asset `{file}` is malformed: {reason}")]
    Malformed {
        /// Asset file name.
        file: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Failure reported by a render backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("render backend: {0}")]
pub struct BackendError(pub String);

/// Everything that can fail while building or running a level.
#[derive(Error, Debug)]
pub enum LevelError {
    /// Reading or writing a file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The level description is not valid JSON for the expected schema.
    #[error("level json: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file is not valid TOML for the expected schema.
    #[error("level config: {0}")]
    Config(#[from] toml::de::Error),

    /// An arena ran out of space.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The entity store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The asset source failed.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The render backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A model graph violates its invariants.
    #[error("model `{file}`: {source}")]
    Model {
        /// Model file name.
        file: String,
        /// The violated invariant.
        #[source]
        source: ModelError,
    },

    /// The model file is already loaded.
    #[error("model `{0}` is already loaded")]
    DuplicateModel(String),

    /// A render component names a model file that is not loaded.
    #[error("model `{0}` is not loaded")]
    UnknownModel(String),

    /// Every model slot is in use.
    #[error("model capacity {0} exceeded")]
    ModelCapacity(usize),

    /// Every skybox slot is in use.
    #[error("skybox capacity {0} exceeded")]
    SkyboxCapacity(usize),

    /// A skybox index outside the skybox table.
    #[error("skybox index {index} out of range ({count} skyboxes)")]
    SkyboxOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of skyboxes.
        count: usize,
    },

    /// An entity name or asset file name longer than its record holds.
    #[error("name `{0}` is too long")]
    NameTooLong(String),

    /// The player entity named in the level does not exist.
    #[error("player entity `{0}` not found")]
    UnknownPlayer(String),

    /// More point lights than the common uniform block holds.
    #[error("{count} point lights exceed the maximum of {max}")]
    TooManyPointLights {
        /// Point lights in the level.
        count: usize,
        /// The configured maximum.
        max: usize,
    },

    /// The frame uniform buffer is full.
    #[error("frame uniform buffer full: {requested} bytes at offset {offset} of {capacity}")]
    UniformBufferFull {
        /// Bytes requested.
        requested: usize,
        /// Aligned write offset.
        offset: usize,
        /// Buffer size.
        capacity: usize,
    },
}

/// Result type for level operations.
pub type LevelResult<T> = Result<T, LevelError>;
