//! # Level Configuration
//!
//! Arena capacities and asset limits, read from TOML. Every field has a
//! default, so an empty file (or no file at all) yields a working level.
//!
//! ```toml
//! frame_arena_bytes = 4194304
//! model_capacity = 256
//! store_vertices = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LevelResult;

const MIB: usize = 1024 * 1024;

/// Capacities fixed when a level is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Frame arena for per-frame render records.
    pub frame_arena_bytes: usize,
    /// Each of the two entity column arenas.
    pub entity_arena_bytes: usize,
    /// Asset arena holding model graphs for the life of the level.
    pub asset_arena_bytes: usize,
    /// Maximum number of loaded models.
    pub model_capacity: usize,
    /// Maximum number of loaded skyboxes.
    pub skybox_capacity: usize,
    /// Keep CPU copies of mesh index and vertex bytes after upload.
    pub store_vertices: bool,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            frame_arena_bytes: 4 * MIB,
            entity_arena_bytes: 8 * MIB,
            asset_arena_bytes: 64 * MIB,
            model_capacity: 1024,
            skybox_capacity: 16,
            store_vertices: false,
        }
    }
}

impl LevelConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// [`LevelError::Config`](crate::LevelError::Config) on malformed TOML or
    /// mistyped values.
    pub fn from_toml_str(text: &str) -> LevelResult<Self> {
        Ok(toml::from_str::<Self>(text)?)
    }

    /// Reads a TOML file, then applies environment overrides.
    ///
    /// A missing file is not an error: the defaults are used.
    ///
    /// # Errors
    ///
    /// I/O errors other than "not found", and TOML errors.
    pub fn load(path: impl AsRef<Path>) -> LevelResult<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No level config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => return Err(err.into()),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Env overrides for quick tuning.
    fn apply_env_overrides(&mut self) {
        if let Some(store) = std::env::var("KEYSTONE_STORE_VERTICES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.store_vertices = store;
        }
        if let Some(bytes) = std::env::var("KEYSTONE_FRAME_ARENA_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.frame_arena_bytes = bytes;
        }
    }
}
