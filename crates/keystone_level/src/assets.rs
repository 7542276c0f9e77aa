//! # Asset Source Seam
//!
//! Decoded model and skybox tables, as produced by the host's file loader.
//! The level copies them into its asset arena and uploads the GPU parts, so
//! an asset value can be dropped as soon as it is loaded.

use std::collections::HashMap;

use keystone_shared::{Mat4, Vec4};

use crate::error::AssetError;

/// Marks an absent node mesh or material image.
pub const NO_INDEX: u32 = u32::MAX;

/// Bytes per model vertex: position, color, uv, normal, tangent, joints,
/// weights.
pub const VERTEX_STRIDE: usize = 12 + 4 + 8 + 8 + 8 + 4 + 8;

/// Bytes per texel of a skybox cubemap face.
pub const SKYBOX_TEXEL_BYTES: usize = 4;

/// A named list of root nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneAsset {
    /// Scene name.
    pub name: String,
    /// Root nodes in draw order.
    pub roots: Vec<u32>,
}

/// One node of the model hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAsset {
    /// Mesh drawn at this node, or [`NO_INDEX`].
    pub mesh_index: u32,
    /// Transform relative to the parent.
    pub local_transform: Mat4,
    /// Child nodes.
    pub children: Vec<u32>,
}

impl NodeAsset {
    /// A node without mesh or children.
    #[must_use]
    pub fn new(local_transform: Mat4) -> Self {
        Self {
            mesh_index: NO_INDEX,
            local_transform,
            children: Vec::new(),
        }
    }

    /// Builder: draws `mesh` at this node.
    #[must_use]
    pub fn with_mesh(mut self, mesh: u32) -> Self {
        self.mesh_index = mesh;
        self
    }

    /// Builder: sets the children.
    #[must_use]
    pub fn with_children(mut self, children: &[u32]) -> Self {
        self.children = children.to_vec();
        self
    }
}

/// Index and vertex data of one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshAsset {
    /// Mesh name.
    pub name: String,
    /// Material, or [`NO_INDEX`] for the default material.
    pub material_index: u32,
    /// Triangle list indices.
    pub indices: Vec<u16>,
    /// Vertex bytes, [`VERTEX_STRIDE`] per vertex.
    pub vertices: Vec<u8>,
}

impl MeshAsset {
    /// Vertex count, or `None` when the byte length is not a whole number of
    /// vertices.
    #[must_use]
    pub fn vertex_count(&self) -> Option<usize> {
        (self.vertices.len() % VERTEX_STRIDE == 0).then_some(self.vertices.len() / VERTEX_STRIDE)
    }
}

/// A joint of a skin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAsset {
    /// Node driven by the joint.
    pub node_index: u32,
    /// Model space to joint space at bind time.
    pub inverse_bind_mat: Mat4,
}

/// A skeleton.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinAsset {
    /// Skin name.
    pub name: String,
    /// Skeleton root.
    pub root_node_index: u32,
    /// Joints. Never empty in valid data.
    pub joints: Vec<JointAsset>,
}

/// Surface parameters and texture references.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialAsset {
    /// Material name.
    pub name: String,
    /// Base color multiplier.
    pub albedo_factor: Vec4,
    /// Metalness multiplier.
    pub metallic_factor: f32,
    /// Roughness multiplier.
    pub roughness_factor: f32,
    /// Image indices: albedo, metallic, roughness, normal, height.
    pub images: [u32; 5],
}

impl Default for MaterialAsset {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo_factor: Vec4::new(1.0, 1.0, 1.0, 1.0),
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            images: [NO_INDEX; 5],
        }
    }
}

/// Texture data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAsset {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Mip levels.
    pub mip_count: u32,
    /// Array layers.
    pub layer_count: u32,
    /// Backend pixel format code.
    pub format: u32,
    /// Texel bytes, all mips and layers.
    pub data: Vec<u8>,
}

/// A decoded model file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelAsset {
    /// Scenes.
    pub scenes: Vec<SceneAsset>,
    /// Nodes.
    pub nodes: Vec<NodeAsset>,
    /// Meshes.
    pub meshes: Vec<MeshAsset>,
    /// Skins.
    pub skins: Vec<SkinAsset>,
    /// Materials.
    pub materials: Vec<MaterialAsset>,
    /// Images.
    pub images: Vec<ImageAsset>,
}

/// A decoded skybox file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkyboxAsset {
    /// Face width in texels.
    pub width: u32,
    /// Face height in texels.
    pub height: u32,
    /// Backend pixel format code.
    pub format: u32,
    /// Six faces, [`SKYBOX_TEXEL_BYTES`] per texel.
    pub cubemap: Vec<u8>,
}

impl SkyboxAsset {
    /// Bytes six faces of this size occupy.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * SKYBOX_TEXEL_BYTES * 6
    }
}

/// Where the level gets its assets from.
pub trait AssetSource {
    /// Loads and decodes a model file.
    ///
    /// # Errors
    ///
    /// [`AssetError::NotFound`] or [`AssetError::Malformed`].
    fn load_model(&self, file: &str) -> Result<ModelAsset, AssetError>;

    /// Loads and decodes a skybox file.
    ///
    /// # Errors
    ///
    /// [`AssetError::NotFound`] or [`AssetError::Malformed`].
    fn load_skybox(&self, file: &str) -> Result<SkyboxAsset, AssetError>;
}

/// Assets registered in memory under file names.
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    models: HashMap<String, ModelAsset>,
    skyboxes: HashMap<String, SkyboxAsset>,
}

impl AssetLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model under `file`, replacing any previous one.
    pub fn insert_model(&mut self, file: impl Into<String>, model: ModelAsset) {
        self.models.insert(file.into(), model);
    }

    /// Registers a skybox under `file`, replacing any previous one.
    pub fn insert_skybox(&mut self, file: impl Into<String>, skybox: SkyboxAsset) {
        self.skyboxes.insert(file.into(), skybox);
    }

    /// Number of registered models.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

impl AssetSource for AssetLibrary {
    fn load_model(&self, file: &str) -> Result<ModelAsset, AssetError> {
        self.models
            .get(file)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(file.to_owned()))
    }

    fn load_skybox(&self, file: &str) -> Result<SkyboxAsset, AssetError> {
        let skybox = self
            .skyboxes
            .get(file)
            .ok_or_else(|| AssetError::NotFound(file.to_owned()))?;
        if skybox.cubemap.len() != skybox.expected_len() {
            return Err(AssetError::Malformed {
                file: file.to_owned(),
                reason: format!(
                    "cubemap holds {} bytes, {}x{} faces need {}",
                    skybox.cubemap.len(),
                    skybox.width,
                    skybox.height,
                    skybox.expected_len()
                ),
            });
        }
        Ok(skybox.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_stride() {
        assert_eq!(VERTEX_STRIDE, 52);
        let mesh = MeshAsset {
            vertices: vec![0; VERTEX_STRIDE * 3],
            ..MeshAsset::default()
        };
        assert_eq!(mesh.vertex_count(), Some(3));
        let torn = MeshAsset {
            vertices: vec![0; VERTEX_STRIDE + 1],
            ..MeshAsset::default()
        };
        assert_eq!(torn.vertex_count(), None);
    }

    #[test]
    fn test_library_lookup() {
        let mut library = AssetLibrary::new();
        library.insert_model("crate.gpk", ModelAsset::default());
        assert!(library.load_model("crate.gpk").is_ok());
        assert_eq!(
            library.load_model("barrel.gpk"),
            Err(AssetError::NotFound("barrel.gpk".to_owned()))
        );
    }

    #[test]
    fn test_skybox_size_is_checked() {
        let mut library = AssetLibrary::new();
        library.insert_skybox(
            "sky.gpk",
            SkyboxAsset {
                width: 2,
                height: 2,
                format: 0,
                cubemap: vec![0; 2 * 2 * 4 * 6],
            },
        );
        library.insert_skybox(
            "torn.gpk",
            SkyboxAsset {
                width: 2,
                height: 2,
                format: 0,
                cubemap: vec![0; 10],
            },
        );
        assert!(library.load_skybox("sky.gpk").is_ok());
        assert!(matches!(
            library.load_skybox("torn.gpk"),
            Err(AssetError::Malformed { .. })
        ));
    }
}
