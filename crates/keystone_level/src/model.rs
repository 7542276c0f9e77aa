//! # Model Library
//!
//! Model graphs copied into the asset arena when a model is added, and kept
//! there for the life of the level. Every table is a `Pod` record column;
//! child lists and scene roots live in one flat `u32` index column that
//! scene and node records point into.
//!
//! ## Validation
//!
//! An asset is rejected before anything is copied or uploaded if any index
//! in it points outside its table, or if its node graph is not a forest when
//! seen from the scene roots. Traversal can then index without checks and
//! always terminates.

use bytemuck::{Pod, Zeroable};
use keystone_core::{Arena, ArenaSlice};
use keystone_shared::{Mat4, Vec4};

use crate::assets::{ModelAsset, NO_INDEX, VERTEX_STRIDE};
use crate::backend::{DescriptorHandle, ImageDesc, ImageHandle, MaterialTextures, RenderBackend};
use crate::config::LevelConfig;
use crate::error::{LevelError, LevelResult, ModelError};

/// Bytes in an asset file name record, including the terminator.
pub const ASSET_NAME_CAPACITY: usize = 128;

/// A fixed-size file name, so model and skybox tables stay `Copy`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AssetName {
    bytes: [u8; ASSET_NAME_CAPACITY],
    len: u8,
}

impl AssetName {
    /// Copies `name`, or `None` when it does not fit.
    #[must_use]
    pub fn new(name: &str) -> Option<Self> {
        if name.len() >= ASSET_NAME_CAPACITY {
            return None;
        }
        let mut bytes = [0u8; ASSET_NAME_CAPACITY];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Some(Self {
            bytes,
            len: name.len() as u8,
        })
    }

    /// The name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or_default()
    }
}

impl Default for AssetName {
    fn default() -> Self {
        Self {
            bytes: [0; ASSET_NAME_CAPACITY],
            len: 0,
        }
    }
}

impl std::fmt::Debug for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

// ============================================================================
// ARENA RECORDS
// ============================================================================

/// Roots of one scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelScene {
    /// First root in the index column.
    pub root_offset: u32,
    /// Number of roots.
    pub root_count: u32,
}

/// One node of the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelNode {
    /// Mesh drawn at this node; anything `>= mesh_count` means none.
    pub mesh_index: u32,
    /// First child in the index column.
    pub child_offset: u32,
    /// Number of children.
    pub child_count: u32,
    /// Transform relative to the parent.
    pub local_transform: Mat4,
}

impl ModelNode {
    /// Whether this node draws one of `mesh_count` meshes.
    #[inline]
    #[must_use]
    pub const fn has_mesh(&self, mesh_count: usize) -> bool {
        (self.mesh_index as usize) < mesh_count
    }
}

/// Where a mesh lives in the level vertex buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelMesh {
    /// Material, or out of range for the default material.
    pub material_index: u32,
    /// `u16` indices.
    pub index_count: u32,
    /// Byte offset of the indices, a multiple of 2.
    pub index_buffer_offset: u32,
    /// Vertices.
    pub vertex_count: u32,
    /// Byte offset of the vertices, a multiple of the vertex stride.
    pub vertex_buffer_offset: u32,
    /// Offset of the CPU copy in the model's mesh data, or [`NO_INDEX`].
    pub data_offset: u32,
}

/// A joint of a skin.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelJoint {
    /// Node driven by the joint.
    pub node_index: u32,
    /// Inverse bind matrix.
    pub inverse_bind_mat: Mat4,
}

/// A skeleton.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelSkin {
    /// Skeleton root.
    pub root_node_index: u32,
    /// First joint in the joint column.
    pub joint_offset: u32,
    /// Number of joints, at least one.
    pub joint_count: u32,
}

/// A material with its texture descriptor set.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelMaterial {
    /// Descriptor set binding the five textures.
    pub descriptor: DescriptorHandle,
    /// Base color multiplier.
    pub albedo_factor: Vec4,
    /// Metalness multiplier.
    pub metallic_factor: f32,
    /// Roughness multiplier.
    pub roughness_factor: f32,
}

/// Arena handles of one loaded model.
#[derive(Clone, Copy, Debug, Default)]
pub struct Model {
    file: AssetName,
    scenes: ArenaSlice<ModelScene>,
    nodes: ArenaSlice<ModelNode>,
    indices: ArenaSlice<u32>,
    meshes: ArenaSlice<ModelMesh>,
    skins: ArenaSlice<ModelSkin>,
    joints: ArenaSlice<ModelJoint>,
    materials: ArenaSlice<ModelMaterial>,
    images: ArenaSlice<ImageHandle>,
    mesh_data: ArenaSlice<u8>,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Checks every index of `asset`.
///
/// # Errors
///
/// The first violated invariant.
pub fn validate(asset: &ModelAsset) -> Result<(), ModelError> {
    let node_count = asset.nodes.len();
    let mesh_count = asset.meshes.len();

    for (scene, record) in asset.scenes.iter().enumerate() {
        if let Some(&node) = record.roots.iter().find(|&&n| n as usize >= node_count) {
            return Err(ModelError::SceneRootOutOfRange {
                scene,
                node,
                node_count,
            });
        }
    }

    let mut has_parent = vec![false; node_count];
    for (node, record) in asset.nodes.iter().enumerate() {
        if record.mesh_index != NO_INDEX && record.mesh_index as usize >= mesh_count {
            return Err(ModelError::MeshOutOfRange {
                node,
                mesh: record.mesh_index,
                mesh_count,
            });
        }
        for &child in &record.children {
            let Some(parented) = has_parent.get_mut(child as usize) else {
                return Err(ModelError::ChildOutOfRange {
                    node,
                    child,
                    node_count,
                });
            };
            if *parented {
                return Err(ModelError::NotATree {
                    node: child as usize,
                });
            }
            *parented = true;
        }
    }

    for (mesh, record) in asset.meshes.iter().enumerate() {
        if record.vertex_count().is_none() {
            return Err(ModelError::TornVertexData {
                mesh,
                len: record.vertices.len(),
            });
        }
    }

    for (skin, record) in asset.skins.iter().enumerate() {
        if record.joints.is_empty() {
            return Err(ModelError::EmptySkin { skin });
        }
        let joints = record.joints.iter().map(|joint| joint.node_index);
        if let Some(node) = std::iter::once(record.root_node_index)
            .chain(joints)
            .find(|&n| n as usize >= node_count)
        {
            return Err(ModelError::JointOutOfRange {
                skin,
                node,
                node_count,
            });
        }
    }

    // Every node has at most one parent now; a node reached twice from the
    // roots of one scene means a cycle or a duplicated root.
    let mut visited = vec![false; node_count];
    let mut stack = Vec::new();
    for record in &asset.scenes {
        visited.fill(false);
        stack.extend(record.roots.iter().rev().copied());
        while let Some(node) = stack.pop() {
            let node = node as usize;
            if visited[node] {
                return Err(ModelError::NotATree { node });
            }
            visited[node] = true;
            stack.extend(asset.nodes[node].children.iter().rev().copied());
        }
    }

    Ok(())
}

// ============================================================================
// LIBRARY
// ============================================================================

/// All models of a level, in their own arena.
#[derive(Debug)]
pub struct ModelLibrary {
    arena: Arena,
    models: Box<[Model]>,
    count: usize,
    vertex_buffer_offset: usize,
    store_vertices: bool,
}

impl ModelLibrary {
    /// Reserves the asset arena and the model table.
    #[must_use]
    pub fn new(config: &LevelConfig) -> Self {
        Self {
            arena: Arena::new("assets", config.asset_arena_bytes),
            models: vec![Model::default(); config.model_capacity].into_boxed_slice(),
            count: 0,
            vertex_buffer_offset: 0,
            store_vertices: config.store_vertices,
        }
    }

    /// Loaded models.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// No models loaded.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Model slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.models.len()
    }

    /// Bytes used in the level vertex buffer so far.
    #[inline]
    #[must_use]
    pub const fn vertex_buffer_offset(&self) -> usize {
        self.vertex_buffer_offset
    }

    /// The asset arena.
    #[inline]
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Index of the model loaded from `file`.
    #[must_use]
    pub fn index_of(&self, file: &str) -> Option<usize> {
        self.models[..self.count]
            .iter()
            .position(|model| model.file.as_str() == file)
    }

    /// Read view of model `index`, `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<ModelView<'_>> {
        self.models[..self.count].get(index).map(|model| ModelView {
            arena: &self.arena,
            model,
        })
    }

    /// Read views of every model, in load order.
    pub fn iter(&self) -> impl Iterator<Item = ModelView<'_>> + '_ {
        self.models[..self.count].iter().map(|model| ModelView {
            arena: &self.arena,
            model,
        })
    }

    /// Validates `asset`, uploads its meshes and images through `backend`
    /// and copies its tables into the asset arena.
    ///
    /// On failure the arena and the vertex buffer offset are restored.
    ///
    /// # Errors
    ///
    /// Capacity, duplicate file, name length, validation, arena and backend
    /// failures.
    pub fn add(
        &mut self,
        file: &str,
        asset: &ModelAsset,
        backend: &mut dyn RenderBackend,
    ) -> LevelResult<usize> {
        if self.count == self.models.len() {
            return Err(LevelError::ModelCapacity(self.models.len()));
        }
        if self.index_of(file).is_some() {
            return Err(LevelError::DuplicateModel(file.to_owned()));
        }
        let name = AssetName::new(file).ok_or_else(|| LevelError::NameTooLong(file.to_owned()))?;
        validate(asset).map_err(|source| LevelError::Model {
            file: file.to_owned(),
            source,
        })?;

        let checkpoint = self.arena.checkpoint();
        let vertex_buffer_offset = self.vertex_buffer_offset;
        match self.build(name, asset, backend) {
            Ok(model) => {
                let index = self.count;
                self.models[index] = model;
                self.count += 1;
                tracing::info!(
                    "Loaded model {} as {}: {} nodes, {} meshes, {} bytes of vertex buffer",
                    file,
                    index,
                    asset.nodes.len(),
                    asset.meshes.len(),
                    self.vertex_buffer_offset - vertex_buffer_offset
                );
                Ok(index)
            }
            Err(err) => {
                self.arena.rewind(checkpoint);
                self.vertex_buffer_offset = vertex_buffer_offset;
                Err(err)
            }
        }
    }

    fn build(
        &mut self,
        file: AssetName,
        asset: &ModelAsset,
        backend: &mut dyn RenderBackend,
    ) -> LevelResult<Model> {
        let mut indices = Vec::new();
        let scenes: Vec<ModelScene> = asset
            .scenes
            .iter()
            .map(|scene| {
                let record = ModelScene {
                    root_offset: indices.len() as u32,
                    root_count: scene.roots.len() as u32,
                };
                indices.extend_from_slice(&scene.roots);
                record
            })
            .collect();
        let nodes: Vec<ModelNode> = asset
            .nodes
            .iter()
            .map(|node| {
                let record = ModelNode {
                    mesh_index: node.mesh_index,
                    child_offset: indices.len() as u32,
                    child_count: node.children.len() as u32,
                    local_transform: node.local_transform,
                };
                indices.extend_from_slice(&node.children);
                record
            })
            .collect();

        let mut mesh_data = Vec::new();
        let mut meshes = Vec::with_capacity(asset.meshes.len());
        for mesh in &asset.meshes {
            let index_bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);
            let index_buffer_offset = self.vertex_buffer_offset.next_multiple_of(2);
            backend.transfer_buffer(index_buffer_offset, index_bytes)?;
            let vertex_buffer_offset =
                (index_buffer_offset + index_bytes.len()).next_multiple_of(VERTEX_STRIDE);
            backend.transfer_buffer(vertex_buffer_offset, &mesh.vertices)?;
            self.vertex_buffer_offset = vertex_buffer_offset + mesh.vertices.len();

            let data_offset = if self.store_vertices {
                let offset = mesh_data.len() as u32;
                mesh_data.extend_from_slice(index_bytes);
                mesh_data.extend_from_slice(&mesh.vertices);
                offset
            } else {
                NO_INDEX
            };
            meshes.push(ModelMesh {
                material_index: mesh.material_index,
                index_count: mesh.indices.len() as u32,
                index_buffer_offset: index_buffer_offset as u32,
                vertex_count: (mesh.vertices.len() / VERTEX_STRIDE) as u32,
                vertex_buffer_offset: vertex_buffer_offset as u32,
                data_offset,
            });
        }

        let mut joints = Vec::new();
        let skins: Vec<ModelSkin> = asset
            .skins
            .iter()
            .map(|skin| {
                let record = ModelSkin {
                    root_node_index: skin.root_node_index,
                    joint_offset: joints.len() as u32,
                    joint_count: skin.joints.len() as u32,
                };
                joints.extend(skin.joints.iter().map(|joint| ModelJoint {
                    node_index: joint.node_index,
                    inverse_bind_mat: joint.inverse_bind_mat,
                }));
                record
            })
            .collect();

        let mut images = Vec::with_capacity(asset.images.len());
        for image in &asset.images {
            let desc = ImageDesc {
                width: image.width,
                height: image.height,
                mip_count: image.mip_count,
                layer_count: image.layer_count,
                format: image.format,
                cubemap: false,
            };
            images.push(backend.create_image(&desc, &image.data)?);
        }

        let mut materials = Vec::with_capacity(asset.materials.len());
        for (index, material) in asset.materials.iter().enumerate() {
            let default = backend.default_texture();
            let bind = |slot: usize| {
                let image = material.images[slot];
                match images.get(image as usize) {
                    Some(&handle) => handle,
                    None => {
                        if image != NO_INDEX {
                            tracing::warn!(
                                "Model {:?} material {} image {} out of range, using default texture",
                                file,
                                index,
                                image
                            );
                        }
                        default
                    }
                }
            };
            // Height maps are not sampled yet; the slot always holds the default.
            let textures = MaterialTextures {
                albedo: bind(0),
                metallic: bind(1),
                roughness: bind(2),
                normal: bind(3),
                height: default,
            };
            materials.push(ModelMaterial {
                descriptor: backend.write_material_descriptors(&textures)?,
                albedo_factor: material.albedo_factor,
                metallic_factor: material.metallic_factor,
                roughness_factor: material.roughness_factor,
            });
        }

        Ok(Model {
            file,
            scenes: self.arena.push_slice(&scenes)?,
            nodes: self.arena.push_slice(&nodes)?,
            indices: self.arena.push_slice(&indices)?,
            meshes: self.arena.push_slice(&meshes)?,
            skins: self.arena.push_slice(&skins)?,
            joints: self.arena.push_slice(&joints)?,
            materials: self.arena.push_slice(&materials)?,
            images: self.arena.push_slice(&images)?,
            mesh_data: self.arena.copy_bytes(&mesh_data)?,
        })
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// Borrowed read access to one model's tables.
#[derive(Clone, Copy, Debug)]
pub struct ModelView<'a> {
    arena: &'a Arena,
    model: &'a Model,
}

impl<'a> ModelView<'a> {
    /// File the model was loaded from.
    #[must_use]
    pub fn file(&self) -> &'a str {
        self.model.file.as_str()
    }

    /// Scenes.
    #[must_use]
    pub fn scenes(&self) -> &'a [ModelScene] {
        self.arena.get(self.model.scenes)
    }

    /// Nodes.
    #[must_use]
    pub fn nodes(&self) -> &'a [ModelNode] {
        self.arena.get(self.model.nodes)
    }

    /// Root nodes of `scene`.
    #[must_use]
    pub fn roots(&self, scene: &ModelScene) -> &'a [u32] {
        self.index_range(scene.root_offset, scene.root_count)
    }

    /// Children of `node`.
    #[must_use]
    pub fn children(&self, node: &ModelNode) -> &'a [u32] {
        self.index_range(node.child_offset, node.child_count)
    }

    /// Meshes.
    #[must_use]
    pub fn meshes(&self) -> &'a [ModelMesh] {
        self.arena.get(self.model.meshes)
    }

    /// Skins.
    #[must_use]
    pub fn skins(&self) -> &'a [ModelSkin] {
        self.arena.get(self.model.skins)
    }

    /// Joints of `skin`.
    #[must_use]
    pub fn joints(&self, skin: &ModelSkin) -> &'a [ModelJoint] {
        let start = skin.joint_offset as usize;
        &self.arena.get(self.model.joints)[start..start + skin.joint_count as usize]
    }

    /// Materials.
    #[must_use]
    pub fn materials(&self) -> &'a [ModelMaterial] {
        self.arena.get(self.model.materials)
    }

    /// Images created for this model.
    #[must_use]
    pub fn images(&self) -> &'a [ImageHandle] {
        self.arena.get(self.model.images)
    }

    /// CPU copy of a mesh's index bytes, when vertices are stored.
    #[must_use]
    pub fn index_bytes(&self, mesh: &ModelMesh) -> Option<&'a [u8]> {
        let len = mesh.index_count as usize * std::mem::size_of::<u16>();
        self.mesh_bytes(mesh.data_offset, 0, len)
    }

    /// CPU copy of a mesh's vertex bytes, when vertices are stored.
    #[must_use]
    pub fn vertex_bytes(&self, mesh: &ModelMesh) -> Option<&'a [u8]> {
        let skip = mesh.index_count as usize * std::mem::size_of::<u16>();
        let len = mesh.vertex_count as usize * VERTEX_STRIDE;
        self.mesh_bytes(mesh.data_offset, skip, len)
    }

    fn mesh_bytes(&self, data_offset: u32, skip: usize, len: usize) -> Option<&'a [u8]> {
        if data_offset == NO_INDEX {
            return None;
        }
        let start = data_offset as usize + skip;
        self.arena.get(self.model.mesh_data).get(start..start + len)
    }

    fn index_range(&self, offset: u32, count: u32) -> &'a [u32] {
        let start = offset as usize;
        &self.arena.get(self.model.indices)[start..start + count as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ImageAsset, JointAsset, MaterialAsset, MeshAsset, NodeAsset, SceneAsset, SkinAsset};
    use crate::backend::HeadlessBackend;
    use keystone_shared::Vec3;

    fn mesh(index_count: usize, vertex_count: usize) -> MeshAsset {
        MeshAsset {
            name: "mesh".to_owned(),
            material_index: 0,
            indices: (0..index_count as u16).collect(),
            vertices: vec![7; vertex_count * VERTEX_STRIDE],
        }
    }

    fn two_node_asset() -> ModelAsset {
        ModelAsset {
            scenes: vec![SceneAsset {
                name: "scene".to_owned(),
                roots: vec![0],
            }],
            nodes: vec![
                NodeAsset::new(Mat4::IDENTITY).with_mesh(0).with_children(&[1]),
                NodeAsset::new(Mat4::from_translation(Vec3::X)).with_mesh(1),
            ],
            meshes: vec![mesh(3, 3), mesh(5, 4)],
            ..ModelAsset::default()
        }
    }

    fn library(store_vertices: bool) -> ModelLibrary {
        ModelLibrary::new(&LevelConfig {
            asset_arena_bytes: 1 << 20,
            model_capacity: 2,
            store_vertices,
            ..LevelConfig::default()
        })
    }

    #[test]
    fn test_validate_accepts_forest() {
        assert_eq!(validate(&two_node_asset()), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_indices() {
        let mut asset = two_node_asset();
        asset.scenes[0].roots.push(9);
        assert!(matches!(validate(&asset), Err(ModelError::SceneRootOutOfRange { node: 9, .. })));

        let mut asset = two_node_asset();
        asset.nodes[1].children.push(5);
        assert!(matches!(validate(&asset), Err(ModelError::ChildOutOfRange { node: 1, child: 5, .. })));

        let mut asset = two_node_asset();
        asset.nodes[1].mesh_index = 2;
        assert!(matches!(validate(&asset), Err(ModelError::MeshOutOfRange { mesh: 2, .. })));

        let mut asset = two_node_asset();
        asset.meshes[0].vertices.push(0);
        assert!(matches!(validate(&asset), Err(ModelError::TornVertexData { mesh: 0, .. })));
    }

    #[test]
    fn test_validate_rejects_cycles() {
        let mut asset = two_node_asset();
        asset.nodes[1].children.push(0);
        assert_eq!(validate(&asset), Err(ModelError::NotATree { node: 0 }));

        let mut asset = two_node_asset();
        asset.nodes[1].children.push(1);
        assert_eq!(validate(&asset), Err(ModelError::NotATree { node: 1 }));
    }

    #[test]
    fn test_validate_skins() {
        let mut asset = two_node_asset();
        asset.skins.push(SkinAsset::default());
        assert_eq!(validate(&asset), Err(ModelError::EmptySkin { skin: 0 }));

        asset.skins[0].joints.push(JointAsset {
            node_index: 4,
            inverse_bind_mat: Mat4::IDENTITY,
        });
        assert!(matches!(validate(&asset), Err(ModelError::JointOutOfRange { node: 4, .. })));
    }

    #[test]
    fn test_mesh_upload_offsets() {
        let mut models = library(true);
        let mut backend = HeadlessBackend::default();
        let index = models.add("two.gpk", &two_node_asset(), &mut backend).unwrap();
        let model = models.get(index).unwrap();
        let meshes = model.meshes();

        // 3 indices = 6 bytes, vertices rounded up to the stride.
        assert_eq!(meshes[0].index_buffer_offset, 0);
        assert_eq!(meshes[0].vertex_buffer_offset, VERTEX_STRIDE as u32);
        let first_end = VERTEX_STRIDE * 4;
        assert_eq!(meshes[1].index_buffer_offset, first_end as u32);
        assert_eq!(
            meshes[1].vertex_buffer_offset as usize,
            (first_end + 10).next_multiple_of(VERTEX_STRIDE)
        );
        assert_eq!(meshes[1].vertex_buffer_offset as usize % VERTEX_STRIDE, 0);
        assert_eq!(models.vertex_buffer_offset(), meshes[1].vertex_buffer_offset as usize + 4 * VERTEX_STRIDE);

        let uploaded = &backend.vertex_buffer()[0..6];
        assert_eq!(uploaded, bytemuck::cast_slice::<u16, u8>(&[0, 1, 2]));
        assert_eq!(model.index_bytes(&meshes[1]).unwrap().len(), 10);
        assert_eq!(model.vertex_bytes(&meshes[1]).unwrap(), &[7u8; 4 * VERTEX_STRIDE][..]);
    }

    #[test]
    fn test_vertices_not_stored_by_default() {
        let mut models = library(false);
        let mut backend = HeadlessBackend::default();
        models.add("two.gpk", &two_node_asset(), &mut backend).unwrap();
        let model = models.get(0).unwrap();
        assert_eq!(model.index_bytes(&model.meshes()[0]), None);
    }

    #[test]
    fn test_graph_copied_into_arena() {
        let mut models = library(false);
        let mut backend = HeadlessBackend::default();
        models.add("two.gpk", &two_node_asset(), &mut backend).unwrap();
        let model = models.get(0).unwrap();
        assert_eq!(model.file(), "two.gpk");
        assert_eq!(model.roots(&model.scenes()[0]), &[0]);
        assert_eq!(model.children(&model.nodes()[0]), &[1]);
        assert!(model.children(&model.nodes()[1]).is_empty());
        assert_eq!(model.nodes()[1].local_transform, Mat4::from_translation(Vec3::X));
    }

    #[test]
    fn test_duplicate_and_capacity() {
        let mut models = library(false);
        let mut backend = HeadlessBackend::default();
        models.add("a.gpk", &ModelAsset::default(), &mut backend).unwrap();
        assert!(matches!(
            models.add("a.gpk", &ModelAsset::default(), &mut backend),
            Err(LevelError::DuplicateModel(_))
        ));
        models.add("b.gpk", &ModelAsset::default(), &mut backend).unwrap();
        assert!(matches!(
            models.add("c.gpk", &ModelAsset::default(), &mut backend),
            Err(LevelError::ModelCapacity(2))
        ));
        assert_eq!(models.index_of("b.gpk"), Some(1));
        assert_eq!(models.index_of("c.gpk"), None);
    }

    #[test]
    fn test_failed_add_restores_state() {
        let mut models = library(false);
        let mut backend = HeadlessBackend::new(64, 0, 256);
        let used = models.arena().used();
        assert!(matches!(
            models.add("big.gpk", &two_node_asset(), &mut backend),
            Err(LevelError::Backend(_))
        ));
        assert_eq!(models.arena().used(), used);
        assert_eq!(models.vertex_buffer_offset(), 0);
        assert!(models.is_empty());
    }

    #[test]
    fn test_material_binds_default_for_missing_images() {
        let mut asset = two_node_asset();
        asset.images.push(ImageAsset {
            width: 4,
            height: 4,
            mip_count: 1,
            layer_count: 1,
            format: 0,
            data: vec![0; 64],
        });
        asset.materials.push(MaterialAsset {
            images: [0, 3, NO_INDEX, 0, 0],
            ..MaterialAsset::default()
        });

        let mut models = library(false);
        let mut backend = HeadlessBackend::default();
        models.add("lit.gpk", &asset, &mut backend).unwrap();
        let model = models.get(0).unwrap();
        let image = model.images()[0];
        let textures = backend.materials()[model.materials()[0].descriptor.0 as usize];

        assert_eq!(textures.albedo, image);
        assert_eq!(textures.metallic, HeadlessBackend::DEFAULT_TEXTURE);
        assert_eq!(textures.roughness, HeadlessBackend::DEFAULT_TEXTURE);
        assert_eq!(textures.normal, image);
        assert_eq!(textures.height, HeadlessBackend::DEFAULT_TEXTURE);
    }

    #[test]
    fn test_asset_name_limit() {
        assert_eq!(AssetName::new("a.gpk").unwrap().as_str(), "a.gpk");
        assert!(AssetName::new(&"x".repeat(ASSET_NAME_CAPACITY)).is_none());
    }
}
