//! # Per-Frame Render Data
//!
//! Walks the committed store once per frame and produces:
//! - one common uniform block (camera, shadow map, lights)
//! - one model record per visible render component with a loaded model
//! - one mesh record and uniform block per mesh-bearing node of that model
//!
//! Uniform blocks go to the backend's mapped frame memory; the records go to
//! the frame arena and are released when the frame arena is reset.
//!
//! **CRITICAL:** The uniform structs mirror shader layouts (std140). Every
//! field is 16-byte aligned by construction; do not reorder them.

use bytemuck::{Pod, Zeroable};
use keystone_core::{Arena, ArenaSlice, Light, LightComponent, RenderComponent, StoreView};
use keystone_shared::{
    Mat4, Vec2, Vec3, Vec4, MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS,
};

use crate::backend::FrameUniformBuffer;
use crate::camera::{Camera, SHADOW_ZFAR};
use crate::error::{LevelError, LevelResult};
use crate::model::{ModelLibrary, ModelView};
use crate::traversal::{count_mesh_nodes, traverse_scenes_with_transform};

// ============================================================================
// UNIFORM LAYOUTS
// ============================================================================

/// A directional light as the shaders see it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct DirectionalLightUniform {
    /// RGB, w unused.
    pub color: Vec4,
    /// Travel direction, w unused.
    pub direction: Vec4,
}

/// A point light as the shaders see it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PointLightUniform {
    /// RGB, w unused.
    pub color: Vec4,
    /// Position in xyz, attenuation in w.
    pub position_attenuation: Vec4,
}

/// A spot light as the shaders see it. Reserved, never filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct SpotLightUniform {
    /// RGB, w unused.
    pub color: Vec4,
    /// Position in xyz, attenuation in w.
    pub position_attenuation: Vec4,
    /// Direction in xyz, cone angle in w.
    pub direction_angle: Vec4,
}

/// Data shared by every draw of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CommonUniform {
    /// World to clip space.
    pub view_proj: Mat4,
    /// Eye position, w = 0.
    pub camera_position: Vec4,
    /// World to shadow-map clip space.
    pub shadow_map_proj: Mat4,
    /// Ambient RGB, w unused.
    pub ambient_light_color: Vec4,
    /// Directional lights.
    pub directional_lights: [DirectionalLightUniform; MAX_DIRECTIONAL_LIGHTS],
    /// Point lights, the first `point_light_count` are live.
    pub point_lights: [PointLightUniform; MAX_POINT_LIGHTS],
    /// Spot lights.
    pub spot_lights: [SpotLightUniform; MAX_SPOT_LIGHTS],
    /// Live directional lights (always one).
    pub directional_light_count: u32,
    /// Live point lights.
    pub point_light_count: u32,
    /// Live spot lights (always zero).
    pub spot_light_count: u32,
    _pad: u32,
}

/// Per-draw data of one mesh node.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MeshUniform {
    /// Model to world.
    pub model_mat: Mat4,
    /// Inverse transpose of `model_mat`.
    pub normal_mat: Mat4,
    /// Texture coordinate scale.
    pub uv_scale: Vec2,
    /// Roughness override.
    pub roughness: f32,
    /// Metalness override.
    pub metallic: f32,
    /// Parallax height scale.
    pub height_map_scale: f32,
    _pad: [f32; 3],
}

impl MeshUniform {
    /// Uniform for a node drawn with `model_mat`.
    #[must_use]
    pub fn new(model_mat: Mat4) -> Self {
        Self {
            model_mat,
            normal_mat: model_mat.inverse().map_or(Mat4::IDENTITY, Mat4::transpose),
            uv_scale: Vec2::ONE,
            roughness: 1.0,
            metallic: 0.0,
            height_map_scale: 0.0,
            _pad: [0.0; 3],
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One drawn model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ModelRenderData {
    /// Model in the library.
    pub model_index: u32,
    /// First mesh record.
    pub mesh_offset: u32,
    /// Number of mesh records.
    pub mesh_count: u32,
}

/// One drawn mesh node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct MeshRenderData {
    /// Mesh in the model.
    pub mesh_index: u32,
    /// Offset of its [`MeshUniform`] in the frame uniform memory.
    pub uniform_offset: u32,
}

/// Everything generated for one frame. The slices live in the frame arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelRenderData {
    /// Offset of the [`CommonUniform`].
    pub common_uniform_offset: u32,
    /// Drawn models.
    pub models: ArenaSlice<ModelRenderData>,
    /// Drawn meshes, grouped by model.
    pub meshes: ArenaSlice<MeshRenderData>,
}

impl LevelRenderData {
    /// Model records.
    #[must_use]
    pub fn models<'a>(&self, frame_arena: &'a Arena) -> &'a [ModelRenderData] {
        frame_arena.get(self.models)
    }

    /// Mesh records of `model`.
    #[must_use]
    pub fn meshes_of<'a>(&self, frame_arena: &'a Arena, model: &ModelRenderData) -> &'a [MeshRenderData] {
        let start = model.mesh_offset as usize;
        &frame_arena.get(self.meshes)[start..start + model.mesh_count as usize]
    }
}

// ============================================================================
// LIGHTS
// ============================================================================

/// The lights of a frame, reduced to what the common uniform holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneLights {
    /// Last ambient light, black without one.
    pub ambient: Vec3,
    /// Last directional light as (color, direction), black along +X without one.
    pub directional: (Vec3, Vec3),
    /// Point lights in store order.
    pub points: [PointLightUniform; MAX_POINT_LIGHTS],
    /// Live entries of `points`.
    pub point_count: usize,
}

impl Default for SceneLights {
    fn default() -> Self {
        Self {
            ambient: Vec3::ZERO,
            directional: (Vec3::ZERO, Vec3::X),
            points: [PointLightUniform::default(); MAX_POINT_LIGHTS],
            point_count: 0,
        }
    }
}

/// Reduces the light column. Later ambient and directional lights replace
/// earlier ones.
///
/// # Errors
///
/// [`LevelError::TooManyPointLights`] past [`MAX_POINT_LIGHTS`].
pub fn collect_lights(lights: &[LightComponent]) -> LevelResult<SceneLights> {
    let mut scene = SceneLights::default();
    let mut point_total = 0;
    for light in lights {
        match light.light() {
            Light::Ambient { color } => scene.ambient = color,
            Light::Directional { color, direction } => scene.directional = (color, direction),
            Light::Point {
                color,
                position,
                attenuation,
            } => {
                if let Some(slot) = scene.points.get_mut(point_total) {
                    *slot = PointLightUniform {
                        color: color.extend(0.0),
                        position_attenuation: position.extend(attenuation),
                    };
                }
                point_total += 1;
            }
        }
    }
    if point_total > MAX_POINT_LIGHTS {
        return Err(LevelError::TooManyPointLights {
            count: point_total,
            max: MAX_POINT_LIGHTS,
        });
    }
    scene.point_count = point_total;
    Ok(scene)
}

/// Builds the common uniform block.
#[must_use]
pub fn common_uniform(camera: &Camera, lights: &SceneLights) -> CommonUniform {
    let (directional_color, directional_direction) = lights.directional;
    let shadow_camera = Camera {
        zfar: SHADOW_ZFAR,
        ..*camera
    };
    CommonUniform {
        view_proj: camera.view_projection(),
        camera_position: camera.position.extend(0.0),
        shadow_map_proj: shadow_camera.shadow_map_projection(directional_direction),
        ambient_light_color: lights.ambient.extend(0.0),
        directional_lights: [DirectionalLightUniform {
            color: directional_color.extend(0.0),
            direction: directional_direction.extend(0.0),
        }],
        point_lights: lights.points,
        spot_lights: [SpotLightUniform::default(); MAX_SPOT_LIGHTS],
        directional_light_count: 1,
        point_light_count: lights.point_count as u32,
        spot_light_count: 0,
        _pad: 0,
    }
}

// ============================================================================
// GENERATION
// ============================================================================

/// Model drawn by `render`, or `None` when it is hidden or unloaded.
fn drawn_model<'a>(models: &'a ModelLibrary, render: &RenderComponent) -> Option<ModelView<'a>> {
    if render.is_hidden() {
        return None;
    }
    models.get(render.model_index as usize)
}

/// Generates one frame of render data.
///
/// Render components whose model index is out of range are skipped with a
/// warning.
///
/// # Errors
///
/// Too many point lights, frame arena exhaustion and uniform memory
/// exhaustion. Nothing is rolled back: the frame is expected to abort.
pub fn generate_render_data(
    store: &StoreView<'_>,
    models: &ModelLibrary,
    camera: &Camera,
    frame_arena: &mut Arena,
    uniforms: &mut FrameUniformBuffer<'_>,
) -> LevelResult<LevelRenderData> {
    let lights = collect_lights(store.components::<LightComponent>())?;
    let common_uniform_offset = uniforms.push(&common_uniform(camera, &lights))?;

    let mut model_count = 0;
    let mut mesh_total = 0;
    for (entity, render) in store.iter_with::<RenderComponent>() {
        if render.is_hidden() {
            continue;
        }
        match models.get(render.model_index as usize) {
            Some(model) => {
                model_count += 1;
                mesh_total += count_mesh_nodes(&model);
            }
            None => tracing::warn!(
                "Entity {} ({}) renders unloaded model {}, skipped",
                entity,
                store.infos()[entity].name(),
                render.model_index
            ),
        }
    }

    let model_records = frame_arena.allocate::<ModelRenderData>(model_count)?;
    let mesh_records = frame_arena.allocate::<MeshRenderData>(mesh_total)?;

    let mut model_slot = 0;
    let mut mesh_cursor = 0;
    for (entity, render) in store.iter_with::<RenderComponent>() {
        let Some(model) = drawn_model(models, render) else {
            continue;
        };
        let transform =
            store.transforms()[entity].to_mat4() * render.adjustment.to_mat4();
        let mesh_count = model.meshes().len();
        let mesh_offset = mesh_cursor;

        let meshes_out = frame_arena.get_mut(mesh_records);
        let mut pushed: LevelResult<()> = Ok(());
        traverse_scenes_with_transform(&model, |_, node, global| {
            if pushed.is_err() || !node.has_mesh(mesh_count) {
                return;
            }
            match uniforms.push(&MeshUniform::new(transform * *global)) {
                Ok(uniform_offset) => {
                    meshes_out[mesh_cursor] = MeshRenderData {
                        mesh_index: node.mesh_index,
                        uniform_offset,
                    };
                    mesh_cursor += 1;
                }
                Err(err) => pushed = Err(err),
            }
        });
        pushed?;

        frame_arena.get_mut(model_records)[model_slot] = ModelRenderData {
            model_index: render.model_index,
            mesh_offset: mesh_offset as u32,
            mesh_count: (mesh_cursor - mesh_offset) as u32,
        };
        model_slot += 1;
    }

    tracing::debug!(
        "Render data: {} models, {} meshes, {} point lights, {} uniform bytes",
        model_count,
        mesh_total,
        lights.point_count,
        uniforms.offset()
    );

    Ok(LevelRenderData {
        common_uniform_offset,
        models: model_records,
        meshes: mesh_records,
    })
}
