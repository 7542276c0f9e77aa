//! Integration tests for per-frame render data generation.

use keystone_core::{EntityAddition, Light, LightComponent, RenderComponent};
use keystone_level::assets::{MeshAsset, NodeAsset, SceneAsset, NO_INDEX};
use keystone_level::render_data::{CommonUniform, MeshRenderData};
use keystone_level::{
    AssetLibrary, Camera, HeadlessBackend, Level, LevelConfig, LevelError, ModelAsset, MeshUniform,
};
use keystone_shared::{Mat4, Transform, Vec3};

fn config() -> LevelConfig {
    LevelConfig {
        frame_arena_bytes: 1 << 16,
        entity_arena_bytes: 1 << 18,
        asset_arena_bytes: 1 << 18,
        model_capacity: 4,
        skybox_capacity: 1,
        store_vertices: false,
    }
}

fn translate(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

/// Scene 0: 0 (mesh 1) -> (1 (no mesh) -> 3 (mesh 0), 2 (mesh 0)).
fn tree_model() -> ModelAsset {
    ModelAsset {
        scenes: vec![SceneAsset {
            name: "main".to_owned(),
            roots: vec![0],
        }],
        nodes: vec![
            NodeAsset::new(translate(1.0, 0.0, 0.0)).with_mesh(1).with_children(&[1, 2]),
            NodeAsset::new(translate(0.0, 1.0, 0.0)).with_children(&[3]),
            NodeAsset::new(translate(0.0, 0.0, 1.0)).with_mesh(0),
            NodeAsset::new(translate(0.0, 2.0, 0.0)).with_mesh(0),
        ],
        meshes: vec![
            MeshAsset {
                material_index: NO_INDEX,
                ..MeshAsset::default()
            },
            MeshAsset {
                material_index: NO_INDEX,
                ..MeshAsset::default()
            },
        ],
        ..ModelAsset::default()
    }
}

fn level_with_model() -> (Level, HeadlessBackend) {
    let mut assets = AssetLibrary::new();
    assets.insert_model("tree.gpk", tree_model());
    let mut backend = HeadlessBackend::default();
    let mut level = Level::new(&config());
    level.add_model("tree.gpk", &assets, &mut backend).unwrap();
    (level, backend)
}

fn point_light(x: f32) -> LightComponent {
    LightComponent::new(Light::Point {
        color: Vec3::ONE,
        position: Vec3::new(x, 0.0, 0.0),
        attenuation: 0.1,
    })
}

fn camera() -> Camera {
    Camera::overview(10.0, 1.0)
}

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-4
}

#[test]
fn test_mesh_records_follow_traversal_order() {
    let (mut level, mut backend) = level_with_model();
    level.store_mut().add_entity(
        EntityAddition::new("tree")
            .with_transform(Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)))
            .with_component(RenderComponent::new(0)),
    );
    level.commit().unwrap();

    let frame = level.generate_render_data(&camera(), &mut backend).unwrap();
    let models = frame.models(level.frame_arena());
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].model_index, 0);

    let meshes: Vec<MeshRenderData> = frame.meshes_of(level.frame_arena(), &models[0]).to_vec();
    let mesh_indices: Vec<u32> = meshes.iter().map(|mesh| mesh.mesh_index).collect();
    // Pre-order: 0, 1 (skipped), 3, 2.
    assert_eq!(mesh_indices, vec![1, 0, 0]);

    let origins: Vec<Vec3> = meshes
        .iter()
        .map(|mesh| {
            let uniform: MeshUniform = backend.read_uniform(mesh.uniform_offset);
            uniform.model_mat.transform_point(Vec3::ZERO)
        })
        .collect();
    assert!(close(origins[0], Vec3::new(11.0, 0.0, 0.0)));
    assert!(close(origins[1], Vec3::new(11.0, 3.0, 0.0)));
    assert!(close(origins[2], Vec3::new(11.0, 0.0, 1.0)));
}

#[test]
fn test_uniform_offsets_are_aligned() {
    let (mut level, mut backend) = level_with_model();
    for x in [0.0, 5.0] {
        level.store_mut().add_entity(
            EntityAddition::new("tree")
                .with_transform(Transform::from_translation(Vec3::new(x, 0.0, 0.0)))
                .with_component(RenderComponent::new(0)),
        );
    }
    level.commit().unwrap();

    let frame = level.generate_render_data(&camera(), &mut backend).unwrap();
    assert_eq!(frame.common_uniform_offset, 0);
    let meshes = level.frame_arena().get(frame.meshes);
    assert_eq!(meshes.len(), 6);
    let mut previous = frame.common_uniform_offset;
    for mesh in meshes {
        assert_eq!(mesh.uniform_offset % 256, 0);
        assert!(mesh.uniform_offset > previous);
        previous = mesh.uniform_offset;
    }
}

#[test]
fn test_adjustment_applies_before_node_transforms() {
    let (mut level, mut backend) = level_with_model();
    let adjustment = Transform::from_translation(Vec3::new(0.0, 0.0, -5.0));
    level.store_mut().add_entity(
        EntityAddition::new("tree").with_component(RenderComponent::new(0).with_adjustment(adjustment)),
    );
    level.commit().unwrap();

    let frame = level.generate_render_data(&camera(), &mut backend).unwrap();
    let first = level.frame_arena().get(frame.meshes)[0];
    let uniform: MeshUniform = backend.read_uniform(first.uniform_offset);
    assert!(close(uniform.model_mat.transform_point(Vec3::ZERO), Vec3::new(1.0, 0.0, -5.0)));
}

#[test]
fn test_hidden_and_unloaded_models_are_skipped() {
    let (mut level, mut backend) = level_with_model();
    level
        .store_mut()
        .add_entity(EntityAddition::new("hidden").with_component(RenderComponent::new(0).hidden(true)));
    level
        .store_mut()
        .add_entity(EntityAddition::new("stale").with_component(RenderComponent::new(3)));
    level
        .store_mut()
        .add_entity(EntityAddition::new("shown").with_component(RenderComponent::new(0)));
    level.commit().unwrap();

    let frame = level.generate_render_data(&camera(), &mut backend).unwrap();
    assert_eq!(frame.models.len(), 1);
    assert_eq!(frame.meshes.len(), 3);
}

#[test]
fn test_point_light_limit() {
    let (mut level, mut backend) = level_with_model();
    for x in 0..4 {
        level
            .store_mut()
            .add_entity(EntityAddition::new("lamp").with_component(point_light(x as f32)));
    }
    level.commit().unwrap();

    let frame = level.generate_render_data(&camera(), &mut backend).unwrap();
    let common: CommonUniform = backend.read_uniform(frame.common_uniform_offset);
    assert_eq!(common.point_light_count, 4);
    assert_eq!(common.point_lights[3].position_attenuation.x, 3.0);
    level.end_frame();

    level
        .store_mut()
        .add_entity(EntityAddition::new("lamp").with_component(point_light(4.0)));
    level.commit().unwrap();
    let result = level.generate_render_data(&camera(), &mut backend);
    assert!(matches!(
        result,
        Err(LevelError::TooManyPointLights { count: 5, max: 4 })
    ));
}

#[test]
fn test_common_uniform_carries_camera_and_lights() {
    let (mut level, mut backend) = level_with_model();
    level.store_mut().add_entity(EntityAddition::new("sky").with_component(LightComponent::new(
        Light::Ambient {
            color: Vec3::new(0.1, 0.2, 0.3),
        },
    )));
    level.commit().unwrap();

    let camera = camera();
    let frame = level.generate_render_data(&camera, &mut backend).unwrap();
    let common: CommonUniform = backend.read_uniform(frame.common_uniform_offset);
    assert!(close(common.ambient_light_color.truncate(), Vec3::new(0.1, 0.2, 0.3)));
    assert!(close(common.camera_position.truncate(), camera.position));
    assert!(common.view_proj.abs_diff_eq(camera.view_projection(), 1e-5));
    assert_eq!(common.directional_light_count, 1);
}

#[test]
fn test_uniform_memory_exhaustion() {
    let (mut level, _) = level_with_model();
    level
        .store_mut()
        .add_entity(EntityAddition::new("tree").with_component(RenderComponent::new(0)));
    level.commit().unwrap();

    // Common block at 0, first mesh block at 768, second would land at 1024.
    let mut small = HeadlessBackend::new(1024, 768 + 160, 256);
    let result = level.generate_render_data(&camera(), &mut small);
    assert!(matches!(
        result,
        Err(LevelError::UniformBufferFull {
            requested: 160,
            offset: 1024,
            capacity: 928
        })
    ));
}
