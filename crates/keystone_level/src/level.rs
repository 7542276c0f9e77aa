//! # Level
//!
//! Owns everything a running level needs: the entity store, the model
//! library, the skybox table and the frame arena. Collaborators (assets,
//! GPU backend, physics engine) are passed in per call, never stored.
//!
//! ## Frame flow
//!
//! ```text
//! host edits -> store_mut().modify()/add_entity()
//!            -> commit()
//!            -> generate_render_data(camera, backend)
//!            -> host renders from the returned records
//!            -> end_frame()
//! ```

use std::path::Path;

use keystone_core::{
    collections::array, Arena, CollisionComponent, CommitStats, ComponentKind, EntityAddition,
    EntityInfo, EntityStore, LightComponent, PhysicsComponent, RenderComponent,
};
use keystone_shared::{Transform, Vec3};

use crate::assets::AssetSource;
use crate::backend::{FrameUniformBuffer, ImageDesc, ImageHandle, RenderBackend};
use crate::camera::Camera;
use crate::config::LevelConfig;
use crate::error::{LevelError, LevelResult};
use crate::level_file::{
    EntityDescription, LevelDescription, PhysicsDescription, PlayerDescription, RenderDescription,
};
use crate::model::{AssetName, ModelLibrary};
use crate::physics::{self, PhysicsWorld};
use crate::render_data::{self, LevelRenderData};

/// A loaded skybox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Skybox {
    file: AssetName,
    /// The cubemap image.
    pub cubemap: ImageHandle,
}

impl Skybox {
    /// File the skybox was loaded from.
    #[must_use]
    pub fn file(&self) -> &str {
        self.file.as_str()
    }
}

/// A running level.
#[derive(Debug)]
pub struct Level {
    frame_arena: Arena,
    store: EntityStore,
    models: ModelLibrary,
    skyboxes: Box<[Skybox]>,
    skybox_count: usize,
    skybox_index: usize,
    player: Option<EntityInfo>,
    extras: serde_json::Map<String, serde_json::Value>,
}

impl Level {
    /// Creates an empty level, reserving every arena up front.
    #[must_use]
    pub fn new(config: &LevelConfig) -> Self {
        Self {
            frame_arena: Arena::new("frame", config.frame_arena_bytes),
            store: EntityStore::new(config.entity_arena_bytes),
            models: ModelLibrary::new(config),
            skyboxes: vec![Skybox::default(); config.skybox_capacity].into_boxed_slice(),
            skybox_count: 0,
            skybox_index: 0,
            player: None,
            extras: serde_json::Map::new(),
        }
    }

    /// Builds a level from its description: loads models and skyboxes,
    /// creates and commits the entities, then creates their physics bodies.
    ///
    /// # Errors
    ///
    /// Any asset, backend, capacity or reference error. A render component
    /// naming a model that is not listed fails with
    /// [`LevelError::UnknownModel`]; a missing player entity with
    /// [`LevelError::UnknownPlayer`]; a skybox index past the listed skyboxes
    /// with [`LevelError::SkyboxOutOfRange`].
    pub fn from_description(
        config: &LevelConfig,
        description: &LevelDescription,
        assets: &dyn AssetSource,
        backend: &mut dyn RenderBackend,
        physics: &mut dyn PhysicsWorld,
    ) -> LevelResult<Self> {
        let mut level = Self::new(config);
        for file in &description.models {
            level.add_model(file, assets, backend)?;
        }
        for file in &description.skyboxes {
            level.add_skybox(file, assets, backend)?;
        }
        // Index 0 with no skyboxes is the empty default.
        if level.skybox_count > 0 || description.skybox_index != 0 {
            level.set_skybox_index(description.skybox_index as usize)?;
        }

        for entity in &description.entities {
            let addition = level.entity_addition(entity)?;
            level.store.add_entity(addition);
        }
        level.store.commit()?;
        level.create_bodies(physics);

        if let Some(player) = &description.player {
            level.set_player(&player.entity_name)?;
        }
        level.extras = description.extras.clone();

        tracing::info!(
            "Level ready: {} entities, {} models, {} skyboxes, {} of {} asset bytes",
            level.store.entity_count(),
            level.models.len(),
            level.skybox_count,
            level.models.arena().used(),
            level.models.arena().capacity()
        );
        Ok(level)
    }

    /// Reads a level file and builds the level.
    ///
    /// # Errors
    ///
    /// I/O and JSON errors, plus everything [`Level::from_description`]
    /// returns.
    pub fn read_json_file(
        config: &LevelConfig,
        path: impl AsRef<Path>,
        assets: &dyn AssetSource,
        backend: &mut dyn RenderBackend,
        physics: &mut dyn PhysicsWorld,
    ) -> LevelResult<Self> {
        let path = path.as_ref();
        tracing::info!("Reading level {}", path.display());
        let description = LevelDescription::read(path)?;
        Self::from_description(config, &description, assets, backend, physics)
    }

    /// Describes the published generation of the level.
    ///
    /// Render components whose model is not loaded are left out with a
    /// warning.
    #[must_use]
    pub fn to_description(&self) -> LevelDescription {
        let view = self.store.view();
        let entities = (0..view.entity_count())
            .map(|entity| {
                let name = view.infos()[entity].name().to_owned();
                let render_component = view.try_component::<RenderComponent>(entity).and_then(|render| {
                    let Some(model) = self.models.get(render.model_index as usize) else {
                        tracing::warn!(
                            "Entity {} renders unloaded model {}, not written",
                            name,
                            render.model_index
                        );
                        return None;
                    };
                    Some(RenderDescription {
                        gpk_file: model.file().to_owned(),
                        adjustment_transform: render.adjustment.into(),
                        hide: render.is_hidden(),
                    })
                });
                EntityDescription {
                    transform: view.transforms()[entity].into(),
                    render_component,
                    collision_component: view
                        .try_component::<CollisionComponent>(entity)
                        .map(|collision| collision.shape().into()),
                    physics_component: view.try_component::<PhysicsComponent>(entity).map(
                        |physics| PhysicsDescription {
                            velocity: physics.velocity.to_array(),
                            mass: physics.mass,
                            max_speed: physics.max_speed,
                        },
                    ),
                    light_component: view
                        .try_component::<LightComponent>(entity)
                        .map(|light| light.light().into()),
                    name,
                }
            })
            .collect();

        LevelDescription {
            models: self.models.iter().map(|model| model.file().to_owned()).collect(),
            skyboxes: self.skyboxes().iter().map(|skybox| skybox.file().to_owned()).collect(),
            skybox_index: self.skybox_index as u32,
            entities,
            player: self.player_entity().map(|entity| PlayerDescription {
                entity_name: view.infos()[entity].name().to_owned(),
            }),
            extras: self.extras.clone(),
        }
    }

    /// Writes the published generation to a level file.
    ///
    /// # Errors
    ///
    /// I/O and JSON errors.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> LevelResult<()> {
        let path = path.as_ref();
        self.to_description().write(path)?;
        tracing::info!("Wrote level {}", path.display());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Models and skyboxes
    // ------------------------------------------------------------------------

    /// Loads a model file. Returns its model index.
    ///
    /// # Errors
    ///
    /// See [`ModelLibrary::add`].
    pub fn add_model(
        &mut self,
        file: &str,
        assets: &dyn AssetSource,
        backend: &mut dyn RenderBackend,
    ) -> LevelResult<usize> {
        let asset = assets.load_model(file)?;
        self.models.add(file, &asset, backend)
    }

    /// Index of the model loaded from `file`.
    #[must_use]
    pub fn model_index(&self, file: &str) -> Option<usize> {
        self.models.index_of(file)
    }

    /// The model library.
    #[must_use]
    pub const fn models(&self) -> &ModelLibrary {
        &self.models
    }

    /// Loads a skybox file and creates its cubemap. Returns its index.
    ///
    /// # Errors
    ///
    /// Capacity, name length, asset and backend failures.
    pub fn add_skybox(
        &mut self,
        file: &str,
        assets: &dyn AssetSource,
        backend: &mut dyn RenderBackend,
    ) -> LevelResult<usize> {
        if self.skybox_count == self.skyboxes.len() {
            return Err(LevelError::SkyboxCapacity(self.skyboxes.len()));
        }
        let name = AssetName::new(file).ok_or_else(|| LevelError::NameTooLong(file.to_owned()))?;
        let asset = assets.load_skybox(file)?;
        let desc = ImageDesc {
            width: asset.width,
            height: asset.height,
            mip_count: 1,
            layer_count: 6,
            format: asset.format,
            cubemap: true,
        };
        let skybox = Skybox {
            file: name,
            cubemap: backend.create_image(&desc, &asset.cubemap)?,
        };
        let index = self.skybox_count;
        if !array::insert(&mut self.skyboxes, &mut self.skybox_count, index, skybox) {
            return Err(LevelError::SkyboxCapacity(self.skyboxes.len()));
        }
        tracing::info!("Loaded skybox {} as {}", file, index);
        Ok(index)
    }

    /// Removes a skybox, keeping the order of the others. The active index
    /// follows the skybox it pointed at, or falls back to the first one.
    ///
    /// # Errors
    ///
    /// [`LevelError::SkyboxOutOfRange`].
    pub fn remove_skybox(&mut self, index: usize) -> LevelResult<Skybox> {
        self.check_skybox(index)?;
        let removed = array::remove(&mut self.skyboxes, &mut self.skybox_count, index);
        if self.skybox_index > index {
            self.skybox_index -= 1;
        } else if self.skybox_index == index {
            self.skybox_index = 0;
        }
        Ok(removed)
    }

    /// Loaded skyboxes.
    #[must_use]
    pub fn skyboxes(&self) -> &[Skybox] {
        &self.skyboxes[..self.skybox_count]
    }

    /// Index of the active skybox.
    #[must_use]
    pub const fn skybox_index(&self) -> usize {
        self.skybox_index
    }

    /// The active skybox, if any is loaded.
    #[must_use]
    pub fn active_skybox(&self) -> Option<&Skybox> {
        self.skyboxes().get(self.skybox_index)
    }

    /// Selects the active skybox.
    ///
    /// # Errors
    ///
    /// [`LevelError::SkyboxOutOfRange`].
    pub fn set_skybox_index(&mut self, index: usize) -> LevelResult<()> {
        self.check_skybox(index)?;
        self.skybox_index = index;
        Ok(())
    }

    fn check_skybox(&self, index: usize) -> LevelResult<()> {
        if index >= self.skybox_count {
            return Err(LevelError::SkyboxOutOfRange {
                index,
                count: self.skybox_count,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------------

    /// The entity store.
    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The entity store, for queuing edits.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Commits the queued edits.
    ///
    /// # Errors
    ///
    /// See [`EntityStore::commit`].
    pub fn commit(&mut self) -> LevelResult<CommitStats> {
        Ok(self.store.commit()?)
    }

    /// Queues an entity built from its description, resolving the model file
    /// of its render component.
    ///
    /// # Errors
    ///
    /// [`LevelError::NameTooLong`] if the name does not fit an entity info
    /// record, [`LevelError::UnknownModel`] if the model file is not loaded.
    pub fn entity_addition(&self, entity: &EntityDescription) -> LevelResult<EntityAddition> {
        check_entity_name(&entity.name)?;
        let mut addition =
            EntityAddition::new(&entity.name).with_transform(Transform::from(entity.transform));
        if let Some(render) = &entity.render_component {
            let model_index = self
                .models
                .index_of(&render.gpk_file)
                .ok_or_else(|| LevelError::UnknownModel(render.gpk_file.clone()))?;
            addition = addition.with_component(
                RenderComponent::new(model_index as u32)
                    .with_adjustment(render.adjustment_transform.into())
                    .hidden(render.hide),
            );
        }
        if let Some(collision) = entity.collision_component {
            addition = addition.with_component(CollisionComponent::new(collision.into()));
        }
        if let Some(physics) = entity.physics_component {
            addition = addition.with_component(
                PhysicsComponent::new(physics.mass)
                    .with_velocity(Vec3::from_array(physics.velocity))
                    .with_max_speed(physics.max_speed),
            );
        }
        if let Some(light) = entity.light_component {
            addition = addition.with_component(LightComponent::new(light.into()));
        }
        Ok(addition)
    }

    /// Creates a physics object for every entity with collision or physics
    /// and stores the handle in its components.
    fn create_bodies(&mut self, world: &mut dyn PhysicsWorld) {
        let mut bodies = Vec::new();
        {
            let view = self.store.view();
            for entity in 0..view.entity_count() {
                let collision = view.try_component::<CollisionComponent>(entity);
                let physics = view.try_component::<PhysicsComponent>(entity);
                let transform = &view.transforms()[entity];
                if let Some(body) = physics::create_body(world, transform, collision, physics) {
                    bodies.push((entity, body));
                }
            }
        }
        for &(entity, body) in &bodies {
            if let Some(collision) = self.store.try_component_mut::<CollisionComponent>(entity) {
                collision.body = body;
            }
            if let Some(physics) = self.store.try_component_mut::<PhysicsComponent>(entity) {
                physics.body = body;
            }
        }
        tracing::debug!("Created {} physics objects", bodies.len());
    }

    /// Marks the entity named `name` as the player.
    ///
    /// # Errors
    ///
    /// [`LevelError::NameTooLong`] if the name does not fit an entity info
    /// record, [`LevelError::UnknownPlayer`] if no published entity has that
    /// name.
    pub fn set_player(&mut self, name: &str) -> LevelResult<()> {
        check_entity_name(name)?;
        if self.store.view().find_by_name(name).is_none() {
            return Err(LevelError::UnknownPlayer(name.to_owned()));
        }
        self.player = Some(EntityInfo::new(name));
        Ok(())
    }

    /// Current index of the player entity, if it exists.
    #[must_use]
    pub fn player_entity(&self) -> Option<usize> {
        let player = self.player.as_ref()?;
        self.store.view().find_by_name(player.name())
    }

    /// Host-owned keys of the level file.
    #[must_use]
    pub const fn extras(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.extras
    }

    /// Host-owned keys of the level file, for editing.
    pub fn extras_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.extras
    }

    // ------------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------------

    /// Orbit camera around the player, or an overview of the origin when
    /// there is no player.
    #[must_use]
    pub fn player_camera(&self, r: f32, theta: f32, phi: f32, aspect: f32) -> Camera {
        match self.player_entity() {
            Some(entity) => {
                let center = self.store.view().transforms()[entity].translate;
                Camera::orbit(center, r, theta, phi, aspect)
            }
            None => Camera::overview(r, aspect),
        }
    }

    /// Generates this frame's render data into the backend's uniform memory
    /// and the frame arena.
    ///
    /// # Errors
    ///
    /// See [`render_data::generate_render_data`].
    pub fn generate_render_data(
        &mut self,
        camera: &Camera,
        backend: &mut dyn RenderBackend,
    ) -> LevelResult<LevelRenderData> {
        let alignment = backend.uniform_alignment();
        let mut uniforms = FrameUniformBuffer::new(backend.frame_uniforms(), alignment);
        render_data::generate_render_data(
            &self.store.view(),
            &self.models,
            camera,
            &mut self.frame_arena,
            &mut uniforms,
        )
    }

    /// The frame arena holding render records.
    #[must_use]
    pub const fn frame_arena(&self) -> &Arena {
        &self.frame_arena
    }

    /// Releases this frame's render records.
    pub fn end_frame(&mut self) {
        self.frame_arena.reset();
    }

    /// Component count of `kind` in the published generation.
    #[must_use]
    pub fn component_count(&self, kind: ComponentKind) -> usize {
        self.store.view().component_count(kind)
    }
}

/// Entity names are stored whole or not at all.
fn check_entity_name(name: &str) -> LevelResult<()> {
    if name.len() > EntityInfo::MAX_NAME_LEN {
        return Err(LevelError::NameTooLong(name.to_owned()));
    }
    Ok(())
}
