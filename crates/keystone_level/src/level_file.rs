//! # Level Description
//!
//! The JSON document a level is read from and written back to.
//!
//! ```json
//! {
//!   "models": ["crate.gpk"],
//!   "skyboxes": ["sky.gpk"],
//!   "skybox_index": 0,
//!   "entities": [
//!     {
//!       "name": "crate",
//!       "transform": { "scale": [1, 1, 1], "rotate": [0, 0, 0, 1], "translate": [0, 0, 0] },
//!       "render_component": { "gpk_file": "crate.gpk" },
//!       "collision_component": { "shape": "box", "size": [1, 1, 1] },
//!       "physics_component": { "mass": 10 },
//!       "light_component": { "light_type": "ambient", "color": [0.1, 0.1, 0.1] }
//!     }
//!   ],
//!   "player": { "entity_name": "crate" }
//! }
//! ```
//!
//! Top-level keys this module does not know are kept in
//! [`LevelDescription::extras`] and written back unchanged.

use std::path::Path;

use keystone_core::{CollisionShape, Light};
use keystone_shared::{Quaternion, Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::LevelResult;

/// The whole level document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDescription {
    /// Model files, loaded in order; render components refer to them by name.
    #[serde(default)]
    pub models: Vec<String>,
    /// Skybox files, loaded in order.
    #[serde(default)]
    pub skyboxes: Vec<String>,
    /// Active skybox.
    #[serde(default)]
    pub skybox_index: u32,
    /// Entities in store order.
    #[serde(default)]
    pub entities: Vec<EntityDescription>,
    /// The player entity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerDescription>,
    /// Unknown top-level keys, owned by the host.
    #[serde(flatten)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl LevelDescription {
    /// Parses a level document.
    ///
    /// # Errors
    ///
    /// [`LevelError::Json`](crate::LevelError::Json) on malformed input.
    pub fn from_json_str(text: &str) -> LevelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes with two-space indentation.
    ///
    /// # Errors
    ///
    /// [`LevelError::Json`](crate::LevelError::Json) if a float is not finite.
    pub fn to_json_string(&self) -> LevelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads and parses a level file.
    ///
    /// # Errors
    ///
    /// I/O and JSON errors.
    pub fn read(path: impl AsRef<Path>) -> LevelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serializes and writes a level file.
    ///
    /// # Errors
    ///
    /// I/O and JSON errors.
    pub fn write(&self, path: impl AsRef<Path>) -> LevelResult<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

/// Names the player entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDescription {
    /// Name of an entity in [`LevelDescription::entities`].
    pub entity_name: String,
}

/// One entity and its components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// Entity name, at most 31 bytes. Longer names are rejected at load.
    pub name: String,
    /// Placement.
    #[serde(default)]
    pub transform: TransformDescription,
    /// Model to draw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_component: Option<RenderDescription>,
    /// Collision geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_component: Option<CollisionDescription>,
    /// Rigid-body parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics_component: Option<PhysicsDescription>,
    /// Light source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_component: Option<LightDescription>,
}

/// Scale, rotation quaternion `[x, y, z, w]` and translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformDescription {
    /// Per-axis scale.
    pub scale: [f32; 3],
    /// Rotation quaternion.
    pub rotate: [f32; 4],
    /// Translation.
    pub translate: [f32; 3],
}

impl Default for TransformDescription {
    fn default() -> Self {
        Transform::IDENTITY.into()
    }
}

impl From<Transform> for TransformDescription {
    fn from(transform: Transform) -> Self {
        Self {
            scale: transform.scale.to_array(),
            rotate: transform.rotate.to_array(),
            translate: transform.translate.to_array(),
        }
    }
}

impl From<TransformDescription> for Transform {
    fn from(description: TransformDescription) -> Self {
        Self::new(
            Vec3::from_array(description.scale),
            Quaternion::from_array(description.rotate),
            Vec3::from_array(description.translate),
        )
    }
}

/// Draws a model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDescription {
    /// Model file, one of [`LevelDescription::models`].
    pub gpk_file: String,
    /// Model-space correction applied before the entity transform.
    #[serde(default)]
    pub adjustment_transform: TransformDescription,
    /// Starts hidden.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hide: bool,
}

/// Collision geometry, tagged by `shape`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CollisionDescription {
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Y-aligned capsule.
    Capsule {
        /// Cylinder length.
        height: f32,
        /// Cap radius.
        radius: f32,
    },
    /// Box with full extents.
    Box {
        /// Full extents.
        size: [f32; 3],
    },
}

impl From<CollisionDescription> for CollisionShape {
    fn from(description: CollisionDescription) -> Self {
        match description {
            CollisionDescription::Sphere { radius } => Self::Sphere { radius },
            CollisionDescription::Capsule { height, radius } => Self::Capsule { height, radius },
            CollisionDescription::Box { size } => Self::Box {
                size: Vec3::from_array(size),
            },
        }
    }
}

impl From<CollisionShape> for CollisionDescription {
    fn from(shape: CollisionShape) -> Self {
        match shape {
            CollisionShape::Sphere { radius } => Self::Sphere { radius },
            CollisionShape::Capsule { height, radius } => Self::Capsule { height, radius },
            CollisionShape::Box { size } => Self::Box {
                size: size.to_array(),
            },
        }
    }
}

/// Rigid-body parameters. Missing fields are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsDescription {
    /// Initial velocity.
    #[serde(default)]
    pub velocity: [f32; 3],
    /// Mass.
    #[serde(default)]
    pub mass: f32,
    /// Speed clamp.
    #[serde(default)]
    pub max_speed: f32,
}

/// A light source, tagged by `light_type`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "light_type", rename_all = "snake_case")]
pub enum LightDescription {
    /// Ambient light.
    Ambient {
        /// Color.
        color: [f32; 3],
    },
    /// Directional light.
    Directional {
        /// Color.
        color: [f32; 3],
        /// Travel direction.
        direction: [f32; 3],
    },
    /// Point light.
    Point {
        /// Color.
        color: [f32; 3],
        /// Position.
        position: [f32; 3],
        /// Falloff coefficient.
        attenuation: f32,
    },
}

impl From<LightDescription> for Light {
    fn from(description: LightDescription) -> Self {
        match description {
            LightDescription::Ambient { color } => Self::Ambient {
                color: Vec3::from_array(color),
            },
            LightDescription::Directional { color, direction } => Self::Directional {
                color: Vec3::from_array(color),
                direction: Vec3::from_array(direction),
            },
            LightDescription::Point {
                color,
                position,
                attenuation,
            } => Self::Point {
                color: Vec3::from_array(color),
                position: Vec3::from_array(position),
                attenuation,
            },
        }
    }
}

impl From<Light> for LightDescription {
    fn from(light: Light) -> Self {
        match light {
            Light::Ambient { color } => Self::Ambient {
                color: color.to_array(),
            },
            Light::Directional { color, direction } => Self::Directional {
                color: color.to_array(),
                direction: direction.to_array(),
            },
            Light::Point {
                color,
                position,
                attenuation,
            } => Self::Point {
                color: color.to_array(),
                position: position.to_array(),
                attenuation,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "models": ["crate.gpk"],
        "skyboxes": [],
        "skybox_index": 0,
        "entities": [
            {
                "name": "crate",
                "transform": { "scale": [1, 1, 1], "rotate": [0, 0, 0, 1], "translate": [1, 2, 3] },
                "render_component": { "gpk_file": "crate.gpk" },
                "collision_component": { "shape": "capsule", "height": 2, "radius": 0.5 },
                "physics_component": { "mass": 10 }
            },
            {
                "name": "sun",
                "transform": { "scale": [1, 1, 1], "rotate": [0, 0, 0, 1], "translate": [0, 0, 0] },
                "light_component": { "light_type": "directional", "color": [1, 1, 1], "direction": [0, -1, 0] }
            }
        ],
        "player": { "entity_name": "crate" },
        "editor_camera": { "zoom": 3 }
    }"#;

    #[test]
    fn test_parse_document() {
        let level = LevelDescription::from_json_str(DOCUMENT).unwrap();
        assert_eq!(level.models, vec!["crate.gpk"]);
        assert_eq!(level.entities.len(), 2);

        let crate_entity = &level.entities[0];
        let render = crate_entity.render_component.as_ref().unwrap();
        assert_eq!(render.adjustment_transform, TransformDescription::default());
        assert!(!render.hide);
        assert_eq!(
            crate_entity.collision_component,
            Some(CollisionDescription::Capsule { height: 2.0, radius: 0.5 })
        );
        assert_eq!(
            crate_entity.physics_component,
            Some(PhysicsDescription {
                velocity: [0.0; 3],
                mass: 10.0,
                max_speed: 0.0
            })
        );
        assert_eq!(
            Light::from(level.entities[1].light_component.unwrap()),
            Light::Directional {
                color: Vec3::ONE,
                direction: -Vec3::Y
            }
        );
        assert_eq!(level.player.as_ref().unwrap().entity_name, "crate");
        assert_eq!(level.extras["editor_camera"]["zoom"], 3);
    }

    #[test]
    fn test_write_then_read_is_identical() {
        let level = LevelDescription::from_json_str(DOCUMENT).unwrap();
        let text = level.to_json_string().unwrap();
        assert!(text.contains("\"editor_camera\""));
        assert!(!text.contains("\"hide\""));
        assert_eq!(LevelDescription::from_json_str(&text).unwrap(), level);
    }

    #[test]
    fn test_unknown_shape_is_error() {
        let text = r#"{ "entities": [ { "name": "x", "collision_component": { "shape": "cone" } } ] }"#;
        assert!(LevelDescription::from_json_str(text).is_err());
    }

    #[test]
    fn test_transform_conversion() {
        let transform = Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::new(0.0, 1.0, 0.0, 0.0),
            Vec3::new(4.0, 5.0, 6.0),
        );
        let description = TransformDescription::from(transform);
        assert_eq!(description.rotate, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(Transform::from(description), transform);
    }
}
