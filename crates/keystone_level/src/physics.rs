//! # Physics World Seam
//!
//! Bodies are created once, when a level is loaded. The store only keeps the
//! opaque [`BodyHandle`] the world returns; simulation state stays in the
//! physics engine.

use keystone_core::{BodyHandle, CollisionComponent, CollisionShape, PhysicsComponent};
use keystone_shared::{Quaternion, Transform, Vec3};

/// Geometry handed to the physics engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyShape {
    /// No collision geometry (a physics component without collision).
    Empty,
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
    /// Box.
    Box {
        /// Half the full extents.
        half_extents: Vec3,
    },
}

impl From<CollisionShape> for BodyShape {
    fn from(shape: CollisionShape) -> Self {
        match shape {
            CollisionShape::Sphere { radius } => Self::Sphere { radius },
            CollisionShape::Capsule { height, radius } => Self::Capsule { height, radius },
            CollisionShape::Box { size } => Self::Box {
                half_extents: size * 0.5,
            },
        }
    }
}

/// A simulated body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidBodyDesc {
    /// Collision geometry.
    pub shape: BodyShape,
    /// Mass. Zero makes the body static.
    pub mass: f32,
    /// Initial orientation.
    pub rotate: Quaternion,
    /// Initial position.
    pub translate: Vec3,
    /// Initial linear velocity.
    pub velocity: Vec3,
}

/// A collider that is not simulated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionObjectDesc {
    /// Collision geometry.
    pub shape: BodyShape,
    /// Orientation.
    pub rotate: Quaternion,
    /// Position.
    pub translate: Vec3,
}

/// What the level needs from a physics engine.
pub trait PhysicsWorld {
    /// Adds a simulated body.
    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> BodyHandle;

    /// Adds a static collider.
    fn add_collision_object(&mut self, desc: &CollisionObjectDesc) -> BodyHandle;
}

/// Creates the physics object for one entity.
///
/// - collision and physics: rigid body with the collision shape
/// - collision only: collision object
/// - physics only: rigid body with an empty shape
pub(crate) fn create_body(
    world: &mut dyn PhysicsWorld,
    transform: &Transform,
    collision: Option<&CollisionComponent>,
    physics: Option<&PhysicsComponent>,
) -> Option<BodyHandle> {
    let shape = collision.map_or(BodyShape::Empty, |c| BodyShape::from(c.shape()));
    match physics {
        Some(physics) => Some(world.add_rigid_body(&RigidBodyDesc {
            shape,
            mass: physics.mass,
            rotate: transform.rotate,
            translate: transform.translate,
            velocity: physics.velocity,
        })),
        None if collision.is_some() => Some(world.add_collision_object(&CollisionObjectDesc {
            shape,
            rotate: transform.rotate,
            translate: transform.translate,
        })),
        None => None,
    }
}

/// A physics world that only records what it was asked to create.
#[derive(Debug, Default, Clone)]
pub struct RecordingPhysics {
    /// Rigid bodies in creation order.
    pub rigid_bodies: Vec<RigidBodyDesc>,
    /// Collision objects in creation order.
    pub collision_objects: Vec<CollisionObjectDesc>,
    next_handle: u32,
}

impl RecordingPhysics {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> BodyHandle {
        let handle = BodyHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

impl PhysicsWorld for RecordingPhysics {
    fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> BodyHandle {
        self.rigid_bodies.push(*desc);
        self.next()
    }

    fn add_collision_object(&mut self, desc: &CollisionObjectDesc) -> BodyHandle {
        self.collision_objects.push(*desc);
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32) -> Transform {
        Transform::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_box_uses_half_extents() {
        let shape = BodyShape::from(CollisionShape::Box {
            size: Vec3::new(2.0, 4.0, 6.0),
        });
        assert_eq!(
            shape,
            BodyShape::Box {
                half_extents: Vec3::new(1.0, 2.0, 3.0)
            }
        );
    }

    #[test]
    fn test_body_kind_follows_components() {
        let mut world = RecordingPhysics::new();
        let collision = CollisionComponent::new(CollisionShape::Sphere { radius: 0.5 });
        let physics = PhysicsComponent::new(2.0).with_velocity(Vec3::X);

        let both = create_body(&mut world, &at(1.0), Some(&collision), Some(&physics));
        let only_collision = create_body(&mut world, &at(2.0), Some(&collision), None);
        let only_physics = create_body(&mut world, &at(3.0), None, Some(&physics));
        let neither = create_body(&mut world, &at(4.0), None, None);

        assert_eq!(both, Some(BodyHandle::new(0)));
        assert_eq!(only_collision, Some(BodyHandle::new(1)));
        assert_eq!(only_physics, Some(BodyHandle::new(2)));
        assert_eq!(neither, None);

        assert_eq!(world.rigid_bodies.len(), 2);
        assert_eq!(world.rigid_bodies[0].shape, BodyShape::Sphere { radius: 0.5 });
        assert_eq!(world.rigid_bodies[0].mass, 2.0);
        assert_eq!(world.rigid_bodies[0].velocity, Vec3::X);
        assert_eq!(world.rigid_bodies[1].shape, BodyShape::Empty);
        assert_eq!(world.rigid_bodies[1].translate, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(world.collision_objects.len(), 1);
        assert_eq!(world.collision_objects[0].translate, Vec3::new(2.0, 0.0, 0.0));
    }
}
