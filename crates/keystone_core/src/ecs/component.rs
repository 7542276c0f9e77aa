//! # Component System
//!
//! The four optional component kinds. Components are pure data: every one is
//! `Pod`, so columns live in arena memory and are copied with `bytemuck`.
//!
//! Tagged payloads (collision shape, light type) are stored as a tag plus
//! raw fields and exposed through the [`CollisionShape`] and [`Light`] enums.
//! A component never stores its owning entity; see
//! [`StoreView::component`](super::StoreView::component).

use bytemuck::{Pod, Zeroable};
use keystone_shared::{Transform, Vec3};

/// The optional component kinds, in column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ComponentKind {
    /// A model reference to draw.
    Render = 0,
    /// A collision shape.
    Collision = 1,
    /// Rigid-body parameters.
    Physics = 2,
    /// A light source.
    Light = 3,
}

impl ComponentKind {
    /// Number of component kinds.
    pub const COUNT: usize = 4;

    /// Every kind, in column order.
    pub const ALL: [Self; Self::COUNT] = [Self::Render, Self::Collision, Self::Physics, Self::Light];

    /// Flag bit of this kind.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u32 {
        1 << self as u32
    }

    /// Column index of this kind.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name, as used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Collision => "collision",
            Self::Physics => "physics",
            Self::Light => "light",
        }
    }
}

/// Marker trait for component column types.
///
/// Implemented by the four component structs only. The hidden accessors let
/// generic store code reach the matching field of a [`ComponentPayloads`].
pub trait Component: Pod + Send + Sync + 'static {
    /// Which column this type lives in.
    const KIND: ComponentKind;

    #[doc(hidden)]
    fn payload(payloads: &ComponentPayloads) -> &Self;

    #[doc(hidden)]
    fn payload_mut(payloads: &mut ComponentPayloads) -> &mut Self;
}

/// Opaque handle to a physics-world object.
///
/// The store never looks inside; it only carries the handle for the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct BodyHandle(u32);

impl BodyHandle {
    /// No physics object.
    pub const NONE: Self = Self(u32::MAX);

    /// Wraps a raw handle.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this refers to no object.
    #[inline]
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for BodyHandle {
    fn default() -> Self {
        Self::NONE
    }
}

// ============================================================================
// RENDER
// ============================================================================

/// Draws one model, placed by the entity transform times `adjustment`.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct RenderComponent {
    /// Index into the level's model table.
    pub model_index: u32,
    /// Local correction applied before the entity transform.
    pub adjustment: Transform,
    hidden: u32,
}

impl RenderComponent {
    /// A visible component with an identity adjustment.
    #[must_use]
    pub const fn new(model_index: u32) -> Self {
        Self {
            model_index,
            adjustment: Transform::IDENTITY,
            hidden: 0,
        }
    }

    /// Builder: replaces the adjustment transform.
    #[must_use]
    pub const fn with_adjustment(mut self, adjustment: Transform) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Builder: sets the hidden flag.
    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden as u32;
        self
    }

    /// Whether the component is skipped when rendering.
    #[inline]
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden != 0
    }

    /// Shows or hides the component.
    #[inline]
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = u32::from(hidden);
    }
}

impl Default for RenderComponent {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Component for RenderComponent {
    const KIND: ComponentKind = ComponentKind::Render;

    fn payload(payloads: &ComponentPayloads) -> &Self {
        &payloads.render
    }

    fn payload_mut(payloads: &mut ComponentPayloads) -> &mut Self {
        &mut payloads.render
    }
}

// ============================================================================
// COLLISION
// ============================================================================

/// Collision geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CollisionShape {
    /// A sphere around the entity origin.
    Sphere {
        /// Sphere radius.
        radius: f32,
    },
    /// A Y-aligned capsule.
    Capsule {
        /// Length of the cylinder part.
        height: f32,
        /// Cap radius.
        radius: f32,
    },
    /// An axis-aligned box.
    Box {
        /// Full extents along each axis.
        size: Vec3,
    },
}

impl CollisionShape {
    const SPHERE: u32 = 0;
    const CAPSULE: u32 = 1;
    const BOX: u32 = 2;
}

/// Collision geometry plus the physics-world object built for it.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CollisionComponent {
    shape_tag: u32,
    params: [f32; 3],
    /// Physics-world object, [`BodyHandle::NONE`] until the level creates it.
    pub body: BodyHandle,
}

impl CollisionComponent {
    /// Creates a component without a physics object.
    #[must_use]
    pub const fn new(shape: CollisionShape) -> Self {
        let (shape_tag, params) = match shape {
            CollisionShape::Sphere { radius } => (CollisionShape::SPHERE, [radius, 0.0, 0.0]),
            CollisionShape::Capsule { height, radius } => {
                (CollisionShape::CAPSULE, [height, radius, 0.0])
            }
            CollisionShape::Box { size } => (CollisionShape::BOX, [size.x, size.y, size.z]),
        };
        Self {
            shape_tag,
            params,
            body: BodyHandle::NONE,
        }
    }

    /// Decodes the stored shape. Unknown tags read as a sphere.
    #[must_use]
    pub const fn shape(&self) -> CollisionShape {
        let [a, b, c] = self.params;
        match self.shape_tag {
            CollisionShape::CAPSULE => CollisionShape::Capsule {
                height: a,
                radius: b,
            },
            CollisionShape::BOX => CollisionShape::Box {
                size: Vec3::new(a, b, c),
            },
            _ => CollisionShape::Sphere { radius: a },
        }
    }

    /// Replaces the shape, keeping the body handle.
    pub fn set_shape(&mut self, shape: CollisionShape) {
        let body = self.body;
        *self = Self::new(shape);
        self.body = body;
    }
}

impl Default for CollisionComponent {
    fn default() -> Self {
        Self::new(CollisionShape::Sphere { radius: 1.0 })
    }
}

impl Component for CollisionComponent {
    const KIND: ComponentKind = ComponentKind::Collision;

    fn payload(payloads: &ComponentPayloads) -> &Self {
        &payloads.collision
    }

    fn payload_mut(payloads: &mut ComponentPayloads) -> &mut Self {
        &mut payloads.collision
    }
}

// ============================================================================
// PHYSICS
// ============================================================================

/// Rigid-body parameters.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PhysicsComponent {
    /// Initial linear velocity.
    pub velocity: Vec3,
    /// Body mass. Zero makes the body static.
    pub mass: f32,
    /// Speed clamp applied by the host's movement code.
    pub max_speed: f32,
    /// Physics-world object, [`BodyHandle::NONE`] until the level creates it.
    pub body: BodyHandle,
}

impl PhysicsComponent {
    /// Creates a component at rest.
    #[must_use]
    pub const fn new(mass: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            mass,
            max_speed: 0.0,
            body: BodyHandle::NONE,
        }
    }

    /// Builder: sets the initial velocity.
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: sets the speed clamp.
    #[must_use]
    pub const fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }
}

impl Default for PhysicsComponent {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Component for PhysicsComponent {
    const KIND: ComponentKind = ComponentKind::Physics;

    fn payload(payloads: &ComponentPayloads) -> &Self {
        &payloads.physics
    }

    fn payload_mut(payloads: &mut ComponentPayloads) -> &mut Self {
        &mut payloads.physics
    }
}

// ============================================================================
// LIGHT
// ============================================================================

/// A light source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    /// Uniform light from everywhere.
    Ambient {
        /// Light color.
        color: Vec3,
    },
    /// Parallel light, like the sun.
    Directional {
        /// Light color.
        color: Vec3,
        /// Direction the light travels.
        direction: Vec3,
    },
    /// Omnidirectional light with falloff.
    Point {
        /// Light color.
        color: Vec3,
        /// World-space position.
        position: Vec3,
        /// Falloff coefficient.
        attenuation: f32,
    },
}

impl Light {
    const AMBIENT: u32 = 0;
    const DIRECTIONAL: u32 = 1;
    const POINT: u32 = 2;
}

/// A light source attached to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct LightComponent {
    tag: u32,
    color: Vec3,
    vector: Vec3,
    attenuation: f32,
}

impl LightComponent {
    /// Encodes a light.
    #[must_use]
    pub const fn new(light: Light) -> Self {
        match light {
            Light::Ambient { color } => Self {
                tag: Light::AMBIENT,
                color,
                vector: Vec3::ZERO,
                attenuation: 0.0,
            },
            Light::Directional { color, direction } => Self {
                tag: Light::DIRECTIONAL,
                color,
                vector: direction,
                attenuation: 0.0,
            },
            Light::Point {
                color,
                position,
                attenuation,
            } => Self {
                tag: Light::POINT,
                color,
                vector: position,
                attenuation,
            },
        }
    }

    /// Decodes the stored light. Unknown tags read as ambient.
    #[must_use]
    pub const fn light(&self) -> Light {
        match self.tag {
            Light::DIRECTIONAL => Light::Directional {
                color: self.color,
                direction: self.vector,
            },
            Light::POINT => Light::Point {
                color: self.color,
                position: self.vector,
                attenuation: self.attenuation,
            },
            _ => Light::Ambient { color: self.color },
        }
    }
}

impl Default for LightComponent {
    fn default() -> Self {
        Self::new(Light::Ambient { color: Vec3::ONE })
    }
}

impl Component for LightComponent {
    const KIND: ComponentKind = ComponentKind::Light;

    fn payload(payloads: &ComponentPayloads) -> &Self {
        &payloads.light
    }

    fn payload_mut(payloads: &mut ComponentPayloads) -> &mut Self {
        &mut payloads.light
    }
}

// ============================================================================
// PAYLOADS
// ============================================================================

/// Optional payload for each component kind.
///
/// `present` says which fields hold a value; absent fields are ignored. The
/// record is `Pod` so pending modifications can live in an arena column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct ComponentPayloads {
    present: u32,
    render: RenderComponent,
    collision: CollisionComponent,
    physics: PhysicsComponent,
    light: LightComponent,
}

impl ComponentPayloads {
    /// Stores a payload, replacing any earlier one of the same kind.
    pub fn set<C: Component>(&mut self, component: C) {
        *C::payload_mut(self) = component;
        self.present |= C::KIND.bit();
    }

    /// The payload of kind `C`, if one was set.
    #[must_use]
    pub fn get<C: Component>(&self) -> Option<&C> {
        self.contains(C::KIND).then(|| C::payload(self))
    }

    /// Drops the payload of `kind`.
    pub fn clear(&mut self, kind: ComponentKind) {
        self.present &= !kind.bit();
    }

    /// Whether a payload of `kind` is set.
    #[inline]
    #[must_use]
    pub const fn contains(&self, kind: ComponentKind) -> bool {
        self.present & kind.bit() != 0
    }

    /// Bitset of the kinds with a payload.
    #[inline]
    #[must_use]
    pub const fn present_bits(&self) -> u32 {
        self.present
    }
}
