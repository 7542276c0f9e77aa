//! Perspective camera and the projections derived from it.

use keystone_shared::{Mat4, Quaternion, Vec3};

/// Vertical field of view of gameplay cameras, in degrees.
pub const DEFAULT_FOVY_DEGREES: f32 = 50.0;

/// Near plane of gameplay cameras.
pub const DEFAULT_ZNEAR: f32 = 0.1;

/// Far plane of gameplay cameras.
pub const DEFAULT_ZFAR: f32 = 1000.0;

/// Far plane used when fitting the shadow map.
pub const SHADOW_ZFAR: f32 = 100.0;

/// A perspective camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Eye position.
    pub position: Vec3,
    /// Viewing direction, unit length.
    pub view: Vec3,
    /// Up vector, perpendicular to `view`.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fovy: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub znear: f32,
    /// Far plane distance.
    pub zfar: f32,
}

impl Camera {
    /// A camera at `center + offset` looking back at `center`.
    #[must_use]
    pub fn looking_at(center: Vec3, offset: Vec3, aspect: f32) -> Self {
        let view = (-offset).normalize();
        Self {
            position: center + offset,
            view,
            up: view.cross(Vec3::Y).cross(view),
            fovy: DEFAULT_FOVY_DEGREES.to_radians(),
            aspect,
            znear: DEFAULT_ZNEAR,
            zfar: DEFAULT_ZFAR,
        }
    }

    /// Orbit camera `r` units from `center`: pitched by `theta` around X,
    /// then turned by `phi` around Y, starting behind the center on -Z.
    #[must_use]
    pub fn orbit(center: Vec3, r: f32, theta: f32, phi: f32, aspect: f32) -> Self {
        let pitch = Quaternion::from_axis_angle(Vec3::X, theta);
        let turn = Quaternion::from_axis_angle(Vec3::Y, phi);
        let offset = (turn * pitch).rotate(Vec3::new(0.0, 0.0, -r));
        Self::looking_at(center, offset, aspect)
    }

    /// Camera `r` units from the origin, above and behind it.
    #[must_use]
    pub fn overview(r: f32, aspect: f32) -> Self {
        Self::looking_at(Vec3::ZERO, Vec3::new(0.0, 1.0, -1.0).normalize() * r, aspect)
    }

    /// World to view space.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to(self.position, self.view, self.up)
    }

    /// View to clip space.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// World to clip space.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view_matrix()
    }

    /// World to shadow-map clip space for a directional light.
    ///
    /// Covers the sphere around the middle of the view range out to `zfar`,
    /// seen along `light_direction`.
    #[must_use]
    pub fn shadow_map_projection(&self, light_direction: Vec3) -> Mat4 {
        let radius = self.zfar * 0.5;
        let center = self.position + self.view * radius;
        let direction = light_direction.normalize();
        let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let eye = center - direction * radius;
        Mat4::orthographic(radius, radius, 0.0, 2.0 * radius) * Mat4::look_to(eye, direction, up)
    }
}
