//! Mathematical types shared by the store and the level.
//!
//! Everything here is `Pod` so it can be stored directly in arena columns
//! and copied byte-for-byte into uniform buffers.
//!
//! Matrices are column-major (`cols[c][r]`), vectors are column vectors.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 2D Vector - texture coords, UV scale
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// One vector
    pub const ONE: Self = Self::new(1.0, 1.0);
}

/// 3D Vector - position, velocity, direction, color
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// One vector (identity scale)
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Unit X vector
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Extends to a `Vec4` with the given `w`.
    #[must_use]
    pub const fn extend(self, w: f32) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, w)
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// 4D Vector - uniform padding, homogeneous coordinates
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec4 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Vec4 {
    /// Creates a new Vec4
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Drops `w`.
    #[must_use]
    pub const fn truncate(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

/// Quaternion for rotations
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quaternion {
    /// Creates a new quaternion
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Rotation of `angle` radians around `axis`.
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize();
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Converts to array in `[x, y, z, w]` order
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Creates from array in `[x, y, z, w]` order
    #[must_use]
    pub const fn from_array(arr: [f32; 4]) -> Self {
        Self::new(arr[0], arr[1], arr[2], arr[3])
    }

    /// Rotates a vector.
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Quaternion {
    type Output = Self;
    fn mul(self, b: Self) -> Self {
        let a = self;
        Self::new(
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        )
    }
}

/// Transform - scale, then rotate, then translate
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Transform {
    /// Per-axis scale
    pub scale: Vec3,
    /// Rotation
    pub rotate: Quaternion,
    /// Translation
    pub translate: Vec3,
}

impl Transform {
    /// Creates a new transform
    #[must_use]
    pub const fn new(scale: Vec3, rotate: Quaternion, translate: Vec3) -> Self {
        Self { scale, rotate, translate }
    }

    /// Identity transform
    pub const IDENTITY: Self = Self::new(Vec3::ONE, Quaternion::IDENTITY, Vec3::ZERO);

    /// Identity transform moved to `translate`.
    #[must_use]
    pub const fn from_translation(translate: Vec3) -> Self {
        Self::new(Vec3::ONE, Quaternion::IDENTITY, translate)
    }

    /// Matrix form `T * R * S`.
    #[must_use]
    pub fn to_mat4(self) -> Mat4 {
        Mat4::from_transform(self)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 4x4 column-major matrix
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    /// Columns, `cols[c][r]`
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates from columns.
    #[must_use]
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Translation matrix.
    #[must_use]
    pub const fn from_translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [t.x, t.y, t.z, 1.0];
        m
    }

    /// `T * R * S` for a transform.
    #[must_use]
    pub fn from_transform(t: Transform) -> Self {
        let Quaternion { x, y, z, w } = t.rotate;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        let s = t.scale;
        Self::from_cols([
            [
                (1.0 - 2.0 * (yy + zz)) * s.x,
                2.0 * (xy + wz) * s.x,
                2.0 * (xz - wy) * s.x,
                0.0,
            ],
            [
                2.0 * (xy - wz) * s.y,
                (1.0 - 2.0 * (xx + zz)) * s.y,
                2.0 * (yz + wx) * s.y,
                0.0,
            ],
            [
                2.0 * (xz + wy) * s.z,
                2.0 * (yz - wx) * s.z,
                (1.0 - 2.0 * (xx + yy)) * s.z,
                0.0,
            ],
            [t.translate.x, t.translate.y, t.translate.z, 1.0],
        ])
    }

    /// Right-handed view matrix looking along `direction` from `eye`.
    #[must_use]
    pub fn look_to(eye: Vec3, direction: Vec3, up: Vec3) -> Self {
        let f = direction.normalize();
        let s = f.cross(up).normalize();
        let u = s.cross(f);
        Self::from_cols([
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
        ])
    }

    /// Right-handed perspective projection with a `[0, 1]` depth range and
    /// a flipped Y axis (Vulkan clip space).
    #[must_use]
    pub fn perspective(fovy: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        let f = 1.0 / (fovy * 0.5).tan();
        Self::from_cols([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, -f, 0.0, 0.0],
            [0.0, 0.0, zfar / (znear - zfar), -1.0],
            [0.0, 0.0, (znear * zfar) / (znear - zfar), 0.0],
        ])
    }

    /// Right-handed orthographic projection with a `[0, 1]` depth range and
    /// a flipped Y axis.
    #[must_use]
    pub fn orthographic(half_width: f32, half_height: f32, znear: f32, zfar: f32) -> Self {
        Self::from_cols([
            [1.0 / half_width, 0.0, 0.0, 0.0],
            [0.0, -1.0 / half_height, 0.0, 0.0],
            [0.0, 0.0, 1.0 / (znear - zfar), 0.0],
            [0.0, 0.0, znear / (znear - zfar), 1.0],
        ])
    }

    /// Transposed matrix.
    #[must_use]
    pub fn transpose(self) -> Self {
        let mut out = Self::IDENTITY;
        for c in 0..4 {
            for r in 0..4 {
                out.cols[c][r] = self.cols[r][c];
            }
        }
        out
    }

    /// Inverse matrix, or `None` when singular.
    #[must_use]
    pub fn inverse(self) -> Option<Self> {
        let m: [f32; 16] = bytemuck::cast(self.cols);
        let mut inv = [0.0f32; 16];

        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];

        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det.abs() <= f32::EPSILON * f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        for v in &mut inv {
            *v *= inv_det;
        }
        Some(Self::from_cols(bytemuck::cast(inv)))
    }

    /// Transforms a point (w = 1).
    #[must_use]
    pub fn transform_point(self, p: Vec3) -> Vec3 {
        (self * p.extend(1.0)).truncate()
    }

    /// Approximate equality, element by element.
    #[must_use]
    pub fn abs_diff_eq(self, other: Self, epsilon: f32) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, value) in col.iter_mut().enumerate() {
                *value = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Self::from_cols(out)
    }
}

impl std::ops::Mul<Vec4> for Mat4 {
    type Output = Vec4;
    fn mul(self, v: Vec4) -> Vec4 {
        let v = v.to_array();
        let mut out = [0.0f32; 4];
        for (r, value) in out.iter_mut().enumerate() {
            *value = (0..4).map(|k| self.cols[k][r] * v[k]).sum();
        }
        Vec4::new(out[0], out[1], out[2], out[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum.x, 5.0);
        assert_eq!(sum.y, 7.0);
        assert_eq!(sum.z, 9.0);

        assert_eq!(a.dot(b), 32.0); // 1*4 + 2*5 + 3*6
        assert_eq!(Vec3::X.cross(Vec3::Y), Vec3::Z);
    }

    #[test]
    fn test_pod_sizes() {
        assert_eq!(std::mem::size_of::<Transform>(), 40);
        assert_eq!(std::mem::size_of::<Mat4>(), 64);
        let t = Transform::IDENTITY;
        assert_eq!(bytemuck::bytes_of(&t).len(), 40);
    }

    #[test]
    fn test_quaternion_rotation() {
        let q = Quaternion::from_axis_angle(Vec3::Y, std::f32::consts::FRAC_PI_2);
        assert!(approx(q.rotate(Vec3::X), Vec3::new(0.0, 0.0, -1.0)));

        let twice = q * q;
        assert!(approx(twice.rotate(Vec3::X), Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_transform_matrix_order() {
        let t = Transform::new(
            Vec3::new(2.0, 2.0, 2.0),
            Quaternion::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
            Vec3::new(10.0, 0.0, 0.0),
        );
        // scale to (2,0,0), rotate to (0,2,0), translate to (10,2,0)
        let p = t.to_mat4().transform_point(Vec3::X);
        assert!(approx(p, Vec3::new(10.0, 2.0, 0.0)));
    }

    #[test]
    fn test_matrix_product_and_inverse() {
        let a = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let b = Transform::new(
            Vec3::new(1.0, 3.0, 1.0),
            Quaternion::from_axis_angle(Vec3::X, 0.7),
            Vec3::ZERO,
        )
        .to_mat4();
        let ab = a * b;
        let inv = ab.inverse().unwrap();
        assert!((ab * inv).abs_diff_eq(Mat4::IDENTITY, 1e-5));
        assert!(Mat4::IDENTITY.transpose().abs_diff_eq(Mat4::IDENTITY, 0.0));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let zero = Mat4::from_cols([[0.0; 4]; 4]);
        assert!(zero.inverse().is_none());
    }
}
