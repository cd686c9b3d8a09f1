//! 4x4 matrix in the OpenGL convention.
//!
//! # Convention
//! - Storage is **column-major**: element `(row, col)` lives at `m[col * 4 + row]`
//! - Vectors are **column vectors** on the right: `M * v`
//! - Transforms chain **right-to-left**: `A * B * v` applies B first, then A
//! - Clip-space depth is `[-1, 1]`; backends with a `[0, 1]` range remap in the vertex stage
//!
//! The storage order is exactly what a `mat4x4<f32>` uniform expects, so
//! [`Mat4::as_bytes`] can be uploaded without transposition.

use std::ops::Mul;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    m: [f32; 16],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Builds a matrix from column-major storage.
    pub const fn from_cols_array(m: [f32; 16]) -> Self {
        Mat4 { m }
    }

    pub fn to_cols_array(&self) -> [f32; 16] {
        self.m
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.m[col * 4 + row]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: f32) {
        self.m[col * 4 + row] = value;
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.m)
    }

    /// Perspective frustum with an explicit clipping box (`glFrustum`).
    pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let mut out = Mat4::from_cols_array([0.0; 16]);
        out.set(0, 0, 2.0 * near / (right - left));
        out.set(1, 1, 2.0 * near / (top - bottom));
        out.set(0, 2, (right + left) / (right - left));
        out.set(1, 2, (top + bottom) / (top - bottom));
        out.set(2, 2, -(far + near) / (far - near));
        out.set(3, 2, -1.0);
        out.set(2, 3, -2.0 * far * near / (far - near));
        out
    }

    /// Translation is stored in the last column.
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut out = Mat4::IDENTITY;
        out.set(0, 3, x);
        out.set(1, 3, y);
        out.set(2, 3, z);
        out
    }

    /// Rotation by Euler angles in degrees, applied about X first, then Y, then Z
    /// (`Rz * Ry * Rx`).
    pub fn rotation_xyz_degrees(x: f32, y: f32, z: f32) -> Self {
        let (sx, cx) = x.to_radians().sin_cos();
        let (sy, cy) = y.to_radians().sin_cos();
        let (sz, cz) = z.to_radians().sin_cos();

        Mat4::from_cols_array([
            cy * cz,
            cy * sz,
            -sy,
            0.0,
            sx * sy * cz - cx * sz,
            sx * sy * sz + cx * cz,
            sx * cy,
            0.0,
            cx * sy * cz + sx * sz,
            cx * sy * sz - sx * cz,
            cx * cy,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ])
    }

    /// Returns `self * Mat4::translation(x, y, z)`.
    pub fn translate(&self, x: f32, y: f32, z: f32) -> Self {
        *self * Mat4::translation(x, y, z)
    }

    /// Returns `self * Mat4::rotation_xyz_degrees(x, y, z)`.
    pub fn rotate_degrees(&self, x: f32, y: f32, z: f32) -> Self {
        *self * Mat4::rotation_xyz_degrees(x, y, z)
    }

    /// Transforms a point (`w = 1`) and returns the homogeneous result.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 4] {
        let v = [p[0], p[1], p[2], 1.0];
        let mut out = [0.0; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = (0..4).map(|k| self.get(row, k) * v[k]).sum();
        }
        out
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = Mat4::from_cols_array([0.0; 16]);
        for col in 0..4 {
            for row in 0..4 {
                let v = (0..4).map(|k| self.get(row, k) * rhs.get(k, col)).sum();
                out.set(row, col, v);
            }
        }
        out
    }
}
