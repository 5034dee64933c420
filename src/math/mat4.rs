//! 4x4 homogeneous transformation matrix.
//!
//! # Convention
//! - Storage is row-major: `data[row][col]`
//! - Vectors are **column vectors** on the right: `M * v`
//! - Translation is stored in the **last column**
//! - Transforms chain **right-to-left**: `A * B * v` applies B first, then A
//!
//! # Example
//! ```ignore
//! let model = Mat4::translation(0.0, 1.0, 0.0) * Mat4::scaling(2.0, 2.0, 2.0);
//! let p = model.transform_point(Vec3::ONE); // scaled first, then moved up
//! ```

use std::ops::Mul;

use approx::{AbsDiffEq, RelativeEq};

use super::vec3::Vec3;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    data: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn new(data: [[f32; 4]; 4]) -> Self {
        Mat4 { data }
    }

    /// Builds a matrix from 16 values in row-major order.
    pub fn from_row_major(values: [f32; 16]) -> Self {
        let mut data = [[0.0; 4]; 4];
        for (i, v) in values.into_iter().enumerate() {
            data[i / 4][i % 4] = v;
        }
        Mat4 { data }
    }

    pub fn identity() -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, y],
            [0.0, 0.0, 1.0, z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Self {
        Mat4::new([
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Counter-clockwise rotation about +X (right-handed).
    pub fn rotation_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, -s, 0.0],
            [0.0, s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::new([
            [c, 0.0, s, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [-s, 0.0, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    pub fn rotation_z(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Mat4::new([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Right-handed perspective projection mapping view space to clip space
    /// with depth in `[-1, 1]`.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y / 2.0).tan();
        Mat4::new([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [
                0.0,
                0.0,
                (far + near) / (near - far),
                2.0 * far * near / (near - far),
            ],
            [0.0, 0.0, -1.0, 0.0],
        ])
    }

    /// Right-handed view matrix looking from `eye` towards `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let f = (eye - target).unit();
        let s = up.cross(f).unit();
        let t = f.cross(s).unit();

        Self::new([
            [s.x, s.y, s.z, -s.dot(eye)],
            [t.x, t.y, t.z, -t.dot(eye)],
            [f.x, f.y, f.z, -f.dot(eye)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Row-by-column product `self * other`.
    pub fn multiply(&self, other: &Mat4) -> Mat4 {
        let mut result = [[0.0f32; 4]; 4];
        for (row, out) in result.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = (0..4)
                    .map(|k| self.data[row][k] * other.data[k][col])
                    .sum();
            }
        }
        Mat4::new(result)
    }

    pub fn transpose(&self) -> Self {
        let mut data = [[0.0f32; 4]; 4];
        for (row, out) in data.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = self.data[col][row];
            }
        }
        Mat4 { data }
    }

    /// Signed cofactor of entry `(row, col)`.
    fn cofactor(&self, row: usize, col: usize) -> f32 {
        let mut sub = [[0.0f32; 3]; 3];
        let rows = (0..4).filter(|&r| r != row);
        for (sr, r) in rows.enumerate() {
            let cols = (0..4).filter(|&c| c != col);
            for (sc, c) in cols.enumerate() {
                sub[sr][sc] = self.data[r][c];
            }
        }
        let minor = sub[0][0] * (sub[1][1] * sub[2][2] - sub[1][2] * sub[2][1])
            - sub[0][1] * (sub[1][0] * sub[2][2] - sub[1][2] * sub[2][0])
            + sub[0][2] * (sub[1][0] * sub[2][1] - sub[1][1] * sub[2][0]);
        if (row + col) % 2 == 0 {
            minor
        } else {
            -minor
        }
    }

    /// Full cofactor-expansion determinant.
    pub fn determinant(&self) -> f32 {
        (0..4).map(|c| self.data[0][c] * self.cofactor(0, c)).sum()
    }

    /// Computes the inverse through the adjugate.
    ///
    /// All 16 cofactors are evaluated; the determinant is row 0 of `self`
    /// dotted with column 0 of the adjugate, and every adjugate entry is then
    /// divided by it.
    ///
    /// # Errors
    /// [`Error::SingularTransform`] if the determinant is not finite or its
    /// magnitude is below `f32::EPSILON`.
    pub fn inverse(&self) -> Result<Mat4> {
        let mut cofactors = [[0.0f32; 4]; 4];
        for (row, out) in cofactors.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = self.cofactor(row, col);
            }
        }

        // adjugate[i][j] = cofactors[j][i], so column 0 of the adjugate is row 0
        // of the cofactor matrix.
        let determinant: f32 = (0..4).map(|c| self.data[0][c] * cofactors[0][c]).sum();
        if !determinant.is_finite() || determinant.abs() < f32::EPSILON {
            return Err(Error::SingularTransform { determinant });
        }

        let inv_det = 1.0 / determinant;
        let mut data = [[0.0f32; 4]; 4];
        for (row, out) in data.iter_mut().enumerate() {
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = cofactors[col][row] * inv_det;
            }
        }
        Ok(Mat4 { data })
    }

    /// Transpose of the inverse; the correct transform for surface normals.
    pub fn inverse_transpose(&self) -> Result<Mat4> {
        Ok(self.inverse()?.transpose())
    }

    /// Transforms a point (`w = 1`), including translation, and divides by the
    /// resulting `w`.
    pub fn transform_point(&self, v: Vec3) -> Vec3 {
        let m = &self.data;
        let w = m[3][0] * v.x + m[3][1] * v.y + m[3][2] * v.z + m[3][3];
        Vec3::new(
            (m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z + m[0][3]) / w,
            (m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z + m[1][3]) / w,
            (m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z + m[2][3]) / w,
        )
    }

    /// Transforms a direction with the upper-left 3x3 block only.
    ///
    /// Not valid for normals under non-uniform scale or shear; use
    /// [`Mat4::inverse_transpose`] for those.
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        let m = &self.data;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// Access element at [row][col].
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row][col]
    }

    /// Set element at [row][col].
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row][col] = value;
    }

    /// The 16 entries in row-major order.
    pub fn to_row_major(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.data[i / 4][i % 4];
        }
        out
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Self::Output {
        self.multiply(&rhs)
    }
}

/// `M * p` transforms `p` as a point.
impl Mul<Vec3> for Mat4 {
    type Output = Vec3;

    fn mul(self, v: Vec3) -> Self::Output {
        self.transform_point(v)
    }
}

impl AbsDiffEq for Mat4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.to_row_major()
            .iter()
            .zip(other.to_row_major().iter())
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Mat4 {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.to_row_major()
            .iter()
            .zip(other.to_row_major().iter())
            .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}
