//! Perspective projection parameters and window-to-world unprojection.

use crate::backend::Viewport;
use crate::error::Result;
use crate::math::{Mat4, Vec3};

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians.
    fov_y: f32,
    /// Aspect ratio (width / height).
    aspect_ratio: f32,
    z_near: f32,
    z_far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self::from_degrees(45.0, 1.0, 0.1, 1000.0)
    }
}

impl Projection {
    /// # Arguments
    /// * `fov_y` - Vertical field of view in radians
    /// * `aspect_ratio` - Width divided by height
    /// * `z_near` - Near clipping plane distance (must be > 0)
    /// * `z_far` - Far clipping plane distance (must be > z_near)
    pub fn new(fov_y: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            fov_y,
            aspect_ratio,
            z_near,
            z_far,
        }
    }

    /// Creates a projection from degrees instead of radians.
    pub fn from_degrees(fov_y_degrees: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self::new(fov_y_degrees.to_radians(), aspect_ratio, z_near, z_far)
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    /// Right-handed perspective matrix, depth mapped to `[-1, 1]`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov_y, self.aspect_ratio, self.z_near, self.z_far)
    }
}

/// Maps window coordinates back into the space `modelview` maps from.
///
/// `win.x` and `win.y` are pixels relative to the viewport origin, `win.z` is
/// depth in `[0, 1]`.
///
/// # Errors
/// [`crate::Error::SingularTransform`] if `projection * modelview` has no
/// inverse.
pub fn unproject(win: Vec3, modelview: &Mat4, projection: &Mat4, viewport: Viewport) -> Result<Vec3> {
    let ndc = Vec3::new(
        (win.x - viewport.x as f32) / viewport.width as f32 * 2.0 - 1.0,
        (win.y - viewport.y as f32) / viewport.height as f32 * 2.0 - 1.0,
        win.z * 2.0 - 1.0,
    );
    let inverse = (*projection * *modelview).inverse()?;
    Ok(inverse.transform_point(ndc))
}

/// Projects a point to window coordinates; the inverse of [`unproject`].
pub fn project(point: Vec3, modelview: &Mat4, projection: &Mat4, viewport: Viewport) -> Vec3 {
    let ndc = (*projection * *modelview).transform_point(point);
    Vec3::new(
        viewport.x as f32 + viewport.width as f32 * (ndc.x + 1.0) / 2.0,
        viewport.y as f32 + viewport.height as f32 * (ndc.y + 1.0) / 2.0,
        (ndc.z + 1.0) / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn from_degrees_converts_correctly() {
        let proj = Projection::from_degrees(45.0, 1.0, 0.1, 100.0);
        assert_relative_eq!(proj.fov_y(), FRAC_PI_4, epsilon = 1e-6);
    }

    #[test]
    fn near_plane_maps_to_minus_one() {
        let proj = Projection::new(FRAC_PI_4, 1.0, 1.0, 100.0);
        let p = proj.matrix().transform_point(Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-5);
        let p = proj.matrix().transform_point(Vec3::new(0.0, 0.0, -100.0));
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn unproject_inverts_project() {
        let projection = Projection::from_degrees(60.0, 4.0 / 3.0, 0.1, 100.0).matrix();
        let modelview = Mat4::look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        let viewport = Viewport::new(0, 0, 800, 600);
        let point = Vec3::new(0.5, -0.25, 1.0);

        let win = project(point, &modelview, &projection, viewport);
        let back = unproject(win, &modelview, &projection, viewport).unwrap();
        assert_relative_eq!(back, point, epsilon = 1e-3);
    }

    #[test]
    fn depth_range_unprojects_to_clip_planes() {
        let proj = Projection::from_degrees(60.0, 16.0 / 9.0, 0.5, 40.0);
        let viewport = Viewport::new(0, 0, 160, 90);
        let center = |depth| {
            unproject(
                Vec3::new(80.0, 45.0, depth),
                &Mat4::identity(),
                &proj.matrix(),
                viewport,
            )
            .unwrap()
        };
        assert_relative_eq!(center(0.0).z, -proj.z_near(), max_relative = 1e-3);
        assert_relative_eq!(center(1.0).z, -proj.z_far(), max_relative = 1e-3);
        assert_relative_eq!(proj.aspect_ratio(), 16.0 / 9.0);
    }

    #[test]
    fn viewport_center_is_on_view_axis() {
        let projection = Projection::default().matrix();
        let viewport = Viewport::new(0, 0, 100, 100);
        let p = unproject(Vec3::new(50.0, 50.0, 0.5), &Mat4::identity(), &projection, viewport)
            .unwrap();
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-4);
        assert!(p.z < 0.0);
    }

    #[test]
    fn unproject_singular_fails() {
        let result = unproject(
            Vec3::ZERO,
            &Mat4::scaling(0.0, 1.0, 1.0),
            &Mat4::identity(),
            Viewport::new(0, 0, 1, 1),
        );
        assert!(matches!(result, Err(Error::SingularTransform { .. })));
    }
}
