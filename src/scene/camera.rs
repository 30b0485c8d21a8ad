use anyhow::{ensure, Result};
use glam::{Mat4, Vec3, Vec4};

use crate::shader::GlobalUbo;

/// Host-side source of the projection and view matrices.
///
/// Follows Vulkan clip conventions: depth in [0, 1], +y down, the camera looks
/// along +z in view space.
pub struct Camera {
    pub position: Vec3,
    pub rotation: Vec3, // x = pitch, y = yaw, z = roll (radians)

    pub projection_matrix: Mat4,
    pub inverse_projection_matrix: Mat4,
    pub view_matrix: Mat4,
    pub inverse_view_matrix: Mat4,

    pub look_sense: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            projection_matrix: Mat4::IDENTITY,
            inverse_projection_matrix: Mat4::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            inverse_view_matrix: Mat4::IDENTITY,
            look_sense: 0.0025,
        }
    }

    pub fn set_orthographic_projection(
        &mut self,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    ) -> Result<()> {
        ensure!(right != left, "Orthographic width must be non-zero, left = right = {}", left);
        ensure!(bottom != top, "Orthographic height must be non-zero, top = bottom = {}", top);
        ensure!(far != near, "Orthographic depth must be non-zero, near = far = {}", near);

        self.projection_matrix = Mat4::from_cols(
            Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / (bottom - top), 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0 / (far - near), 0.0),
            Vec4::new(
                -(right + left) / (right - left),
                -(bottom + top) / (bottom - top),
                -near / (far - near),
                1.0,
            ),
        );

        self.inverse_projection_matrix = Mat4::from_cols(
            Vec4::new((right - left) / 2.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, (bottom - top) / 2.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, far - near, 0.0),
            Vec4::new((left + right) / 2.0, (bottom + top) / 2.0, near, 1.0),
        );

        Ok(())
    }

    /// `fovy` is the vertical field of view in radians.
    pub fn set_perspective_projection(&mut self, fovy: f32, aspect: f32, near: f32, far: f32) -> Result<()> {
        ensure!(aspect.abs() > f32::EPSILON, "Aspect ratio must be non-zero, got {}", aspect);
        let tan_half_fovy = (fovy / 2.0).tan();

        self.projection_matrix = Mat4::from_cols(
            Vec4::new(1.0 / (aspect * tan_half_fovy), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0 / tan_half_fovy, 0.0, 0.0),
            Vec4::new(0.0, 0.0, far / (far - near), 1.0),
            Vec4::new(0.0, 0.0, -(far * near) / (far - near), 0.0),
        );

        self.inverse_projection_matrix = Mat4::from_cols(
            Vec4::new(aspect * tan_half_fovy, 0.0, 0.0, 0.0),
            Vec4::new(0.0, tan_half_fovy, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 0.0, (near - far) / (near * far)),
            Vec4::new(0.0, 0.0, 1.0, 1.0 / near),
        );

        Ok(())
    }

    /// Places the camera using a Y-X-Z (yaw, pitch, roll) rotation.
    pub fn set_view(&mut self, position: Vec3, rotation: Vec3) {
        self.position = position;
        self.rotation = rotation;

        let (s3, c3) = rotation.z.sin_cos();
        let (s2, c2) = rotation.x.sin_cos();
        let (s1, c1) = rotation.y.sin_cos();

        // Camera basis vectors in world space
        let u = Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1);
        let v = Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3);
        let w = Vec3::new(c2 * s1, -s2, c1 * c2);

        self.view_matrix = Mat4::from_cols(
            Vec4::new(u.x, v.x, w.x, 0.0),
            Vec4::new(u.y, v.y, w.y, 0.0),
            Vec4::new(u.z, v.z, w.z, 0.0),
            Vec4::new(-u.dot(position), -v.dot(position), -w.dot(position), 1.0),
        );

        self.inverse_view_matrix = Mat4::from_cols(
            u.extend(0.0),
            v.extend(0.0),
            w.extend(0.0),
            position.extend(1.0),
        );
    }

    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        let delta = self.look_sense * Vec3::new(dx, dy, 0.0);
        self.set_view(self.position, self.rotation + delta);
    }

    pub fn uniform(&self) -> GlobalUbo {
        GlobalUbo::new(self.projection_matrix, self.view_matrix)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
