//! Scene camera.
//!
//! A fixed perspective camera in look-at mode. The scene never moves it; hosts
//! only change the aspect ratio when the surface resizes.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use serde::{Deserialize, Serialize};

use crate::picking::Ray;

/// Camera configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera position in world space.
    pub position: Vec3,
    /// Look-at target.
    pub target: Vec3,
    /// Up vector, Y-up by default.
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Near clip plane distance.
    pub near: f32,
    /// Far clip plane distance.
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 25.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 30.0,
            near: 1.0,
            far: 40.0,
        }
    }
}

impl CameraConfig {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect.max(1e-6), self.near, self.far)
    }

    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Normalized direction from position to target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// World-space ray through a point in normalized device coordinates
    /// (x right, y up, both in `[-1, 1]`).
    pub fn ray_from_ndc(&self, ndc: Vec2, aspect: f32) -> Ray {
        let inverse = self.view_projection_matrix(aspect).inverse();
        // wgpu clip space depth runs 0 (near) to 1 (far).
        let near = inverse * ndc.extend(0.0).extend(1.0);
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let near = near.xyz() / near.w;
        let far = far.xyz() / far.w;
        Ray::new(near, far - near)
    }

    /// Camera-space right and up axes in world space.
    pub fn basis(&self) -> (Vec3, Vec3) {
        let forward = self.forward();
        let right = forward.cross(self.up).normalize_or_zero();
        (right, right.cross(forward))
    }

    /// Evaluate into GPU-ready uniforms.
    pub fn to_uniforms(&self, aspect: f32) -> CameraUniforms {
        let (right, up) = self.basis();
        CameraUniforms {
            view_proj: self.view_projection_matrix(aspect).to_cols_array_2d(),
            position: self.position.extend(1.0).to_array(),
            right: right.extend(0.0).to_array(),
            up: up.extend(0.0).to_array(),
        }
    }
}

/// Evaluated camera parameters ready for the GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct CameraUniforms {
    /// Combined view-projection matrix, column major.
    pub view_proj: [[f32; 4]; 4],
    /// Camera position in world space (vec4, w unused).
    pub position: [f32; 4],
    /// Billboard axes for point sprites.
    pub right: [f32; 4],
    pub up: [f32; 4],
}

/// Map a window-space pixel position to normalized device coordinates.
pub fn pixel_to_ndc(x: f64, y: f64, width: u32, height: u32) -> Vec2 {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    Vec2::new((x / w * 2.0 - 1.0) as f32, (1.0 - y / h * 2.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = CameraConfig::default();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 25.0));
        assert_eq!(camera.fov, 30.0);
        assert_eq!(camera.forward(), Vec3::NEG_Z);
    }

    #[test]
    fn test_uniform_size() {
        // Ensure proper alignment for GPU
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 112);
    }

    #[test]
    fn test_view_matrix_lookat() {
        let camera = CameraConfig::default();
        let view = camera.view_matrix();
        // The origin should be in front of the camera (negative Z in view space)
        let origin_in_view = view.transform_point3(Vec3::ZERO);
        assert!(origin_in_view.z < 0.0);
        assert!((origin_in_view.z + 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_centre_ray_points_at_target() {
        let camera = CameraConfig::default();
        let ray = camera.ray_from_ndc(Vec2::ZERO, 16.0 / 9.0);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!(ray.origin.x.abs() < 1e-4 && ray.origin.y.abs() < 1e-4);
        // Origin sits on the near plane.
        assert!((ray.origin.z - 24.0).abs() < 1e-3);
    }

    #[test]
    fn test_ray_through_projected_point() {
        let camera = CameraConfig::default();
        let aspect = 1.5;
        let point = Vec3::new(3.0, -2.0, 4.0);
        let ndc = camera.view_projection_matrix(aspect).project_point3(point);
        let ray = camera.ray_from_ndc(ndc.truncate(), aspect);

        let to_point = (point - ray.origin).normalize();
        assert!(to_point.dot(ray.direction) > 0.9999);
    }

    #[test]
    fn test_basis() {
        let (right, up) = CameraConfig::default().basis();
        assert!((right - Vec3::X).length() < 1e-6);
        assert!((up - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_pixel_to_ndc() {
        assert_eq!(pixel_to_ndc(0.0, 0.0, 200, 100), Vec2::new(-1.0, 1.0));
        assert_eq!(pixel_to_ndc(100.0, 50.0, 200, 100), Vec2::ZERO);
        assert_eq!(pixel_to_ndc(200.0, 100.0, 200, 100), Vec2::new(1.0, -1.0));
    }
}
