//! Perspective camera: view/projection matrices and cursor rays.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use plates_scene::{CameraConfig, Ray};

/// Camera data shared by the vertex and fragment stages.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// World-space eye position with `w = 1`.
    pub position: [f32; 4],
}

/// A look-at perspective camera with reverse-Z projection.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Camera at the configured position looking at the origin.
    pub fn from_config(config: &CameraConfig, aspect_ratio: f32) -> Self {
        Self {
            eye: config.position,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: config.fov_degrees.to_radians(),
            aspect_ratio,
            near: config.near,
            far: config.far,
        }
    }

    pub fn look_at(&mut self, eye: Vec3, target: Vec3) {
        self.eye = eye;
        self.target = target;
    }

    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Near maps to depth 1, far to depth 0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            position: self.eye.extend(1.0).to_array(),
        }
    }

    /// World-space ray through `cursor`, given in pixels from the top-left
    /// of a `viewport`-sized surface.
    pub fn screen_ray(&self, cursor: Vec2, viewport: Vec2) -> Ray {
        let ndc = Vec2::new(
            2.0 * cursor.x / viewport.x.max(1.0) - 1.0,
            1.0 - 2.0 * cursor.y / viewport.y.max(1.0),
        );
        let inverse = self.view_projection_matrix().inverse();
        let unproject = |depth: f32| {
            let p = inverse * Vec4::new(ndc.x, ndc.y, depth, 1.0);
            p.truncate() / p.w
        };
        let near = unproject(1.0);
        let far = unproject(0.0);
        Ray::new(near, far - near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_camera() -> Camera {
        Camera::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn test_from_config() {
        let camera = default_camera();
        assert_eq!(camera.eye, Vec3::new(0.0, 0.0, 10.0));
        assert!((camera.fov_y - 75f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
    }

    #[test]
    fn test_reverse_z_depth() {
        let camera = default_camera();
        let vp = camera.view_projection_matrix();
        let depth = |z: f32| {
            let clip = vp * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        // Eye at z=10 looking down -Z.
        assert!((depth(10.0 - 0.1) - 1.0).abs() < 1e-4);
        assert!(depth(10.0 - 1000.0).abs() < 1e-4);
        assert!(depth(0.0) > depth(-50.0));
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = default_camera();
        let ray = camera.screen_ray(Vec2::new(640.0, 360.0), Vec2::new(1280.0, 720.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-3);
        assert!((ray.origin - Vec3::new(0.0, 0.0, 9.9)).length() < 1e-2);
    }

    #[test]
    fn test_corner_ray_matches_fov() {
        let camera = default_camera();
        let ray = camera.screen_ray(Vec2::new(640.0, 0.0), Vec2::new(1280.0, 720.0));
        // Top edge of the view: angle to the axis is half the vertical fov.
        let angle = ray.direction.angle_between(Vec3::NEG_Z);
        assert!((angle - camera.fov_y * 0.5).abs() < 1e-3);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn test_look_at_moves_eye() {
        let mut camera = default_camera();
        camera.look_at(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO);
        let ray = camera.screen_ray(Vec2::new(50.0, 50.0), Vec2::new(100.0, 100.0));
        assert!((ray.direction - Vec3::NEG_X).length() < 1e-3);
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        let uniform = default_camera().to_uniform();
        assert_eq!(uniform.position, [0.0, 0.0, 10.0, 1.0]);
    }

    #[test]
    fn test_aspect_ratio_ignores_zero_height() {
        let mut camera = default_camera();
        camera.set_aspect_ratio(800.0, 0.0);
        assert!((camera.aspect_ratio - 16.0 / 9.0).abs() < 1e-6);
        camera.set_aspect_ratio(800.0, 400.0);
        assert_eq!(camera.aspect_ratio, 2.0);
    }
}
