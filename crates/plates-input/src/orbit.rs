//! Orbit camera controls: rotate around a target, dolly, and pan.
//!
//! Left-drag orbits, the wheel dollies toward or away from the target and
//! right-drag pans the target in the view plane. The camera position is
//! kept in spherical coordinates around the target.

use glam::{Vec2, Vec3};
use winit::event::MouseButton;

use crate::mouse::MouseState;

/// Keeps the polar angle away from the poles so `look_at` stays defined.
const POLAR_EPSILON: f32 = 1e-4;

/// Smallest orbit radius; dollying multiplies the radius, so zero would stick.
const MIN_RADIUS: f32 = 1e-3;

/// Per-step dolly factor before `zoom_speed` is applied.
const DOLLY_BASE: f32 = 0.95;

/// Tuning for [`OrbitControls`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitSettings {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub invert_y: bool,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            invert_y: false,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

/// Orbit-style camera controller.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    target: Vec3,
    radius: f32,
    /// Azimuth around +Y, measured from +Z toward +X.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
    settings: OrbitSettings,
}

impl OrbitControls {
    /// Start at `eye` looking at `target`.
    pub fn new(eye: Vec3, target: Vec3, settings: OrbitSettings) -> Self {
        let offset = eye - target;
        let radius = offset.length();
        let (theta, phi) = if radius > 0.0 {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        } else {
            (0.0, std::f32::consts::FRAC_PI_2)
        };
        let mut controls = Self {
            target,
            radius,
            theta,
            phi,
            settings,
        };
        controls.clamp();
        controls
    }

    pub fn eye(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + self.radius
                * Vec3::new(sin_phi * self.theta.sin(), self.phi.cos(), sin_phi * self.theta.cos())
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: OrbitSettings) {
        self.settings = settings;
        self.clamp();
    }

    /// Apply this frame's mouse input. Returns `true` if the camera moved.
    ///
    /// `viewport_height` is in the same pixel units as the mouse delta and
    /// `fov_y` is the vertical field of view in radians.
    pub fn update(&mut self, mouse: &MouseState, viewport_height: f32, fov_y: f32) -> bool {
        let before = (self.target, self.radius, self.theta, self.phi);
        let delta = mouse.delta();

        if mouse.is_button_pressed(MouseButton::Left) && delta != Vec2::ZERO {
            self.rotate(delta, viewport_height);
        }
        if mouse.is_button_pressed(MouseButton::Right) && delta != Vec2::ZERO {
            self.pan(delta, viewport_height, fov_y);
        }
        if mouse.scroll() != 0.0 {
            self.dolly(mouse.scroll());
        }

        before != (self.target, self.radius, self.theta, self.phi)
    }

    /// Orbit by a drag of `delta` pixels. A drag across the full viewport
    /// height turns the camera once around.
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let scale = std::f32::consts::TAU / viewport_height * self.settings.rotate_speed;
        let dy = if self.settings.invert_y { -delta.y } else { delta.y };
        self.theta -= delta.x * scale;
        self.phi -= dy * scale;
        self.clamp();
    }

    /// Move toward the target for positive `steps` (wheel up), away for negative.
    pub fn dolly(&mut self, steps: f32) {
        let scale = DOLLY_BASE.powf(self.settings.zoom_speed * steps);
        self.radius *= scale;
        self.clamp();
    }

    /// Slide the target (and camera) in the view plane so the point under
    /// the cursor follows the drag.
    pub fn pan(&mut self, delta: Vec2, viewport_height: f32, fov_y: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);

        let world_per_pixel = 2.0 * self.radius * (fov_y * 0.5).tan() / viewport_height;
        let offset = (-right * delta.x + up * delta.y) * world_per_pixel * self.settings.pan_speed;
        self.target += offset;
    }

    fn clamp(&mut self) {
        self.phi = self
            .phi
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
        let min = self.settings.min_distance.max(MIN_RADIUS);
        let max = self.settings.max_distance.max(min);
        self.radius = self.radius.clamp(min, max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::{ElementState, MouseScrollDelta};

    fn default_controls() -> OrbitControls {
        OrbitControls::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, OrbitSettings::default())
    }

    fn assert_vec_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn test_initial_eye_matches_position() {
        let controls = default_controls();
        assert_vec_near(controls.eye(), Vec3::new(0.0, 0.0, 10.0));
        assert!((controls.distance() - 10.0).abs() < 1e-6);

        let offset = OrbitControls::new(Vec3::new(3.0, 4.0, 0.0), Vec3::ZERO, OrbitSettings::default());
        assert_vec_near(offset.eye(), Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_full_height_drag_turns_once() {
        let mut controls = default_controls();
        controls.rotate(Vec2::new(720.0, 0.0), 720.0);
        assert_vec_near(controls.eye(), Vec3::new(0.0, 0.0, 10.0));

        controls.rotate(Vec2::new(180.0, 0.0), 720.0);
        // A quarter turn to the left brings the camera to -X.
        assert_vec_near(controls.eye(), Vec3::new(-10.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_keeps_distance() {
        let mut controls = default_controls();
        controls.rotate(Vec2::new(37.0, -91.0), 600.0);
        assert!((controls.eye().length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_polar_angle_clamped() {
        let mut controls = default_controls();
        controls.rotate(Vec2::new(0.0, 10_000.0), 100.0);
        let eye = controls.eye();
        assert!(eye.y > 9.99);
        assert!(eye.is_finite());
        controls.rotate(Vec2::new(0.0, -20_000.0), 100.0);
        assert!(controls.eye().y < -9.99);
    }

    #[test]
    fn test_invert_y() {
        let mut normal = default_controls();
        let mut inverted = OrbitControls::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            OrbitSettings {
                invert_y: true,
                ..OrbitSettings::default()
            },
        );
        normal.rotate(Vec2::new(0.0, 50.0), 720.0);
        inverted.rotate(Vec2::new(0.0, 50.0), 720.0);
        assert!((normal.eye().y + inverted.eye().y).abs() < 1e-4);
    }

    #[test]
    fn test_dolly_scales_distance() {
        let mut controls = default_controls();
        controls.dolly(1.0);
        assert!((controls.distance() - 9.5).abs() < 1e-5);
        controls.dolly(-1.0);
        assert!((controls.distance() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_dolly_recovers_after_zooming_all_the_way_in() {
        let mut controls = default_controls();
        for _ in 0..5000 {
            controls.dolly(1.0);
        }
        let closest = controls.distance();
        assert!(closest > 0.0);
        assert!(closest.is_finite());
        assert_ne!(controls.eye(), controls.target());

        controls.dolly(-10.0);
        assert!(controls.distance() > closest);
    }

    #[test]
    fn test_dolly_respects_limits() {
        let mut controls = OrbitControls::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::ZERO,
            OrbitSettings {
                min_distance: 5.0,
                max_distance: 20.0,
                ..OrbitSettings::default()
            },
        );
        controls.dolly(100.0);
        assert_eq!(controls.distance(), 5.0);
        controls.dolly(-100.0);
        assert_eq!(controls.distance(), 20.0);
    }

    #[test]
    fn test_pan_moves_target_and_eye_together() {
        let mut controls = default_controls();
        let offset_before = controls.eye() - controls.target();
        controls.pan(Vec2::new(100.0, 0.0), 720.0, 75.0_f32.to_radians());
        // Dragging right drags the scene right, so the target moves left.
        assert!(controls.target().x < 0.0);
        assert!(controls.target().y.abs() < 1e-5);
        assert_vec_near(controls.eye() - controls.target(), offset_before);
    }

    #[test]
    fn test_update_from_mouse() {
        let mut controls = default_controls();
        let mut mouse = MouseState::new();
        mouse.on_cursor_moved(100.0, 100.0);
        assert!(!controls.update(&mouse, 720.0, 1.3));

        mouse.on_button(MouseButton::Left, ElementState::Pressed);
        mouse.on_cursor_moved(140.0, 100.0);
        assert!(controls.update(&mouse, 720.0, 1.3));
        assert!(controls.eye().x < 0.0);

        mouse.clear_transients();
        mouse.on_scroll(MouseScrollDelta::LineDelta(0.0, 2.0));
        assert!(controls.update(&mouse, 720.0, 1.3));
        assert!(controls.distance() < 10.0);
    }
}
