//! Orbit camera controls with damping, pan and dolly
use nalgebra::{Point3, Vector3};

use crate::projection::Camera;

/// Motion smaller than this is treated as settled.
const SETTLE_EPS: f32 = 1e-6;
/// Camera displacement below this is not reported as movement.
const MOVE_EPS: f32 = 1e-4;
/// Keeps the polar angle off the poles so `look_at` stays well defined.
const POLE_EPS: f32 = 1e-6;

/// Position on a sphere around the orbit target. `theta` is the azimuth
/// around +Y measured from +Z, `phi` the polar angle from +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: &Vector3<f32>) -> Self {
        let radius = offset.norm();
        if radius < SETTLE_EPS {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi = self.phi.sin();
        Vector3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

/// Orbit controls: the camera circles `target`, input accumulates and
/// [`update`](Self::update) applies it once per frame.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    /// Fraction of pending motion applied per update when damping is on.
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,

    pending_theta: f32,
    pending_phi: f32,
    pending_pan: Vector3<f32>,
    pending_scale: f32,
}

impl OrbitControls {
    pub fn new(target: Point3<f32>) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            enable_pan: true,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: std::f32::consts::PI,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vector3::zeros(),
            pending_scale: 1.0,
        }
    }

    /// Swing the camera around the vertical axis (positive moves it to the left).
    pub fn rotate_left(&mut self, angle: f32) {
        self.pending_theta -= angle;
    }

    /// Tilt the camera toward the pole (positive raises it).
    pub fn rotate_up(&mut self, angle: f32) {
        self.pending_phi -= angle;
    }

    /// Pointer drag in pixels. A drag across the full surface height is one turn.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, surface_height: f32) {
        if surface_height <= 0.0 {
            return;
        }
        let turn = std::f32::consts::TAU * self.rotate_speed / surface_height;
        self.rotate_left(dx * turn);
        self.rotate_up(dy * turn);
    }

    /// Screen-space pan in pixels, scaled so the target follows the pointer.
    pub fn pan_by_pixels(&mut self, dx: f32, dy: f32, camera: &Camera, surface_height: f32) {
        if !self.enable_pan || surface_height <= 0.0 {
            return;
        }
        let forward = camera.direction();
        let Some(right) = forward.cross(&camera.up).try_normalize(SETTLE_EPS) else {
            return;
        };
        let screen_up = right.cross(&forward);

        // Height of the view at the target's depth, in world units
        let distance = (camera.position - self.target).norm();
        let world_per_pixel = 2.0 * distance * (camera.fov / 2.0).tan() / surface_height;

        self.pending_pan += (-right * dx + screen_up * dy) * world_per_pixel * self.pan_speed;
    }

    /// Move toward the target by `factor` (> 1 zooms in).
    pub fn dolly_in(&mut self, factor: f32) {
        if factor > 0.0 {
            self.pending_scale /= factor;
        }
    }

    pub fn dolly_out(&mut self, factor: f32) {
        if factor > 0.0 {
            self.pending_scale *= factor;
        }
    }

    /// One wheel notch; positive `steps` zoom out.
    pub fn zoom(&mut self, steps: f32) {
        let factor = 0.95f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.dolly_out(1.0 / factor);
        } else if steps < 0.0 {
            self.dolly_in(1.0 / factor);
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pending_theta.abs() < SETTLE_EPS
            && self.pending_phi.abs() < SETTLE_EPS
            && self.pending_pan.norm() < SETTLE_EPS
            && (self.pending_scale - 1.0).abs() < SETTLE_EPS
    }

    /// Apply pending input to the camera. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let mut spherical = Spherical::from_offset(&(camera.position - self.target));
        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        spherical.theta += self.pending_theta * step;
        spherical.phi += self.pending_phi * step;
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLE_EPS, std::f32::consts::PI - POLE_EPS);
        spherical.radius = (spherical.radius * self.pending_scale).clamp(self.min_distance, self.max_distance);

        self.target += self.pending_pan * step;

        let position = self.target + spherical.to_offset();
        let moved = (position - camera.position).norm() > MOVE_EPS
            || (self.target - camera.target).norm() > MOVE_EPS;
        camera.position = position;
        camera.target = self.target;

        if self.enable_damping {
            self.pending_theta *= 1.0 - self.damping_factor;
            self.pending_phi *= 1.0 - self.damping_factor;
            self.pending_pan *= 1.0 - self.damping_factor;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_pan = Vector3::zeros();
        }
        self.pending_scale = 1.0;

        moved
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn scene_camera() -> Camera {
        Camera::new(800, 600).looking_at(Point3::new(33.0, 10.0, 10.0), Point3::origin())
    }

    fn scene_controls() -> OrbitControls {
        OrbitControls {
            enable_damping: true,
            min_distance: 5.0,
            max_distance: 60.0,
            min_polar_angle: FRAC_PI_4,
            max_polar_angle: FRAC_PI_2 - 0.05,
            ..OrbitControls::default()
        }
    }

    #[test]
    fn test_idle_update_keeps_camera() {
        let mut camera = scene_camera();
        let before = camera.position;
        let mut controls = scene_controls();
        assert!(!controls.update(&mut camera));
        assert!((camera.position - before).norm() < 1e-4);
    }

    #[test]
    fn test_undamped_rotation_applies_at_once() {
        let mut camera = Camera::new(800, 600).looking_at(Point3::new(0.0, 0.0, 10.0), Point3::origin());
        let mut controls = OrbitControls::default();
        controls.rotate_left(-FRAC_PI_2);

        assert!(controls.update(&mut camera));
        assert!((camera.position - Point3::new(10.0, 0.0, 0.0)).norm() < 1e-4);
        assert!(controls.is_settled());
    }

    #[test]
    fn test_damping_eases_toward_input() {
        let mut camera = scene_camera();
        let mut controls = scene_controls();
        let start = Spherical::from_offset(&(camera.position - controls.target)).theta;
        controls.rotate_left(-0.5);

        controls.update(&mut camera);
        let first = Spherical::from_offset(&(camera.position - controls.target)).theta;
        assert!((first - start - 0.025).abs() < 1e-4);

        for _ in 0..400 {
            controls.update(&mut camera);
        }
        let settled = Spherical::from_offset(&(camera.position - controls.target)).theta;
        assert!((settled - start - 0.5).abs() < 2e-3);
    }

    #[test]
    fn test_polar_angle_is_clamped() {
        let mut camera = scene_camera();
        let mut controls = scene_controls();
        controls.enable_damping = false;

        // Far below the ground
        controls.rotate_up(-3.0);
        controls.update(&mut camera);
        let phi = Spherical::from_offset(&(camera.position - controls.target)).phi;
        assert!((phi - (FRAC_PI_2 - 0.05)).abs() < 1e-4);
        assert!(camera.position.y > 0.0);

        // Straight down from above
        controls.rotate_up(3.0);
        controls.update(&mut camera);
        let phi = Spherical::from_offset(&(camera.position - controls.target)).phi;
        assert!((phi - FRAC_PI_4).abs() < 1e-4);
    }

    #[test]
    fn test_distance_is_clamped() {
        let mut camera = scene_camera();
        let mut controls = scene_controls();

        controls.dolly_in(100.0);
        controls.update(&mut camera);
        assert!(((camera.position - camera.target).norm() - 5.0).abs() < 1e-3);

        controls.dolly_out(1000.0);
        controls.update(&mut camera);
        assert!(((camera.position - camera.target).norm() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_pan_moves_target_and_camera_together() {
        let mut camera = Camera::new(800, 600).looking_at(Point3::new(0.0, 0.0, 10.0), Point3::origin());
        let mut controls = OrbitControls::default();
        let before = camera.position - camera.target;

        controls.pan_by_pixels(-100.0, 0.0, &camera, 600.0);
        controls.update(&mut camera);

        // Dragging left pulls the scene left, so the target moves right
        assert!(camera.target.x > 0.0);
        assert!(((camera.position - camera.target) - before).norm() < 1e-4);
    }

    #[test]
    fn test_wheel_zoom_direction() {
        let mut camera = scene_camera();
        let mut controls = scene_controls();
        let start = (camera.position - camera.target).norm();

        controls.zoom(1.0);
        controls.update(&mut camera);
        let out = (camera.position - camera.target).norm();
        assert!(out > start);

        controls.zoom(-2.0);
        controls.update(&mut camera);
        assert!((camera.position - camera.target).norm() < out);
    }

    #[test]
    fn test_pan_disabled() {
        let camera = scene_camera();
        let mut controls = scene_controls();
        controls.enable_pan = false;
        controls.pan_by_pixels(40.0, 40.0, &camera, 600.0);
        assert!(controls.is_settled());
    }
}
