//! Time-driven prop motion
use nalgebra::Point3;

use crate::transform::WorldTransform;

/// Circular path around the world origin in the ground plane, driven by wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularMotion {
    pub radius: f32,
    /// Radians per unit of scaled time.
    pub angular_speed: f32,
    /// Milliseconds to scaled time.
    pub time_scale: f64,
    /// Height of the path above the ground plane.
    pub height: f32,
}

impl CircularMotion {
    pub fn new(radius: f32, angular_speed: f32) -> Self {
        Self {
            radius,
            angular_speed,
            time_scale: 0.0005,
            height: 0.0,
        }
    }

    /// Position along the path at `now_ms`. Starts on +Z and heads toward +X.
    pub fn position_at(&self, now_ms: f64) -> Point3<f32> {
        // Reduce in f64 first: epoch milliseconds lose all precision in f32
        let phase = (now_ms * self.time_scale * f64::from(self.angular_speed)) % std::f64::consts::TAU;
        let phase = phase as f32;
        Point3::new(phase.sin() * self.radius, self.height, phase.cos() * self.radius)
    }

    /// Move `transform` onto the path, leaving rotation and scale alone.
    pub fn apply(&self, transform: &mut WorldTransform, now_ms: f64) {
        transform.position = self.position_at(now_ms);
    }
}

impl Default for CircularMotion {
    fn default() -> Self {
        Self::new(20.0, 0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_positive_z() {
        let motion = CircularMotion::default();
        let start = motion.position_at(0.0);
        assert!(start.x.abs() < 1e-6);
        assert!((start.z - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_stays_on_circle() {
        let motion = CircularMotion::default();
        for now_ms in [1.0e3, 5.5e4, 1.7e12] {
            let p = motion.position_at(now_ms);
            assert!(((p.x * p.x + p.z * p.z).sqrt() - 20.0).abs() < 1e-3);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn test_quarter_turn() {
        let motion = CircularMotion::default();
        // sin(t * 0.0005 * 0.7) hits 1 at t = (pi / 2) / 0.00035 ms
        let quarter = std::f64::consts::FRAC_PI_2 / (0.0005 * 0.7);
        let p = motion.position_at(quarter);
        assert!((p.x - 20.0).abs() < 1e-3);
        assert!(p.z.abs() < 1e-3);
    }

    #[test]
    fn test_apply_keeps_scale() {
        let motion = CircularMotion::default();
        let mut transform = WorldTransform::identity().with_scale(nalgebra::Vector3::new(2.0, 2.0, 2.0));
        motion.apply(&mut transform, 0.0);
        assert_eq!(transform.scale.x, 2.0);
        assert!((transform.position.z - 20.0).abs() < 1e-6);
    }
}
