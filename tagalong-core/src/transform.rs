//! World transforms of tracked scene nodes
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

/// Placement of a node in world space: translation, rotation and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl WorldTransform {
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            ..Self::identity()
        }
    }

    /// Decompose a column-major 4x4 world matrix, as engines store it.
    ///
    /// Shear is discarded. A zero scale on any axis yields an identity rotation.
    pub fn from_column_slice(elements: &[f32; 16]) -> Self {
        let matrix = Matrix4::from_column_slice(elements);
        let position = Point3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);

        let basis = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let scale = Vector3::new(
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        );

        let rotation = if scale.iter().all(|s| *s > f32::EPSILON) {
            let mut unscaled = basis;
            for (i, s) in scale.iter().enumerate() {
                unscaled.set_column(i, &(basis.column(i) / *s));
            }
            UnitQuaternion::from_matrix(&unscaled)
        } else {
            UnitQuaternion::identity()
        };

        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Translation-rotation-scale matrix (scale applied first).
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position.coords)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// World-space origin of the node, the point a label follows.
    pub fn translation(&self) -> Point3<f32> {
        self.position
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        let transform = WorldTransform::identity();
        assert!((transform.matrix() - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_translation_lands_in_last_column() {
        let transform = WorldTransform::from_position(1.0, 2.0, 3.0);
        let m = transform.matrix();
        assert!((m[(0, 3)] - 1.0).abs() < 1e-6);
        assert!((m[(1, 3)] - 2.0).abs() < 1e-6);
        assert!((m[(2, 3)] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_decompose_column_major_matrix() {
        let original = WorldTransform::from_position(4.0, 0.5, -2.0)
            .with_rotation(UnitQuaternion::from_euler_angles(0.0, 0.8, 0.0))
            .with_scale(Vector3::new(2.0, 2.0, 2.0));

        let mut elements = [0.0f32; 16];
        elements.copy_from_slice(original.matrix().as_slice());
        let decoded = WorldTransform::from_column_slice(&elements);

        assert!((decoded.position - original.position).norm() < 1e-5);
        assert!((decoded.scale - original.scale).norm() < 1e-5);
        assert!(decoded.rotation.angle_to(&original.rotation) < 1e-4);
    }

    #[test]
    fn test_zero_scale_keeps_position() {
        let mut elements = [0.0f32; 16];
        elements[12] = 7.0;
        elements[15] = 1.0;
        let decoded = WorldTransform::from_column_slice(&elements);
        assert_eq!(decoded.translation(), Point3::new(7.0, 0.0, 0.0));
        assert_eq!(decoded.rotation, UnitQuaternion::identity());
    }
}
