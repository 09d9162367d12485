//! Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::viewport::ViewportMetrics;

/// Below this magnitude the homogeneous divide is treated as degenerate.
pub const MIN_CLIP_W: f32 = 1e-6;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera state for the current frame. Orbit controls mutate it before tracking runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 100.0,
            mode: ProjectionMode::Perspective,
        }
    }

    pub fn looking_at(mut self, position: Point3<f32>, target: Point3<f32>) -> Self {
        self.position = position;
        self.target = target;
        self
    }

    /// Resize handler: keep the projection's aspect in step with the surface.
    pub fn set_viewport(&mut self, viewport: &ViewportMetrics) {
        if !viewport.is_empty() {
            self.aspect = viewport.aspect();
        }
    }

    /// Unit vector from the camera toward its target, or zero if they coincide.
    pub fn direction(&self) -> Vector3<f32> {
        (self.target - self.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Combined world-to-clip transform for this frame.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a vertex of a model into surface pixels, keeping NDC depth.
    ///
    /// Returns `None` for vertices behind the camera or outside the near/far
    /// range, which the rasterizer treats as clipped. Points off the sides of
    /// the surface are kept; the rasterizer clips those per pixel.
    pub fn project_vertex(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        viewport: &ViewportMetrics,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.view_projection() * model_matrix;
        let ndc = project_ndc(point, &mvp)?;

        // Depth clip test
        if ndc.z.abs() > 1.0 {
            return None;
        }

        let half_width = viewport.width / 2.0;
        let half_height = viewport.height / 2.0;
        Some((
            viewport.offset_x + ndc.x * half_width + half_width,
            viewport.offset_y - ndc.y * half_height + half_height,
            ndc.z,
        ))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Transform a world point to normalized device coordinates, divide included.
///
/// `None` when the point sits on the camera plane (w ~ 0) or the result is not finite.
pub fn project_ndc(point: &Point3<f32>, view_projection: &Matrix4<f32>) -> Option<Point3<f32>> {
    let clip = view_projection * Vector4::new(point.x, point.y, point.z, 1.0);

    // Prevent division by near-zero w
    if clip.w.is_nan() || clip.w.abs() < MIN_CLIP_W {
        return None;
    }

    let ndc = Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w);
    ndc.coords.iter().all(|c| c.is_finite()).then_some(ndc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode, ProjectionMode::Perspective);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_view_matrix() {
        let camera = Camera::new(800, 600);
        let view = camera.view_matrix();
        // View matrix should be non-zero
        assert!(view.norm() > 0.0);
    }

    #[test]
    fn test_target_projects_to_ndc_origin() {
        let camera = Camera::default().looking_at(Point3::new(3.0, 4.0, 5.0), Point3::new(1.0, 0.5, -1.0));
        let ndc = project_ndc(&camera.target, &camera.view_projection()).unwrap();
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
    }

    #[test]
    fn test_point_on_camera_plane_is_rejected() {
        let camera = Camera::default().looking_at(Point3::new(0.0, 0.0, 10.0), Point3::origin());
        // Same depth as the eye: w == 0 after the perspective transform
        let beside_eye = Point3::new(3.0, 0.0, 10.0);
        assert!(project_ndc(&beside_eye, &camera.view_projection()).is_none());
    }

    #[test]
    fn test_orthographic_keeps_center() {
        let mut camera = Camera::default().looking_at(Point3::new(0.0, 0.0, 10.0), Point3::origin());
        camera.mode = ProjectionMode::Orthographic;
        let ndc = project_ndc(&Point3::origin(), &camera.view_projection()).unwrap();
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
    }

    #[test]
    fn test_project_vertex_keeps_offscreen_points() {
        let camera = Camera::new(800, 600).looking_at(Point3::new(0.0, 0.0, 10.0), Point3::origin());
        let viewport = ViewportMetrics::new(800.0, 600.0);
        let model = Matrix4::identity();

        let (x, _, _) = camera.project_vertex(&Point3::new(50.0, 0.0, 0.0), &model, &viewport).unwrap();
        assert!(x > 800.0);
        assert!(camera.project_vertex(&Point3::new(0.0, 0.0, 20.0), &model, &viewport).is_none());
    }

    #[test]
    fn test_set_viewport_ignores_collapsed_surface() {
        let mut camera = Camera::new(800, 600);
        camera.set_viewport(&ViewportMetrics::new(0.0, 0.0));
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        camera.set_viewport(&ViewportMetrics::new(1000.0, 500.0));
        assert!((camera.aspect - 2.0).abs() < 1e-6);
    }
}
