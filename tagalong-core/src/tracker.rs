//! Screen-space tracking: keep an overlay label glued to a moving 3D node.
//!
//! Each frame the tracker takes the node's world transform, displaces it by an
//! [`OffsetSpec`], projects it through the camera and hands the pixel anchor to
//! an [`OverlaySink`]. Nothing is cached between frames.

use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector3};

use crate::projection::{project_ndc, Camera, MIN_CLIP_W};
use crate::transform::WorldTransform;
use crate::viewport::{ScreenAnchor, ViewportMetrics};

/// Anything that can be moved to a pixel position: a DOM element, a terminal cell, a recorder.
pub trait OverlaySink {
    fn place(&mut self, anchor: ScreenAnchor);
}

impl<T: OverlaySink + ?Sized> OverlaySink for &mut T {
    fn place(&mut self, anchor: ScreenAnchor) {
        (**self).place(anchor);
    }
}

/// Write the anchor onto the overlay. The only visible side effect of tracking.
pub fn update_overlay<O: OverlaySink + ?Sized>(anchor: ScreenAnchor, overlay: &mut O) {
    overlay.place(anchor);
}

/// Displacement from the camera toward the target, swung around `up_axis`
/// and pinned to `height_override` along that axis.
///
/// With `rotation_angle = -90deg` and a vertical up axis this lands beside the
/// target as seen from the camera, and stays there while the camera orbits.
/// Coincident target and camera (or a zero up axis) give the zero vector.
pub fn compute_offset(
    target_world_position: &Point3<f32>,
    camera_position: &Point3<f32>,
    up_axis: &Vector3<f32>,
    rotation_angle: f32,
    distance: f32,
    height_override: f32,
) -> Vector3<f32> {
    let Some(direction) = (target_world_position - camera_position).try_normalize(f32::EPSILON) else {
        return Vector3::zeros();
    };
    let Some(axis) = Unit::try_new(*up_axis, f32::EPSILON) else {
        return Vector3::zeros();
    };

    let swung = UnitQuaternion::from_axis_angle(&axis, rotation_angle) * direction * distance;
    let up = axis.into_inner();
    swung - up * swung.dot(&up) + up * height_override
}

/// Map a world point to page pixels on a surface of the given size and offset.
///
/// `None` when the point is behind or on the camera plane (clip `w` not
/// positive) or the result is not finite; callers skip the overlay update for
/// that frame.
pub fn project_to_screen(
    world_position: &Point3<f32>,
    view_projection: &Matrix4<f32>,
    viewport_width: f32,
    viewport_height: f32,
    viewport_offset_x: f32,
    viewport_offset_y: f32,
) -> Option<ScreenAnchor> {
    let clip_w = (view_projection * world_position.to_homogeneous()).w;
    if !(clip_w > MIN_CLIP_W) {
        return None;
    }
    let ndc = project_ndc(world_position, view_projection)?;

    let half_width = viewport_width / 2.0;
    let half_height = viewport_height / 2.0;
    let anchor = ScreenAnchor::new(
        viewport_offset_x + ndc.x * half_width + half_width,
        viewport_offset_y - ndc.y * half_height + half_height,
    );

    anchor.is_finite().then_some(anchor)
}

/// How the tracked point is displaced from the node's origin before projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OffsetSpec {
    /// Follow the node's origin.
    #[default]
    None,
    /// Constant world-space displacement.
    Fixed(Vector3<f32>),
    /// Recomputed every frame with [`compute_offset`].
    Beside {
        up_axis: Vector3<f32>,
        rotation_angle: f32,
        distance: f32,
        height: f32,
    },
}

impl OffsetSpec {
    /// Left of the node, as the label variants of the scene place it: -90deg about +Y.
    pub fn beside(distance: f32, height: f32) -> Self {
        OffsetSpec::Beside {
            up_axis: Vector3::y(),
            rotation_angle: -std::f32::consts::FRAC_PI_2,
            distance,
            height,
        }
    }

    pub fn resolve(&self, target: &Point3<f32>, camera: &Camera) -> Vector3<f32> {
        match *self {
            OffsetSpec::None => Vector3::zeros(),
            OffsetSpec::Fixed(offset) => offset,
            OffsetSpec::Beside {
                up_axis,
                rotation_angle,
                distance,
                height,
            } => compute_offset(target, &camera.position, &up_axis, rotation_angle, distance, height),
        }
    }
}

/// Per-frame label tracker.
#[derive(Debug, Clone, Default)]
pub struct ScreenSpaceTracker {
    pub offset: OffsetSpec,
}

impl ScreenSpaceTracker {
    pub fn new(offset: OffsetSpec) -> Self {
        Self { offset }
    }

    /// Pixel anchor for `target` this frame, before it is written anywhere.
    pub fn locate(
        &self,
        target: &WorldTransform,
        camera: &Camera,
        viewport: &ViewportMetrics,
    ) -> Option<ScreenAnchor> {
        let origin = target.translation();
        let point = origin + self.offset.resolve(&origin, camera);
        project_to_screen(
            &point,
            &camera.view_projection(),
            viewport.width,
            viewport.height,
            viewport.offset_x,
            viewport.offset_y,
        )
    }

    /// Locate and write to the overlay. A missing target or a degenerate
    /// projection leaves the overlay untouched and returns `None`.
    pub fn track<O: OverlaySink + ?Sized>(
        &self,
        target: Option<&WorldTransform>,
        camera: &Camera,
        viewport: &ViewportMetrics,
        overlay: &mut O,
    ) -> Option<ScreenAnchor> {
        let anchor = self.locate(target?, camera, viewport)?;
        update_overlay(anchor, overlay);
        Some(anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<ScreenAnchor>);

    impl OverlaySink for Recorder {
        fn place(&mut self, anchor: ScreenAnchor) {
            self.0.push(anchor);
        }
    }

    fn camera_at(x: f32, y: f32, z: f32) -> Camera {
        Camera::new(800, 600).looking_at(Point3::new(x, y, z), Point3::origin())
    }

    fn assert_close(anchor: ScreenAnchor, x: f32, y: f32) {
        assert!(
            (anchor.x - x).abs() < 1e-3 && (anchor.y - y).abs() < 1e-3,
            "expected ({x}, {y}), got ({}, {})",
            anchor.x,
            anchor.y
        );
    }

    #[test]
    fn test_point_on_principal_axis_hits_center() {
        let camera = Camera::new(800, 600).looking_at(Point3::origin(), Point3::new(0.0, 0.0, -1.0));
        let anchor = project_to_screen(
            &Point3::new(0.0, 0.0, -7.5),
            &camera.view_projection(),
            800.0,
            600.0,
            0.0,
            0.0,
        )
        .unwrap();
        assert_close(anchor, 400.0, 300.0);
    }

    #[test]
    fn test_origin_from_ten_units_back() {
        let camera = camera_at(0.0, 0.0, 10.0);
        let vp = camera.view_projection();
        let anchor = project_to_screen(&Point3::origin(), &vp, 800.0, 600.0, 0.0, 0.0).unwrap();
        assert_close(anchor, 400.0, 300.0);

        let shifted = project_to_screen(&Point3::origin(), &vp, 800.0, 600.0, 50.0, 20.0).unwrap();
        assert_close(shifted, 450.0, 320.0);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let camera = camera_at(33.0, 10.0, 10.0);
        let vp = camera.view_projection();
        let point = Point3::new(4.0, 0.5, -3.0);
        let first = project_to_screen(&point, &vp, 1280.0, 720.0, 8.0, 8.0);
        let second = project_to_screen(&point, &vp, 1280.0, 720.0, 8.0, 8.0);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_doubling_viewport_doubles_offset_from_center() {
        let camera = camera_at(0.0, 2.0, 10.0);
        let vp = camera.view_projection();
        let point = Point3::new(1.5, 0.75, 0.0);

        let small = project_to_screen(&point, &vp, 400.0, 300.0, 0.0, 0.0).unwrap();
        let large = project_to_screen(&point, &vp, 800.0, 600.0, 0.0, 0.0).unwrap();

        let (dx_small, dy_small) = (small.x - 200.0, small.y - 150.0);
        let (dx_large, dy_large) = (large.x - 400.0, large.y - 300.0);
        assert!(dx_small.abs() > 1.0);
        assert!((dx_large - 2.0 * dx_small).abs() < 1e-3);
        assert!((dy_large - 2.0 * dy_small).abs() < 1e-3);
    }

    #[test]
    fn test_screen_y_grows_downward() {
        let camera = camera_at(0.0, 0.0, 10.0);
        let above = project_to_screen(&Point3::new(0.0, 1.0, 0.0), &camera.view_projection(), 800.0, 600.0, 0.0, 0.0)
            .unwrap();
        assert!(above.y < 300.0);
    }

    #[test]
    fn test_camera_plane_projection_is_suppressed() {
        let camera = camera_at(0.0, 0.0, 10.0);
        let result = project_to_screen(&Point3::new(2.0, 0.0, 10.0), &camera.view_projection(), 800.0, 600.0, 0.0, 0.0);
        assert!(result.is_none());
    }

    #[test]
    fn test_point_behind_camera_is_suppressed() {
        // Camera dollied in close while the prop is on the far side of it
        let camera = Camera::new(800, 600).looking_at(Point3::new(5.0, 3.0, 0.0), Point3::origin());
        let vp = camera.view_projection();
        let behind = project_to_screen(&Point3::new(20.0, 0.0, 0.0), &vp, 800.0, 600.0, 0.0, 0.0);
        assert!(behind.is_none());

        let in_front = project_to_screen(&Point3::new(-5.0, 0.0, 0.0), &vp, 800.0, 600.0, 0.0, 0.0);
        assert!(in_front.is_some());
    }

    #[test]
    fn test_track_leaves_overlay_when_target_behind_camera() {
        let tracker = ScreenSpaceTracker::default();
        let mut overlay = Recorder::default();
        let camera = Camera::new(800, 600).looking_at(Point3::new(0.0, 0.0, -5.0), Point3::new(0.0, 0.0, -10.0));

        let anchor = tracker.track(
            Some(&WorldTransform::identity()),
            &camera,
            &ViewportMetrics::new(800.0, 600.0),
            &mut overlay,
        );

        assert!(anchor.is_none());
        assert!(overlay.0.is_empty());
    }

    #[test]
    fn test_offset_is_perpendicular_and_pinned() {
        let up = Vector3::y();
        let angle = -std::f32::consts::FRAC_PI_2;
        for (target_y, camera_y) in [(0.0, 0.0), (1.0, 5.0), (-3.0, 12.0)] {
            let target = Point3::new(0.0, target_y, 0.0);
            let camera = Point3::new(0.0, camera_y, 10.0);
            let offset = compute_offset(&target, &camera, &up, angle, 2.0, 1.5);

            assert_eq!(offset.y, 1.5);
            let horizontal_view = Vector3::new(target.x - camera.x, 0.0, target.z - camera.z);
            let horizontal_offset = Vector3::new(offset.x, 0.0, offset.z);
            assert!(horizontal_offset.norm() > 1e-3);
            assert!(horizontal_offset.dot(&horizontal_view).abs() < 1e-4);
        }
    }

    #[test]
    fn test_offset_side_follows_camera() {
        // Looking down -Z, a -90deg swing about +Y points to +X.
        let offset = compute_offset(
            &Point3::origin(),
            &Point3::new(0.0, 0.0, 10.0),
            &Vector3::y(),
            -std::f32::consts::FRAC_PI_2,
            2.0,
            0.0,
        );
        assert!((offset.x - 2.0).abs() < 1e-5);
        assert!(offset.z.abs() < 1e-5);

        // Camera moved around to +X: the offset swings with it.
        let orbited = compute_offset(
            &Point3::origin(),
            &Point3::new(10.0, 0.0, 0.0),
            &Vector3::y(),
            -std::f32::consts::FRAC_PI_2,
            2.0,
            0.0,
        );
        assert!(orbited.x.abs() < 1e-5);
        assert!((orbited.z + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_offset_degenerate_is_zero() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let offset = compute_offset(&p, &p, &Vector3::y(), -1.0, 2.0, 1.5);
        assert_eq!(offset, Vector3::zeros());

        let offset = compute_offset(&p, &Point3::origin(), &Vector3::zeros(), -1.0, 2.0, 1.5);
        assert_eq!(offset, Vector3::zeros());
    }

    #[test]
    fn test_track_writes_overlay() {
        let tracker = ScreenSpaceTracker::default();
        let mut overlay = Recorder::default();
        let target = WorldTransform::identity();
        let viewport = ViewportMetrics::new(800.0, 600.0).with_offset(50.0, 20.0);

        let anchor = tracker.track(Some(&target), &camera_at(0.0, 0.0, 10.0), &viewport, &mut overlay);

        assert_close(anchor.unwrap(), 450.0, 320.0);
        assert_eq!(overlay.0.len(), 1);
    }

    #[test]
    fn test_track_without_target_leaves_overlay() {
        let tracker = ScreenSpaceTracker::new(OffsetSpec::beside(1.0, 1.5));
        let mut overlay = Recorder::default();
        let viewport = ViewportMetrics::new(800.0, 600.0);

        let anchor = tracker.track(None, &camera_at(0.0, 0.0, 10.0), &viewport, &mut overlay);

        assert!(anchor.is_none());
        assert!(overlay.0.is_empty());
    }

    #[test]
    fn test_fixed_offset_raises_label() {
        let tracker = ScreenSpaceTracker::new(OffsetSpec::Fixed(Vector3::new(0.0, 1.0, 0.0)));
        let viewport = ViewportMetrics::new(800.0, 600.0);
        let anchor = tracker
            .locate(&WorldTransform::identity(), &camera_at(0.0, 0.0, 10.0), &viewport)
            .unwrap();
        assert!((anchor.x - 400.0).abs() < 1e-3);
        assert!(anchor.y < 300.0);
    }
}
