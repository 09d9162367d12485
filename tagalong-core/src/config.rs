//! Scene configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) reproduces the
//! stock scene: a camera up and to the side of a prop that circles the origin,
//! with damped orbit controls that can't dip below the ground.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::path::Path;

use nalgebra::{Point3, Vector3};
use serde::Deserialize;

use crate::controls::OrbitControls;
use crate::error::ConfigError;
use crate::motion::CircularMotion;
use crate::projection::{Camera, ProjectionMode};
use crate::tracker::OffsetSpec;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub motion: MotionConfig,
    pub label: LabelConfig,
    pub prop: PropConfig,
    /// Frame rate the terminal front end aims for.
    pub target_fps: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            motion: MotionConfig::default(),
            label: LabelConfig::default(),
            prop: PropConfig::default(),
            target_fps: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub orthographic: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            position: [33.0, 10.0, 10.0],
            target: [0.0, 0.0, 0.0],
            orthographic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians from straight up.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            enable_pan: true,
            min_distance: 5.0,
            max_distance: 60.0,
            min_polar_angle: FRAC_PI_4,       // no top-down view
            max_polar_angle: FRAC_PI_2 - 0.05, // never below the ground
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConfig {
    pub radius: f32,
    pub angular_speed: f32,
    pub time_scale: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            radius: 20.0,
            angular_speed: 0.7,
            time_scale: 0.0005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropConfig {
    pub radius: f32,
    pub height: f32,
}

impl Default for PropConfig {
    fn default() -> Self {
        Self {
            radius: 0.25,
            height: 1.0,
        }
    }
}

/// Where the label sits relative to the prop.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LabelConfig {
    /// On the prop's origin.
    #[default]
    Origin,
    /// A constant world-space displacement.
    Fixed { offset: [f32; 3] },
    /// Beside the prop as seen from the camera.
    Beside {
        #[serde(default = "default_up_axis")]
        up_axis: [f32; 3],
        #[serde(default = "default_rotation_degrees")]
        rotation_degrees: f32,
        distance: f32,
        height: f32,
    },
}

fn default_up_axis() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_rotation_degrees() -> f32 {
    -90.0
}

impl SceneConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&input)?;
        tracing::info!(path = %path.display(), "loaded scene config");
        Ok(config)
    }

    /// Reject values that would make the controls or the projection degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(invalid("camera.fov_degrees", "must be between 0 and 180"));
        }
        if !(camera.near > 0.0 && camera.far > camera.near && camera.far.is_finite()) {
            return Err(invalid("camera.near", "need 0 < near < far, both finite"));
        }

        let controls = &self.controls;
        if !(controls.min_distance >= 0.0 && controls.max_distance >= controls.min_distance) {
            return Err(invalid("controls.min_distance", "need 0 <= min_distance <= max_distance"));
        }
        if !(controls.min_polar_angle >= 0.0
            && controls.max_polar_angle <= std::f32::consts::PI
            && controls.min_polar_angle <= controls.max_polar_angle)
        {
            return Err(invalid("controls.min_polar_angle", "need 0 <= min <= max <= pi"));
        }
        if !(controls.damping_factor > 0.0 && controls.damping_factor <= 1.0) {
            return Err(invalid("controls.damping_factor", "must be in (0, 1]"));
        }
        positive("controls.rotate_speed", controls.rotate_speed)?;
        positive("controls.pan_speed", controls.pan_speed)?;
        positive("controls.zoom_speed", controls.zoom_speed)?;

        for (field, value) in [
            ("camera.position", camera.position),
            ("camera.target", camera.target),
        ] {
            if !value.iter().all(|v| v.is_finite()) {
                return Err(invalid(field, "must be finite"));
            }
        }

        let motion = &self.motion;
        if !(motion.radius.is_finite() && motion.radius >= 0.0) {
            return Err(invalid("motion.radius", "must be finite and not negative"));
        }
        if !motion.angular_speed.is_finite() {
            return Err(invalid("motion.angular_speed", "must be finite"));
        }
        if !(motion.time_scale.is_finite() && motion.time_scale > 0.0) {
            return Err(invalid("motion.time_scale", "must be finite and positive"));
        }

        positive("prop.radius", self.prop.radius)?;
        positive("prop.height", self.prop.height)?;

        if let LabelConfig::Fixed { offset } = &self.label {
            if !offset.iter().all(|v| v.is_finite()) {
                return Err(invalid("label.offset", "must be finite"));
            }
        }
        if let LabelConfig::Beside {
            up_axis,
            rotation_degrees,
            distance,
            height,
        } = &self.label
        {
            let finite = up_axis.iter().chain([rotation_degrees, distance, height]).all(|v| v.is_finite());
            if !finite {
                return Err(invalid("label", "beside parameters must be finite"));
            }
        }

        if self.target_fps == 0 {
            return Err(invalid("target_fps", "must be positive"));
        }
        Ok(())
    }

    pub fn camera(&self, width: u32, height: u32) -> Camera {
        let c = &self.camera;
        let mut camera = Camera::new(width, height).looking_at(Point3::from(c.position), Point3::from(c.target));
        camera.fov = c.fov_degrees.to_radians();
        camera.near = c.near;
        camera.far = c.far;
        if c.orthographic {
            camera.mode = ProjectionMode::Orthographic;
        }
        camera
    }

    pub fn controls(&self) -> OrbitControls {
        let c = &self.controls;
        let mut controls = OrbitControls::new(Point3::from(self.camera.target));
        controls.enable_damping = c.enable_damping;
        controls.damping_factor = c.damping_factor;
        controls.enable_pan = c.enable_pan;
        controls.min_distance = c.min_distance;
        controls.max_distance = c.max_distance;
        controls.min_polar_angle = c.min_polar_angle;
        controls.max_polar_angle = c.max_polar_angle;
        controls.rotate_speed = c.rotate_speed;
        controls.pan_speed = c.pan_speed;
        controls.zoom_speed = c.zoom_speed;
        controls
    }

    pub fn motion(&self) -> CircularMotion {
        CircularMotion {
            time_scale: self.motion.time_scale,
            ..CircularMotion::new(self.motion.radius, self.motion.angular_speed)
        }
    }

    pub fn label_offset(&self) -> OffsetSpec {
        match &self.label {
            LabelConfig::Origin => OffsetSpec::None,
            LabelConfig::Fixed { offset } => OffsetSpec::Fixed(Vector3::from(*offset)),
            LabelConfig::Beside {
                up_axis,
                rotation_degrees,
                distance,
                height,
            } => OffsetSpec::Beside {
                up_axis: Vector3::from(*up_axis),
                rotation_angle: rotation_degrees.to_radians(),
                distance: *distance,
                height: *height,
            },
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be finite and positive"))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_stock_scene() {
        let config = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(config, SceneConfig::default());

        let camera = config.camera(800, 600);
        assert_eq!(camera.position, Point3::new(33.0, 10.0, 10.0));
        assert!((camera.fov - 45f32.to_radians()).abs() < 1e-6);

        let controls = config.controls();
        assert!(controls.enable_damping);
        assert_eq!(controls.max_distance, 60.0);
        assert_eq!(config.label_offset(), OffsetSpec::None);
    }

    #[test]
    fn test_partial_sections() {
        let config = SceneConfig::from_toml_str(
            r#"
            target_fps = 60

            [camera]
            fov_degrees = 60.0

            [label]
            mode = "beside"
            distance = 1.5
            height = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.target_fps, 60);
        assert_eq!(config.camera.far, 1000.0);
        match config.label_offset() {
            OffsetSpec::Beside {
                up_axis,
                rotation_angle,
                distance,
                height,
            } => {
                assert_eq!(up_axis, Vector3::y());
                assert!((rotation_angle + FRAC_PI_2).abs() < 1e-6);
                assert_eq!(distance, 1.5);
                assert_eq!(height, 2.0);
            }
            other => panic!("unexpected offset {other:?}"),
        }
    }

    #[test]
    fn test_fixed_label() {
        let config = SceneConfig::from_toml_str("[label]\nmode = \"fixed\"\noffset = [0.0, 1.5, 0.0]\n").unwrap();
        assert_eq!(config.label_offset(), OffsetSpec::Fixed(Vector3::new(0.0, 1.5, 0.0)));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = SceneConfig::from_toml_str("[camera]\nzoom = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let err = SceneConfig::from_toml_str("[controls]\nmin_distance = 10.0\nmax_distance = 2.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "controls.min_distance", .. }));

        let err = SceneConfig::from_toml_str("[camera]\nnear = 5.0\nfar = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let err = SceneConfig::from_toml_str("[controls]\nrotate_speed = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "controls.rotate_speed", .. }));

        let err = SceneConfig::from_toml_str("[motion]\nradius = inf\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "motion.radius", .. }));

        let err = SceneConfig::from_toml_str("[prop]\nheight = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "prop.height", .. }));

        let err = SceneConfig::from_toml_str("[camera]\nposition = [nan, 10.0, 10.0]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "camera.position", .. }));

        let err =
            SceneConfig::from_toml_str("[label]\nmode = \"beside\"\ndistance = inf\nheight = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "label", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[motion]\nradius = 12.0").unwrap();

        let config = SceneConfig::load(file.path()).unwrap();
        assert_eq!(config.motion().radius, 12.0);
        assert_eq!(config.motion().angular_speed, 0.7);
    }

    #[test]
    fn test_missing_file() {
        let err = SceneConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
