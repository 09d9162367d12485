//! Tagalong core library: keeps a 2D overlay label glued to a moving 3D object.
//!
//! Everything here is engine independent. A front end supplies the drawing
//! ([`Stage`]), the overlay element ([`OverlaySink`]) and the next-frame hook
//! ([`Scheduler`]); the core owns the camera, the orbit controls, the prop's
//! motion and the screen-space tracking that ties them together.

pub mod asset;
pub mod config;
pub mod controls;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod motion;
pub mod projection;
pub mod stl;
pub mod tracker;
pub mod transform;
pub mod viewport;

// Re-export commonly used types
pub use asset::{AssetResolver, AssetSlot, AssetState};
pub use config::SceneConfig;
pub use controls::OrbitControls;
pub use error::{ConfigError, Error, ModelError, Result};
pub use frame::{FrameClock, FrameLoop, FrameReport, FrameView, Scene, Scheduler, SkipReason, Stage, Tracking};
pub use geometry::{Mesh, Triangle, Vertex};
pub use motion::CircularMotion;
pub use projection::{Camera, ProjectionMode};
pub use tracker::{compute_offset, project_to_screen, update_overlay, OffsetSpec, OverlaySink, ScreenSpaceTracker};
pub use transform::WorldTransform;
pub use viewport::{ScreenAnchor, ViewportMetrics};
