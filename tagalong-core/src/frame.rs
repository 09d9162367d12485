//! Per-frame orchestration.
//!
//! [`FrameLoop::tick`] runs one complete pass over a [`Scene`] and then asks the
//! [`Scheduler`] for exactly one more. Within a pass the order is fixed:
//!
//! 1. move the prop along its path
//! 2. apply orbit-control input to the camera
//! 3. let the stage refresh world transforms
//! 4. track the prop and write the overlay
//! 5. advance prop animation
//! 6. draw
//! 7. schedule the next frame
//!
//! Tracking reads the transforms from step 3, and the draw sees the same anchor
//! the overlay received, so label and model never disagree about which frame
//! they belong to.

use crate::asset::{AssetSlot, AssetState};
use crate::controls::OrbitControls;
use crate::error::Result;
use crate::motion::CircularMotion;
use crate::projection::Camera;
use crate::tracker::{OverlaySink, ScreenSpaceTracker};
use crate::transform::WorldTransform;
use crate::viewport::{ScreenAnchor, ViewportMetrics};

/// Longest simulated step, in seconds. Longer gaps (a backgrounded tab) are cut short.
pub const MAX_FRAME_STEP: f32 = 0.25;

/// The drawing side of a scene: everything the core leaves to a rendering engine.
pub trait Stage {
    /// Whatever the asset loader produces for the tracked prop.
    type Prop;

    /// Size and page offset of the render surface. Called once per frame.
    fn viewport(&self) -> ViewportMetrics;

    /// Bring the prop's world transform up to date. The default takes the
    /// transform the core computed as final.
    fn update_transforms(&mut self, _prop: &mut Self::Prop, _transform: &mut WorldTransform) -> Result<()> {
        Ok(())
    }

    /// Advance animation playback on the loaded prop.
    fn animate(&mut self, _prop: &mut Self::Prop, _dt: f32) {}

    fn draw(&mut self, frame: &FrameView<'_, Self::Prop>) -> Result<()>;
}

/// Requests the next invocation of the frame loop.
pub trait Scheduler {
    fn schedule_next(&mut self) -> Result<()>;
}

/// Everything the frame loop reads and writes, passed in explicitly each frame.
#[derive(Debug)]
pub struct Scene<P> {
    pub camera: Camera,
    pub controls: OrbitControls,
    /// `None` when something else (the host engine) moves the prop.
    pub motion: Option<CircularMotion>,
    pub tracker: ScreenSpaceTracker,
    pub prop: AssetSlot<P>,
    pub prop_transform: WorldTransform,
}

impl<P> Scene<P> {
    pub fn new(camera: Camera, controls: OrbitControls, prop: AssetSlot<P>) -> Self {
        Self {
            camera,
            controls,
            motion: None,
            tracker: ScreenSpaceTracker::default(),
            prop,
            prop_transform: WorldTransform::identity(),
        }
    }

    pub fn with_motion(mut self, motion: CircularMotion) -> Self {
        self.motion = Some(motion);
        self
    }

    pub fn with_tracker(mut self, tracker: ScreenSpaceTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Resize notification: match the projection to the new surface.
    pub fn resize(&mut self, viewport: &ViewportMetrics) {
        self.camera.set_viewport(viewport);
    }
}

/// Read-only view of a frame handed to [`Stage::draw`].
#[derive(Debug)]
pub struct FrameView<'a, P> {
    pub frame: u64,
    pub dt: f32,
    pub camera: &'a Camera,
    pub viewport: ViewportMetrics,
    /// `None` while the prop is still loading.
    pub prop: Option<&'a P>,
    pub prop_transform: &'a WorldTransform,
    pub tracking: Tracking,
}

/// Why the overlay was left where it was this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The prop has not finished loading.
    TargetPending,
    /// The prop failed to load; it will never be tracked.
    TargetFailed,
    /// The render surface has no area.
    EmptyViewport,
    /// The tracked point is behind or on the camera plane.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tracking {
    Placed(ScreenAnchor),
    Skipped(SkipReason),
}

impl Tracking {
    pub fn anchor(&self) -> Option<ScreenAnchor> {
        match self {
            Tracking::Placed(anchor) => Some(*anchor),
            Tracking::Skipped(_) => None,
        }
    }
}

/// What happened on one pass of the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub dt: f32,
    pub camera_moved: bool,
    pub tracking: Tracking,
}

/// Turns host timestamps (milliseconds) into per-frame deltas (seconds).
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick: zero on the first tick, never
    /// negative, at most [`MAX_FRAME_STEP`].
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_STEP)
        } else {
            0.0
        }
    }
}

/// Drives a [`Scene`] one frame at a time.
#[derive(Debug, Default)]
pub struct FrameLoop {
    clock: FrameClock,
    frame: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Run one full update-and-draw pass, then request exactly one more.
    ///
    /// A failing draw or schedule ends the loop: the error is returned and
    /// no further frame is requested.
    pub fn tick<S, O, K>(
        &mut self,
        scene: &mut Scene<S::Prop>,
        stage: &mut S,
        overlay: &mut O,
        scheduler: &mut K,
        now_ms: f64,
    ) -> Result<FrameReport>
    where
        S: Stage,
        O: OverlaySink + ?Sized,
        K: Scheduler + ?Sized,
    {
        let dt = self.clock.tick(now_ms);
        self.frame += 1;

        let viewport = stage.viewport();
        scene.camera.set_viewport(&viewport);

        let (mut prop, unavailable) = match scene.prop.poll() {
            AssetState::Ready(prop) => (Some(prop), None),
            AssetState::Pending => (None, Some(SkipReason::TargetPending)),
            AssetState::Failed(_) => (None, Some(SkipReason::TargetFailed)),
        };

        // 1. motion
        if prop.is_some() {
            if let Some(motion) = &scene.motion {
                motion.apply(&mut scene.prop_transform, now_ms);
            }
        }

        // 2. controls
        let camera_moved = scene.controls.update(&mut scene.camera);

        // 3. transforms
        if let Some(prop) = prop.as_deref_mut() {
            stage.update_transforms(prop, &mut scene.prop_transform)?;
        }

        // 4. overlay
        let tracking = if let Some(reason) = unavailable {
            Tracking::Skipped(reason)
        } else if viewport.is_empty() {
            Tracking::Skipped(SkipReason::EmptyViewport)
        } else {
            match scene
                .tracker
                .track(Some(&scene.prop_transform), &scene.camera, &viewport, overlay)
            {
                Some(anchor) => Tracking::Placed(anchor),
                None => Tracking::Skipped(SkipReason::Degenerate),
            }
        };
        if let Tracking::Skipped(reason) = &tracking {
            tracing::trace!(frame = self.frame, ?reason, "tracking skipped, overlay left in place");
        }

        // 5. animation
        if let Some(prop) = prop.as_deref_mut() {
            stage.animate(prop, dt);
        }

        // 6. draw
        stage.draw(&FrameView {
            frame: self.frame,
            dt,
            camera: &scene.camera,
            viewport,
            prop: prop.as_deref(),
            prop_transform: &scene.prop_transform,
            tracking: tracking.clone(),
        })?;

        // 7. next tick
        scheduler.schedule_next()?;

        Ok(FrameReport {
            frame: self.frame,
            dt,
            camera_moved,
            tracking,
        })
    }
}
