//! Scene state the page can touch while a frame is running.
//!
//! The page's draw callback runs inside a frame, with the scene borrowed. Anything
//! it may call back into (`frames()`, `hostDrivesMotion()`, dropping the scene)
//! goes through these cells instead, and the next frame picks up the change.
use std::cell::Cell;

#[derive(Debug, Default)]
pub struct SharedStatus {
    frames: Cell<u64>,
    host_motion: Cell<bool>,
    stopped: Cell<bool>,
}

impl SharedStatus {
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    pub fn record_frames(&self, frames: u64) {
        self.frames.set(frames);
    }

    /// Ask the loop to stop moving the node itself.
    pub fn request_host_motion(&self) {
        self.host_motion.set(true);
    }

    /// `true` once after a request.
    pub fn take_host_motion(&self) -> bool {
        self.host_motion.replace(false)
    }

    /// No further frames are scheduled after this.
    pub fn stop(&self) {
        self.stopped.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}
