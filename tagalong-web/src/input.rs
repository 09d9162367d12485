//! Browser input mapping, kept free of DOM types so it runs under `cargo test`.
use tagalong_core::{ScreenAnchor, WorldTransform};

/// What a pointer drag does to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Orbit,
    Pan,
}

impl DragMode {
    /// `MouseEvent.button`: middle orbits, right pans. The left button is left to the page.
    pub fn from_button(button: i16) -> Option<Self> {
        match button {
            1 => Some(DragMode::Orbit),
            2 => Some(DragMode::Pan),
            _ => None,
        }
    }
}

/// Tracks one pointer drag at a time and turns moves into deltas.
#[derive(Debug, Default)]
pub struct PointerDrag {
    active: Option<(DragMode, f32, f32)>,
}

impl PointerDrag {
    /// Start a drag. Returns whether the button is one we handle.
    pub fn press(&mut self, button: i16, x: f32, y: f32) -> bool {
        match DragMode::from_button(button) {
            Some(mode) => {
                self.active = Some((mode, x, y));
                true
            }
            None => false,
        }
    }

    /// Pointer moved; yields the mode and the delta since the last move.
    pub fn moved(&mut self, x: f32, y: f32) -> Option<(DragMode, f32, f32)> {
        let (mode, last_x, last_y) = self.active.as_mut()?;
        let delta = (*mode, x - *last_x, y - *last_y);
        *last_x = x;
        *last_y = y;
        Some(delta)
    }

    pub fn release(&mut self) {
        self.active = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }
}

/// Wheel notches from `WheelEvent.deltaY`: scrolling down zooms out.
pub fn wheel_steps(delta_y: f64) -> f32 {
    if delta_y > 0.0 {
        1.0
    } else if delta_y < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// CSS `left`/`top` values for a label anchor.
pub fn css_position(anchor: ScreenAnchor) -> (String, String) {
    (format!("{}px", anchor.x), format!("{}px", anchor.y))
}

/// Read a `matrixWorld.elements` array. Anything other than 16 finite numbers is rejected.
pub fn transform_from_elements(elements: &[f64]) -> Option<WorldTransform> {
    let elements: [f64; 16] = elements.try_into().ok()?;
    if !elements.iter().all(|e| e.is_finite()) {
        return None;
    }
    Some(WorldTransform::from_column_slice(&elements.map(|e| e as f32)))
}
