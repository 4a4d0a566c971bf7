//! Rotation state and frame arithmetic

use serde::Serialize;

use crate::catalog::MaterialId;

/// Active interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Idle,
    Dragging,
    Pinching,
    AutoRotating,
}

impl Mode {
    /// A drag or pinch is in progress
    pub fn is_gesture(&self) -> bool {
        matches!(self, Mode::Dragging | Mode::Pinching)
    }
}

/// The one view state of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationState {
    pub material: MaterialId,
    /// Always in `[0, frame_count)`
    pub frame: usize,
    pub frame_count: usize,
    pub zoom: f32,
    pub auto_rotate: bool,
    pub mode: Mode,
}

/// `(current + delta) mod n`, never negative
pub fn wrap_frame(current: usize, delta: i64, frame_count: usize) -> usize {
    let n = frame_count.max(1) as i64;
    (current as i64 + delta).rem_euclid(n) as usize
}

/// Map a frame onto a sequence with a different frame count, keeping the
/// same angle
pub fn rescale_frame(frame: usize, old_count: usize, new_count: usize) -> usize {
    let new_count = new_count.max(1);
    if old_count == new_count || old_count == 0 {
        return frame % new_count;
    }
    let scaled = (frame as f64 * new_count as f64 / old_count as f64).round() as usize;
    scaled % new_count
}
