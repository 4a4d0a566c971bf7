//! Rotation state machine
//!
//! Applies intents to the session's [`RotationState`]. Modes are Idle,
//! Dragging, Pinching and AutoRotating; auto-rotation advances from elapsed
//! time via [`RotationMachine::tick`].

use std::time::{Duration, Instant};

use super::{rescale_frame, wrap_frame, Mode, RotationState};
use crate::catalog::MaterialId;
use crate::error::ValidationError;
use crate::gesture::{GestureKind, Intent};
use crate::settings::{AutoRotateSettings, ZoomSettings};

/// Owner of the rotation state
#[derive(Debug, Clone)]
pub struct RotationMachine {
    state: RotationState,
    zoom: ZoomSettings,
    frame_interval: Duration,
    /// Elapsed auto-rotate time not yet turned into a frame
    carry: Duration,
    last_tick: Option<Instant>,
}

impl RotationMachine {
    pub fn new(
        material: MaterialId,
        frame_count: usize,
        zoom: ZoomSettings,
        auto_rotate: &AutoRotateSettings,
        now: Instant,
    ) -> Self {
        let mode = if auto_rotate.start_enabled {
            Mode::AutoRotating
        } else {
            Mode::Idle
        };
        Self {
            state: RotationState {
                material,
                frame: 0,
                frame_count: frame_count.max(1),
                zoom: zoom.default,
                auto_rotate: auto_rotate.start_enabled,
                mode,
            },
            zoom,
            frame_interval: auto_rotate.frame_interval().max(Duration::from_millis(1)),
            carry: Duration::ZERO,
            last_tick: auto_rotate.start_enabled.then_some(now),
        }
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    /// Apply one intent. Returns whether the state changed.
    pub fn apply(&mut self, intent: Intent, now: Instant) -> Result<bool, ValidationError> {
        let before = self.state.clone();

        match intent {
            Intent::RotateBy(delta) => self.rotate_by(delta as i64),
            Intent::ZoomBy(factor) => self.zoom_by(factor),
            Intent::JumpToFrame(frame) => {
                if frame >= self.state.frame_count {
                    return Err(ValidationError::FrameOutOfRange {
                        frame,
                        count: self.state.frame_count,
                    });
                }
                self.state.frame = frame;
            }
            Intent::ResetView => {
                self.state.frame = 0;
                self.state.zoom = self.zoom.default;
            }
            Intent::ToggleAutoRotate => self.toggle_auto_rotate(now),
            Intent::GestureStart(kind) => {
                self.stop_auto_rotate();
                self.state.mode = match kind {
                    GestureKind::Drag => Mode::Dragging,
                    GestureKind::Pinch => Mode::Pinching,
                };
            }
            Intent::GestureEnd => {
                if self.state.mode.is_gesture() {
                    self.state.mode = Mode::Idle;
                }
            }
        }

        Ok(self.state != before)
    }

    /// Advance auto-rotation to `now`. Returns whether the frame changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.state.mode != Mode::AutoRotating {
            return false;
        }
        let Some(last) = self.last_tick.replace(now) else {
            return false;
        };

        let elapsed = self.carry + now.saturating_duration_since(last);
        let interval = self.frame_interval.as_nanos();
        let frames = elapsed.as_nanos() / interval;
        self.carry = Duration::from_nanos((elapsed.as_nanos() % interval) as u64);

        if frames == 0 {
            return false;
        }
        let step = (frames % self.state.frame_count as u128) as i64;
        let before = self.state.frame;
        self.rotate_by(step);
        self.state.frame != before
    }

    /// Move to another material's sequence, keeping the viewing angle
    pub fn switch_material(&mut self, material: MaterialId, frame_count: usize) {
        let frame_count = frame_count.max(1);
        self.state.frame = rescale_frame(self.state.frame, self.state.frame_count, frame_count);
        self.state.frame_count = frame_count;
        self.state.material = material;
    }

    /// Time until the next auto-rotate frame, if auto-rotating
    pub fn next_frame_in(&self, now: Instant) -> Option<Duration> {
        if self.state.mode != Mode::AutoRotating {
            return None;
        }
        let last = self.last_tick?;
        let elapsed = self.carry + now.saturating_duration_since(last);
        Some(self.frame_interval.saturating_sub(elapsed))
    }

    fn rotate_by(&mut self, delta: i64) {
        self.state.frame = wrap_frame(self.state.frame, delta, self.state.frame_count);
    }

    fn zoom_by(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            tracing::debug!(target: "immersive_turntable::rotation", factor, "Ignoring invalid zoom factor");
            return;
        }
        self.state.zoom = (self.state.zoom * factor).clamp(self.zoom.min, self.zoom.max);
    }

    fn toggle_auto_rotate(&mut self, now: Instant) {
        match self.state.mode {
            Mode::Idle => {
                self.state.mode = Mode::AutoRotating;
                self.state.auto_rotate = true;
                self.carry = Duration::ZERO;
                self.last_tick = Some(now);
            }
            Mode::AutoRotating => self.stop_auto_rotate(),
            Mode::Dragging | Mode::Pinching => {}
        }
    }

    fn stop_auto_rotate(&mut self) {
        if self.state.mode == Mode::AutoRotating {
            self.state.mode = Mode::Idle;
        }
        self.state.auto_rotate = false;
        self.carry = Duration::ZERO;
        self.last_tick = None;
    }
}
