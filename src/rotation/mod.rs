//! Rotation state machine
//!
//! Owns current material, frame index, zoom and auto-rotate mode.

mod machine;
mod state;

pub use machine::RotationMachine;
pub use state::{rescale_frame, wrap_frame, Mode, RotationState};
