//! Gesture interpretation
//!
//! Converts raw pointer, touch, keyboard and wheel input into view intents.

mod inertia;
mod input;
mod intent;
mod interpreter;

pub use input::{InputEvent, Key, Point, PointerId};
pub use intent::{GestureKind, Intent};
pub use interpreter::GestureInterpreter;
