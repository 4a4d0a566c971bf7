//! Intents emitted by the interpreter

use serde::{Deserialize, Serialize};

/// Kind of continuous gesture in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Drag,
    Pinch,
}

/// A view change requested by the user.
///
/// Accessibility controls submit these directly, bypassing pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Intent {
    /// Rotate by a signed number of frames
    RotateBy(i32),
    /// Multiply zoom by a factor
    ZoomBy(f32),
    JumpToFrame(usize),
    /// Frame 0 at the default zoom
    ResetView,
    ToggleAutoRotate,
    GestureStart(GestureKind),
    GestureEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_json() {
        assert_eq!(
            serde_json::to_string(&Intent::RotateBy(-2)).unwrap(),
            r#"{"type":"rotate_by","value":-2}"#
        );
        let intent: Intent = serde_json::from_str(r#"{"type":"reset_view"}"#).unwrap();
        assert_eq!(intent, Intent::ResetView);
    }
}
