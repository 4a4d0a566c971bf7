//! Raw input events from the render surface

use std::time::Instant;

/// Identity of one pointer (mouse or touch contact)
pub type PointerId = u64;

/// Position in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Keys the interpreter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    /// `+` or `=`
    ZoomIn,
    /// `-`
    ZoomOut,
    Space,
    Escape,
}

impl Key {
    /// Parse a DOM-style key name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowLeft" | "Left" => Some(Key::ArrowLeft),
            "ArrowRight" | "Right" => Some(Key::ArrowRight),
            "Home" => Some(Key::Home),
            "End" => Some(Key::End),
            "+" | "=" => Some(Key::ZoomIn),
            "-" | "_" => Some(Key::ZoomOut),
            " " | "Space" | "Spacebar" => Some(Key::Space),
            "Escape" | "Esc" => Some(Key::Escape),
            _ => None,
        }
    }
}

/// One low-level input event, timestamped by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { id: PointerId, position: Point, at: Instant },
    PointerMove { id: PointerId, position: Point, at: Instant },
    PointerUp { id: PointerId, position: Point, at: Instant },
    /// The platform took the pointer away (e.g. a system gesture)
    PointerCancel { id: PointerId, at: Instant },
    Key { key: Key, at: Instant },
    /// Wheel notches; positive zooms in
    Wheel { delta: f32, at: Instant },
}

impl InputEvent {
    pub fn at(&self) -> Instant {
        match *self {
            InputEvent::PointerDown { at, .. }
            | InputEvent::PointerMove { at, .. }
            | InputEvent::PointerUp { at, .. }
            | InputEvent::PointerCancel { at, .. }
            | InputEvent::Key { at, .. }
            | InputEvent::Wheel { at, .. } => at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("ArrowLeft"), Some(Key::ArrowLeft));
        assert_eq!(Key::from_name("="), Some(Key::ZoomIn));
        assert_eq!(Key::from_name(" "), Some(Key::Space));
        assert_eq!(Key::from_name("Tab"), None);
    }

    #[test]
    fn test_point_distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0);
    }
}
