//! Gesture disambiguation
//!
//! Turns pointer, key and wheel events into [`Intent`]s. A press starts a
//! pending session that resolves into a tap, a drag, a hold or (with a second
//! pointer) a pinch. Drag release may hand off to inertia, which is advanced
//! by [`GestureInterpreter::tick`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::inertia::Inertia;
use super::{GestureKind, InputEvent, Intent, Key, Point, PointerId};
use crate::settings::GestureSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionMode {
    /// Pressed, not yet classified
    Pending,
    Dragging,
    /// Stationary past the tap timeout; emits nothing
    Holding,
    Pinching,
    /// Pinch finished; waiting for the remaining pointer to lift
    Ended,
}

#[derive(Debug, Clone)]
struct Contact {
    id: PointerId,
    start: Point,
    last: Point,
}

/// Per-interaction record, dropped when the last pointer lifts
#[derive(Debug, Clone)]
struct GestureSession {
    contacts: Vec<Contact>,
    mode: SessionMode,
    started_at: Instant,
    drag_remainder: f32,
    pinch_start_distance: f32,
    /// Product of the zoom factors already emitted for this pinch
    pinch_applied: f32,
    /// (time, x) of recent drag positions for release velocity
    samples: VecDeque<(Instant, f32)>,
}

impl GestureSession {
    fn new(id: PointerId, position: Point, at: Instant) -> Self {
        Self {
            contacts: vec![Contact {
                id,
                start: position,
                last: position,
            }],
            mode: SessionMode::Pending,
            started_at: at,
            drag_remainder: 0.0,
            pinch_start_distance: 0.0,
            pinch_applied: 1.0,
            samples: VecDeque::new(),
        }
    }

    fn contact_index(&self, id: PointerId) -> Option<usize> {
        self.contacts.iter().position(|c| c.id == id)
    }

    fn begin_pinch(&mut self) {
        for contact in &mut self.contacts {
            contact.start = contact.last;
        }
        self.mode = SessionMode::Pinching;
        self.pinch_start_distance = self.contacts[0].last.distance(self.contacts[1].last);
        self.pinch_applied = 1.0;
    }

    fn pinch_factor(&mut self) -> Option<f32> {
        if self.pinch_start_distance <= f32::EPSILON {
            return None;
        }
        let ratio = self.contacts[0].last.distance(self.contacts[1].last) / self.pinch_start_distance;
        let factor = ratio / self.pinch_applied;
        if !factor.is_finite() || factor <= 0.0 || (factor - 1.0).abs() < 1e-6 {
            return None;
        }
        self.pinch_applied = ratio;
        Some(factor)
    }

    /// Whole frames for a horizontal displacement, carrying the remainder
    fn drag_frames(&mut self, dx: f32, px_per_frame: f32) -> Option<i32> {
        let frames = self.drag_remainder + dx / px_per_frame;
        let whole = frames.trunc();
        self.drag_remainder = frames - whole;
        (whole != 0.0).then_some(whole as i32)
    }

    fn push_sample(&mut self, at: Instant, x: f32, window: Duration) {
        self.samples.push_back((at, x));
        while let Some(&(t, _)) = self.samples.front() {
            if at.saturating_duration_since(t) > window && self.samples.len() > 2 {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Horizontal release velocity in px/s over the sample window
    fn release_velocity(&self, at: Instant, window: Duration) -> f32 {
        let recent: Vec<&(Instant, f32)> = self
            .samples
            .iter()
            .filter(|(t, _)| at.saturating_duration_since(*t) <= window)
            .collect();
        let (Some(first), Some(last)) = (recent.first(), recent.last()) else {
            return 0.0;
        };
        let dt = last.0.saturating_duration_since(first.0).as_secs_f32();
        if dt <= f32::EPSILON {
            return 0.0;
        }
        (last.1 - first.1) / dt
    }
}

/// Stateful gesture interpreter for one view
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    settings: GestureSettings,
    frame_count: usize,
    session: Option<GestureSession>,
    /// Position and time of the last lone tap
    last_tap: Option<(Point, Instant)>,
    inertia: Option<Inertia>,
}

impl GestureInterpreter {
    pub fn new(settings: GestureSettings, frame_count: usize) -> Self {
        Self {
            settings,
            frame_count: frame_count.max(1),
            session: None,
            last_tap: None,
            inertia: None,
        }
    }

    /// Frame count of the committed material, used by `End`
    pub fn set_frame_count(&mut self, frame_count: usize) {
        self.frame_count = frame_count.max(1);
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Whether a drag or pinch is in progress
    pub fn is_gesture_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| matches!(s.mode, SessionMode::Dragging | SessionMode::Pinching))
    }

    pub fn has_inertia(&self) -> bool {
        self.inertia.is_some()
    }

    /// Stop coasting without emitting anything
    pub fn cancel_inertia(&mut self) {
        self.inertia = None;
    }

    /// Interpret one input event
    pub fn handle(&mut self, event: &InputEvent) -> Vec<Intent> {
        let mut intents = Vec::new();
        match *event {
            InputEvent::PointerDown { id, position, at } => self.pointer_down(id, position, at, &mut intents),
            InputEvent::PointerMove { id, position, at } => self.pointer_move(id, position, at, &mut intents),
            InputEvent::PointerUp { id, position, at } => self.pointer_up(id, position, at, &mut intents),
            InputEvent::PointerCancel { id, .. } => self.pointer_cancel(id, &mut intents),
            InputEvent::Key { key, .. } => self.key(key, &mut intents),
            InputEvent::Wheel { delta, .. } => self.wheel(delta, &mut intents),
        }
        intents
    }

    /// Advance time-based behavior: hold detection and inertia
    pub fn tick(&mut self, now: Instant) -> Vec<Intent> {
        let mut intents = Vec::new();
        let tap_timeout = Duration::from_millis(self.settings.tap_max_duration_ms);

        if let Some(session) = self.session.as_mut() {
            if session.mode == SessionMode::Pending && now.saturating_duration_since(session.started_at) > tap_timeout {
                session.mode = SessionMode::Holding;
                tracing::trace!(target: "immersive_turntable::gesture", "Press became a hold");
            }
        }

        if let Some(inertia) = self.inertia.as_mut() {
            let (frames, finished) = inertia.advance(
                now,
                self.settings.inertia_friction,
                self.settings.inertia_min_velocity,
                self.settings.drag_px_per_frame,
            );
            if frames != 0 {
                intents.push(Intent::RotateBy(frames));
            }
            if finished {
                self.inertia = None;
            }
        }
        intents
    }

    fn pointer_down(&mut self, id: PointerId, position: Point, at: Instant, intents: &mut Vec<Intent>) {
        self.inertia = None;

        let Some(mut session) = self.session.take() else {
            self.session = Some(GestureSession::new(id, position, at));
            return;
        };

        if session.contacts.len() < 2 && session.contact_index(id).is_none() {
            match session.mode {
                SessionMode::Pending | SessionMode::Holding | SessionMode::Dragging => {
                    if session.mode == SessionMode::Dragging {
                        intents.push(Intent::GestureEnd);
                    }
                    session.contacts.push(Contact {
                        id,
                        start: position,
                        last: position,
                    });
                    session.begin_pinch();
                    intents.push(Intent::GestureStart(GestureKind::Pinch));
                }
                SessionMode::Pinching | SessionMode::Ended => {}
            }
        }
        self.session = Some(session);
    }

    fn pointer_move(&mut self, id: PointerId, position: Point, at: Instant, intents: &mut Vec<Intent>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(index) = session.contact_index(id) else {
            return;
        };
        let previous = session.contacts[index].last;
        session.contacts[index].last = position;

        let settings = &self.settings;
        let window = Duration::from_millis(settings.velocity_window_ms);

        match session.mode {
            SessionMode::Pending => {
                let start = session.contacts[index].start;
                if start.distance(position) <= settings.tap_max_distance_px {
                    return;
                }
                let elapsed = at.saturating_duration_since(session.started_at);
                if elapsed > Duration::from_millis(settings.tap_max_duration_ms) {
                    session.mode = SessionMode::Holding;
                    return;
                }

                session.mode = SessionMode::Dragging;
                intents.push(Intent::GestureStart(GestureKind::Drag));
                session.push_sample(session.started_at, start.x, window);
                session.push_sample(at, position.x, window);
                if let Some(frames) = session.drag_frames(position.x - start.x, settings.drag_px_per_frame) {
                    intents.push(Intent::RotateBy(frames));
                }
            }
            SessionMode::Dragging => {
                session.push_sample(at, position.x, window);
                if let Some(frames) = session.drag_frames(position.x - previous.x, settings.drag_px_per_frame) {
                    intents.push(Intent::RotateBy(frames));
                }
            }
            SessionMode::Pinching => {
                if let Some(factor) = session.pinch_factor() {
                    intents.push(Intent::ZoomBy(factor));
                }
            }
            SessionMode::Holding | SessionMode::Ended => {}
        }
    }

    fn pointer_up(&mut self, id: PointerId, position: Point, at: Instant, intents: &mut Vec<Intent>) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let Some(index) = session.contact_index(id) else {
            self.session = Some(session);
            return;
        };
        let previous = session.contacts[index].last;
        session.contacts[index].last = position;

        match session.mode {
            SessionMode::Pending => {
                let start = session.contacts[index].start;
                let is_tap = start.distance(position) <= self.settings.tap_max_distance_px
                    && at.saturating_duration_since(session.started_at)
                        <= Duration::from_millis(self.settings.tap_max_duration_ms);
                if is_tap {
                    self.tap(position, at, intents);
                } else {
                    self.last_tap = None;
                }
            }
            SessionMode::Dragging => {
                self.last_tap = None;
                let window = Duration::from_millis(self.settings.velocity_window_ms);
                session.push_sample(at, position.x, window);
                if let Some(frames) = session.drag_frames(position.x - previous.x, self.settings.drag_px_per_frame) {
                    intents.push(Intent::RotateBy(frames));
                }
                intents.push(Intent::GestureEnd);

                let velocity = session.release_velocity(at, window);
                if self.settings.inertia_enabled && velocity.abs() >= self.settings.inertia_min_velocity {
                    tracing::trace!(target: "immersive_turntable::gesture", velocity, "Drag released into inertia");
                    self.inertia = Some(Inertia::new(velocity, session.drag_remainder, at));
                }
            }
            SessionMode::Holding => self.last_tap = None,
            SessionMode::Pinching | SessionMode::Ended => {
                self.last_tap = None;
                if session.mode == SessionMode::Pinching {
                    intents.push(Intent::GestureEnd);
                    session.mode = SessionMode::Ended;
                }
                session.contacts.remove(index);
                if !session.contacts.is_empty() {
                    self.session = Some(session);
                }
            }
        }
    }

    fn pointer_cancel(&mut self, id: PointerId, intents: &mut Vec<Intent>) {
        let Some(session) = self.session.take() else {
            return;
        };
        if session.contact_index(id).is_none() {
            self.session = Some(session);
            return;
        }
        self.last_tap = None;
        if matches!(session.mode, SessionMode::Dragging | SessionMode::Pinching) {
            intents.push(Intent::GestureEnd);
        }
    }

    fn tap(&mut self, position: Point, at: Instant, intents: &mut Vec<Intent>) {
        let window = Duration::from_millis(self.settings.double_tap_window_ms);
        if let Some((previous, previous_at)) = self.last_tap.take() {
            if at.saturating_duration_since(previous_at) <= window
                && previous.distance(position) <= self.settings.double_tap_max_distance_px
            {
                intents.push(Intent::ResetView);
                return;
            }
        }
        self.last_tap = Some((position, at));
    }

    fn key(&mut self, key: Key, intents: &mut Vec<Intent>) {
        self.inertia = None;
        let intent = match key {
            Key::ArrowLeft => Intent::RotateBy(-1),
            Key::ArrowRight => Intent::RotateBy(1),
            Key::Home => Intent::JumpToFrame(0),
            Key::End => Intent::JumpToFrame(self.frame_count - 1),
            Key::ZoomIn => Intent::ZoomBy(self.settings.keyboard_zoom_step),
            Key::ZoomOut => Intent::ZoomBy(1.0 / self.settings.keyboard_zoom_step),
            Key::Space => Intent::ToggleAutoRotate,
            Key::Escape => Intent::ResetView,
        };
        intents.push(intent);
    }

    fn wheel(&mut self, delta: f32, intents: &mut Vec<Intent>) {
        if !delta.is_finite() || delta == 0.0 {
            return;
        }
        let factor = self.settings.wheel_zoom_step.powf(delta.abs().min(3.0));
        intents.push(Intent::ZoomBy(if delta > 0.0 { factor } else { 1.0 / factor }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock {
        start: Instant,
    }

    impl Clock {
        fn new() -> Self {
            Self { start: Instant::now() }
        }

        fn at(&self, ms: u64) -> Instant {
            self.start + Duration::from_millis(ms)
        }
    }

    fn interpreter() -> GestureInterpreter {
        GestureInterpreter::new(GestureSettings::default(), 36)
    }

    fn down(id: PointerId, x: f32, y: f32, at: Instant) -> InputEvent {
        InputEvent::PointerDown {
            id,
            position: Point::new(x, y),
            at,
        }
    }

    fn mv(id: PointerId, x: f32, y: f32, at: Instant) -> InputEvent {
        InputEvent::PointerMove {
            id,
            position: Point::new(x, y),
            at,
        }
    }

    fn up(id: PointerId, x: f32, y: f32, at: Instant) -> InputEvent {
        InputEvent::PointerUp {
            id,
            position: Point::new(x, y),
            at,
        }
    }

    fn rotation(intents: &[Intent]) -> i32 {
        intents
            .iter()
            .map(|i| match i {
                Intent::RotateBy(d) => *d,
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn test_single_tap_emits_nothing() {
        let clock = Clock::new();
        let mut gi = interpreter();
        assert!(gi.handle(&down(1, 100.0, 100.0, clock.at(0))).is_empty());
        assert!(gi.handle(&up(1, 102.0, 101.0, clock.at(80))).is_empty());
    }

    #[test]
    fn test_double_tap_resets_view() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&up(1, 100.0, 100.0, clock.at(60)));
        gi.handle(&down(1, 104.0, 98.0, clock.at(200)));
        let intents = gi.handle(&up(1, 104.0, 98.0, clock.at(250)));
        assert_eq!(intents, vec![Intent::ResetView]);

        // A third tap starts a fresh pair
        gi.handle(&down(1, 104.0, 98.0, clock.at(320)));
        assert!(gi.handle(&up(1, 104.0, 98.0, clock.at(350))).is_empty());
    }

    #[test]
    fn test_slow_or_distant_taps_are_not_double() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&up(1, 100.0, 100.0, clock.at(50)));
        gi.handle(&down(1, 100.0, 100.0, clock.at(500)));
        assert!(gi.handle(&up(1, 100.0, 100.0, clock.at(550))).is_empty());

        gi.handle(&down(1, 300.0, 100.0, clock.at(600)));
        assert!(gi.handle(&up(1, 300.0, 100.0, clock.at(650))).is_empty());
    }

    #[test]
    fn test_drag_between_taps_breaks_double_tap() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&up(1, 100.0, 100.0, clock.at(40)));

        gi.handle(&down(1, 100.0, 100.0, clock.at(60)));
        assert_eq!(rotation(&gi.handle(&mv(1, 160.0, 100.0, clock.at(100)))), 5);
        let intents = gi.handle(&up(1, 100.0, 100.0, clock.at(200)));
        assert_eq!(intents.last(), Some(&Intent::GestureEnd));

        gi.handle(&down(1, 100.0, 100.0, clock.at(240)));
        let intents = gi.handle(&up(1, 100.0, 100.0, clock.at(270)));
        assert!(!intents.contains(&Intent::ResetView));

        // That tap still pairs with the next one
        gi.handle(&down(1, 100.0, 100.0, clock.at(300)));
        assert_eq!(gi.handle(&up(1, 100.0, 100.0, clock.at(330))), vec![Intent::ResetView]);
    }

    #[test]
    fn test_hold_between_taps_breaks_double_tap() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&up(1, 100.0, 100.0, clock.at(40)));

        gi.handle(&down(1, 100.0, 100.0, clock.at(45)));
        gi.tick(clock.at(296));
        gi.handle(&up(1, 100.0, 100.0, clock.at(300)));

        // Within the double-tap window of the first tap
        gi.handle(&down(1, 100.0, 100.0, clock.at(305)));
        assert!(gi.handle(&up(1, 100.0, 100.0, clock.at(320))).is_empty());
    }

    #[test]
    fn test_drag_rotates_with_remainder() {
        let clock = Clock::new();
        let mut settings = GestureSettings::default();
        settings.inertia_enabled = false;
        let mut gi = GestureInterpreter::new(settings, 36);

        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        let intents = gi.handle(&mv(1, 118.0, 140.0, clock.at(30)));
        assert_eq!(
            intents,
            vec![Intent::GestureStart(GestureKind::Drag), Intent::RotateBy(1)]
        );
        assert!(gi.is_gesture_active());

        // 18px so far = 1.5 frames; 6 more px completes the second frame
        assert_eq!(gi.handle(&mv(1, 124.0, 0.0, clock.at(40))), vec![Intent::RotateBy(1)]);
        assert!(gi.handle(&mv(1, 130.0, 0.0, clock.at(50))).is_empty());

        let intents = gi.handle(&up(1, 64.0, 0.0, clock.at(60)));
        assert_eq!(rotation(&intents), -5);
        assert_eq!(intents.last(), Some(&Intent::GestureEnd));
        assert!(!gi.is_gesture_active());
        assert!(!gi.has_inertia());
    }

    #[test]
    fn test_vertical_motion_is_ignored() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        let intents = gi.handle(&mv(1, 100.0, 300.0, clock.at(30)));
        assert_eq!(intents, vec![Intent::GestureStart(GestureKind::Drag)]);
        assert!(gi.handle(&mv(1, 100.0, 500.0, clock.at(60))).is_empty());
    }

    #[test]
    fn test_hold_emits_nothing() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        assert!(gi.tick(clock.at(400)).is_empty());
        assert!(gi.handle(&mv(1, 300.0, 100.0, clock.at(450))).is_empty());
        assert!(gi.handle(&up(1, 300.0, 100.0, clock.at(500))).is_empty());
    }

    #[test]
    fn test_late_move_becomes_hold() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        assert!(gi.handle(&mv(1, 200.0, 100.0, clock.at(300))).is_empty());
        assert!(!gi.is_gesture_active());
    }

    #[test]
    fn test_pinch_zoom_product_matches_ratio() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        let intents = gi.handle(&down(2, 200.0, 100.0, clock.at(10)));
        assert_eq!(intents, vec![Intent::GestureStart(GestureKind::Pinch)]);

        let mut product = 1.0f32;
        for (step, x) in [(20, 250.0), (30, 300.0), (40, 220.0), (50, 400.0)] {
            for intent in gi.handle(&mv(2, x, 100.0, clock.at(step))) {
                if let Intent::ZoomBy(f) = intent {
                    product *= f;
                }
            }
        }
        assert!((product - 3.0).abs() < 1e-4, "product {}", product);

        assert_eq!(gi.handle(&up(2, 400.0, 100.0, clock.at(60))), vec![Intent::GestureEnd]);
        // Remaining pointer no longer does anything
        assert!(gi.handle(&mv(1, 20.0, 100.0, clock.at(70))).is_empty());
        assert!(gi.handle(&up(1, 20.0, 100.0, clock.at(80))).is_empty());
        assert!(!gi.is_gesture_active());
    }

    #[test]
    fn test_second_pointer_turns_drag_into_pinch() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&mv(1, 130.0, 100.0, clock.at(20)));
        let intents = gi.handle(&down(2, 230.0, 100.0, clock.at(40)));
        assert_eq!(
            intents,
            vec![Intent::GestureEnd, Intent::GestureStart(GestureKind::Pinch)]
        );
    }

    #[test]
    fn test_keyboard_mapping() {
        let clock = Clock::new();
        let mut gi = interpreter();
        let press = |gi: &mut GestureInterpreter, key| gi.handle(&InputEvent::Key { key, at: clock.at(0) });

        assert_eq!(press(&mut gi, Key::ArrowLeft), vec![Intent::RotateBy(-1)]);
        assert_eq!(press(&mut gi, Key::ArrowRight), vec![Intent::RotateBy(1)]);
        assert_eq!(press(&mut gi, Key::Home), vec![Intent::JumpToFrame(0)]);
        assert_eq!(press(&mut gi, Key::End), vec![Intent::JumpToFrame(35)]);
        assert_eq!(press(&mut gi, Key::ZoomIn), vec![Intent::ZoomBy(1.25)]);
        assert_eq!(press(&mut gi, Key::ZoomOut), vec![Intent::ZoomBy(0.8)]);
        assert_eq!(press(&mut gi, Key::Space), vec![Intent::ToggleAutoRotate]);
        assert_eq!(press(&mut gi, Key::Escape), vec![Intent::ResetView]);

        gi.set_frame_count(24);
        assert_eq!(press(&mut gi, Key::End), vec![Intent::JumpToFrame(23)]);
    }

    #[test]
    fn test_wheel_zoom_is_capped() {
        let clock = Clock::new();
        let mut gi = interpreter();
        let wheel = |gi: &mut GestureInterpreter, delta| gi.handle(&InputEvent::Wheel { delta, at: clock.at(0) });

        assert_eq!(wheel(&mut gi, 1.0), vec![Intent::ZoomBy(1.1)]);
        let Intent::ZoomBy(big) = wheel(&mut gi, 10.0)[0] else {
            panic!("expected zoom");
        };
        assert!((big - 1.1f32.powi(3)).abs() < 1e-5);
        let Intent::ZoomBy(out) = wheel(&mut gi, -1.0)[0] else {
            panic!("expected zoom");
        };
        assert!((out - 1.0 / 1.1).abs() < 1e-6);
        assert!(wheel(&mut gi, 0.0).is_empty());
        assert!(wheel(&mut gi, f32::NAN).is_empty());
    }

    #[test]
    fn test_fast_release_coasts_until_new_press() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&mv(1, 120.0, 100.0, clock.at(10)));
        gi.handle(&mv(1, 160.0, 100.0, clock.at(30)));
        gi.handle(&up(1, 200.0, 100.0, clock.at(50)));
        assert!(gi.has_inertia());

        let coasted = rotation(&gi.tick(clock.at(150)));
        assert!(coasted > 0, "coasted {}", coasted);

        // Any new press stops coasting
        gi.handle(&down(1, 0.0, 0.0, clock.at(160)));
        assert!(!gi.has_inertia());
        assert!(gi.tick(clock.at(300)).is_empty());
    }

    #[test]
    fn test_inertia_runs_out() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&mv(1, 140.0, 100.0, clock.at(20)));
        gi.handle(&up(1, 180.0, 100.0, clock.at(40)));
        assert!(gi.has_inertia());

        for step in 1..200 {
            gi.tick(clock.at(40 + step * 16));
        }
        assert!(!gi.has_inertia());
    }

    #[test]
    fn test_cancel_ends_gesture_without_inertia() {
        let clock = Clock::new();
        let mut gi = interpreter();
        gi.handle(&down(1, 100.0, 100.0, clock.at(0)));
        gi.handle(&mv(1, 200.0, 100.0, clock.at(20)));
        let intents = gi.handle(&InputEvent::PointerCancel { id: 1, at: clock.at(30) });
        assert_eq!(intents, vec![Intent::GestureEnd]);
        assert!(!gi.has_inertia());
        assert!(!gi.is_gesture_active());
    }
}
