//! Post-release coasting of a drag

use std::time::Instant;

/// Exponentially decaying drag velocity
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Inertia {
    /// Horizontal speed in px/s
    velocity: f32,
    /// Sub-frame travel carried between ticks
    remainder: f32,
    last: Instant,
}

impl Inertia {
    pub fn new(velocity: f32, remainder: f32, at: Instant) -> Self {
        Self {
            velocity,
            remainder,
            last: at,
        }
    }

    #[cfg(test)]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Coast until `now`. Returns whole frames travelled and whether the
    /// velocity dropped below `min_velocity`.
    pub fn advance(&mut self, now: Instant, friction: f32, min_velocity: f32, px_per_frame: f32) -> (i32, bool) {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        if dt <= 0.0 {
            return (0, self.velocity.abs() < min_velocity);
        }
        self.last = now;

        // Integral of v0 * e^(-kt) over dt
        let decay = (-friction * dt).exp();
        let travel = self.velocity * (1.0 - decay) / friction;
        self.velocity *= decay;

        let frames = self.remainder + travel / px_per_frame;
        let whole = frames.trunc();
        self.remainder = frames - whole;
        (whole as i32, self.velocity.abs() < min_velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_decays_and_stops() {
        let start = Instant::now();
        let mut inertia = Inertia::new(600.0, 0.0, start);

        let mut total = 0;
        let mut finished = false;
        for step in 1..=200 {
            let (frames, done) = inertia.advance(start + Duration::from_millis(step * 16), 4.0, 60.0, 12.0);
            assert!(frames >= 0);
            total += frames;
            if done {
                finished = true;
                break;
            }
        }
        assert!(finished);
        // Full coast from 600 px/s covers at most 600/4 = 150 px, 12.5 frames
        assert!((10..=12).contains(&total), "travelled {} frames", total);
    }

    #[test]
    fn test_negative_velocity_rotates_backwards() {
        let start = Instant::now();
        let mut inertia = Inertia::new(-1200.0, 0.0, start);
        let (frames, done) = inertia.advance(start + Duration::from_millis(100), 4.0, 60.0, 12.0);
        assert!(frames < 0);
        assert!(!done);
        assert!(inertia.velocity() < 0.0);
    }

    #[test]
    fn test_zero_elapsed_is_noop() {
        let start = Instant::now();
        let mut inertia = Inertia::new(300.0, 0.5, start);
        assert_eq!(inertia.advance(start, 4.0, 60.0, 12.0), (0, false));
    }
}
