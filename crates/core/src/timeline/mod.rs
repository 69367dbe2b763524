use std::time::{Duration, Instant};

/// Monotonic playback position measured in seconds.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    time_seconds: f64,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward; negative deltas are ignored.
    pub fn advance(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.time_seconds += delta as f64;
        }
    }

    pub fn seconds(&self) -> f64 {
        self.time_seconds
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.time_seconds)
    }

    /// Whole sample frames elapsed at `sample_rate`.
    pub fn frames_at(&self, sample_rate: u32) -> usize {
        (self.time_seconds * sample_rate as f64).floor() as usize
    }
}

/// Measures wall-clock time between rendered frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    max_delta: f32,
}

impl FrameClock {
    /// `max_delta` caps the step reported after a stall (e.g. a window drag).
    pub fn new(max_delta: f32) -> Self {
        Self {
            last: None,
            max_delta: max_delta.max(0.0),
        }
    }

    /// Returns seconds since the previous tick; the first tick reports zero.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        delta.min(self.max_delta)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_clock_counts_frames() {
        let mut clock = PlaybackClock::new();
        clock.advance(0.5);
        clock.advance(-1.0);
        clock.advance(0.25);
        assert_eq!(clock.frames_at(1_000), 750);
    }

    #[test]
    fn frame_clock_caps_stalls() {
        let mut clock = FrameClock::new(0.1);
        let start = Instant::now();
        assert_eq!(clock.tick_at(start), 0.0);

        let delta = clock.tick_at(start + Duration::from_millis(16));
        assert!((delta - 0.016).abs() < 1e-4);

        let stalled = clock.tick_at(start + Duration::from_secs(3));
        assert_eq!(stalled, 0.1);
    }
}
