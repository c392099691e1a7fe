//! Frame Clock
//!
//! Turns wall-clock instants into the delta-time seconds the state machine
//! consumes. Large gaps (debugger pauses, window drags) are clamped so a
//! single tick never simulates an unbounded span.

use std::time::{Duration, Instant};

/// Measures elapsed time between frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    tick_duration: Duration,
    max_delta: f64,
}

impl FrameClock {
    /// Create a clock starting now.
    ///
    /// `tick_rate` must be non-zero; `EngineConfig::validate` guarantees it.
    pub fn new(tick_rate: u32, max_delta: f64) -> Self {
        Self::starting_at(Instant::now(), tick_rate, max_delta)
    }

    /// Create a clock whose first frame begins at `start`.
    pub fn starting_at(start: Instant, tick_rate: u32, max_delta: f64) -> Self {
        Self {
            last: start,
            tick_duration: Duration::from_micros(1_000_000 / tick_rate.max(1) as u64),
            max_delta,
        }
    }

    /// Nominal duration of one tick.
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Delta in seconds for one fixed-rate tick.
    pub fn fixed_delta(&self) -> f64 {
        self.tick_duration.as_secs_f64()
    }

    /// Seconds elapsed since the previous call, clamped to `max_delta`.
    pub fn delta(&mut self) -> f64 {
        self.advance_to(Instant::now())
    }

    /// Advance the clock to `now` and return the clamped delta.
    ///
    /// An instant earlier than the previous one yields zero.
    pub fn advance_to(&mut self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        if now > self.last {
            self.last = now;
        }
        elapsed.min(self.max_delta)
    }
}
