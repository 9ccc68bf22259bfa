//! Time management utilities
//!
//! The simulation never reads the wall clock directly. It goes through a
//! [`Clock`] so that hosts can drive it from real time ([`SystemClock`]) or
//! step it deterministically ([`ManualClock`]).

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock {
    /// Time elapsed since the clock's own origin
    fn now(&self) -> Duration;
}

/// Clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same underlying time, so a host can keep one handle and
/// give another to the simulation.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Create a clock stopped at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move time forward by a number of seconds
    pub fn advance_secs(&self, seconds: f32) {
        self.advance(Duration::from_secs_f32(seconds.max(0.0)));
    }

    /// Jump to an absolute time; earlier values are ignored
    pub fn set(&self, now: Duration) {
        if now > self.now.get() {
            self.now.set(now);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Pausable stopwatch measuring elapsed time on a [`Clock`]
///
/// Time that passes while the stopwatch is stopped is never counted, which
/// is what lets a simulation pause without a time jump on resume.
pub struct Stopwatch {
    clock: Rc<dyn Clock>,
    start_time: Option<Duration>,
    elapsed: Duration,
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new(clock: Rc<dyn Clock>) -> Self {
        let mut stopwatch = Self::new(clock);
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch; does nothing if it is already running
    pub fn start(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(self.clock.now());
        }
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += self.clock.now().saturating_sub(start);
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let current_elapsed = match self.start_time {
            Some(start) => self.clock.now().saturating_sub(start),
            None => Duration::ZERO,
        };
        self.elapsed + current_elapsed
    }

    /// Check if the stopwatch is currently running
    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch")
            .field("elapsed", &self.elapsed())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(other.now(), Duration::from_millis(250));

        other.set(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(250));
    }

    #[test]
    fn test_stopwatch_excludes_stopped_time() {
        let clock = ManualClock::new();
        let mut stopwatch = Stopwatch::start_new(Rc::new(clock.clone()));

        clock.advance(Duration::from_secs(1));
        stopwatch.stop();
        clock.advance(Duration::from_secs(10));
        assert_eq!(stopwatch.elapsed(), Duration::from_secs(1));

        stopwatch.start();
        clock.advance(Duration::from_secs(2));
        assert_eq!(stopwatch.elapsed(), Duration::from_secs(3));
        assert!(stopwatch.is_running());
    }
}
