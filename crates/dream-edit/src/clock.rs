//! Time sources for history timestamps and notification expiry.

use std::cell::Cell;
use std::time::Instant;

/// Monotonic seconds since some fixed origin.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to. Used by tests and headless runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
    step: f64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Cell::new(start),
            step: 0.0,
        }
    }

    /// A clock that advances by `step` seconds after every reading.
    pub fn stepping(start: f64, step: f64) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}
