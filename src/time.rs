//! Frame clock
//!
//! Time points are wall-clock milliseconds stored as `f64`. The scene reads the
//! clock through [`Clock`] so tests can step time by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub type TimePoint = f64;

/// Source of the current time point
pub trait Clock {
    fn now(&self) -> TimePoint;
}

/// Reads the system wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimePoint {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Hand-stepped clock. Clones share the same time point.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Rc<Cell<TimePoint>>,
}

impl ManualClock {
    pub fn new(start: TimePoint) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, time: TimePoint) {
        self.now.set(time);
    }

    pub fn advance(&self, millis: f64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimePoint {
        self.now.get()
    }
}
