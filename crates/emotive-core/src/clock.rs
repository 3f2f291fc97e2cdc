// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time sources.
//!
//! Components that reason about elapsed time (recovery delays, sampling
//! intervals) read it through the [`Clock`] trait so tests can drive time by
//! hand instead of sleeping.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A source of monotonic time in milliseconds.
pub trait Clock {
    /// Milliseconds elapsed since an arbitrary, fixed origin.
    fn now_ms(&self) -> f64;
}

/// Wall-clock time measured from the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A hand-driven clock.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the component under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Creates a manual clock starting at `start_ms`.
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    /// Moves time forward by `delta_ms`.
    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Measures elapsed time against a [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stopwatch {
    start_ms: f64,
}

impl Stopwatch {
    /// Starts timing now.
    #[inline]
    pub fn start(clock: &dyn Clock) -> Self {
        Self {
            start_ms: clock.now_ms(),
        }
    }

    /// Milliseconds since [`start`](Self::start), never negative.
    #[inline]
    pub fn elapsed_ms(&self, clock: &dyn Clock) -> f64 {
        (clock.now_ms() - self.start_ms).max(0.0)
    }

    /// Returns the elapsed time and restarts.
    pub fn lap_ms(&mut self, clock: &dyn Clock) -> f64 {
        let now = clock.now_ms();
        let lap = (now - self.start_ms).max(0.0);
        self.start_ms = now;
        lap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(100.0);
        let handle = clock.clone();
        handle.advance(250.0);
        assert_eq!(clock.now_ms(), 350.0);
        clock.set(10.0);
        assert_eq!(handle.now_ms(), 10.0);
    }

    #[test]
    fn test_stopwatch_laps() {
        let clock = ManualClock::new(0.0);
        let mut watch = Stopwatch::start(&clock);
        clock.advance(12.5);
        assert_eq!(watch.elapsed_ms(&clock), 12.5);
        assert_eq!(watch.lap_ms(&clock), 12.5);
        clock.advance(4.0);
        assert_eq!(watch.elapsed_ms(&clock), 4.0);
        clock.set(0.0);
        assert_eq!(watch.elapsed_ms(&clock), 0.0);
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(a >= 0.0);
    }
}
