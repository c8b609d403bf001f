//! Time helpers used across the crate.
//!
//! `ms` keeps millisecond literals readable, and [`MonotonicClock`] is a
//! ready-made [`Delay`] for hosted platforms built on `std`.

use std::thread;
use std::time::{Duration, Instant};

use crate::transport::traits::Delay;

/// Convert milliseconds to Duration.
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Wall-clock [`Delay`] backed by `Instant` and `thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Delay for MonotonicClock {
    fn delay_ms(&mut self, n: u64) {
        thread::sleep(ms(n));
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
