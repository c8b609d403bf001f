// uwblink/src/link/backoff.rs

use crate::link::config::MAX_BACKOFF_DELAY_MS;
use crate::transport::traits::Delay;
use crate::{Error, Result};

/// Outcome of [`Backoff::wait_or_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStep {
    Retry,
    TimedOut,
}

/// Retry pacing for one logical operation.
///
/// Sleeps grow exponentially from 1 ms up to [`MAX_BACKOFF_DELAY_MS`]. The
/// ceiling applies to time elapsed since [`reset`](Backoff::reset), so time
/// spent in edge waits between retries counts against it too. Use one
/// instance per wait loop; never share one across nested loops.
#[derive(Debug, Clone)]
pub struct Backoff {
    ceiling_ms: u64,
    started_ms: u64,
    step: u32,
}

impl Backoff {
    /// Create a counter whose clock starts now.
    pub fn start<D: Delay + ?Sized>(ceiling_ms: u64, clock: &D) -> Self {
        Self {
            ceiling_ms,
            started_ms: clock.now_ms(),
            step: 0,
        }
    }

    pub fn reset<D: Delay + ?Sized>(&mut self, clock: &D) {
        self.started_ms = clock.now_ms();
        self.step = 0;
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn ceiling_ms(&self) -> u64 {
        self.ceiling_ms
    }

    pub fn elapsed_ms<D: Delay + ?Sized>(&self, clock: &D) -> u64 {
        clock.now_ms().saturating_sub(self.started_ms)
    }

    pub fn remaining_ms<D: Delay + ?Sized>(&self, clock: &D) -> u64 {
        self.ceiling_ms.saturating_sub(self.elapsed_ms(clock))
    }

    fn delay_for_step(step: u32) -> u64 {
        (1u64 << step.min(6)).min(MAX_BACKOFF_DELAY_MS)
    }

    /// Sleep before the next attempt, or report that the ceiling has passed.
    pub fn wait_or_timeout<D: Delay + ?Sized>(&mut self, clock: &mut D) -> BackoffStep {
        let remaining = self.remaining_ms(clock);
        if remaining == 0 {
            return BackoffStep::TimedOut;
        }
        clock.delay_ms(Self::delay_for_step(self.step).min(remaining));
        self.step = self.step.saturating_add(1);
        BackoffStep::Retry
    }

    /// [`wait_or_timeout`](Self::wait_or_timeout) mapped onto `Result`:
    /// the error built by `on_timeout` is returned once the ceiling passes.
    pub fn retry_or<D, F>(&mut self, clock: &mut D, on_timeout: F) -> Result<()>
    where
        D: Delay + ?Sized,
        F: FnOnce() -> Error,
    {
        match self.wait_or_timeout(clock) {
            BackoffStep::Retry => Ok(()),
            BackoffStep::TimedOut => Err(on_timeout()),
        }
    }
}
