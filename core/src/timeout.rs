//! Deadline-bounded polling
//!
//! Every wait in this crate (oscillator start-up, register synchronisation,
//! operator input) is a condition polled at a fixed interval until a time
//! budget is spent. Time is measured by the delays spent between polls, so
//! the budget holds on any [`DelayNs`] implementation without a running
//! monotonic clock.

use core::fmt;

use embedded_hal::delay::DelayNs;

/// The polled condition did not become true within the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timed out")
    }
}

impl core::error::Error for TimedOut {}

/// A polling budget: check every `interval`, give up after `budget`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout {
    budget_us: u32,
    interval_us: u32,
}

impl Timeout {
    /// Budget and poll interval in microseconds
    pub const fn micros(budget_us: u32, interval_us: u32) -> Self {
        Self {
            budget_us,
            interval_us: if interval_us == 0 { 1 } else { interval_us },
        }
    }

    /// Budget and poll interval in milliseconds
    ///
    /// Both saturate at `u32::MAX` microseconds, a little over 71 minutes.
    pub const fn millis(budget_ms: u32, interval_ms: u32) -> Self {
        Self::micros(budget_ms.saturating_mul(1000), interval_ms.saturating_mul(1000))
    }

    /// Total wait budget in microseconds
    pub const fn budget_us(&self) -> u32 {
        self.budget_us
    }

    /// Delay between two polls in microseconds
    pub const fn interval_us(&self) -> u32 {
        self.interval_us
    }

    /// Number of polls before giving up (the first one is immediate)
    pub const fn attempts(&self) -> u32 {
        self.budget_us / self.interval_us + 1
    }

    /// Poll `probe` until it yields a value or the budget is spent
    ///
    /// The first poll happens immediately, so an already-satisfied
    /// condition costs no delay.
    pub fn poll<D, T, F>(&self, delay: &mut D, mut probe: F) -> Result<T, TimedOut>
    where
        D: DelayNs,
        F: FnMut() -> Option<T>,
    {
        let mut elapsed_us: u32 = 0;
        loop {
            if let Some(value) = probe() {
                return Ok(value);
            }
            if elapsed_us >= self.budget_us {
                return Err(TimedOut);
            }
            delay.delay_us(self.interval_us);
            elapsed_us = elapsed_us.saturating_add(self.interval_us);
        }
    }

    /// Poll `condition` until it is true or the budget is spent
    pub fn wait_until<D, F>(&self, delay: &mut D, mut condition: F) -> Result<(), TimedOut>
    where
        D: DelayNs,
        F: FnMut() -> bool,
    {
        self.poll(delay, || condition().then_some(()))
    }
}
