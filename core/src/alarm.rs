//! Alarm interrupt handling
//!
//! The alarm interrupt fires once the counter matches the alarm register.
//! [`AlarmHandler`] is meant to live in a `static` so the interrupt
//! handler and the task that arms the alarm can share it.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use rtclock_hal::AlarmAcknowledge;

use crate::calendar::Timestamp;

/// Whether an alarm has been armed through [`crate::Rtc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmState {
    Disabled,
    Armed,
}

/// User hook run from the alarm interrupt with the current time
pub type AlarmCallback = fn(Timestamp);

/// Interrupt-side alarm state
pub struct AlarmHandler {
    callback: Mutex<Cell<Option<AlarmCallback>>>,
    fired: AtomicU32,
}

impl AlarmHandler {
    pub const fn new() -> Self {
        Self {
            callback: Mutex::new(Cell::new(None)),
            fired: AtomicU32::new(0),
        }
    }

    /// Install (or clear) the function called when the alarm fires
    pub fn set_callback(&self, callback: Option<AlarmCallback>) {
        critical_section::with(|cs| self.callback.borrow(cs).set(callback));
    }

    /// Number of alarm interrupts serviced so far
    pub fn fired_count(&self) -> u32 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Service the alarm interrupt
    ///
    /// Clears the pending flag first so the interrupt does not re-enter,
    /// then runs the callback. Without a callback the event is only logged.
    pub fn on_interrupt<A: AlarmAcknowledge>(&self, hw: &mut A, now: Timestamp) {
        hw.acknowledge_alarm();
        self.fired.fetch_add(1, Ordering::Relaxed);

        let callback = critical_section::with(|cs| self.callback.borrow(cs).get());
        match callback {
            Some(callback) => callback(now),
            None => info!("Alarm! at {}", now.as_secs()),
        }
    }
}

impl Default for AlarmHandler {
    fn default() -> Self {
        Self::new()
    }
}
