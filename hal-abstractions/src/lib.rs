//! Hardware abstraction traits for battery-backed real-time clocks
//!
//! This crate defines traits that abstract over hardware differences
//! between RTC peripherals. Board crates implement these traits on top of
//! their register blocks; `rtclock-core` drives them.
//!
//! The traits expose individual register operations rather than whole
//! procedures, so that the unlock / write / lock / wait-for-idle sequences
//! and their timeouts live in one hardware-independent place.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod backup;
pub mod calendar;
pub mod counter;
pub mod oscillator;

pub use backup::{BackupAccess, BackupRegisters};
pub use calendar::{CalendarFields, CalendarRegisters};
pub use counter::CounterRegisters;
pub use oscillator::{ClockSource, LowSpeedOscillators};

/// Acknowledgement of a fired RTC alarm
///
/// Called from interrupt context: implementations must only clear flags
/// and never wait on the peripheral.
pub trait AlarmAcknowledge {
    /// Clear the alarm match flag and the pending external interrupt line.
    fn acknowledge_alarm(&mut self);
}
