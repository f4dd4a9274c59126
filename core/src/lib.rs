//! Platform-agnostic RTC timekeeping
//!
//! This crate contains the timekeeping logic shared by every supported
//! board. It has NO hardware dependencies: peripherals are reached through
//! the `rtclock-hal` traits, which board crates implement.
//!
//! ## Architecture
//! - [`calendar`]: timestamp <-> calendar conversion, weekday, day-of-year
//! - [`backend`]: one [`RtcBackend`] contract over two peripheral kinds,
//!   a calendar-register RTC and a 32-bit seconds counter RTC
//! - [`clock_source`]: picks and persists the RTC oscillator across resets
//! - [`alarm`]: interrupt-side alarm handling
//! - [`rtc`]: the [`Rtc`] facade the rest of the firmware talks to
//! - [`time_set`]: the operator dialogue that sets the clock over a serial line
//!
//! ## Usage
//! ```ignore
//! let mut rtc = Rtc::new(CounterBackend::new(regs, &config), delay, config);
//! let source = clock_source::initialize(&mut clocks, &mut rtc);
//! TimeSetProtocol::new(key, serial, TimeSetConfig::default()).run(&mut rtc);
//! let now = rtc.get_time()?;
//! ```

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod backend;
pub mod calendar;
pub mod clock_source;
pub mod config;
pub mod error;
pub mod rtc;
pub mod time_set;
pub mod timeout;

#[cfg(test)]
mod testing;

pub use alarm::{AlarmCallback, AlarmHandler, AlarmState};
pub use backend::{CalendarBackend, CounterBackend, RtcBackend};
pub use calendar::{CalendarError, CalendarTime, Timestamp};
pub use clock_source::{ClockSourceMarker, StartupReport};
pub use config::{RtcConfig, TimeSetConfig};
pub use error::RtcError;
pub use rtc::Rtc;
pub use time_set::{parse_date_time, ParseError, TimeSetOutcome, TimeSetProtocol, TimeSetState};
pub use timeout::{TimedOut, Timeout};

pub use rtclock_hal::ClockSource;
