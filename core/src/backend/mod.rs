//! RTC backends
//!
//! Two structurally different peripherals behind one contract:
//! - [`CalendarBackend`]: the hardware keeps year/month/day/hour/min/sec
//!   in registers and has no notion of an epoch timestamp
//! - [`CounterBackend`]: the hardware only counts seconds in 32 bits and
//!   everything calendar-shaped is derived by conversion
//!
//! Board crates pick one at integration time; nothing above this module
//! needs to know which.

use embedded_hal::delay::DelayNs;

use crate::calendar::{CalendarTime, Timestamp};
use crate::error::RtcError;

mod calendar;
mod counter;

pub use calendar::CalendarBackend;
pub use counter::CounterBackend;

/// Timekeeping contract shared by all RTC peripherals
///
/// Operations that wait on the peripheral take the delay provider used to
/// pace their bounded polling.
pub trait RtcBackend {
    /// Read the current time
    fn read(&mut self) -> Result<CalendarTime, RtcError>;

    /// Write `time` to the hardware
    ///
    /// `time` must not carry a leap second; [`crate::Rtc::set_time`]
    /// normalises those before calling in.
    fn write<D: DelayNs>(&mut self, time: &CalendarTime, delay: &mut D) -> Result<(), RtcError>;

    /// Next alarm match as a timestamp
    fn get_alarm_timestamp(&mut self) -> Result<Timestamp, RtcError>;

    /// Arm the alarm for `at`
    fn set_alarm_timestamp<D: DelayNs>(&mut self, at: Timestamp, delay: &mut D) -> Result<(), RtcError>;

    /// Mask the alarm interrupt
    fn disable_alarm(&mut self) -> Result<(), RtcError>;

    /// Earliest instant the hardware can hold; the power-loss reset value
    fn epoch(&self) -> Timestamp {
        Timestamp::EPOCH
    }

    /// Current time as seconds since the epoch
    fn get_timestamp(&mut self) -> Result<Timestamp, RtcError> {
        self.read().map(|time| time.to_timestamp())
    }

    /// Set the time from seconds since the epoch
    fn set_timestamp<D: DelayNs>(&mut self, timestamp: Timestamp, delay: &mut D) -> Result<(), RtcError> {
        let time = CalendarTime::try_from_timestamp(timestamp).map_err(|_| RtcError::OutOfRange)?;
        self.write(&time, delay)
    }
}
