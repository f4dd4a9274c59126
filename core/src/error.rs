//! RTC error types

use crate::calendar::CalendarError;
use crate::timeout::TimedOut;

/// RTC operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcError {
    /// The backend does not provide this capability
    Unsupported,
    /// The peripheral never reported the register operation as finished
    RegisterBusy,
    /// The value cannot be represented by the hardware registers
    OutOfRange,
    /// Invalid calendar fields
    Calendar(CalendarError),
}

impl core::fmt::Display for RtcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "Not supported by this RTC"),
            Self::RegisterBusy => write!(f, "RTC register operation timed out"),
            Self::OutOfRange => write!(f, "Time not representable by this RTC"),
            Self::Calendar(e) => write!(f, "Invalid calendar time: {}", e),
        }
    }
}

impl core::error::Error for RtcError {}

impl From<CalendarError> for RtcError {
    fn from(e: CalendarError) -> Self {
        Self::Calendar(e)
    }
}

impl From<TimedOut> for RtcError {
    fn from(_: TimedOut) -> Self {
        Self::RegisterBusy
    }
}
