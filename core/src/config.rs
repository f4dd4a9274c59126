//! RTC and operator-dialogue configuration

use crate::timeout::Timeout;

/// Backup data register holding the clock-source marker (DR1)
pub const MARKER_REGISTER: usize = 1;

/// Marker value: RTC runs from the external oscillator
pub const EXTERNAL_TAG: u16 = 0x8800;

/// Marker value: RTC runs from the internal oscillator
pub const INTERNAL_TAG: u16 = 0x8801;

/// RTC driver configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcConfig {
    /// External oscillator start-up budget before falling back to the internal one
    pub oscillator_probe: Timeout,
    /// Budget for the peripheral to finish a register operation or enter init mode
    pub register_sync: Timeout,
    /// Delay inserted when a leap second (60) is written as 59
    pub leap_second_delay_ms: u32,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            // 200 polls, 5 ms apart
            oscillator_probe: Timeout::millis(1000, 5),
            register_sync: Timeout::micros(10_000, 10),
            leap_second_delay_ms: 1000,
        }
    }
}

/// Interactive time-set dialogue configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeSetConfig {
    /// How long the operator has to press the key after boot
    pub arm_window: Timeout,
    /// How long the operator has to type the date/time line
    pub input_window: Timeout,
}

impl Default for TimeSetConfig {
    fn default() -> Self {
        Self {
            arm_window: Timeout::millis(1000, 10),
            input_window: Timeout::millis(10_000, 10),
        }
    }
}
