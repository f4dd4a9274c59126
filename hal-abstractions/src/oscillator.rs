//! Low-speed oscillators feeding the RTC

/// RTC clock source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// External 32.768 kHz crystal (LSE)
    External,
    /// Internal RC oscillator (LSI), the fallback
    Internal,
}

/// Control over the RTC's candidate clock sources
pub trait LowSpeedOscillators {
    /// Switch the external oscillator on. Does not wait.
    fn start_external(&mut self);

    /// `true` once the external oscillator reports stable.
    fn external_ready(&self) -> bool;

    /// Switch the internal oscillator on. Does not wait.
    fn start_internal(&mut self);

    /// `true` once the internal oscillator reports stable.
    fn internal_ready(&self) -> bool;

    /// Route `source` to the RTC and enable the RTC clock.
    fn route_to_rtc(&mut self, source: ClockSource);
}
