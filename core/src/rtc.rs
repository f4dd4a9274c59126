//! RTC facade
//!
//! [`Rtc`] owns a backend and a delay provider and is what application
//! code talks to. Both timestamp-shaped and calendar-shaped accessors
//! work on either backend.

use embedded_hal::delay::DelayNs;

use crate::alarm::AlarmState;
use crate::backend::RtcBackend;
use crate::calendar::{CalendarTime, Timestamp};
use crate::config::RtcConfig;
use crate::error::RtcError;

/// Real-time clock
pub struct Rtc<B, D> {
    backend: B,
    delay: D,
    config: RtcConfig,
    alarm: AlarmState,
}

impl<B: RtcBackend, D: DelayNs> Rtc<B, D> {
    pub fn new(backend: B, delay: D, config: RtcConfig) -> Self {
        Self {
            backend,
            delay,
            config,
            alarm: AlarmState::Disabled,
        }
    }

    /// Current time as seconds since 1970-01-01 00:00:00
    pub fn get_time_t(&mut self) -> Result<Timestamp, RtcError> {
        self.backend.get_timestamp()
    }

    /// Current calendar time
    pub fn get_time(&mut self) -> Result<CalendarTime, RtcError> {
        self.backend.read()
    }

    pub fn set_time_t(&mut self, timestamp: Timestamp) -> Result<(), RtcError> {
        self.backend.set_timestamp(timestamp, &mut self.delay)
    }

    /// Set the calendar time
    ///
    /// A leap second (60) is stored as 59 after waiting one extra second,
    /// so the clock lands on the following minute on time.
    pub fn set_time(&mut self, time: &CalendarTime) -> Result<(), RtcError> {
        let (time, leap) = time.normalize_leap_second();
        if leap {
            info!("Leap second, storing :59 after a delay");
            self.delay.delay_ms(self.config.leap_second_delay_ms);
        }
        self.backend.write(&time, &mut self.delay)
    }

    /// Current time, or the epoch if the RTC cannot be read
    pub fn now(&mut self) -> Timestamp {
        match self.get_time_t() {
            Ok(now) => now,
            Err(e) => {
                error!("RTC read failed: {}", e);
                Timestamp::EPOCH
            }
        }
    }

    pub fn get_alarm_t(&mut self) -> Result<Timestamp, RtcError> {
        self.backend.get_alarm_timestamp()
    }

    /// Next alarm as calendar time
    pub fn get_alarm(&mut self) -> Result<CalendarTime, RtcError> {
        Ok(CalendarTime::try_from_timestamp(self.get_alarm_t()?)?)
    }

    /// Arm the alarm for `at`
    pub fn set_alarm_t(&mut self, at: Timestamp) -> Result<(), RtcError> {
        self.backend.set_alarm_timestamp(at, &mut self.delay)?;
        self.alarm = AlarmState::Armed;
        info!("Alarm armed for {}", at.as_secs());
        Ok(())
    }

    pub fn set_alarm(&mut self, at: &CalendarTime) -> Result<(), RtcError> {
        self.set_alarm_t(at.to_timestamp())
    }

    pub fn disable_alarm(&mut self) -> Result<(), RtcError> {
        self.backend.disable_alarm()?;
        self.alarm = AlarmState::Disabled;
        info!("Alarm disarmed");
        Ok(())
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm
    }

    pub fn config(&self) -> &RtcConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub(crate) fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    pub fn release(self) -> (B, D) {
        (self.backend, self.delay)
    }
}
