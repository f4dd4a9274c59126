//! RTC clock source selection
//!
//! The external crystal (LSE) is preferred. If it does not start within the
//! probe budget the internal RC oscillator (LSI) is used instead. The choice
//! is recorded in backup register DR1, which survives resets as long as the
//! backup domain stays powered, so later boots skip the probe.
//!
//! Whenever the source is (re)selected the RTC time is reset to the
//! backend's epoch: the counter kept running from an unknown clock, or not
//! at all, and its value cannot be trusted.

use embedded_hal::delay::DelayNs;
use rtclock_hal::{BackupRegisters, ClockSource, LowSpeedOscillators};

use crate::backend::RtcBackend;
use crate::config::{EXTERNAL_TAG, INTERNAL_TAG, MARKER_REGISTER};
use crate::rtc::Rtc;

/// Decoded content of the clock-source marker register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSourceMarker {
    /// Backup domain was reset, or holds a value we did not write
    Unset,
    External,
    Internal,
}

impl ClockSourceMarker {
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            EXTERNAL_TAG => Self::External,
            INTERNAL_TAG => Self::Internal,
            _ => Self::Unset,
        }
    }

    /// Register value, `None` for [`ClockSourceMarker::Unset`]
    pub const fn raw(self) -> Option<u16> {
        match self {
            Self::Unset => None,
            Self::External => Some(EXTERNAL_TAG),
            Self::Internal => Some(INTERNAL_TAG),
        }
    }

    pub const fn source(self) -> Option<ClockSource> {
        match self {
            Self::Unset => None,
            Self::External => Some(ClockSource::External),
            Self::Internal => Some(ClockSource::Internal),
        }
    }
}

impl From<ClockSource> for ClockSourceMarker {
    fn from(source: ClockSource) -> Self {
        match source {
            ClockSource::External => Self::External,
            ClockSource::Internal => Self::Internal,
        }
    }
}

/// What happened during clock-source initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartupReport {
    pub source: ClockSource,
    /// The source was selected on this boot and the time reset to the epoch
    pub reset: bool,
}

pub fn read_marker<H: BackupRegisters>(hw: &H) -> ClockSourceMarker {
    ClockSourceMarker::from_raw(hw.read_backup(MARKER_REGISTER))
}

/// Select the RTC clock source and return it
pub fn initialize<H, B, D>(hw: &mut H, rtc: &mut Rtc<B, D>) -> ClockSource
where
    H: BackupRegisters + LowSpeedOscillators,
    B: RtcBackend,
    D: DelayNs,
{
    initialize_with_report(hw, rtc).source
}

/// Select the RTC clock source, reporting whether the time was reset
pub fn initialize_with_report<H, B, D>(hw: &mut H, rtc: &mut Rtc<B, D>) -> StartupReport
where
    H: BackupRegisters + LowSpeedOscillators,
    B: RtcBackend,
    D: DelayNs,
{
    let probe = rtc.config().oscillator_probe;

    match read_marker(hw) {
        ClockSourceMarker::External => {
            debug!("RTC clocked from LSE");
            StartupReport {
                source: ClockSource::External,
                reset: false,
            }
        }
        ClockSourceMarker::Internal => {
            // LSI is not part of the backup domain and stops on reset
            hw.start_internal();
            if probe.wait_until(rtc.delay_mut(), || hw.internal_ready()).is_err() {
                warn!("LSI not ready");
            }
            debug!("RTC clocked from LSI");
            StartupReport {
                source: ClockSource::Internal,
                reset: false,
            }
        }
        ClockSourceMarker::Unset => {
            hw.enable_backup_access();
            hw.start_external();

            let source = if probe.wait_until(rtc.delay_mut(), || hw.external_ready()).is_ok() {
                info!("LSE started");
                ClockSource::External
            } else {
                warn!("LSE failed to start, falling back to LSI");
                hw.start_internal();
                if probe.wait_until(rtc.delay_mut(), || hw.internal_ready()).is_err() {
                    warn!("LSI not ready");
                }
                ClockSource::Internal
            };

            hw.route_to_rtc(source);
            if let Some(raw) = ClockSourceMarker::from(source).raw() {
                hw.write_backup(MARKER_REGISTER, raw);
            }

            let epoch = rtc.backend().epoch();
            match rtc.set_time_t(epoch) {
                Ok(()) => warn!("RTC was reset, time set to epoch"),
                Err(e) => error!("RTC time reset failed: {}", e),
            }

            StartupReport { source, reset: true }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CalendarBackend, CounterBackend};
    use crate::calendar::Timestamp;
    use crate::config::RtcConfig;
    use crate::testing::{FakeCalendarRtc, FakeClockHardware, FakeCounterRtc, FakeDelay, VirtualTime};

    fn counter_rtc(time: &VirtualTime, counter: u32) -> Rtc<CounterBackend<FakeCounterRtc>, FakeDelay> {
        let config = RtcConfig::default();
        Rtc::new(
            CounterBackend::new(FakeCounterRtc::with_counter(counter), &config),
            time.delay(),
            config,
        )
    }

    #[test]
    fn test_marker_decoding() {
        assert_eq!(ClockSourceMarker::from_raw(0x8800), ClockSourceMarker::External);
        assert_eq!(ClockSourceMarker::from_raw(0x8801), ClockSourceMarker::Internal);
        assert_eq!(ClockSourceMarker::from_raw(0), ClockSourceMarker::Unset);
        assert_eq!(ClockSourceMarker::from_raw(0x8802), ClockSourceMarker::Unset);
        assert_eq!(ClockSourceMarker::External.raw(), Some(0x8800));
        assert_eq!(ClockSourceMarker::Unset.raw(), None);
    }

    #[test]
    fn test_external_marker_is_trusted() {
        let time = VirtualTime::default();
        let mut hw = FakeClockHardware::new(&time).with_marker(0x8800);
        let mut rtc = counter_rtc(&time, 1_717_243_200);

        let report = initialize_with_report(&mut hw, &mut rtc);

        assert_eq!(report, StartupReport { source: ClockSource::External, reset: false });
        assert_eq!(rtc.get_time_t(), Ok(Timestamp::from_secs(1_717_243_200)));
        assert_eq!(time.now_us(), 0);
        assert_eq!(hw.external_started_at, None);
        assert_eq!(hw.routed, None);
        assert!(rtc.backend().registers().ops.is_empty());
    }

    #[test]
    fn test_internal_marker_restarts_lsi() {
        let time = VirtualTime::default();
        let mut hw = FakeClockHardware::new(&time).with_marker(0x8801);
        let mut rtc = counter_rtc(&time, 500);

        assert_eq!(initialize(&mut hw, &mut rtc), ClockSource::Internal);
        assert!(hw.internal_on);
        assert_eq!(hw.external_started_at, None);
        assert_eq!(rtc.get_time_t(), Ok(Timestamp::from_secs(500)));
        assert_eq!(hw.backup[1], 0x8801);
    }

    #[test]
    fn test_unset_marker_selects_lse_and_resets() {
        let time = VirtualTime::default();
        let mut hw = FakeClockHardware::new(&time).crystal_starts_after_ms(300);
        let mut rtc = counter_rtc(&time, 1_717_243_200);

        let report = initialize_with_report(&mut hw, &mut rtc);

        assert_eq!(report, StartupReport { source: ClockSource::External, reset: true });
        assert_eq!(hw.routed, Some(ClockSource::External));
        assert_eq!(hw.backup[1], 0x8800);
        assert_eq!(rtc.get_time_t(), Ok(Timestamp::EPOCH));
        assert_eq!(time.now_us(), 300_000);
        assert!(!hw.internal_on);
    }

    #[test]
    fn test_garbage_marker_is_treated_as_unset() {
        let time = VirtualTime::default();
        let mut hw = FakeClockHardware::new(&time).with_marker(0x1234);
        let mut rtc = counter_rtc(&time, 99);

        let report = initialize_with_report(&mut hw, &mut rtc);

        assert!(report.reset);
        assert_eq!(read_marker(&hw), ClockSourceMarker::External);
        assert_eq!(rtc.get_time_t(), Ok(Timestamp::EPOCH));
    }

    #[test]
    fn test_dead_crystal_falls_back_to_lsi() {
        let time = VirtualTime::default();
        let mut hw = FakeClockHardware::new(&time).dead_crystal();
        let mut rtc = counter_rtc(&time, 1_717_243_200);

        let report = initialize_with_report(&mut hw, &mut rtc);

        assert_eq!(report, StartupReport { source: ClockSource::Internal, reset: true });
        assert_eq!(hw.routed, Some(ClockSource::Internal));
        assert_eq!(hw.backup[1], 0x8801);
        assert_eq!(time.now_us(), 1_000_000);
        assert_eq!(hw.external_polls.get(), RtcConfig::default().oscillator_probe.attempts());
        assert_eq!(rtc.get_time_t(), Ok(Timestamp::EPOCH));
    }

    #[test]
    fn test_second_boot_takes_fast_path() {
        let time = VirtualTime::default();
        let mut hw = FakeClockHardware::new(&time).dead_crystal();
        let mut rtc = counter_rtc(&time, 0);
        initialize(&mut hw, &mut rtc);

        rtc.set_time_t(Timestamp::from_secs(1_000)).unwrap();
        let before = time.now_us();

        let report = initialize_with_report(&mut hw, &mut rtc);
        assert_eq!(report, StartupReport { source: ClockSource::Internal, reset: false });
        assert_eq!(time.now_us(), before);
        assert_eq!(rtc.get_time_t(), Ok(Timestamp::from_secs(1_000)));
    }

    #[test]
    fn test_calendar_backend_resets_to_2000() {
        let time = VirtualTime::default();
        let config = RtcConfig::default();
        let mut hw = FakeClockHardware::new(&time);
        let mut rtc = Rtc::new(
            CalendarBackend::new(FakeCalendarRtc::default(), &config),
            time.delay(),
            config,
        );
        rtc.set_time_t(Timestamp::from_secs(1_717_243_200)).unwrap();

        initialize(&mut hw, &mut rtc);
        assert_eq!(rtc.get_time_t(), Ok(Timestamp::from_secs(946_684_800)));
    }
}
