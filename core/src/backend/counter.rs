//! 32-bit seconds counter RTC (STM32F1 family)

use embedded_hal::delay::DelayNs;
use rtclock_hal::CounterRegisters;

use super::RtcBackend;
use crate::calendar::{CalendarTime, Timestamp};
use crate::config::RtcConfig;
use crate::error::RtcError;
use crate::timeout::Timeout;

/// RTC whose hardware only counts seconds since the epoch
///
/// The counter and alarm registers are 32 bits wide, split into 16-bit
/// halves, and may only be written inside the peripheral's configuration
/// mode. Each write completes asynchronously; the backend waits for the
/// previous operation before starting and for its own before returning.
pub struct CounterBackend<R> {
    regs: R,
    register_sync: Timeout,
}

impl<R: CounterRegisters> CounterBackend<R> {
    pub fn new(regs: R, config: &RtcConfig) -> Self {
        Self {
            regs,
            register_sync: config.register_sync,
        }
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn release(self) -> R {
        self.regs
    }

    /// Alarm matched and has not been acknowledged yet
    ///
    /// For callers that poll instead of taking the interrupt.
    pub fn alarm_pending(&self) -> bool {
        self.regs.alarm_pending()
    }

    /// Run one configuration-mode write of a 32-bit register
    fn commit<D, F>(&mut self, value: u32, delay: &mut D, write: F) -> Result<(), RtcError>
    where
        D: DelayNs,
        F: FnOnce(&mut R, u16, u16),
    {
        self.regs.enable_backup_access();

        let regs = &self.regs;
        if self
            .register_sync
            .wait_until(delay, || regs.operation_complete())
            .is_err()
        {
            warn!("RTC still busy with a previous write");
            return Err(RtcError::RegisterBusy);
        }

        self.regs.enter_config();
        write(&mut self.regs, value as u16, (value >> 16) as u16);
        self.regs.exit_config();

        let regs = &self.regs;
        if self
            .register_sync
            .wait_until(delay, || regs.operation_complete())
            .is_err()
        {
            error!("RTC write did not complete");
            return Err(RtcError::RegisterBusy);
        }
        Ok(())
    }
}

fn to_counter(timestamp: Timestamp) -> Result<u32, RtcError> {
    u32::try_from(timestamp.as_secs()).map_err(|_| RtcError::OutOfRange)
}

impl<R: CounterRegisters> RtcBackend for CounterBackend<R> {
    fn read(&mut self) -> Result<CalendarTime, RtcError> {
        Ok(CalendarTime::from_timestamp(self.get_timestamp()?))
    }

    fn write<D: DelayNs>(&mut self, time: &CalendarTime, delay: &mut D) -> Result<(), RtcError> {
        self.set_timestamp(time.to_timestamp(), delay)
    }

    fn get_timestamp(&mut self) -> Result<Timestamp, RtcError> {
        Ok(Timestamp::from(self.regs.counter()))
    }

    fn set_timestamp<D: DelayNs>(&mut self, timestamp: Timestamp, delay: &mut D) -> Result<(), RtcError> {
        let counter = to_counter(timestamp)?;
        self.commit(counter, delay, |regs, low, high| regs.write_counter(low, high))?;
        debug!("RTC counter set to {}", counter);
        Ok(())
    }

    fn get_alarm_timestamp(&mut self) -> Result<Timestamp, RtcError> {
        Ok(Timestamp::from(self.regs.alarm()))
    }

    fn set_alarm_timestamp<D: DelayNs>(&mut self, at: Timestamp, delay: &mut D) -> Result<(), RtcError> {
        let alarm = to_counter(at)?;
        self.commit(alarm, delay, |regs, low, high| regs.write_alarm(low, high))?;

        // A stale match must not fire the new alarm
        self.regs.clear_alarm_flag();
        self.regs.set_alarm_interrupt(true);
        self.regs.set_alarm_exti(true);

        debug!("RTC alarm armed for {}", alarm);
        Ok(())
    }

    fn disable_alarm(&mut self) -> Result<(), RtcError> {
        self.regs.set_alarm_interrupt(false);
        self.regs.set_alarm_exti(false);
        self.regs.clear_alarm_flag();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CounterOp, FakeCounterRtc, FakeDelay};

    fn backend(regs: FakeCounterRtc) -> CounterBackend<FakeCounterRtc> {
        CounterBackend::new(regs, &RtcConfig::default())
    }

    #[test]
    fn test_read_converts_counter() {
        let mut rtc = backend(FakeCounterRtc::with_counter(1_717_243_200));
        let time = rtc.read().unwrap();

        assert_eq!(time, CalendarTime::new(2024, 5, 1, 12, 0, 0).unwrap());
        assert_eq!(time.weekday(), 6);
        assert_eq!(rtc.get_timestamp(), Ok(Timestamp::from_secs(1_717_243_200)));
    }

    #[test]
    fn test_write_sequence() {
        let mut rtc = backend(FakeCounterRtc::default());
        let mut delay = FakeDelay::default();

        rtc.set_timestamp(Timestamp::from_secs(0x1234_5678), &mut delay)
            .unwrap();

        assert_eq!(
            rtc.registers().ops,
            [
                CounterOp::EnableBackup,
                CounterOp::EnterConfig,
                CounterOp::WriteCounter(0x5678, 0x1234),
                CounterOp::ExitConfig,
            ]
        );
        assert_eq!(rtc.registers().counter, 0x1234_5678);
        assert_eq!(delay.elapsed_us(), 0);
    }

    #[test]
    fn test_write_calendar_time() {
        let mut rtc = backend(FakeCounterRtc::default());
        let mut delay = FakeDelay::default();
        let time = CalendarTime::new(2024, 5, 1, 12, 0, 0).unwrap();

        rtc.write(&time, &mut delay).unwrap();
        assert_eq!(rtc.registers().counter, 1_717_243_200);
    }

    #[test]
    fn test_write_beyond_counter_range() {
        let mut rtc = backend(FakeCounterRtc::default());
        let mut delay = FakeDelay::default();

        let last = Timestamp::from(u32::MAX);
        assert_eq!(rtc.set_timestamp(last, &mut delay), Ok(()));
        assert_eq!(rtc.get_timestamp(), Ok(last));

        // 2106-02-07 06:28:16
        let past_end = CalendarTime::from_timestamp(Timestamp::from_secs(u32::MAX as u64 + 1));
        rtc.registers_mut().ops.clear();
        assert_eq!(rtc.write(&past_end, &mut delay), Err(RtcError::OutOfRange));
        assert!(rtc.registers().ops.is_empty());
    }

    #[test]
    fn test_write_never_completes() {
        let mut regs = FakeCounterRtc::with_counter(42);
        regs.stuck = true;
        let mut rtc = backend(regs);
        let mut delay = FakeDelay::default();

        assert_eq!(
            rtc.set_timestamp(Timestamp::from_secs(7), &mut delay),
            Err(RtcError::RegisterBusy)
        );
        assert_eq!(delay.elapsed_us(), 10_000);
        assert!(!rtc.registers().ops.contains(&CounterOp::EnterConfig));
        assert_eq!(rtc.registers().counter, 42);
    }

    #[test]
    fn test_alarm_round_trip() {
        let mut rtc = backend(FakeCounterRtc::default());
        let mut delay = FakeDelay::default();

        for secs in [0, 1, 0x0001_0000, 1_717_243_200, u32::MAX as u64] {
            let at = Timestamp::from_secs(secs);
            rtc.set_alarm_timestamp(at, &mut delay).unwrap();
            assert_eq!(rtc.get_alarm_timestamp(), Ok(at));
        }
    }

    #[test]
    fn test_set_alarm_arms_interrupt() {
        let mut regs = FakeCounterRtc::default();
        regs.alarm_flag = true;
        let mut rtc = backend(regs);
        let mut delay = FakeDelay::default();

        rtc.set_alarm_timestamp(Timestamp::from_secs(100), &mut delay)
            .unwrap();

        let regs = rtc.registers();
        assert_eq!(
            regs.ops,
            [
                CounterOp::EnableBackup,
                CounterOp::EnterConfig,
                CounterOp::WriteAlarm(100, 0),
                CounterOp::ExitConfig,
                CounterOp::ClearAlarmFlag,
                CounterOp::AlarmInterrupt(true),
                CounterOp::AlarmExti(true),
            ]
        );
        assert!(!regs.alarm_flag);
        assert!(regs.alarm_irq && regs.alarm_exti);
    }

    #[test]
    fn test_alarm_beyond_counter_range() {
        let mut rtc = backend(FakeCounterRtc::default());
        let mut delay = FakeDelay::default();

        assert_eq!(
            rtc.set_alarm_timestamp(Timestamp::from_secs(u32::MAX as u64 + 1), &mut delay),
            Err(RtcError::OutOfRange)
        );
        assert!(!rtc.registers().alarm_irq);
    }

    #[test]
    fn test_disable_alarm() {
        let mut rtc = backend(FakeCounterRtc::default());
        let mut delay = FakeDelay::default();

        rtc.set_alarm_timestamp(Timestamp::from_secs(5), &mut delay)
            .unwrap();
        rtc.disable_alarm().unwrap();

        let regs = rtc.registers();
        assert!(!regs.alarm_irq);
        assert!(!regs.alarm_exti);
        assert_eq!(regs.alarm, 5);
    }

    #[test]
    fn test_disable_clears_pending_alarm() {
        let mut rtc = backend(FakeCounterRtc::default());
        rtc.registers_mut().alarm_flag = true;
        assert!(rtc.alarm_pending());

        rtc.disable_alarm().unwrap();
        assert!(!rtc.alarm_pending());
    }
}
