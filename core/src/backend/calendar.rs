//! Calendar-register RTC (STM32F4 family)

use embedded_hal::delay::DelayNs;
use rtclock_hal::{CalendarFields, CalendarRegisters};

use super::RtcBackend;
use crate::calendar::{CalendarError, CalendarTime, Timestamp};
use crate::config::RtcConfig;
use crate::error::RtcError;
use crate::timeout::Timeout;

/// Year represented by a two-digit year register of 0
const BASE_YEAR: u16 = 2000;

const LAST_YEAR: u16 = BASE_YEAR + 99;

/// 2000-01-01 00:00:00
const BASE_TIMESTAMP: Timestamp = Timestamp::from_secs(946_684_800);

/// RTC whose hardware keeps the broken-down date and time
///
/// Timestamps are computed on the fly from the registers. The peripheral
/// has no alarm support wired up, so alarm operations report
/// [`RtcError::Unsupported`].
pub struct CalendarBackend<R> {
    regs: R,
    register_sync: Timeout,
}

impl<R: CalendarRegisters> CalendarBackend<R> {
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

    fn to_fields(time: &CalendarTime) -> Result<CalendarFields, RtcError> {
        if !(BASE_YEAR..=LAST_YEAR).contains(&time.year()) {
            return Err(RtcError::OutOfRange);
        }

        Ok(CalendarFields {
            year: (time.year() - BASE_YEAR) as u8,
            month: time.month() + 1,
            day: time.day(),
            // Hardware counts Monday = 1 .. Sunday = 7
            weekday: match time.weekday() {
                0 => 7,
                d => d,
            },
            hours: time.hour(),
            minutes: time.minute(),
            seconds: time.second().min(59),
        })
    }

    fn from_fields(fields: &CalendarFields) -> Result<CalendarTime, RtcError> {
        let month = fields
            .month
            .checked_sub(1)
            .ok_or(RtcError::Calendar(CalendarError::Month))?;

        // Weekday and day-of-year are recomputed, the hardware weekday is ignored
        Ok(CalendarTime::new(
            BASE_YEAR + fields.year as u16,
            month,
            fields.day,
            fields.hours,
            fields.minutes,
            fields.seconds,
        )?)
    }
}

impl<R: CalendarRegisters> RtcBackend for CalendarBackend<R> {
    fn read(&mut self) -> Result<CalendarTime, RtcError> {
        let fields = self.regs.read_fields();
        let time = Self::from_fields(&fields)?;
        Ok(time.with_dst(self.regs.daylight_saving()))
    }

    fn write<D: DelayNs>(&mut self, time: &CalendarTime, delay: &mut D) -> Result<(), RtcError> {
        let fields = Self::to_fields(time)?;

        self.regs.enable_backup_access();
        self.regs.unlock();
        self.regs.enter_init();

        let regs = &self.regs;
        if self.register_sync.wait_until(delay, || regs.init_ready()).is_err() {
            self.regs.exit_init();
            self.regs.lock();
            error!("RTC did not enter initialization mode");
            return Err(RtcError::RegisterBusy);
        }

        self.regs.write_fields(&fields);
        self.regs.exit_init();
        self.regs.set_daylight_saving(time.is_dst());
        self.regs.lock();

        debug!("RTC calendar written");
        Ok(())
    }

    fn get_alarm_timestamp(&mut self) -> Result<Timestamp, RtcError> {
        Err(RtcError::Unsupported)
    }

    fn set_alarm_timestamp<D: DelayNs>(&mut self, _at: Timestamp, _delay: &mut D) -> Result<(), RtcError> {
        Err(RtcError::Unsupported)
    }

    fn disable_alarm(&mut self) -> Result<(), RtcError> {
        Err(RtcError::Unsupported)
    }

    fn epoch(&self) -> Timestamp {
        BASE_TIMESTAMP
    }
}
