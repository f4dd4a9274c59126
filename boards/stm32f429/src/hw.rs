//! STM32F4 calendar RTC, backup registers and low-speed oscillators

use embassy_stm32::pac;
use embassy_stm32::pac::rcc::vals::Rtcsel;
use rtclock_hal::{
    BackupAccess, BackupRegisters, CalendarFields, CalendarRegisters, ClockSource,
    LowSpeedOscillators,
};

/// RTC_BKP0R..RTC_BKP19R
const BACKUP_REGISTERS: usize = 20;

/// (asynchronous, synchronous) prescalers giving 1 Hz from 32.768 kHz
const LSE_PREDIV: (u8, u16) = (127, 255);

/// LSI is nominally 32 kHz on this family
const LSI_PREDIV: (u8, u16) = (127, 249);

const SPIN_LIMIT: u32 = 100_000;

fn spin_until(mut done: impl FnMut() -> bool) -> bool {
    (0..SPIN_LIMIT).any(|_| done())
}

fn enable_backup_domain() {
    pac::RCC.apb1enr().modify(|w| w.set_pwren(true));
    pac::PWR.cr1().modify(|w| w.set_dbp(true));
}

fn unlock() {
    pac::RTC.wpr().write(|w| w.set_key(0xCA));
    pac::RTC.wpr().write(|w| w.set_key(0x53));
}

fn lock() {
    pac::RTC.wpr().write(|w| w.set_key(0xFF));
}

const fn bcd_split(value: u8) -> (u8, u8) {
    (value / 10, value % 10)
}

/// RCC/PWR side of the RTC plus the RTC backup registers
pub struct ClockControl {
    _private: (),
}

impl ClockControl {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl BackupAccess for ClockControl {
    fn enable_backup_access(&mut self) {
        enable_backup_domain();
    }
}

impl BackupRegisters for ClockControl {
    fn read_backup(&self, index: usize) -> u16 {
        if index < BACKUP_REGISTERS {
            pac::RTC.bkpr(index).read().bkp() as u16
        } else {
            0
        }
    }

    fn write_backup(&mut self, index: usize, value: u16) {
        if index < BACKUP_REGISTERS {
            pac::RTC.bkpr(index).write(|w| w.set_bkp(value as u32));
        } else {
            defmt::warn!("No backup register BKP{}R", index);
        }
    }
}

impl LowSpeedOscillators for ClockControl {
    fn start_external(&mut self) {
        pac::RCC.bdcr().modify(|w| w.set_lseon(true));
    }

    fn external_ready(&self) -> bool {
        pac::RCC.bdcr().read().lserdy()
    }

    fn start_internal(&mut self) {
        pac::RCC.csr().modify(|w| w.set_lsion(true));
    }

    fn internal_ready(&self) -> bool {
        pac::RCC.csr().read().lsirdy()
    }

    fn route_to_rtc(&mut self, source: ClockSource) {
        let (rtcsel, (prediv_a, prediv_s)) = match source {
            ClockSource::External => (Rtcsel::LSE, LSE_PREDIV),
            ClockSource::Internal => (Rtcsel::LSI, LSI_PREDIV),
        };
        pac::RCC.bdcr().modify(|w| {
            w.set_rtcsel(rtcsel);
            w.set_rtcen(true);
        });

        // PRER is only writable in initialization mode
        unlock();
        pac::RTC.isr().modify(|w| w.set_init(true));
        if spin_until(|| pac::RTC.isr().read().initf()) {
            pac::RTC.prer().modify(|w| {
                w.set_prediv_a(prediv_a);
                w.set_prediv_s(prediv_s);
            });
        } else {
            defmt::error!("RTC did not enter initialization mode, prescaler not loaded");
        }
        pac::RTC.isr().modify(|w| w.set_init(false));
        lock();
    }
}

/// RTC time, date and control registers
pub struct CalendarRtc {
    _private: (),
}

impl CalendarRtc {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl BackupAccess for CalendarRtc {
    fn enable_backup_access(&mut self) {
        enable_backup_domain();
    }
}

impl CalendarRegisters for CalendarRtc {
    fn read_fields(&mut self) -> CalendarFields {
        // Wait for the shadow registers to catch up with the calendar
        pac::RTC.isr().modify(|w| w.set_rsf(false));
        if !spin_until(|| pac::RTC.isr().read().rsf()) {
            defmt::debug!("RTC shadow registers not synchronised");
        }

        // Reading TR freezes DR until DR is read
        let tr = pac::RTC.tr().read();
        let dr = pac::RTC.dr().read();

        CalendarFields {
            year: dr.yt() * 10 + dr.yu(),
            month: dr.mt() as u8 * 10 + dr.mu(),
            day: dr.dt() * 10 + dr.du(),
            weekday: dr.wdu(),
            hours: tr.ht() * 10 + tr.hu(),
            minutes: tr.mnt() * 10 + tr.mnu(),
            seconds: tr.st() * 10 + tr.su(),
        }
    }

    fn unlock(&mut self) {
        unlock();
    }

    fn lock(&mut self) {
        lock();
    }

    fn enter_init(&mut self) {
        pac::RTC.isr().modify(|w| w.set_init(true));
    }

    fn init_ready(&self) -> bool {
        pac::RTC.isr().read().initf()
    }

    fn exit_init(&mut self) {
        pac::RTC.isr().modify(|w| w.set_init(false));
    }

    fn write_fields(&mut self, fields: &CalendarFields) {
        let (ht, hu) = bcd_split(fields.hours);
        let (mnt, mnu) = bcd_split(fields.minutes);
        let (st, su) = bcd_split(fields.seconds);
        // A fresh TR value is 24-hour, AM
        pac::RTC.tr().write(|w| {
            w.set_ht(ht);
            w.set_hu(hu);
            w.set_mnt(mnt);
            w.set_mnu(mnu);
            w.set_st(st);
            w.set_su(su);
        });

        let (yt, yu) = bcd_split(fields.year);
        let (mt, mu) = bcd_split(fields.month);
        let (dt, du) = bcd_split(fields.day);
        pac::RTC.dr().write(|w| {
            w.set_yt(yt);
            w.set_yu(yu);
            w.set_wdu(fields.weekday);
            w.set_mt(mt > 0);
            w.set_mu(mu);
            w.set_dt(dt);
            w.set_du(du);
        });
    }

    fn daylight_saving(&self) -> bool {
        pac::RTC.cr().read().bkp()
    }

    fn set_daylight_saving(&mut self, active: bool) {
        pac::RTC.cr().modify(|w| w.set_bkp(active));
    }
}
