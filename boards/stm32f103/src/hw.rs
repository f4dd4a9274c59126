//! STM32F1 RTC, backup registers and low-speed oscillators
//!
//! Thin register-level implementations of the `rtclock-hal` traits. All
//! sequencing and timeouts live in `rtclock-core`; the only waits here are
//! the prescaler load during clock routing and the post-reset register
//! synchronisation, which have no caller-supplied budget.

use embassy_stm32::pac;
use embassy_stm32::pac::rcc::vals::Rtcsel;
use rtclock_hal::{
    AlarmAcknowledge, BackupAccess, BackupRegisters, ClockSource, CounterRegisters,
    LowSpeedOscillators,
};

/// EXTI line wired to the RTC alarm
const ALARM_EXTI_LINE: usize = 17;

/// Backup data registers DR1..DR10 (low-density register block)
const BACKUP_REGISTERS: usize = 10;

/// 32.768 kHz / (32767 + 1) = 1 Hz
const LSE_PRESCALER: u32 = 32_767;

/// LSI is nominally 40 kHz on this family
const LSI_PRESCALER: u32 = 39_999;

const SPIN_LIMIT: u32 = 100_000;

fn spin_until(mut done: impl FnMut() -> bool) -> bool {
    (0..SPIN_LIMIT).any(|_| done())
}

fn enable_backup_domain() {
    pac::RCC.apb1enr().modify(|w| {
        w.set_pwren(true);
        w.set_bkpen(true);
    });
    pac::PWR.cr().modify(|w| w.set_dbp(true));
}

/// Current counter value, safe to call from any context
pub fn counter_now() -> u32 {
    // CNTH and CNTL are not latched together
    loop {
        let high = pac::RTC.cnth().read().cnth();
        let low = pac::RTC.cntl().read().cntl();
        if pac::RTC.cnth().read().cnth() == high {
            return ((high as u32) << 16) | low as u32;
        }
    }
}

/// RCC/PWR/BKP side of the RTC
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
        match index.checked_sub(1) {
            Some(n) if n < BACKUP_REGISTERS => pac::BKP.dr(n).read().d(),
            _ => 0,
        }
    }

    fn write_backup(&mut self, index: usize, value: u16) {
        match index.checked_sub(1) {
            Some(n) if n < BACKUP_REGISTERS => pac::BKP.dr(n).write(|w| w.set_d(value)),
            _ => defmt::warn!("No backup register DR{}", index),
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
        let (rtcsel, prescaler) = match source {
            ClockSource::External => (Rtcsel::LSE, LSE_PRESCALER),
            ClockSource::Internal => (Rtcsel::LSI, LSI_PRESCALER),
        };
        pac::RCC.bdcr().modify(|w| {
            w.set_rtcsel(rtcsel);
            w.set_rtcen(true);
        });

        // PRL is only writable in configuration mode
        if !spin_until(|| pac::RTC.crl().read().rtoff()) {
            defmt::error!("RTC busy, prescaler not loaded");
            return;
        }
        pac::RTC.crl().modify(|w| w.set_cnf(true));
        pac::RTC.prlh().write(|w| w.set_prlh((prescaler >> 16) as u8));
        pac::RTC.prll().write(|w| w.set_prll(prescaler as u16));
        pac::RTC.crl().modify(|w| w.set_cnf(false));
        if !spin_until(|| pac::RTC.crl().read().rtoff()) {
            defmt::error!("RTC prescaler load did not complete");
        }
    }
}

/// RTC counter and alarm registers
pub struct CounterRtc {
    /// ALRH/ALRL are write-only, so the last programmed value is kept here
    alarm: u32,
}

impl CounterRtc {
    pub fn new() -> Self {
        // After a reset the APB copies of the registers are stale until RSF
        pac::RTC.crl().modify(|w| w.set_rsf(false));
        if !spin_until(|| pac::RTC.crl().read().rsf()) {
            defmt::debug!("RTC registers not synchronised, clock not running yet");
        }
        Self { alarm: 0 }
    }
}

impl BackupAccess for CounterRtc {
    fn enable_backup_access(&mut self) {
        enable_backup_domain();
    }
}

impl CounterRegisters for CounterRtc {
    fn counter(&self) -> u32 {
        counter_now()
    }

    fn alarm(&self) -> u32 {
        self.alarm
    }

    fn enter_config(&mut self) {
        pac::RTC.crl().modify(|w| w.set_cnf(true));
    }

    fn exit_config(&mut self) {
        pac::RTC.crl().modify(|w| w.set_cnf(false));
    }

    fn write_counter(&mut self, low: u16, high: u16) {
        pac::RTC.cntl().write(|w| w.set_cntl(low));
        pac::RTC.cnth().write(|w| w.set_cnth(high));
    }

    fn write_alarm(&mut self, low: u16, high: u16) {
        pac::RTC.alrl().write(|w| w.set_alrl(low));
        pac::RTC.alrh().write(|w| w.set_alrh(high));
        self.alarm = ((high as u32) << 16) | low as u32;
    }

    fn operation_complete(&self) -> bool {
        pac::RTC.crl().read().rtoff()
    }

    fn alarm_pending(&self) -> bool {
        pac::RTC.crl().read().alrf()
    }

    fn clear_alarm_flag(&mut self) {
        pac::RTC.crl().modify(|w| w.set_alrf(false));
    }

    fn set_alarm_interrupt(&mut self, enabled: bool) {
        pac::RTC.crh().modify(|w| w.set_alrie(enabled));
    }

    fn set_alarm_exti(&mut self, enabled: bool) {
        pac::EXTI.imr(0).modify(|w| w.set_line(ALARM_EXTI_LINE, enabled));
        pac::EXTI.rtsr(0).modify(|w| w.set_line(ALARM_EXTI_LINE, enabled));
    }
}

/// Interrupt-side view of the alarm: flag clearing only
pub struct AlarmLine {
    _private: (),
}

impl AlarmLine {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl AlarmAcknowledge for AlarmLine {
    fn acknowledge_alarm(&mut self) {
        pac::RTC.crl().modify(|w| w.set_alrf(false));
        pac::EXTI.pr(0).write(|w| w.set_line(ALARM_EXTI_LINE, true));
    }
}
