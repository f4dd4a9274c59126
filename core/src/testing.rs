//! In-memory RTC hardware for unit tests
//!
//! The fakes share a [`VirtualTime`] that only moves when something calls
//! [`FakeDelay`], which makes every deadline in the crate observable and
//! deterministic.

extern crate std;

use core::cell::Cell;
use core::convert::Infallible;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use rtclock_hal::{
    AlarmAcknowledge, BackupAccess, BackupRegisters, CalendarFields, CalendarRegisters,
    ClockSource, CounterRegisters, LowSpeedOscillators,
};

/// Nanoseconds of simulated time, shared between a delay and the fakes
#[derive(Clone, Default)]
pub struct VirtualTime(Rc<Cell<u64>>);

impl VirtualTime {
    pub fn now_us(&self) -> u64 {
        self.0.get() / 1000
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay { time: self.clone() }
    }
}

/// Delay that advances [`VirtualTime`] instead of sleeping
#[derive(Clone, Default)]
pub struct FakeDelay {
    time: VirtualTime,
}

impl FakeDelay {
    pub fn elapsed_us(&self) -> u64 {
        self.time.now_us()
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cell = &self.time.0;
        cell.set(cell.get() + ns as u64);
    }
}

/// Backup registers plus LSE/LSI control
pub struct FakeClockHardware {
    pub backup: [u16; 11],
    pub backup_writable: bool,
    /// `None` models a missing or dead crystal
    pub external_ready_after_us: Option<u64>,
    pub external_started_at: Option<u64>,
    pub internal_on: bool,
    pub routed: Option<ClockSource>,
    pub external_polls: Cell<u32>,
    time: VirtualTime,
}

impl FakeClockHardware {
    pub fn new(time: &VirtualTime) -> Self {
        Self {
            backup: [0; 11],
            backup_writable: false,
            external_ready_after_us: Some(0),
            external_started_at: None,
            internal_on: false,
            routed: None,
            external_polls: Cell::new(0),
            time: time.clone(),
        }
    }

    pub fn with_marker(mut self, raw: u16) -> Self {
        self.backup[1] = raw;
        self
    }

    pub fn crystal_starts_after_ms(mut self, ms: u64) -> Self {
        self.external_ready_after_us = Some(ms * 1000);
        self
    }

    pub fn dead_crystal(mut self) -> Self {
        self.external_ready_after_us = None;
        self
    }
}

impl BackupAccess for FakeClockHardware {
    fn enable_backup_access(&mut self) {
        self.backup_writable = true;
    }
}

impl BackupRegisters for FakeClockHardware {
    fn read_backup(&self, index: usize) -> u16 {
        self.backup[index]
    }

    fn write_backup(&mut self, index: usize, value: u16) {
        // Write-protected backup domain ignores the write
        if self.backup_writable {
            self.backup[index] = value;
        }
    }
}

impl LowSpeedOscillators for FakeClockHardware {
    fn start_external(&mut self) {
        self.external_started_at = Some(self.time.now_us());
    }

    fn external_ready(&self) -> bool {
        self.external_polls.set(self.external_polls.get() + 1);
        match (self.external_started_at, self.external_ready_after_us) {
            (Some(started), Some(after)) => self.time.now_us() - started >= after,
            _ => false,
        }
    }

    fn start_internal(&mut self) {
        self.internal_on = true;
    }

    fn internal_ready(&self) -> bool {
        self.internal_on
    }

    fn route_to_rtc(&mut self, source: ClockSource) {
        self.routed = Some(source);
    }
}

/// Register operation on a [`FakeCounterRtc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOp {
    EnableBackup,
    EnterConfig,
    WriteCounter(u16, u16),
    WriteAlarm(u16, u16),
    ExitConfig,
    ClearAlarmFlag,
    AlarmInterrupt(bool),
    AlarmExti(bool),
}

/// 32-bit seconds counter RTC
#[derive(Default)]
pub struct FakeCounterRtc {
    pub counter: u32,
    pub alarm: u32,
    pub alarm_flag: bool,
    pub alarm_irq: bool,
    pub alarm_exti: bool,
    /// The peripheral never reports the operation as finished
    pub stuck: bool,
    pub ops: Vec<CounterOp>,
    backup_enabled: bool,
    config: bool,
}

impl FakeCounterRtc {
    pub fn with_counter(counter: u32) -> Self {
        Self {
            counter,
            ..Self::default()
        }
    }

    fn writable(&self) -> bool {
        self.backup_enabled && self.config
    }
}

impl BackupAccess for FakeCounterRtc {
    fn enable_backup_access(&mut self) {
        self.backup_enabled = true;
        self.ops.push(CounterOp::EnableBackup);
    }
}

impl CounterRegisters for FakeCounterRtc {
    fn counter(&self) -> u32 {
        self.counter
    }

    fn alarm(&self) -> u32 {
        self.alarm
    }

    fn enter_config(&mut self) {
        self.config = true;
        self.ops.push(CounterOp::EnterConfig);
    }

    fn exit_config(&mut self) {
        self.config = false;
        self.ops.push(CounterOp::ExitConfig);
    }

    fn write_counter(&mut self, low: u16, high: u16) {
        self.ops.push(CounterOp::WriteCounter(low, high));
        if self.writable() {
            self.counter = ((high as u32) << 16) | low as u32;
        }
    }

    fn write_alarm(&mut self, low: u16, high: u16) {
        self.ops.push(CounterOp::WriteAlarm(low, high));
        if self.writable() {
            self.alarm = ((high as u32) << 16) | low as u32;
        }
    }

    fn operation_complete(&self) -> bool {
        !self.stuck
    }

    fn alarm_pending(&self) -> bool {
        self.alarm_flag
    }

    fn clear_alarm_flag(&mut self) {
        self.alarm_flag = false;
        self.ops.push(CounterOp::ClearAlarmFlag);
    }

    fn set_alarm_interrupt(&mut self, enabled: bool) {
        self.alarm_irq = enabled;
        self.ops.push(CounterOp::AlarmInterrupt(enabled));
    }

    fn set_alarm_exti(&mut self, enabled: bool) {
        self.alarm_exti = enabled;
        self.ops.push(CounterOp::AlarmExti(enabled));
    }
}

impl AlarmAcknowledge for FakeCounterRtc {
    fn acknowledge_alarm(&mut self) {
        self.alarm_flag = false;
    }
}

/// Register operation on a [`FakeCalendarRtc`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarOp {
    EnableBackup,
    Unlock,
    Lock,
    EnterInit,
    ExitInit,
    WriteFields(CalendarFields),
    SetDst(bool),
}

/// Calendar-register RTC
pub struct FakeCalendarRtc {
    pub fields: CalendarFields,
    pub dst: bool,
    /// Initialization mode is never granted
    pub stuck: bool,
    pub ops: Vec<CalendarOp>,
    unlocked: bool,
    init: bool,
}

impl FakeCalendarRtc {
    pub fn with_fields(fields: CalendarFields) -> Self {
        Self {
            fields,
            dst: false,
            stuck: false,
            ops: Vec::new(),
            unlocked: false,
            init: false,
        }
    }
}

impl Default for FakeCalendarRtc {
    fn default() -> Self {
        // 2000-01-01 00:00:00, a Saturday
        Self::with_fields(CalendarFields {
            year: 0,
            month: 1,
            day: 1,
            weekday: 6,
            hours: 0,
            minutes: 0,
            seconds: 0,
        })
    }
}

impl BackupAccess for FakeCalendarRtc {
    fn enable_backup_access(&mut self) {
        self.ops.push(CalendarOp::EnableBackup);
    }
}

impl CalendarRegisters for FakeCalendarRtc {
    fn read_fields(&mut self) -> CalendarFields {
        self.fields
    }

    fn unlock(&mut self) {
        self.unlocked = true;
        self.ops.push(CalendarOp::Unlock);
    }

    fn lock(&mut self) {
        self.unlocked = false;
        self.ops.push(CalendarOp::Lock);
    }

    fn enter_init(&mut self) {
        self.init = self.unlocked;
        self.ops.push(CalendarOp::EnterInit);
    }

    fn init_ready(&self) -> bool {
        self.init && !self.stuck
    }

    fn exit_init(&mut self) {
        self.init = false;
        self.ops.push(CalendarOp::ExitInit);
    }

    fn write_fields(&mut self, fields: &CalendarFields) {
        self.ops.push(CalendarOp::WriteFields(*fields));
        if self.unlocked && self.init {
            self.fields = *fields;
        }
    }

    fn daylight_saving(&self) -> bool {
        self.dst
    }

    fn set_daylight_saving(&mut self, active: bool) {
        self.ops.push(CalendarOp::SetDst(active));
        if self.unlocked {
            self.dst = active;
        }
    }
}

/// Active-low push button that goes down at a given moment
pub struct FakeKey {
    time: VirtualTime,
    pressed_at_us: Option<u64>,
}

impl FakeKey {
    pub fn never(time: &VirtualTime) -> Self {
        Self {
            time: time.clone(),
            pressed_at_us: None,
        }
    }

    pub fn pressed_at_ms(time: &VirtualTime, ms: u64) -> Self {
        Self {
            time: time.clone(),
            pressed_at_us: Some(ms * 1000),
        }
    }

    fn pressed(&self) -> bool {
        self.pressed_at_us
            .is_some_and(|at| self.time.now_us() >= at)
    }
}

impl embedded_hal::digital::ErrorType for FakeKey {
    type Error = Infallible;
}

impl embedded_hal::digital::InputPin for FakeKey {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pressed())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pressed())
    }
}

/// Serial console whose input becomes readable at a given moment
pub struct FakeConsole {
    time: VirtualTime,
    input: Vec<u8>,
    arrives_at_us: u64,
    cursor: usize,
    pub output: String,
}

impl FakeConsole {
    pub fn silent(time: &VirtualTime) -> Self {
        Self {
            time: time.clone(),
            input: Vec::new(),
            arrives_at_us: 0,
            cursor: 0,
            output: String::new(),
        }
    }

    pub fn typing_at_ms(time: &VirtualTime, ms: u64, input: &str) -> Self {
        Self {
            input: input.as_bytes().to_vec(),
            arrives_at_us: ms * 1000,
            ..Self::silent(time)
        }
    }

    fn available(&self) -> usize {
        if self.time.now_us() >= self.arrives_at_us {
            self.input.len() - self.cursor
        } else {
            0
        }
    }
}

impl embedded_io::ErrorType for FakeConsole {
    type Error = Infallible;
}

impl embedded_io::ReadReady for FakeConsole {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.available() > 0)
    }
}

impl embedded_io::Read for FakeConsole {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.available().min(buf.len());
        buf[..n].copy_from_slice(&self.input[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

impl embedded_io::Write for FakeConsole {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
