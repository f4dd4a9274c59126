//! Counter RTC peripherals
//!
//! Peripherals of this kind only count seconds in a 32-bit register pair
//! and compare them against a 32-bit alarm register pair.

/// Register interface of a 32-bit seconds counter RTC
///
/// Every write follows: [`enable_backup_access`](crate::BackupAccess::enable_backup_access),
/// [`enter_config`](Self::enter_config), write both halves,
/// [`exit_config`](Self::exit_config), then wait for
/// [`operation_complete`](Self::operation_complete). A write that skips any
/// step is silently ignored by the hardware.
pub trait CounterRegisters: crate::BackupAccess {
    /// Current counter value.
    fn counter(&self) -> u32;

    /// Current alarm compare value.
    fn alarm(&self) -> u32;

    /// Set the configuration-allowed bit.
    fn enter_config(&mut self);

    /// Clear the configuration-allowed bit, which starts the register update.
    fn exit_config(&mut self);

    /// Load the counter halves. Only valid in configuration mode.
    fn write_counter(&mut self, low: u16, high: u16);

    /// Load the alarm halves. Only valid in configuration mode.
    fn write_alarm(&mut self, low: u16, high: u16);

    /// `true` when the last register operation has finished.
    fn operation_complete(&self) -> bool;

    /// `true` while the alarm match flag is set.
    fn alarm_pending(&self) -> bool;

    /// Clear the alarm match flag.
    fn clear_alarm_flag(&mut self);

    /// Enable or mask the RTC alarm interrupt.
    fn set_alarm_interrupt(&mut self, enabled: bool);

    /// Enable or mask the rising-edge external interrupt line the alarm is
    /// wired to.
    fn set_alarm_exti(&mut self, enabled: bool);
}
