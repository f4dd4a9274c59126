//! Calendar-register RTC peripherals
//!
//! Peripherals of this kind keep year/month/day/weekday and
//! hour/minute/second in dedicated (usually BCD) registers. They provide
//! no day-of-year and no epoch timestamp.

/// Raw calendar fields as the hardware stores them
///
/// All values are binary (not BCD). Ranges follow the peripheral:
/// `year` 0-99 (offset from 2000), `month` 1-12, `day` 1-31,
/// `weekday` 1-7 (1 = Monday), `hours` 0-23, `minutes` 0-59, `seconds` 0-59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarFields {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// Register interface of a calendar RTC
///
/// Writes follow: [`unlock`](Self::unlock), [`enter_init`](Self::enter_init),
/// wait for [`init_ready`](Self::init_ready), [`write_fields`](Self::write_fields),
/// [`exit_init`](Self::exit_init), [`lock`](Self::lock).
pub trait CalendarRegisters: crate::BackupAccess {
    /// Read the time and date registers (time first, which latches the date).
    fn read_fields(&mut self) -> CalendarFields;

    /// Remove the RTC write protection.
    fn unlock(&mut self);

    /// Re-enable the RTC write protection.
    fn lock(&mut self);

    /// Request initialization mode (calendar stops counting).
    fn enter_init(&mut self);

    /// `true` once initialization mode is active and the calendar may be written.
    fn init_ready(&self) -> bool;

    /// Leave initialization mode; the calendar restarts from the written value.
    fn exit_init(&mut self);

    /// Load new calendar values. Only valid in initialization mode.
    fn write_fields(&mut self, fields: &CalendarFields);

    /// The daylight-saving "store operation" bit.
    fn daylight_saving(&self) -> bool;

    /// Set or clear the daylight-saving "store operation" bit. Requires
    /// the write protection to be lifted.
    fn set_daylight_saving(&mut self, active: bool);
}
