//! Calendar date/time conversions
//!
//! Portable calendar time plus the conversions every backend shares:
//! epoch timestamp <-> calendar fields, weekday, day-of-year and leap years.
//!
//! Timestamp conversion uses Howard Hinnant's civil_from_days and
//! days_from_civil algorithms.
//! Reference: http://howardhinnant.github.io/date_algorithms.html
//!
//! These algorithms are used in C++20's `<chrono>` library and provide:
//! - O(1) time complexity (no year iteration)
//! - Correct handling of leap years
//! - Valid for all dates in the proleptic Gregorian calendar
//!
//! No timezone support: calendar time is whatever local representation
//! the caller hands in.

use core::fmt;

/// First year representable by [`CalendarTime`]
pub const EPOCH_YEAR: u16 = 1970;

const SECONDS_PER_DAY: u64 = 86_400;

/// Days from 0000-03-01 to 1970-01-01
const DAYS_TO_UNIX_EPOCH: i64 = 719_468;

/// Days per month in a common year
const MONTH_DAYS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Seconds since 1970-01-01 00:00:00
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp(u64);

impl Timestamp {
    /// 1970-01-01 00:00:00
    pub const EPOCH: Self = Self(0);

    /// Create a timestamp from seconds since the epoch
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Seconds since the epoch
    pub const fn as_secs(self) -> u64 {
        self.0
    }
}

impl From<u32> for Timestamp {
    fn from(secs: u32) -> Self {
        Self(secs as u64)
    }
}

/// Calendar field out of range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalendarError {
    /// Year before [`EPOCH_YEAR`]
    Year,
    /// Month outside 0-11
    Month,
    /// Day outside 1..=days in that month
    Day,
    /// Hour outside 0-23
    Hour,
    /// Minute outside 0-59
    Minute,
    /// Second outside 0-60
    Second,
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year => write!(f, "year out of range"),
            Self::Month => write!(f, "month out of range"),
            Self::Day => write!(f, "day out of range"),
            Self::Hour => write!(f, "hour out of range"),
            Self::Minute => write!(f, "minute out of range"),
            Self::Second => write!(f, "second out of range"),
        }
    }
}

impl core::error::Error for CalendarError {}

/// Broken-down calendar time
///
/// `weekday` and `year_day` are derived from the date on construction and
/// cannot be set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    weekday: u8,
    year_day: u16,
    dst: bool,
}

impl CalendarTime {
    /// Build a calendar time from its date and time-of-day fields
    ///
    /// `year` is absolute (>= 1970), `month` is 0-11, `day` is 1-31,
    /// `second` is 0-60 (60 only as a transient leap second).
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, CalendarError> {
        if year < EPOCH_YEAR {
            return Err(CalendarError::Year);
        }
        if month > 11 {
            return Err(CalendarError::Month);
        }
        if day == 0 || day > days_in_month(year, month + 1) {
            return Err(CalendarError::Day);
        }
        if hour > 23 {
            return Err(CalendarError::Hour);
        }
        if minute > 59 {
            return Err(CalendarError::Minute);
        }
        if second > 60 {
            return Err(CalendarError::Second);
        }

        Ok(Self::derive(year, month, day, hour, minute, second))
    }

    fn derive(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            weekday: weekday(year, month + 1, day),
            year_day: day_of_year(year, month + 1, day),
            dst: false,
        }
    }

    /// Same time with the daylight-saving flag set to `dst`
    pub const fn with_dst(mut self, dst: bool) -> Self {
        self.dst = dst;
        self
    }

    /// Absolute year, e.g. 2024
    pub const fn year(&self) -> u16 {
        self.year
    }

    /// Month, 0 = January
    pub const fn month(&self) -> u8 {
        self.month
    }

    /// Day of month, 1-31
    pub const fn day(&self) -> u8 {
        self.day
    }

    pub const fn hour(&self) -> u8 {
        self.hour
    }

    pub const fn minute(&self) -> u8 {
        self.minute
    }

    /// Second, 0-60
    pub const fn second(&self) -> u8 {
        self.second
    }

    /// Day of week, 0 = Sunday
    pub const fn weekday(&self) -> u8 {
        self.weekday
    }

    /// Day of year, 0 = January 1st
    pub const fn year_day(&self) -> u16 {
        self.year_day
    }

    /// Daylight-saving time in effect
    pub const fn is_dst(&self) -> bool {
        self.dst
    }

    /// Convert a timestamp to calendar time (DST flag cleared)
    ///
    /// Uses Howard Hinnant's civil_from_days algorithm. Instants past the
    /// end of year 65535 wrap around; use [`Self::try_from_timestamp`] for
    /// untrusted input.
    pub fn from_timestamp(timestamp: Timestamp) -> Self {
        let (year, month, day, hour, minute, second) = civil_from_timestamp(timestamp);
        Self::derive(year as u16, month, day, hour, minute, second)
    }

    /// Like [`Self::from_timestamp`] but fails with [`CalendarError::Year`]
    /// when the year does not fit
    pub fn try_from_timestamp(timestamp: Timestamp) -> Result<Self, CalendarError> {
        let (year, month, day, hour, minute, second) = civil_from_timestamp(timestamp);
        let year = u16::try_from(year).map_err(|_| CalendarError::Year)?;
        Ok(Self::derive(year, month, day, hour, minute, second))
    }

    /// Convert to seconds since the epoch
    ///
    /// A leap second (60) carries into the next minute.
    pub fn to_timestamp(&self) -> Timestamp {
        let days_since_epoch = days_from_civil(self.year as i64, self.month + 1, self.day);

        Timestamp::from_secs(
            (days_since_epoch as u64) * SECONDS_PER_DAY
                + (self.hour as u64) * 3600
                + (self.minute as u64) * 60
                + (self.second as u64),
        )
    }

    /// Replace a leap second with 59
    ///
    /// Returns the (possibly) adjusted time and whether the second was 60.
    pub fn normalize_leap_second(self) -> (Self, bool) {
        if self.second == 60 {
            (Self { second: 59, ..self }, true)
        } else {
            (self, false)
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS`
impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year,
            self.month + 1,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}

/// Check if year is a leap year (Gregorian calendar)
///
/// - Divisible by 4: leap year
/// - EXCEPT divisible by 100: not a leap year
/// - EXCEPT divisible by 400: leap year
pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`; 0 for an invalid month
pub fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        1..=12 => MONTH_DAYS[(month - 1) as usize],
        _ => 0,
    }
}

/// Zero-based day of year for a civil date (`month` 1-12)
///
/// Sums the month table over completed months and adds the leap day once
/// February is behind us.
pub fn day_of_year(year: u16, month: u8, day: u8) -> u16 {
    let completed = month.saturating_sub(1).min(12) as usize;
    let mut days: u16 = MONTH_DAYS[..completed].iter().map(|&d| d as u16).sum();

    if month >= 3 && is_leap_year(year) {
        days += 1;
    }

    days + (day as u16).saturating_sub(1)
}

/// Day of week for a civil date (`month` 1-12), 0 = Sunday .. 6 = Saturday
///
/// Kim Larsen's variant of Zeller's congruence: January and February count
/// as months 13 and 14 of the previous year. Valid for any proleptic
/// Gregorian date from 0000-03-01 on.
pub fn weekday(year: u16, month: u8, day: u8) -> u8 {
    let (y, m) = if month < 3 {
        (year as i32 - 1, month as i32 + 12)
    } else {
        (year as i32, month as i32)
    };
    let d = day as i32;

    ((d + 1 + 2 * m + 3 * (m + 1) / 5 + y + y / 4 - y / 100 + y / 400).rem_euclid(7)) as u8
}

/// Convert days since Unix epoch to civil date (year, month 1-12, day)
///
/// Howard Hinnant's civil_from_days algorithm.
fn civil_from_days(days_since_epoch: i64) -> (i64, u8, u8) {
    // Shift epoch from 1970-01-01 to 0000-03-01 so the leap day ends the year
    let z = days_since_epoch + DAYS_TO_UNIX_EPOCH;

    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // 0 = March, 11 = February
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;

    let year = if m <= 2 { y + 1 } else { y };
    (year, m, d)
}

/// Convert civil date (year, month 1-12, day) to days since Unix epoch
///
/// Howard Hinnant's days_from_civil algorithm.
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let m = month as i64;
    let d = day as i64;

    // March = month 0, February = month 11
    let (y, m) = if m <= 2 { (year - 1, m + 9) } else { (year, m - 3) };

    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400; // [0, 399]
    let doy = (153 * m + 2) / 5 + d - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]

    era * 146_097 + doe - DAYS_TO_UNIX_EPOCH
}

/// Split a timestamp into (year, month 0-11, day, hour, minute, second)
fn civil_from_timestamp(timestamp: Timestamp) -> (i64, u8, u8, u8, u8, u8) {
    let secs = timestamp.as_secs();
    let days_since_epoch = (secs / SECONDS_PER_DAY) as i64;
    let secs_today = secs % SECONDS_PER_DAY;

    let hour = (secs_today / 3600) as u8;
    let minute = ((secs_today % 3600) / 60) as u8;
    let second = (secs_today % 60) as u8;

    let (year, month, day) = civil_from_days(days_since_epoch);

    (year, month - 1, day, hour, minute, second)
}
