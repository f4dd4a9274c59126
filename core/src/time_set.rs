//! Interactive time setting over a serial console
//!
//! Right after boot the operator gets a short window to press a key. If
//! they do, the firmware asks for a `YYYY-MM-DD HH:MM:SS` line and writes
//! it to the RTC. Both waits are bounded; without operator action the
//! dialogue is a one-second detour and the RTC is left alone.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;

use crate::backend::RtcBackend;
use crate::calendar::{CalendarError, CalendarTime};
use crate::config::TimeSetConfig;
use crate::error::RtcError;
use crate::rtc::Rtc;

const PROMPT_KEY: &str = "Press KEY0 to set time, wait 1 seconds...\r\n";
const PROMPT_INPUT: &str = "Please input date & time, format: YYYY-MM-DD HH:MM:SS, wait 10 seconds...\r\n";
const REPLY_SET: &str = "Time set. \r\n";
const REPLY_TIMEOUT: &str = "Wait input timeout. \r\n";
const REPLY_INVALID: &str = "Invalid date/time. \r\n";
const REPLY_FAILED: &str = "Failed to set time. \r\n";

/// Longest accepted input line, terminator excluded
pub const LINE_CAPACITY: usize = 64;

/// Operator input that is not a usable date and time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Not valid UTF-8
    Encoding,
    /// Longer than [`LINE_CAPACITY`]
    TooLong,
    /// Not exactly six numeric fields
    FieldCount,
    /// A field does not fit its type
    Number,
    /// Fields parsed but do not form a valid calendar time
    Calendar(CalendarError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding => write!(f, "Input is not valid text"),
            Self::TooLong => write!(f, "Input line too long"),
            Self::FieldCount => write!(f, "Expected YYYY-MM-DD HH:MM:SS"),
            Self::Number => write!(f, "Number too large"),
            Self::Calendar(e) => write!(f, "Invalid date/time: {}", e),
        }
    }
}

impl core::error::Error for ParseError {}

impl From<CalendarError> for ParseError {
    fn from(e: CalendarError) -> Self {
        Self::Calendar(e)
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS`
///
/// Separators are not checked: any run of non-digits splits two fields, so
/// `2024/6/1 12.0.0` is accepted too. Exactly six fields are required and
/// the result must be a valid calendar time.
pub fn parse_date_time(line: &str) -> Result<CalendarTime, ParseError> {
    let mut fields: Vec<u16, 6> = Vec::new();
    for field in line.split(|c: char| !c.is_ascii_digit()).filter(|s| !s.is_empty()) {
        let value = field.parse::<u16>().map_err(|_| ParseError::Number)?;
        fields.push(value).map_err(|_| ParseError::FieldCount)?;
    }

    let [year, month, day, hour, minute, second] = fields.as_slice() else {
        return Err(ParseError::FieldCount);
    };
    let narrow = |v: u16| u8::try_from(v).map_err(|_| ParseError::Number);

    // Operator types 1-12, the calendar wants 0-11
    let month = narrow(*month)?
        .checked_sub(1)
        .ok_or(ParseError::Calendar(CalendarError::Month))?;

    Ok(CalendarTime::new(
        *year,
        month,
        narrow(*day)?,
        narrow(*hour)?,
        narrow(*minute)?,
        narrow(*second)?,
    )?)
}

/// Where the dialogue is, or how it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSetState {
    Idle,
    /// Waiting for the key press
    Armed,
    /// Key pressed, waiting for the date/time line
    AwaitingInput,
    Skipped,
    Committed,
    TimedOut,
    Rejected,
    /// The line was valid but the RTC refused the write
    Failed,
}

/// Result of one run of the dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeSetOutcome {
    /// No key press in the arming window
    Skipped,
    /// The RTC now holds this time
    Committed(CalendarTime),
    /// Key pressed but no complete line arrived in time
    TimedOut,
    Rejected(ParseError),
    Failed(RtcError),
}

/// Key-then-line time-set dialogue
///
/// `key` is active-low. `console` is polled without blocking; a line ends
/// at CR or LF.
pub struct TimeSetProtocol<K, C> {
    key: K,
    console: C,
    config: TimeSetConfig,
    state: TimeSetState,
}

impl<K, C> TimeSetProtocol<K, C>
where
    K: InputPin,
    C: Read + ReadReady + Write,
{
    pub fn new(key: K, console: C, config: TimeSetConfig) -> Self {
        Self {
            key,
            console,
            config,
            state: TimeSetState::Idle,
        }
    }

    pub fn state(&self) -> TimeSetState {
        self.state
    }

    /// Give back the key and console for other uses
    pub fn release(self) -> (K, C) {
        (self.key, self.console)
    }

    /// Run the dialogue once
    pub fn run<B, D>(&mut self, rtc: &mut Rtc<B, D>) -> TimeSetOutcome
    where
        B: RtcBackend,
        D: DelayNs,
    {
        self.state = TimeSetState::Armed;
        self.say(PROMPT_KEY);

        let key = &mut self.key;
        let pressed = self
            .config
            .arm_window
            .wait_until(rtc.delay_mut(), || key.is_low().unwrap_or(false));
        if pressed.is_err() {
            debug!("No key press, keeping RTC time");
            self.state = TimeSetState::Skipped;
            return TimeSetOutcome::Skipped;
        }

        self.state = TimeSetState::AwaitingInput;
        info!("Waiting for date/time input");
        self.say(PROMPT_INPUT);

        let mut line = LineBuffer::new();
        let console = &mut self.console;
        let received = self
            .config
            .input_window
            .poll(rtc.delay_mut(), || line.fill(console));
        let outcome = match received {
            Err(_) => TimeSetOutcome::TimedOut,
            Ok(()) => match line.text().and_then(parse_date_time) {
                Err(e) => TimeSetOutcome::Rejected(e),
                Ok(time) => match rtc.set_time(&time) {
                    Ok(()) => TimeSetOutcome::Committed(time),
                    Err(e) => TimeSetOutcome::Failed(e),
                },
            },
        };

        match outcome {
            TimeSetOutcome::Committed(time) => {
                info!("Time set to {}", time);
                self.state = TimeSetState::Committed;
                self.say(REPLY_SET);
            }
            TimeSetOutcome::TimedOut => {
                info!("Date/time input timed out");
                self.state = TimeSetState::TimedOut;
                self.say(REPLY_TIMEOUT);
            }
            TimeSetOutcome::Rejected(e) => {
                warn!("Rejected date/time input: {}", e);
                self.state = TimeSetState::Rejected;
                self.say(REPLY_INVALID);
            }
            TimeSetOutcome::Failed(e) => {
                error!("Setting time failed: {}", e);
                self.state = TimeSetState::Failed;
                self.say(REPLY_FAILED);
            }
            TimeSetOutcome::Skipped => {}
        }
        outcome
    }

    fn say(&mut self, text: &str) {
        if self.console.write_all(text.as_bytes()).is_err() {
            warn!("Console write failed");
        }
    }
}

/// One line of operator input
///
/// Bytes past [`LINE_CAPACITY`] are swallowed up to the terminator and the
/// whole line is reported as [`ParseError::TooLong`].
struct LineBuffer {
    bytes: Vec<u8, LINE_CAPACITY>,
    overflowed: bool,
}

impl LineBuffer {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            overflowed: false,
        }
    }

    /// Drain whatever the console has buffered
    ///
    /// Returns `Some` once a terminator ends a non-empty line. Empty lines
    /// are skipped.
    fn fill<C: Read + ReadReady>(&mut self, console: &mut C) -> Option<()> {
        let mut byte = [0u8; 1];
        while console.read_ready().unwrap_or(false) {
            match console.read(&mut byte) {
                Ok(1) => {}
                _ => return None,
            }
            match byte[0] {
                b'\r' | b'\n' if self.bytes.is_empty() && !self.overflowed => {}
                b'\r' | b'\n' => return Some(()),
                _ if self.overflowed => {}
                b => {
                    if self.bytes.push(b).is_err() {
                        warn!("Input line too long, discarding");
                        self.overflowed = true;
                    }
                }
            }
        }
        None
    }

    fn text(&self) -> Result<&str, ParseError> {
        if self.overflowed {
            return Err(ParseError::TooLong);
        }
        core::str::from_utf8(&self.bytes).map_err(|_| ParseError::Encoding)
    }
}
