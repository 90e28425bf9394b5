//! MS-DOS date/time handling.
//!
//! ZIP headers store the last-modified time of an entry as a pair of packed
//! 16-bit MS-DOS values:
//!
//! - time: `hour << 11 | minute << 5 | second / 2`
//! - date: `(year - 1980) << 9 | month << 5 | day`
//!
//! The representable range is 1980-01-01 to 2107-12-31 with a two-second
//! resolution. Values outside that range are clamped when converting from a
//! [`SystemTime`].
//!
//! Fields are interpreted as UTC so that archives written on one machine
//! extract to the same instant on another.
//!
//! # Example
//!
//! ```rust
//! use spanzip::DosDateTime;
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! // 2020-01-01 00:00:00 UTC
//! let time = UNIX_EPOCH + Duration::from_secs(1_577_836_800);
//! let dos = DosDateTime::from_system_time(time);
//!
//! assert_eq!(dos.year(), 2020);
//! assert_eq!(dos.month(), 1);
//! assert_eq!(dos.as_system_time(), Some(time));
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: i64 = 86_400;

/// First year representable in MS-DOS format.
const DOS_EPOCH_YEAR: i64 = 1980;

/// Last year representable in MS-DOS format (7-bit year offset).
const DOS_MAX_YEAR: i64 = DOS_EPOCH_YEAR + 127;

/// A packed MS-DOS date/time as stored in ZIP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DosDateTime {
    date: u16,
    time: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable value.
    pub const MIN: Self = Self {
        date: (1 << 5) | 1,
        time: 0,
    };

    /// Creates a value from the raw header fields.
    #[inline]
    pub const fn from_parts(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    /// Creates a value from the 32-bit form `date << 16 | time`.
    #[inline]
    pub const fn from_u32(packed: u32) -> Self {
        Self {
            date: (packed >> 16) as u16,
            time: packed as u16,
        }
    }

    /// Returns the 32-bit form `date << 16 | time`.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        ((self.date as u32) << 16) | self.time as u32
    }

    /// Returns the raw date field.
    #[inline]
    pub const fn date(&self) -> u16 {
        self.date
    }

    /// Returns the raw time field.
    #[inline]
    pub const fn time(&self) -> u16 {
        self.time
    }

    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts a [`SystemTime`], clamping to the representable range.
    ///
    /// Odd seconds are rounded down.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs().min(i64::MAX as u64) as i64,
            Err(_) => return Self::MIN,
        };

        let days = secs.div_euclid(SECONDS_PER_DAY);
        let rem = secs.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        if year < DOS_EPOCH_YEAR {
            return Self::MIN;
        }
        if year > DOS_MAX_YEAR {
            return Self::from_fields(DOS_MAX_YEAR, 12, 31, 23, 59, 58);
        }

        Self::from_fields(
            year,
            month,
            day,
            rem / 3600,
            (rem % 3600) / 60,
            rem % 60,
        )
    }

    fn from_fields(year: i64, month: i64, day: i64, hour: i64, minute: i64, second: i64) -> Self {
        let date = (((year - DOS_EPOCH_YEAR) as u16) << 9) | ((month as u16) << 5) | day as u16;
        let time = ((hour as u16) << 11) | ((minute as u16) << 5) | (second as u16 / 2);
        Self { date, time }
    }

    /// Converts back to a [`SystemTime`].
    ///
    /// Returns `None` if the packed fields do not form a valid calendar date.
    pub fn as_system_time(&self) -> Option<SystemTime> {
        let (year, month, day) = (self.year() as i64, self.month() as i64, self.day() as i64);
        if !(1..=12).contains(&month) || day < 1 || day > days_in_month(year, month) {
            return None;
        }
        let (hour, minute, second) = (self.hour() as u64, self.minute() as u64, self.second() as u64);
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }

        let days = days_from_civil(year, month, day);
        let secs = days as u64 * SECONDS_PER_DAY as u64 + hour * 3600 + minute * 60 + second;
        Some(UNIX_EPOCH + Duration::from_secs(secs))
    }

    /// Returns the calendar year (1980-2107).
    pub fn year(&self) -> u16 {
        (self.date >> 9) + DOS_EPOCH_YEAR as u16
    }

    /// Returns the month (1-12 for valid values).
    pub fn month(&self) -> u8 {
        ((self.date >> 5) & 0x0F) as u8
    }

    /// Returns the day of month (1-31 for valid values).
    pub fn day(&self) -> u8 {
        (self.date & 0x1F) as u8
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u8 {
        (self.time >> 11) as u8
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u8 {
        ((self.time >> 5) & 0x3F) as u8
    }

    /// Returns the second (always even).
    pub fn second(&self) -> u8 {
        ((self.time & 0x1F) * 2) as u8
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<SystemTime> for DosDateTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
