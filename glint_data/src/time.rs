// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Calendar units over millisecond timestamps.
//!
//! Time is a numeric value in **milliseconds** since the Unix epoch, in UTC. Fixed-width units
//! (up to weeks) offset by plain arithmetic; months and years go through proleptic Gregorian
//! civil dates.

use core::str::FromStr;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Largest timestamp magnitude, in milliseconds, that offsets produce.
const MAX_TIME_MS: f64 = 8.64e15;
/// Month counts (from year 0) past which no in-range timestamp exists.
const MAX_MONTHS: u64 = 12 * 300_000;

/// A calendar unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// One millisecond.
    Millisecond,
    /// One second.
    Second,
    /// One minute.
    Minute,
    /// One hour.
    Hour,
    /// One day (24 hours, UTC).
    Day,
    /// Seven days.
    Week,
    /// One calendar month.
    Month,
    /// One calendar year.
    Year,
}

impl TimeUnit {
    /// Parses a unit name; singular and plural forms are accepted (`"day"`, `"days"`).
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.strip_suffix('s').unwrap_or(name);
        Some(match name {
            "millisecond" => Self::Millisecond,
            "second" => Self::Second,
            "minute" => Self::Minute,
            "hour" => Self::Hour,
            "day" => Self::Day,
            "week" => Self::Week,
            "month" => Self::Month,
            "year" => Self::Year,
            _ => return None,
        })
    }

    /// Moves `timestamp` by `step` units (negative steps move backwards).
    ///
    /// Month and year steps are truncated to whole units. The day of month carries over, so
    /// January 31st plus one month is March 3rd (or 2nd in a leap year).
    ///
    /// Returns `NaN` when either input is not finite or the result falls outside
    /// `±8.64e15` ms (±100,000,000 days around the epoch).
    pub fn offset(self, timestamp: f64, step: f64) -> f64 {
        if !timestamp.is_finite() || !step.is_finite() || timestamp.abs() > MAX_TIME_MS {
            return f64::NAN;
        }
        let fixed = match self {
            Self::Millisecond => 1,
            Self::Second => MS_PER_SECOND,
            Self::Minute => MS_PER_MINUTE,
            Self::Hour => MS_PER_HOUR,
            Self::Day => MS_PER_DAY,
            Self::Week => MS_PER_WEEK,
            Self::Month | Self::Year => 0,
        };
        let shifted = if fixed != 0 {
            timestamp + step * fixed as f64
        } else {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "timestamp is within the time range; steps saturate and are range checked"
            )]
            let (ms, step) = (timestamp as i64, step as i64);
            let months = if self == Self::Year {
                step.checked_mul(12)
            } else {
                Some(step)
            };
            match months.and_then(|months| add_months(ms, months)) {
                Some(ms) => ms as f64,
                None => return f64::NAN,
            }
        };
        if shifted.abs() > MAX_TIME_MS {
            f64::NAN
        } else {
            shifted
        }
    }
}

impl FromStr for TimeUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(())
    }
}

/// Builds a UTC timestamp in milliseconds. `month` and `day` are 1-based.
pub fn timestamp_ms(year: i64, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> f64 {
    let days = days_from_civil(year, month, day);
    let ms = days * MS_PER_DAY
        + i64::from(hour) * MS_PER_HOUR
        + i64::from(minute) * MS_PER_MINUTE
        + i64::from(second) * MS_PER_SECOND;
    ms as f64
}

/// Splits a UTC timestamp in milliseconds into `(year, month, day)`, 1-based.
pub fn civil(timestamp: f64) -> (i64, u32, u32) {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "millisecond timestamps of real dates fit in i64"
    )]
    let ms = timestamp as i64;
    civil_from_days(ms.div_euclid(MS_PER_DAY))
}

/// Adds calendar months to a timestamp in milliseconds, `None` if out of range.
fn add_months(ms: i64, months: i64) -> Option<i64> {
    let days = ms.div_euclid(MS_PER_DAY);
    let time_of_day = ms.rem_euclid(MS_PER_DAY);
    let (y, m, d) = civil_from_days(days);
    let total = (y * 12 + i64::from(m) - 1).checked_add(months)?;
    if total.unsigned_abs() > MAX_MONTHS {
        return None;
    }
    let shifted = days_from_civil(total.div_euclid(12), month_of(total), d);
    shifted.checked_mul(MS_PER_DAY)?.checked_add(time_of_day)
}

fn month_of(total_months: i64) -> u32 {
    #[allow(clippy::cast_possible_truncation, reason = "rem_euclid(12) is in 0..12")]
    let m = total_months.rem_euclid(12) as u32;
    m + 1
}

/// Days since 1970-01-01 for a civil date. Linear in `day`, so overflowing days carry into
/// the following months.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = i64::from((month + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400 + i64::from(m <= 2);
    #[allow(
        clippy::cast_possible_truncation,
        reason = "month is in 1..=12 and day in 1..=31"
    )]
    (y, m as u32, d as u32)
}
