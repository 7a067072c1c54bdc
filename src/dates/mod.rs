use std::fmt;

use time::{Date, Duration, Month, PrimitiveDateTime};

mod clock;
mod pattern;

pub use clock::{Clock, FixedClock, SystemClock};
pub use pattern::DatePattern;

/// Naming pattern used when the settings leave `format` empty.
pub const DEFAULT_FORMAT: &str = "YYYY-MM-DD";

/// Day-granularity key for a note, e.g. `day-2024-03-10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateUid(String);

impl DateUid {
    pub fn for_date(date: Date) -> Self {
        Self(format!(
            "day-{:04}-{:02}-{:02}",
            date.year(),
            u8::from(date.month()),
            date.day()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Date> for DateUid {
    fn from(date: Date) -> Self {
        Self::for_date(date)
    }
}

impl From<PrimitiveDateTime> for DateUid {
    fn from(at: PrimitiveDateTime) -> Self {
        Self::for_date(at.date())
    }
}

impl fmt::Display for DateUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl OffsetUnit {
    /// `M` is month and `m` is minute; every other letter is case-insensitive.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'M' => return Some(Self::Month),
            'm' => return Some(Self::Minute),
            _ => {}
        }
        match letter.to_ascii_lowercase() {
            'y' => Some(Self::Year),
            'q' => Some(Self::Quarter),
            'w' => Some(Self::Week),
            'd' => Some(Self::Day),
            'h' => Some(Self::Hour),
            's' => Some(Self::Second),
            _ => None,
        }
    }
}

/// Calendar arithmetic. Month-based units clamp the day to the length of the
/// target month, so Jan 31 + 1 month is the last day of February.
pub fn shift(at: PrimitiveDateTime, amount: i64, unit: OffsetUnit) -> Option<PrimitiveDateTime> {
    match unit {
        OffsetUnit::Year => shift_months(at, amount.checked_mul(12)?),
        OffsetUnit::Quarter => shift_months(at, amount.checked_mul(3)?),
        OffsetUnit::Month => shift_months(at, amount),
        OffsetUnit::Week => shift_seconds(at, amount, 7 * 86_400),
        OffsetUnit::Day => shift_seconds(at, amount, 86_400),
        OffsetUnit::Hour => shift_seconds(at, amount, 3_600),
        OffsetUnit::Minute => shift_seconds(at, amount, 60),
        OffsetUnit::Second => shift_seconds(at, amount, 1),
    }
}

fn shift_seconds(at: PrimitiveDateTime, amount: i64, unit: i64) -> Option<PrimitiveDateTime> {
    at.checked_add(Duration::seconds(amount.checked_mul(unit)?))
}

fn shift_months(at: PrimitiveDateTime, months: i64) -> Option<PrimitiveDateTime> {
    let current = i64::from(at.year()) * 12 + i64::from(u8::from(at.month())) - 1;
    let target = current.checked_add(months)?;
    let year = i32::try_from(target.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(target.rem_euclid(12) + 1).ok()?).ok()?;
    let day = at.day().min(time::util::days_in_year_month(year, month));
    let date = Date::from_calendar_date(year, month, day).ok()?;
    Some(PrimitiveDateTime::new(date, at.time()))
}
