//! Moment-style naming patterns (`YYYY-MM-DD`, `gggg-[W]ww`, `dddd, MMMM Do YYYY`).
//!
//! A pattern is compiled once into a list of fields and literals. Formatting
//! walks that list; parsing goes through an anchored regex built from the
//! same list, so a filename only parses if it matches the pattern in full.

use std::fmt::Write as _;

use regex::{Captures, Regex};
use time::{Date, Month, PrimitiveDateTime, Weekday};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year,
    YearShort,
    Quarter,
    MonthLong,
    MonthShort,
    MonthPadded,
    Month,
    DayOfYearPadded,
    DayOfYear,
    DayOrdinal,
    DayPadded,
    Day,
    WeekdayLong,
    WeekdayShort,
    WeekdayMin,
    Weekday,
    IsoWeekday,
    IsoWeekPadded,
    IsoWeek,
    IsoWeekYear,
    Hour24Padded,
    Hour24,
    Hour12Padded,
    Hour12,
    HourFromOnePadded,
    HourFromOne,
    MinutePadded,
    Minute,
    SecondPadded,
    Second,
    MeridiemUpper,
    MeridiemLower,
    UnixSeconds,
    UnixMillis,
}

// Longest tokens first so `MMMM` wins over `MM` + `MM`.
const TOKENS: &[(&str, Field)] = &[
    ("YYYY", Field::Year),
    ("MMMM", Field::MonthLong),
    ("DDDD", Field::DayOfYearPadded),
    ("dddd", Field::WeekdayLong),
    ("gggg", Field::IsoWeekYear),
    ("GGGG", Field::IsoWeekYear),
    ("MMM", Field::MonthShort),
    ("DDD", Field::DayOfYear),
    ("ddd", Field::WeekdayShort),
    ("YY", Field::YearShort),
    ("MM", Field::MonthPadded),
    ("Do", Field::DayOrdinal),
    ("DD", Field::DayPadded),
    ("dd", Field::WeekdayMin),
    ("ww", Field::IsoWeekPadded),
    ("WW", Field::IsoWeekPadded),
    ("HH", Field::Hour24Padded),
    ("hh", Field::Hour12Padded),
    ("kk", Field::HourFromOnePadded),
    ("mm", Field::MinutePadded),
    ("ss", Field::SecondPadded),
    ("Q", Field::Quarter),
    ("M", Field::Month),
    ("D", Field::Day),
    ("d", Field::Weekday),
    ("E", Field::IsoWeekday),
    ("w", Field::IsoWeek),
    ("W", Field::IsoWeek),
    ("H", Field::Hour24),
    ("h", Field::Hour12),
    ("k", Field::HourFromOne),
    ("m", Field::Minute),
    ("s", Field::Second),
    ("A", Field::MeridiemUpper),
    ("a", Field::MeridiemLower),
    ("X", Field::UnixSeconds),
    ("x", Field::UnixMillis),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Literal(String),
    Field(Field),
}

/// A compiled naming pattern.
#[derive(Debug, Clone)]
pub struct DatePattern {
    source: String,
    items: Vec<Item>,
    fields: Vec<Field>,
    parser: Option<Regex>,
}

impl DatePattern {
    pub fn new(pattern: &str) -> Self {
        let items = tokenize(pattern);
        let fields = items
            .iter()
            .filter_map(|item| match item {
                Item::Field(field) => Some(*field),
                Item::Literal(_) => None,
            })
            .collect();
        let parser = match Regex::new(&parser_source(&items)) {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::warn!(%err, pattern, "date pattern cannot be used for parsing");
                None
            }
        };
        Self {
            source: pattern.to_string(),
            items,
            fields,
            parser,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Pattern for the final path segment, used to read dates back out of
    /// filenames when the naming format contains folders (`YYYY/MM/YYYY-MM-DD`).
    pub fn basename(&self) -> DatePattern {
        match self.source.rsplit_once('/') {
            Some((_, last)) => DatePattern::new(last),
            None => self.clone(),
        }
    }

    pub fn format(&self, at: PrimitiveDateTime) -> String {
        let mut out = String::with_capacity(self.source.len() + 8);
        for item in &self.items {
            match item {
                Item::Literal(text) => out.push_str(text),
                Item::Field(field) => format_field(&mut out, *field, at),
            }
        }
        out
    }

    pub fn format_date(&self, date: Date) -> String {
        self.format(date.midnight())
    }

    /// Strict parse: the whole input must match and describe a real calendar day.
    ///
    /// Parts the pattern leaves out are filled in relative to `today`: the
    /// missing leading parts (year, then month) come from `today`, the
    /// trailing ones default to the start of the period. `MMMM Do` reads as a
    /// day in the current year, `DD` as a day in the current month.
    pub fn parse(&self, input: &str, today: Date) -> Option<Date> {
        let caps = self.parser.as_ref()?.captures(input)?;
        let parts = Parts::collect(&self.fields, &caps)?;
        parts.resolve(today)
    }
}

impl Default for DatePattern {
    fn default() -> Self {
        Self::new(super::DEFAULT_FORMAT)
    }
}

fn tokenize(pattern: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(ch) = rest.chars().next() {
        if ch == '[' {
            if let Some(end) = rest.find(']') {
                literal.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }
        if ch.is_ascii_alphabetic() {
            if let Some((token, field)) = TOKENS.iter().find(|(token, _)| rest.starts_with(token)) {
                if !literal.is_empty() {
                    items.push(Item::Literal(std::mem::take(&mut literal)));
                }
                items.push(Item::Field(*field));
                rest = &rest[token.len()..];
                continue;
            }
        }
        literal.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    if !literal.is_empty() {
        items.push(Item::Literal(literal));
    }
    items
}

fn format_field(out: &mut String, field: Field, at: PrimitiveDateTime) {
    let month = u8::from(at.month());
    let weekday = at.weekday();
    let hour12 = match at.hour() % 12 {
        0 => 12,
        h => h,
    };
    let _ = match field {
        Field::Year => write!(out, "{:04}", at.year()),
        Field::YearShort => write!(out, "{:02}", at.year().rem_euclid(100)),
        Field::Quarter => write!(out, "{}", (month - 1) / 3 + 1),
        Field::MonthLong => write!(out, "{}", MONTHS[usize::from(month - 1)]),
        Field::MonthShort => write!(out, "{}", &MONTHS[usize::from(month - 1)][..3]),
        Field::MonthPadded => write!(out, "{month:02}"),
        Field::Month => write!(out, "{month}"),
        Field::DayOfYearPadded => write!(out, "{:03}", at.ordinal()),
        Field::DayOfYear => write!(out, "{}", at.ordinal()),
        Field::DayOrdinal => write!(out, "{}{}", at.day(), ordinal_suffix(at.day())),
        Field::DayPadded => write!(out, "{:02}", at.day()),
        Field::Day => write!(out, "{}", at.day()),
        Field::WeekdayLong => write!(out, "{}", weekday_name(weekday)),
        Field::WeekdayShort => write!(out, "{}", &weekday_name(weekday)[..3]),
        Field::WeekdayMin => write!(out, "{}", &weekday_name(weekday)[..2]),
        Field::Weekday => write!(out, "{}", weekday.number_days_from_sunday()),
        Field::IsoWeekday => write!(out, "{}", weekday.number_from_monday()),
        Field::IsoWeekPadded => write!(out, "{:02}", at.iso_week()),
        Field::IsoWeek => write!(out, "{}", at.iso_week()),
        Field::IsoWeekYear => write!(out, "{:04}", at.date().to_iso_week_date().0),
        Field::Hour24Padded => write!(out, "{:02}", at.hour()),
        Field::Hour24 => write!(out, "{}", at.hour()),
        Field::Hour12Padded => write!(out, "{hour12:02}"),
        Field::Hour12 => write!(out, "{hour12}"),
        Field::HourFromOnePadded => write!(out, "{:02}", hour_from_one(at.hour())),
        Field::HourFromOne => write!(out, "{}", hour_from_one(at.hour())),
        Field::MinutePadded => write!(out, "{:02}", at.minute()),
        Field::Minute => write!(out, "{}", at.minute()),
        Field::SecondPadded => write!(out, "{:02}", at.second()),
        Field::Second => write!(out, "{}", at.second()),
        Field::MeridiemUpper => out.write_str(if at.hour() < 12 { "AM" } else { "PM" }),
        Field::MeridiemLower => out.write_str(if at.hour() < 12 { "am" } else { "pm" }),
        Field::UnixSeconds => write!(out, "{}", at.assume_utc().unix_timestamp()),
        Field::UnixMillis => write!(
            out,
            "{}",
            at.assume_utc().unix_timestamp_nanos() / 1_000_000
        ),
    };
}

fn hour_from_one(hour: u8) -> u8 {
    if hour == 0 {
        24
    } else {
        hour
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAYS[usize::from(weekday.number_days_from_sunday())]
}

fn ordinal_suffix(day: u8) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn parser_source(items: &[Item]) -> String {
    let mut source = String::from("^");
    for item in items {
        match item {
            Item::Literal(text) => source.push_str(&regex::escape(text)),
            Item::Field(field) => {
                source.push('(');
                source.push_str(field_regex(*field));
                source.push(')');
            }
        }
    }
    source.push('$');
    source
}

fn field_regex(field: Field) -> &'static str {
    match field {
        Field::Year | Field::IsoWeekYear => r"\d{4}",
        Field::YearShort => r"\d{2}",
        Field::Quarter => r"[1-4]",
        Field::MonthLong => {
            r"(?i:january|february|march|april|may|june|july|august|september|october|november|december)"
        }
        Field::MonthShort => r"(?i:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)",
        Field::MonthPadded
        | Field::DayPadded
        | Field::IsoWeekPadded
        | Field::Hour24Padded
        | Field::Hour12Padded
        | Field::HourFromOnePadded
        | Field::MinutePadded
        | Field::SecondPadded => r"\d{2}",
        Field::Month
        | Field::Day
        | Field::IsoWeek
        | Field::Hour24
        | Field::Hour12
        | Field::HourFromOne
        | Field::Minute
        | Field::Second => r"\d{1,2}",
        Field::DayOfYearPadded => r"\d{3}",
        Field::DayOfYear => r"\d{1,3}",
        Field::DayOrdinal => r"\d{1,2}(?:st|nd|rd|th)",
        Field::WeekdayLong => r"(?i:sunday|monday|tuesday|wednesday|thursday|friday|saturday)",
        Field::WeekdayShort => r"(?i:sun|mon|tue|wed|thu|fri|sat)",
        Field::WeekdayMin => r"(?i:su|mo|tu|we|th|fr|sa)",
        Field::Weekday => r"[0-6]",
        Field::IsoWeekday => r"[1-7]",
        Field::MeridiemUpper | Field::MeridiemLower => r"(?i:am|pm)",
        Field::UnixSeconds | Field::UnixMillis => r"-?\d+",
    }
}

#[derive(Debug, Default)]
struct Parts {
    year: Option<i32>,
    quarter: Option<u8>,
    month: Option<u8>,
    day: Option<u8>,
    day_of_year: Option<u16>,
    iso_week: Option<u8>,
    iso_week_year: Option<i32>,
    weekday: Option<Weekday>,
    unix_seconds: Option<i64>,
}

impl Parts {
    fn collect(fields: &[Field], caps: &Captures<'_>) -> Option<Self> {
        let mut parts = Parts::default();
        for (idx, field) in fields.iter().enumerate() {
            let raw = caps.get(idx + 1)?.as_str();
            match field {
                Field::Year => parts.year = Some(raw.parse().ok()?),
                Field::YearShort => {
                    let short: i32 = raw.parse().ok()?;
                    parts.year = Some(if short > 68 { 1900 + short } else { 2000 + short });
                }
                Field::IsoWeekYear => parts.iso_week_year = Some(raw.parse().ok()?),
                Field::Quarter => parts.quarter = Some(raw.parse().ok()?),
                Field::MonthLong | Field::MonthShort => {
                    let lowered = raw.to_ascii_lowercase();
                    let idx = MONTHS
                        .iter()
                        .position(|name| name.to_ascii_lowercase().starts_with(&lowered))?;
                    parts.month = Some(u8::try_from(idx + 1).ok()?);
                }
                Field::MonthPadded | Field::Month => parts.month = Some(raw.parse().ok()?),
                Field::DayPadded | Field::Day => parts.day = Some(raw.parse().ok()?),
                Field::DayOrdinal => {
                    let digits = raw.trim_end_matches(|c: char| c.is_ascii_alphabetic());
                    let day: u8 = digits.parse().ok()?;
                    if ordinal_suffix(day) != &raw[digits.len()..] {
                        return None;
                    }
                    parts.day = Some(day);
                }
                Field::DayOfYearPadded | Field::DayOfYear => {
                    parts.day_of_year = Some(raw.parse().ok()?)
                }
                Field::IsoWeekPadded | Field::IsoWeek => parts.iso_week = Some(raw.parse().ok()?),
                Field::WeekdayLong | Field::WeekdayShort | Field::WeekdayMin => {
                    let lowered = raw.to_ascii_lowercase();
                    let idx = WEEKDAYS
                        .iter()
                        .position(|name| name.to_ascii_lowercase().starts_with(&lowered))?;
                    parts.weekday = Some(weekday_from_sunday(u8::try_from(idx).ok()?));
                }
                Field::Weekday => parts.weekday = Some(weekday_from_sunday(raw.parse().ok()?)),
                Field::IsoWeekday => {
                    let number: u8 = raw.parse().ok()?;
                    parts.weekday = Some(weekday_from_sunday(number % 7));
                }
                Field::UnixSeconds => parts.unix_seconds = Some(raw.parse().ok()?),
                Field::UnixMillis => {
                    let millis: i64 = raw.parse().ok()?;
                    parts.unix_seconds = Some(millis.div_euclid(1000));
                }
                Field::Hour24Padded
                | Field::Hour24
                | Field::Hour12Padded
                | Field::Hour12
                | Field::HourFromOnePadded
                | Field::HourFromOne
                | Field::MinutePadded
                | Field::Minute
                | Field::SecondPadded
                | Field::Second
                | Field::MeridiemUpper
                | Field::MeridiemLower => {}
            }
        }
        Some(parts)
    }

    fn resolve(self, today: Date) -> Option<Date> {
        if let Some(seconds) = self.unix_seconds {
            return time::OffsetDateTime::from_unix_timestamp(seconds)
                .ok()
                .map(|at| at.date());
        }

        if let Some(week) = self.iso_week {
            let year = self
                .iso_week_year
                .or(self.year)
                .unwrap_or_else(|| today.to_iso_week_date().0);
            let weekday = self.weekday.unwrap_or(Weekday::Monday);
            return Date::from_iso_week_date(year, week, weekday).ok();
        }

        let year = self.year.or(self.iso_week_year);
        let date = if let Some(ordinal) = self.day_of_year {
            Date::from_ordinal_date(year.unwrap_or(today.year()), ordinal).ok()?
        } else {
            let month = self
                .month
                .or_else(|| self.quarter.map(|quarter| (quarter - 1) * 3 + 1));
            let (year, month, day) = match (year, month, self.day) {
                (Some(year), month, day) => (year, month.unwrap_or(1), day.unwrap_or(1)),
                (None, Some(month), day) => (today.year(), month, day.unwrap_or(1)),
                (None, None, Some(day)) => (today.year(), u8::from(today.month()), day),
                (None, None, None) => (today.year(), u8::from(today.month()), today.day()),
            };
            Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?
        };

        match self.weekday {
            Some(weekday) if date.weekday() != weekday => None,
            _ => Some(date),
        }
    }
}

fn weekday_from_sunday(number: u8) -> Weekday {
    match number {
        0 => Weekday::Sunday,
        1 => Weekday::Monday,
        2 => Weekday::Tuesday,
        3 => Weekday::Wednesday,
        4 => Weekday::Thursday,
        5 => Weekday::Friday,
        _ => Weekday::Saturday,
    }
}
