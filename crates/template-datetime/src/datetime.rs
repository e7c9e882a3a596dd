//! The date-time value handed to and returned from templates.
//!
//! [`DateTimeValue`] wraps the chrono representations a template can
//! meet: a zoned instant, an instant with a bare UTC offset, an instant in
//! the process's local zone, or a floating wall-clock reading with no zone
//! at all. Formatting goes through the [`Formattable`] capability so that
//! any chrono value can be formatted the same way.

use std::fmt::{self, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;

use crate::error::DateError;

/// Display form used when a datetime is rendered without a pattern.
pub const DEFAULT_DISPLAY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Anything that can render itself through a strftime pattern.
pub trait Formattable {
    /// Render with chrono strftime directives.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidFormat`] if the pattern contains an unknown
    /// directive or one the value cannot satisfy (e.g. `%z` without a zone).
    fn strftime(&self, pattern: &str) -> Result<String, DateError>;
}

/// A date-time reading, with or without zone identity.
#[derive(Debug, Clone, PartialEq)]
pub enum DateTimeValue {
    /// An instant in an IANA zone.
    Zoned(DateTime<Tz>),
    /// An instant carrying only a UTC offset (RFC 3339 / RFC 2822 input).
    Offset(DateTime<FixedOffset>),
    /// An instant in the process's local zone.
    Local(DateTime<Local>),
    /// Wall-clock fields with no zone.
    Floating(NaiveDateTime),
}

impl DateTimeValue {
    /// The current instant, in UTC.
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// The current instant in the local zone.
    pub fn now_local() -> Self {
        Self::Local(Local::now())
    }

    /// The current local wall-clock reading, without zone identity.
    pub fn now_floating() -> Self {
        Self::now_local().into_floating()
    }

    /// Drop the zone, keeping the wall-clock fields.
    pub fn into_floating(self) -> Self {
        Self::Floating(self.naive_local())
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Floating(_))
    }

    /// Wall-clock fields as seen in the value's own zone.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Self::Zoned(dt) => dt.naive_local(),
            Self::Offset(dt) => dt.naive_local(),
            Self::Local(dt) => dt.naive_local(),
            Self::Floating(naive) => *naive,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.naive_local().date()
    }

    pub fn year(&self) -> i32 {
        self.naive_local().year()
    }

    pub fn month(&self) -> u32 {
        self.naive_local().month()
    }

    pub fn day(&self) -> u32 {
        self.naive_local().day()
    }

    pub fn hour(&self) -> u32 {
        self.naive_local().hour()
    }

    pub fn minute(&self) -> u32 {
        self.naive_local().minute()
    }

    pub fn second(&self) -> u32 {
        self.naive_local().second()
    }

    pub fn nanosecond(&self) -> u32 {
        self.naive_local().nanosecond()
    }

    pub fn weekday(&self) -> Weekday {
        self.naive_local().weekday()
    }

    /// ISO day of week: Monday = 1 … Sunday = 7.
    pub fn day_of_week(&self) -> u32 {
        self.weekday().number_from_monday()
    }

    pub fn day_of_year(&self) -> u32 {
        self.naive_local().ordinal()
    }

    /// Name of the zone, `None` for floating values.
    ///
    /// IANA zones report their name, offset-only values their offset
    /// (`"+05:30"`), and local values `"local"`.
    pub fn time_zone_name(&self) -> Option<String> {
        match self {
            Self::Zoned(dt) => Some(dt.timezone().name().to_string()),
            Self::Offset(dt) => Some(dt.offset().to_string()),
            Self::Local(_) => Some("local".to_string()),
            Self::Floating(_) => None,
        }
    }

    /// Seconds since the Unix epoch. Floating values are not instants.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::Zoned(dt) => Some(dt.timestamp()),
            Self::Offset(dt) => Some(dt.timestamp()),
            Self::Local(dt) => Some(dt.timestamp()),
            Self::Floating(_) => None,
        }
    }

    /// Render with a strftime pattern.
    ///
    /// # Errors
    ///
    /// See [`Formattable::strftime`].
    pub fn format(&self, pattern: &str) -> Result<String, DateError> {
        match self {
            Self::Zoned(dt) => dt.strftime(pattern),
            Self::Offset(dt) => dt.strftime(pattern),
            Self::Local(dt) => dt.strftime(pattern),
            Self::Floating(naive) => naive.strftime(pattern),
        }
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.naive_local().format(DEFAULT_DISPLAY_FORMAT))
    }
}

impl From<DateTime<Tz>> for DateTimeValue {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::Zoned(dt)
    }
}

impl From<DateTime<Utc>> for DateTimeValue {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Zoned(dt.with_timezone(&Tz::UTC))
    }
}

impl From<DateTime<FixedOffset>> for DateTimeValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Offset(dt)
    }
}

impl From<DateTime<Local>> for DateTimeValue {
    fn from(dt: DateTime<Local>) -> Self {
        Self::Local(dt)
    }
}

impl From<NaiveDateTime> for DateTimeValue {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Floating(naive)
    }
}

impl Formattable for DateTimeValue {
    fn strftime(&self, pattern: &str) -> Result<String, DateError> {
        self.format(pattern)
    }
}

impl<Z: TimeZone> Formattable for DateTime<Z>
where
    Z::Offset: fmt::Display,
{
    fn strftime(&self, pattern: &str) -> Result<String, DateError> {
        let items = checked_items(pattern)?;
        render(pattern, self.format_with_items(items.iter()))
    }
}

impl Formattable for NaiveDateTime {
    fn strftime(&self, pattern: &str) -> Result<String, DateError> {
        let items = checked_items(pattern)?;
        render(pattern, self.format_with_items(items.iter()))
    }
}

impl Formattable for NaiveDate {
    fn strftime(&self, pattern: &str) -> Result<String, DateError> {
        let items = checked_items(pattern)?;
        render(pattern, self.format_with_items(items.iter()))
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// Tokenize a pattern, rejecting unknown directives up front.
fn checked_items(pattern: &str) -> Result<Vec<Item<'_>>, DateError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(DateError::InvalidFormat(format!(
            "unrecognized directive in '{pattern}'"
        )));
    }
    Ok(items)
}

/// chrono reports unsatisfiable directives as a `fmt::Error` at render time.
fn render(pattern: &str, formatted: impl fmt::Display) -> Result<String, DateError> {
    let mut out = String::new();
    write!(out, "{formatted}").map_err(|_| {
        DateError::InvalidFormat(format!("'{pattern}' cannot be rendered for this value"))
    })?;
    Ok(out)
}
