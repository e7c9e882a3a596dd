//! Flexible date-string parsing.
//!
//! Interprets the loosely written dates template data tends to carry:
//! ISO 8601 and RFC 2822 stamps, US and European slash dates, month names,
//! compact `YYYYMMDD` numbers, Unix epoch seconds, and a handful of
//! relative words ("today", "3 days ago", "in 2 hours").
//!
//! Input is tried against a fixed cascade of chrono formats, most specific
//! first. Nothing is guessed beyond that cascade: if no format matches the
//! whole input, parsing fails with [`DateError::Unparseable`].
//!
//! Readings that carry no zone of their own get
//! [`ParseOptions::default_zone`], which is floating unless configured.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, Utc};

use crate::datetime::DateTimeValue;
use crate::error::DateError;
use crate::zone::ZoneSpec;

/// Options for [`FlexibleParser`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOptions {
    /// Read `01/02/2016` as 1 February rather than 2 January.
    pub day_first: bool,
    /// Zone given to readings without an explicit zone or offset.
    pub default_zone: ZoneSpec,
    /// Wall-clock "now" for relative words. Defaults to the current time
    /// in `default_zone` (local time when floating).
    pub anchor: Option<NaiveDateTime>,
}

/// Heuristic date parser over a cascade of chrono formats.
#[derive(Debug, Clone, Default)]
pub struct FlexibleParser {
    options: ParseOptions,
}

impl FlexibleParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `input` into a datetime.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::Unparseable`] if no supported format matches.
    pub fn parse(&self, input: &str) -> Result<DateTimeValue, DateError> {
        let normalized = normalize_input(input);
        if normalized.is_empty() {
            return Err(DateError::Unparseable(input.to_string()));
        }

        let zone = &self.options.default_zone;

        self.try_relative(&normalized)
            .or_else(|| try_rfc(&normalized))
            .or_else(|| try_numeric(&normalized, zone))
            .or_else(|| try_offset_formats(&normalized))
            .or_else(|| self.try_trailing_zone(&normalized))
            .or_else(|| {
                self.try_naive(&normalized)
                    .and_then(|naive| zone.attach(naive).ok())
            })
            .ok_or_else(|| DateError::Unparseable(input.trim().to_string()))
    }

    fn anchor(&self) -> NaiveDateTime {
        self.options
            .anchor
            .unwrap_or_else(|| wall_clock_now(&self.options.default_zone))
    }

    /// "now", "today", "tomorrow", "yesterday", "in N units", "N units ago",
    /// "a week from now". Offsets move the wall clock.
    fn try_relative(&self, s: &str) -> Option<DateTimeValue> {
        let s = s.to_lowercase();
        let anchor = self.anchor();
        let midnight = |date: NaiveDate| date.and_hms_opt(0, 0, 0);

        let naive = match s.as_str() {
            "now" => Some(anchor),
            "today" => midnight(anchor.date()),
            "tomorrow" => midnight(anchor.date().succ_opt()?),
            "yesterday" => midnight(anchor.date().pred_opt()?),
            _ => {
                if let Some(rest) = s.strip_prefix("in ") {
                    let seconds = parse_amount(rest)?;
                    anchor.checked_add_signed(Duration::try_seconds(seconds)?)
                } else if let Some(rest) = s.strip_suffix(" ago") {
                    let seconds = parse_amount(rest)?;
                    anchor.checked_sub_signed(Duration::try_seconds(seconds)?)
                } else if let Some(rest) = s.strip_suffix(" from now") {
                    let seconds = parse_amount(rest)?;
                    anchor.checked_add_signed(Duration::try_seconds(seconds)?)
                } else {
                    None
                }
            }
        }?;

        self.options.default_zone.attach(naive).ok()
    }

    /// A naive reading followed by a zone token: `2016-01-01 10:00 UTC`,
    /// `Jan 1 2016 09:30 America/Chicago`, `2016-01-01 10:00 +05:30`.
    fn try_trailing_zone(&self, s: &str) -> Option<DateTimeValue> {
        let (head, token) = s.rsplit_once(' ')?;
        let zone = match token.to_ascii_uppercase().as_str() {
            "GMT" => ZoneSpec::Named(chrono_tz::Tz::UTC),
            _ => token.parse::<ZoneSpec>().ok()?,
        };
        let naive = self.try_naive(head)?;
        zone.attach(naive).ok()
    }

    fn try_naive(&self, s: &str) -> Option<NaiveDateTime> {
        let (preferred_dt, fallback_dt, preferred_d, fallback_d) = if self.options.day_first {
            (
                DAY_FIRST_DATETIME_FORMATS,
                MONTH_FIRST_DATETIME_FORMATS,
                DAY_FIRST_DATE_FORMATS,
                MONTH_FIRST_DATE_FORMATS,
            )
        } else {
            (
                MONTH_FIRST_DATETIME_FORMATS,
                DAY_FIRST_DATETIME_FORMATS,
                MONTH_FIRST_DATE_FORMATS,
                DAY_FIRST_DATE_FORMATS,
            )
        };

        preferred_dt
            .iter()
            .chain(fallback_dt)
            .chain(DATETIME_FORMATS)
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| {
                preferred_d
                    .iter()
                    .chain(fallback_d)
                    .chain(DATE_FORMATS)
                    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                    .or_else(|| self.try_yearless(s))
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }

    /// "Jan 1", "1 January", "Friday, January 1": the anchor's year.
    fn try_yearless(&self, s: &str) -> Option<NaiveDate> {
        let with_year = format!("{s} {}", self.anchor().year());
        YEARLESS_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&with_year, &format!("{fmt} %Y")).ok())
    }
}

/// Parse with default options: floating zone, month-first slash dates.
///
/// # Errors
///
/// Returns [`DateError::Unparseable`] if no supported format matches.
pub fn parse_flexible(input: &str) -> Result<DateTimeValue, DateError> {
    FlexibleParser::default().parse(input)
}

// ── Format cascade ──────────────────────────────────────────────────────────
//
// `%B` and `%A` accept both full and abbreviated names when parsing.
// Slash tables run before the generic ones, and two-digit-year forms before
// their four-digit twins: `%Y` would happily read "1/2/16" as 16 February
// of the year 1, and "16" as the year 16.

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M %z",
    "%A %B %d %H:%M:%S %z %Y",
    "%d/%B/%Y:%H:%M:%S %z",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M %p",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%B %d %Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%A %B %d %H:%M:%S %Y",
    "%A, %d %B %Y %H:%M:%S",
];

const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%Y %I:%M %p",
];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d-%B-%Y",
    "%A, %B %d, %Y",
    "%A %B %d %Y",
    "%A, %d %B %Y",
    "%A %d %B %Y",
];

const YEARLESS_DATE_FORMATS: &[&str] = &["%B %d", "%d %B", "%A, %B %d", "%A %B %d"];

const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%m-%d-%Y"];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

// ── Internal helpers ────────────────────────────────────────────────────────

/// Trim, collapse runs of whitespace, and drop ordinal suffixes ("1st" → "1").
fn normalize_input(s: &str) -> String {
    s.split_whitespace()
        .map(strip_ordinal)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_ordinal(word: &str) -> String {
    let (core, trail) = match word.strip_suffix(',') {
        Some(core) => (core, ","),
        None => (word, ""),
    };
    let lower = core.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(num) = lower.strip_suffix(suffix) {
            if !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()) {
                return format!("{}{}", &core[..num.len()], trail);
            }
        }
    }
    word.to_string()
}

fn try_rfc(s: &str) -> Option<DateTimeValue> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .ok()
        .map(DateTimeValue::Offset)
}

fn try_offset_formats(s: &str) -> Option<DateTimeValue> {
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
        .map(DateTimeValue::Offset)
}

/// `YYYYMMDD` (8 digits) or Unix epoch seconds (9+ integer digits, optional
/// fraction). Epoch readings are UTC instants.
fn try_numeric(s: &str, zone: &ZoneSpec) -> Option<DateTimeValue> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let digits = int_part.strip_prefix('-').unwrap_or(int_part);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    if digits.len() == 8 && frac_part.is_none() && digits.len() == int_part.len() {
        let date = NaiveDate::from_ymd_opt(
            digits[..4].parse().ok()?,
            digits[4..6].parse().ok()?,
            digits[6..].parse().ok()?,
        )?;
        return zone.attach(date.and_hms_opt(0, 0, 0)?).ok();
    }

    if digits.len() < 9 {
        return None;
    }

    let seconds: i64 = int_part.parse().ok()?;
    let nanos = match frac_part {
        Some(frac) => {
            let mut padded: String = frac.chars().take(9).collect();
            while padded.len() < 9 {
                padded.push('0');
            }
            padded.parse::<u32>().ok()?
        }
        None => 0,
    };
    if seconds < 0 && nanos > 0 {
        // -1.5 means 1.5 seconds before the epoch
        let utc =
            DateTime::<Utc>::from_timestamp(seconds.checked_sub(1)?, 1_000_000_000 - nanos)?;
        return Some(utc.into());
    }
    DateTime::<Utc>::from_timestamp(seconds, nanos).map(DateTimeValue::from)
}

/// "2 hours", "an hour", "a week" → seconds.
fn parse_amount(s: &str) -> Option<i64> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 2 {
        return None;
    }
    let n: i64 = match parts[0] {
        "a" | "an" => 1,
        other => other.parse().ok()?,
    };
    n.checked_mul(unit_seconds(parts[1])?)
}

fn unit_seconds(unit: &str) -> Option<i64> {
    match unit {
        "second" | "seconds" | "sec" | "secs" => Some(1),
        "minute" | "minutes" | "min" | "mins" => Some(60),
        "hour" | "hours" | "hr" | "hrs" => Some(3600),
        "day" | "days" => Some(86400),
        "week" | "weeks" | "wk" | "wks" => Some(604800),
        _ => None,
    }
}

/// Current wall-clock reading in `zone`; floating readings use local time.
fn wall_clock_now(zone: &ZoneSpec) -> NaiveDateTime {
    match zone {
        ZoneSpec::Floating | ZoneSpec::Local => Local::now().naive_local(),
        ZoneSpec::Named(tz) => Utc::now().with_timezone(tz).naive_local(),
        ZoneSpec::Fixed(offset) => Utc::now().with_timezone(offset).naive_local(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
