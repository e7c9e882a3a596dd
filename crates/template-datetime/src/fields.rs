//! Field-based construction of datetimes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::datetime::DateTimeValue;
use crate::error::DateError;
use crate::value::Value;
use crate::zone::ZoneSpec;

fn first() -> u32 {
    1
}

/// Calendar and clock fields for building a specific datetime.
///
/// Only `year` is required. Month and day default to 1, the clock fields
/// to 0, and a missing `time_zone` yields a floating value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFields {
    pub year: i32,
    #[serde(default = "first")]
    pub month: u32,
    #[serde(default = "first")]
    pub day: u32,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
    #[serde(default)]
    pub nanosecond: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl DateFields {
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            nanosecond: 0,
            time_zone: None,
        }
    }

    pub fn with_hms(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    pub fn with_nanosecond(mut self, nanosecond: u32) -> Self {
        self.nanosecond = nanosecond;
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Read fields out of a template mapping such as
    /// `{ year: 2016, month: 1, day: 1, time_zone: "UTC" }`.
    ///
    /// Integer fields accept integers, integral floats and numeric text.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidArgument`] if the value is not a mapping,
    /// `year` is missing, a field is not a whole number, or an unknown key is
    /// present.
    pub fn from_value(value: &Value) -> Result<Self, DateError> {
        let Value::Map(map) = value else {
            return Err(DateError::InvalidArgument(
                "datetime fields must be a mapping".to_string(),
            ));
        };

        if let Some(unknown) = map.keys().find(|k| !FIELD_NAMES.contains(&k.as_str())) {
            return Err(DateError::InvalidArgument(format!(
                "unknown datetime field '{unknown}'"
            )));
        }

        let year = map
            .get("year")
            .ok_or_else(|| DateError::InvalidArgument("missing field 'year'".to_string()))
            .and_then(|v| whole_number("year", v))?;
        let year = i32::try_from(year)
            .map_err(|_| DateError::InvalidArgument(format!("year {year} is out of range")))?;

        let mut fields = Self::ymd(year, 1, 1);
        for (name, slot) in [
            ("month", &mut fields.month),
            ("day", &mut fields.day),
            ("hour", &mut fields.hour),
            ("minute", &mut fields.minute),
            ("second", &mut fields.second),
            ("nanosecond", &mut fields.nanosecond),
        ] {
            if let Some(v) = map.get(name) {
                let n = whole_number(name, v)?;
                *slot = u32::try_from(n).map_err(|_| {
                    DateError::InvalidArgument(format!("{name} {n} is out of range"))
                })?;
            }
        }

        fields.time_zone = match map.get("time_zone") {
            None | Some(Value::Undefined | Value::Null) => None,
            Some(Value::Text(tz)) => Some(tz.clone()),
            Some(_) => {
                return Err(DateError::InvalidArgument(
                    "time_zone must be text".to_string(),
                ))
            }
        };

        Ok(fields)
    }

    /// Build the datetime these fields describe.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidDatetime`] for impossible calendar or clock
    /// fields (e.g. February 30th) or a wall-clock time the zone skips, and
    /// [`DateError::InvalidTimezone`] for an unknown `time_zone`.
    pub fn build(&self) -> Result<DateTimeValue, DateError> {
        let zone = match &self.time_zone {
            Some(name) => name.parse::<ZoneSpec>()?,
            None => ZoneSpec::Floating,
        };

        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day).ok_or_else(|| {
            DateError::InvalidDatetime(format!(
                "no such date: {}-{:02}-{:02}",
                self.year, self.month, self.day
            ))
        })?;
        let naive = date
            .and_hms_nano_opt(self.hour, self.minute, self.second, self.nanosecond)
            .ok_or_else(|| {
                DateError::InvalidDatetime(format!(
                    "no such time: {:02}:{:02}:{:02}.{:09}",
                    self.hour, self.minute, self.second, self.nanosecond
                ))
            })?;

        zone.attach(naive)
    }
}

const FIELD_NAMES: &[&str] = &[
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "nanosecond",
    "time_zone",
];

fn whole_number(name: &str, value: &Value) -> Result<i64, DateError> {
    let n = match value {
        Value::Int(n) => Some(*n),
        Value::Float(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => Some(*x as i64),
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    n.ok_or_else(|| DateError::InvalidArgument(format!("{name} must be a whole number")))
}
