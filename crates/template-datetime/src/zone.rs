//! Time zone selection for constructed and parsed datetimes.
//!
//! A [`ZoneSpec`] names the zone a wall-clock reading belongs to. It is
//! parsed from the same strings template authors pass as `time_zone`:
//!
//! - `"floating"` — no zone at all (wall-clock fields only)
//! - `"local"` — the process's configured local zone
//! - `"UTC"`, `"Z"`, or any IANA name such as `"America/New_York"`
//! - a fixed offset such as `"+05:30"`, `"-0800"` or `"+09"`

use std::fmt;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::datetime::DateTimeValue;
use crate::error::DateError;

/// The zone attached to a wall-clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneSpec {
    /// No zone identity.
    #[default]
    Floating,
    /// The process's local zone.
    Local,
    /// An IANA zone (UTC included).
    Named(Tz),
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl ZoneSpec {
    /// Attach this zone to a wall-clock reading.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidDatetime`] if the reading does not exist in
    /// the zone or is ambiguous there (DST gaps and overlaps).
    pub fn attach(&self, naive: NaiveDateTime) -> Result<DateTimeValue, DateError> {
        let resolved = match self {
            Self::Floating => Some(DateTimeValue::Floating(naive)),
            Self::Local => chrono::Local
                .from_local_datetime(&naive)
                .single()
                .map(DateTimeValue::Local),
            Self::Named(tz) => tz
                .from_local_datetime(&naive)
                .single()
                .map(DateTimeValue::Zoned),
            Self::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(DateTimeValue::Offset),
        };

        resolved.ok_or_else(|| {
            DateError::InvalidDatetime(format!(
                "'{}' is ambiguous or nonexistent in zone {}",
                naive.format("%Y-%m-%dT%H:%M:%S"),
                self
            ))
        })
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Floating)
    }
}

impl FromStr for ZoneSpec {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "floating" => return Ok(Self::Floating),
            "local" => return Ok(Self::Local),
            "utc" | "z" => return Ok(Self::Named(Tz::UTC)),
            _ => {}
        }

        if let Some(offset) = parse_offset(trimmed) {
            return Ok(Self::Fixed(offset));
        }

        trimmed
            .parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| DateError::InvalidTimezone(format!("'{}'", s)))
    }
}

impl fmt::Display for ZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Floating => f.write_str("floating"),
            Self::Local => f.write_str("local"),
            Self::Named(tz) => f.write_str(tz.name()),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Parse `+HH`, `+HHMM` or `+HH:MM` (and the `-` forms) into a fixed offset.
pub(crate) fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };

    let digits = match rest.split_once(':') {
        Some((h, m)) if h.len() == 2 && m.len() == 2 => format!("{h}{m}"),
        Some(_) => return None,
        None => rest.to_string(),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes): (i32, i32) = match digits.len() {
        2 => (digits.parse().ok()?, 0),
        4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!("floating".parse::<ZoneSpec>().unwrap(), ZoneSpec::Floating);
        assert_eq!("Local".parse::<ZoneSpec>().unwrap(), ZoneSpec::Local);
        assert_eq!("UTC".parse::<ZoneSpec>().unwrap(), ZoneSpec::Named(Tz::UTC));
        assert_eq!("z".parse::<ZoneSpec>().unwrap(), ZoneSpec::Named(Tz::UTC));
    }

    #[test]
    fn test_parse_iana_name() {
        assert_eq!(
            "America/New_York".parse::<ZoneSpec>().unwrap(),
            ZoneSpec::Named(Tz::America__New_York)
        );
    }

    #[test]
    fn test_parse_offsets() {
        let expected = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        assert_eq!("+05:30".parse::<ZoneSpec>().unwrap(), ZoneSpec::Fixed(expected));
        assert_eq!("+0530".parse::<ZoneSpec>().unwrap(), ZoneSpec::Fixed(expected));

        let west = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!("-08".parse::<ZoneSpec>().unwrap(), ZoneSpec::Fixed(west));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "Mars/Olympus_Mons".parse::<ZoneSpec>(),
            Err(DateError::InvalidTimezone(_))
        ));
        assert!(parse_offset("+5:30").is_none());
        assert!(parse_offset("+25:00").is_none());
        assert!(parse_offset("0530").is_none());
    }

    #[test]
    fn test_attach_floating_keeps_fields() {
        assert!(ZoneSpec::default().is_floating());
        assert!(!ZoneSpec::Local.is_floating());

        let dt = ZoneSpec::Floating.attach(noon(2016, 1, 1)).unwrap();
        assert!(dt.is_floating());
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_attach_named_zone() {
        let dt = ZoneSpec::Named(Tz::Asia__Tokyo)
            .attach(noon(2026, 6, 15))
            .unwrap();
        assert_eq!(dt.time_zone_name().as_deref(), Some("Asia/Tokyo"));
        assert_eq!(dt.hour(), 12);
        // 12:00 JST = 03:00 UTC
        assert_eq!(dt.timestamp(), Some(1_781_492_400));
    }

    #[test]
    fn test_attach_rejects_dst_gap() {
        // March 8, 2026: 02:30 does not exist in New York
        let gap = NaiveDate::from_ymd_opt(2026, 3, 8)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let err = ZoneSpec::Named(Tz::America__New_York)
            .attach(gap)
            .unwrap_err();
        assert!(matches!(err, DateError::InvalidDatetime(_)));
    }

    #[test]
    fn test_display_round_trips_names() {
        assert_eq!(ZoneSpec::Floating.to_string(), "floating");
        assert_eq!(ZoneSpec::Named(Tz::Europe__Berlin).to_string(), "Europe/Berlin");
        assert_eq!(
            ZoneSpec::Fixed(FixedOffset::east_opt(3600).unwrap()).to_string(),
            "+01:00"
        );
    }
}
