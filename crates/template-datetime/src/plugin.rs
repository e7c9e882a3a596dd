//! The date plugin: coercion, loose formatting, and construction.
//!
//! [`DatePlugin`] is what a host loads. It registers two virtual methods:
//!
//! - `coerce_date` on scalars, mappings and sequences
//! - `strftime(pattern)` on scalars
//!
//! Both are forgiving. Input that cannot be read as a date yields the
//! host's undefined value instead of an error, so template authors can chain
//! further calls over possibly-missing data. Programmatic callers who want
//! the reason use [`DatePlugin::try_coerce_date`] and
//! [`DatePlugin::try_strftime`].
//!
//! Construction is the one strict path: [`DatePlugin::construct`] with bad
//! fields returns the error as-is.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::datetime::DateTimeValue;
use crate::error::DateError;
use crate::fields::DateFields;
use crate::parse::{FlexibleParser, ParseOptions};
use crate::value::{Value, ValueKind};
use crate::vmethod::{VMethod, VMethodHost};
use crate::zone::ZoneSpec;

/// Virtual-method name for date coercion.
pub const COERCE_DATE: &str = "coerce_date";
/// Virtual-method name for loose formatting.
pub const STRFTIME: &str = "strftime";

/// Plugin configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatePluginConfig {
    /// Zone attached to parsed text that names none. Floating when unset.
    pub time_zone: Option<String>,
    /// Read slash dates as `DD/MM/YYYY`.
    pub day_first: bool,
}

impl DatePluginConfig {
    /// Load from a JSON document such as `{"time_zone": "UTC"}`.
    pub fn from_json(json: &str) -> Result<Self, DateError> {
        serde_json::from_str(json).map_err(|e| DateError::Config(e.to_string()))
    }
}

/// Date coercion adapter between a template host and chrono.
#[derive(Debug, Clone, Default)]
pub struct DatePlugin {
    parser: FlexibleParser,
}

impl DatePlugin {
    /// Build a plugin from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::Config`] if `time_zone` names no known zone.
    pub fn new(config: DatePluginConfig) -> Result<Self, DateError> {
        let default_zone = match config.time_zone.as_deref() {
            Some(name) => name
                .parse::<ZoneSpec>()
                .map_err(|e| DateError::Config(e.to_string()))?,
            None => ZoneSpec::Floating,
        };

        Ok(Self::with_parser(FlexibleParser::new(ParseOptions {
            day_first: config.day_first,
            default_zone,
            anchor: None,
        })))
    }

    pub fn with_parser(parser: FlexibleParser) -> Self {
        Self { parser }
    }

    pub fn parser(&self) -> &FlexibleParser {
        &self.parser
    }

    // ── Host registration ───────────────────────────────────────────────

    /// Register `coerce_date` (all kinds) and `strftime` (scalars) with a host.
    pub fn register_extensions<H: VMethodHost + ?Sized>(&self, host: &mut H) {
        let plugin = Arc::new(self.clone());

        for kind in ValueKind::ALL {
            host.define_vmethod(kind, COERCE_DATE, coerce_vmethod(Arc::clone(&plugin)));
        }
        host.define_vmethod(ValueKind::Scalar, STRFTIME, strftime_vmethod(plugin));

        trace!(methods = ?[COERCE_DATE, STRFTIME], "registered date vmethods");
    }

    // ── Coercion ────────────────────────────────────────────────────────

    /// Coerce a template value into a datetime.
    ///
    /// Absent input and anything the parser cannot read give `None`.
    /// Datetimes pass through unchanged.
    ///
    /// Mappings are the one extension over plain text coercion: a mapping
    /// carrying a `year` key is read as [`DateFields`] rather than treated
    /// as having no date form. Other mappings still give `None`.
    pub fn coerce_date(&self, value: &Value) -> Option<DateTimeValue> {
        match self.try_coerce_date(value) {
            Ok(result) => result,
            Err(err) => {
                debug!(input = ?value, error = %err, "date coercion failed, yielding undefined");
                None
            }
        }
    }

    /// Like [`coerce_date`](Self::coerce_date), reporting why coercion failed.
    ///
    /// Absent input is `Ok(None)`. A mapping with a `year` key is read as
    /// construction fields; other values are parsed from their text form.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::Unparseable`] for text the parser cannot read and
    /// for values with no text form (booleans, sequences, mappings without
    /// `year`). Field mappings fail as [`DateFields::from_value`] and
    /// [`DateFields::build`] do.
    pub fn try_coerce_date(&self, value: &Value) -> Result<Option<DateTimeValue>, DateError> {
        if value.is_absent() {
            return Ok(None);
        }
        if let Value::DateTime(dt) = value {
            return Ok(Some(dt.clone()));
        }
        if value.get("year").is_some() {
            return DateFields::from_value(value)?.build().map(Some);
        }

        match value.as_text() {
            Some(text) => self.parser.parse(&text).map(Some),
            None => Err(DateError::Unparseable(format!(
                "{} value has no date form",
                value.kind()
            ))),
        }
    }

    /// Static form of [`coerce_date`](Self::coerce_date) with default options.
    pub fn coerce(value: &Value) -> Option<DateTimeValue> {
        Self::default().coerce_date(value)
    }

    // ── Formatting ──────────────────────────────────────────────────────

    /// Format a value with a strftime pattern, coercing it first if needed.
    ///
    /// Values that cannot be coerced, and patterns chrono cannot render for
    /// the value, give `None`.
    pub fn loose_strftime(&self, value: &Value, pattern: &str) -> Option<String> {
        match self.try_strftime(value, pattern) {
            Ok(result) => result,
            Err(err) => {
                debug!(
                    input = ?value,
                    pattern,
                    error = %err,
                    "strftime failed, yielding undefined"
                );
                None
            }
        }
    }

    /// Like [`loose_strftime`](Self::loose_strftime), reporting failures.
    ///
    /// Absent input is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Propagates coercion errors from [`try_coerce_date`](Self::try_coerce_date)
    /// and [`DateError::InvalidFormat`] from formatting.
    pub fn try_strftime(&self, value: &Value, pattern: &str) -> Result<Option<String>, DateError> {
        if let Some(formattable) = value.as_formattable() {
            return formattable.strftime(pattern).map(Some);
        }

        match self.try_coerce_date(value)? {
            Some(dt) => dt.format(pattern).map(Some),
            None => Ok(None),
        }
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Build a datetime: `None` for the current instant (UTC), or explicit
    /// fields.
    ///
    /// # Errors
    ///
    /// Propagates [`DateFields::build`] errors unchanged.
    pub fn construct(fields: Option<DateFields>) -> Result<DateTimeValue, DateError> {
        match fields {
            None => Ok(DateTimeValue::now()),
            Some(fields) => fields.build(),
        }
    }

    /// Method form of [`construct`](Self::construct). Only the fields are
    /// forwarded; the plugin's own configuration plays no part.
    pub fn new_datetime(&self, fields: Option<DateFields>) -> Result<DateTimeValue, DateError> {
        Self::construct(fields)
    }

    /// The current instant in the local zone.
    pub fn now_local() -> DateTimeValue {
        DateTimeValue::now_local()
    }

    /// The current local wall-clock reading, with no zone.
    pub fn now_floating() -> DateTimeValue {
        DateTimeValue::now_floating()
    }
}

fn coerce_vmethod(plugin: Arc<DatePlugin>) -> VMethod {
    Arc::new(move |value: &Value, _args: &[Value]| Value::from(plugin.coerce_date(value)))
}

fn strftime_vmethod(plugin: Arc<DatePlugin>) -> VMethod {
    Arc::new(move |value: &Value, args: &[Value]| match args.first() {
        Some(Value::Text(pattern)) => Value::from(plugin.loose_strftime(value, pattern)),
        other => {
            debug!(pattern = ?other, "strftime needs a text pattern, yielding undefined");
            Value::Undefined
        }
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vmethod::VMethodRegistry;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn fields_map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    // ── coerce_date ─────────────────────────────────────────────────────

    #[test]
    fn test_coerce_absent_is_none() {
        let plugin = DatePlugin::default();
        assert_eq!(plugin.coerce_date(&Value::Undefined), None);
        assert_eq!(plugin.coerce_date(&Value::Null), None);
        assert_eq!(plugin.try_coerce_date(&Value::Undefined), Ok(None));
    }

    #[test]
    fn test_coerce_datetime_is_identity() {
        let dt = DateTimeValue::now_local();
        let plugin = DatePlugin::default();
        assert_eq!(plugin.coerce_date(&Value::from(dt.clone())), Some(dt));
    }

    #[test]
    fn test_coerce_iso_text() {
        let dt = DatePlugin::default()
            .coerce_date(&Value::from("2016-01-01"))
            .unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2016, 1, 1));
    }

    #[test]
    fn test_coerce_garbage_is_none_not_error() {
        let plugin = DatePlugin::default();
        assert_eq!(plugin.coerce_date(&Value::from("not a date")), None);
        assert!(matches!(
            plugin.try_coerce_date(&Value::from("not a date")),
            Err(DateError::Unparseable(_))
        ));
    }

    #[test]
    fn test_coerce_numbers_via_text_form() {
        let plugin = DatePlugin::default();
        let compact = plugin.coerce_date(&Value::Int(20160101)).unwrap();
        assert_eq!(compact.to_string(), "2016-01-01T00:00:00");

        let epoch = plugin.coerce_date(&Value::Int(1_451_606_400)).unwrap();
        assert_eq!(epoch.timestamp(), Some(1_451_606_400));
    }

    #[test]
    fn test_coerce_values_without_text_form() {
        let plugin = DatePlugin::default();
        assert_eq!(plugin.coerce_date(&Value::Bool(true)), None);
        assert_eq!(plugin.coerce_date(&Value::from(vec!["2016-01-01"])), None);
        assert_eq!(plugin.coerce_date(&fields_map(&[])), None);
    }

    #[test]
    fn test_coerce_field_mapping() {
        let plugin = DatePlugin::default();
        let value = fields_map(&[
            ("year", Value::Int(2016)),
            ("month", Value::Int(7)),
            ("day", Value::Int(4)),
            ("time_zone", Value::from("UTC")),
        ]);
        let dt = plugin.coerce_date(&value).unwrap();
        assert_eq!(dt.to_string(), "2016-07-04T00:00:00");
        assert_eq!(dt.time_zone_name().as_deref(), Some("UTC"));

        let impossible = fields_map(&[("year", Value::Int(2016)), ("month", Value::Int(13))]);
        assert_eq!(plugin.coerce_date(&impossible), None);
    }

    #[test]
    fn test_class_coerce_matches_instance() {
        let value = Value::from("March 5, 2021");
        assert_eq!(
            DatePlugin::coerce(&value),
            DatePlugin::default().coerce_date(&value)
        );
        assert_eq!(DatePlugin::coerce(&Value::Undefined), None);
    }

    // ── strftime ────────────────────────────────────────────────────────

    #[test]
    fn test_loose_strftime_text() {
        let plugin = DatePlugin::default();
        assert_eq!(
            plugin.loose_strftime(&Value::from("2016-01-01"), "%m/%d"),
            Some("01/01".to_string())
        );
        assert_eq!(plugin.loose_strftime(&Value::from("garbage"), "%m/%d"), None);
        assert_eq!(plugin.loose_strftime(&Value::Undefined, "%m/%d"), None);
    }

    #[test]
    fn test_loose_strftime_uses_datetime_directly() {
        let dt = DatePlugin::construct(Some(DateFields::ymd(1999, 12, 31).with_hms(23, 59, 0)))
            .unwrap();
        assert_eq!(
            DatePlugin::default().loose_strftime(&Value::from(dt), "%Y %H:%M"),
            Some("1999 23:59".to_string())
        );
    }

    #[test]
    fn test_strftime_bad_pattern() {
        let plugin = DatePlugin::default();
        let value = Value::from("2016-01-01");
        assert_eq!(plugin.loose_strftime(&value, "%Q"), None);
        assert!(matches!(
            plugin.try_strftime(&value, "%Q"),
            Err(DateError::InvalidFormat(_))
        ));
        // floating values have no offset to print
        assert_eq!(plugin.loose_strftime(&value, "%z"), None);
    }

    // ── construct / now ─────────────────────────────────────────────────

    #[test]
    fn test_construct_without_fields_is_now() {
        let before = Utc::now().timestamp();
        let dt = DatePlugin::construct(None).unwrap();
        let after = Utc::now().timestamp();

        let ts = dt.timestamp().unwrap();
        assert!(before <= ts && ts <= after);
        assert_eq!(dt.time_zone_name().as_deref(), Some("UTC"));
    }

    #[test]
    fn test_construct_with_fields() {
        let dt = DatePlugin::construct(Some(DateFields::ymd(1900, 1, 1))).unwrap();
        assert_eq!(
            dt.naive_local(),
            NaiveDate::from_ymd_opt(1900, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_construct_errors_propagate() {
        assert!(matches!(
            DatePlugin::construct(Some(DateFields::ymd(2021, 2, 30))),
            Err(DateError::InvalidDatetime(_))
        ));
        assert!(matches!(
            DatePlugin::default()
                .new_datetime(Some(DateFields::ymd(2021, 1, 1).with_time_zone("Moon/Base"))),
            Err(DateError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_method_form_ignores_plugin_config() {
        let plugin = DatePlugin::new(DatePluginConfig {
            time_zone: Some("Asia/Tokyo".to_string()),
            day_first: false,
        })
        .unwrap();
        let dt = plugin.new_datetime(Some(DateFields::ymd(2020, 5, 17))).unwrap();
        assert!(dt.is_floating());
    }

    #[test]
    fn test_now_floating_matches_now_local() {
        let local = DatePlugin::now_local();
        let floating = DatePlugin::now_floating();

        assert!(floating.is_floating());
        assert_eq!(floating.time_zone_name(), None);
        assert!(local.time_zone_name().is_some());

        let drift = floating.naive_local() - local.naive_local();
        assert!(drift.num_seconds().abs() <= 1);
    }

    // ── registration ────────────────────────────────────────────────────

    #[test]
    fn test_register_extensions() {
        let mut registry = VMethodRegistry::new();
        DatePlugin::default().register_extensions(&mut registry);

        for kind in ValueKind::ALL {
            assert!(registry.contains(kind, COERCE_DATE));
        }
        assert!(registry.contains(ValueKind::Scalar, STRFTIME));
        assert!(!registry.contains(ValueKind::Mapping, STRFTIME));
        assert!(!registry.contains(ValueKind::Sequence, STRFTIME));
    }

    #[test]
    fn test_vmethods_dispatch() {
        let mut registry = VMethodRegistry::new();
        DatePlugin::default().register_extensions(&mut registry);

        let formatted = registry
            .call(&Value::from("2016-01-01"), STRFTIME, &[Value::from("%m/%d")])
            .unwrap();
        assert_eq!(formatted, Value::from("01/01"));

        let coerced = registry
            .call(&Value::from("junk"), COERCE_DATE, &[])
            .unwrap();
        assert_eq!(coerced, Value::Undefined);

        let missing_pattern = registry
            .call(&Value::from("2016-01-01"), STRFTIME, &[])
            .unwrap();
        assert_eq!(missing_pattern, Value::Undefined);

        let sequence = registry
            .call(&Value::from(vec![1i64, 2, 3]), COERCE_DATE, &[])
            .unwrap();
        assert_eq!(sequence, Value::Undefined);
    }

    #[test]
    fn test_registered_vmethods_use_plugin_config() {
        let plugin = DatePlugin::new(DatePluginConfig {
            time_zone: None,
            day_first: true,
        })
        .unwrap();
        let mut registry = VMethodRegistry::new();
        plugin.register_extensions(&mut registry);

        let formatted = registry
            .call(&Value::from("01/02/2016"), STRFTIME, &[Value::from("%B")])
            .unwrap();
        assert_eq!(formatted, Value::from("February"));
    }

    // ── configuration ───────────────────────────────────────────────────

    #[test]
    fn test_config_from_json() {
        let config = DatePluginConfig::from_json(r#"{"time_zone": "UTC", "day_first": true}"#)
            .unwrap();
        assert_eq!(config.time_zone.as_deref(), Some("UTC"));
        assert!(config.day_first);

        assert_eq!(DatePluginConfig::from_json("{}").unwrap(), DatePluginConfig::default());
        assert!(matches!(
            DatePluginConfig::from_json(r#"{"timezone": "UTC"}"#),
            Err(DateError::Config(_))
        ));
    }

    #[test]
    fn test_config_zone_applies_to_parsed_text() {
        let plugin = DatePlugin::new(DatePluginConfig {
            time_zone: Some("America/New_York".to_string()),
            day_first: false,
        })
        .unwrap();
        assert!(!plugin.parser().options().default_zone.is_floating());
        assert!(!plugin.parser().options().day_first);

        let dt = plugin.coerce_date(&Value::from("2026-01-15 09:00")).unwrap();
        assert_eq!(dt.time_zone_name().as_deref(), Some("America/New_York"));
        assert_eq!(dt.format("%z").unwrap(), "-0500");
    }

    #[test]
    fn test_config_rejects_unknown_zone() {
        let err = DatePlugin::new(DatePluginConfig {
            time_zone: Some("Atlantis/Capital".to_string()),
            day_first: false,
        })
        .unwrap_err();
        assert!(matches!(err, DateError::Config(_)));
    }

    // ── Properties ──────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn prop_datetimes_coerce_to_themselves(
            year in 1i32..9999,
            ordinal in 1u32..=365,
            secs in 0u32..86_400,
        ) {
            let naive = NaiveDate::from_yo_opt(year, ordinal)
                .unwrap()
                .and_hms_opt(secs / 3600, (secs / 60) % 60, secs % 60)
                .unwrap();
            let dt = DateTimeValue::Floating(naive);
            prop_assert_eq!(DatePlugin::coerce(&Value::from(dt.clone())), Some(dt));
        }

        #[test]
        fn prop_iso_text_round_trips_fields(
            year in 1000i32..9999,
            month in 1u32..=12,
            day in 1u32..=28,
        ) {
            let text = format!("{year:04}-{month:02}-{day:02}");
            let dt = DatePlugin::coerce(&Value::from(text.as_str())).unwrap();
            prop_assert_eq!((dt.year(), dt.month(), dt.day()), (year, month, day));
            prop_assert_eq!(
                DatePlugin::default().loose_strftime(&Value::from(text), "%Y-%m-%d"),
                Some(format!("{year:04}-{month:02}-{day:02}"))
            );
        }

        #[test]
        fn prop_single_words_without_digits_are_absent(word in "[a-zA-Z]{0,16}") {
            let lower = word.to_lowercase();
            prop_assume!(!matches!(lower.as_str(), "now" | "today" | "tomorrow" | "yesterday"));
            prop_assert_eq!(DatePlugin::coerce(&Value::from(word)), None);
        }
    }
}
