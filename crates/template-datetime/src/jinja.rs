//! Binding for the [minijinja](https://docs.rs/minijinja) template engine.
//!
//! minijinja has no per-kind method table, so the virtual methods become
//! filters that accept any value:
//!
//! ```text
//! {{ post.published | coerce_date | strftime("%B %-d, %Y") }}
//! {{ "2016-01-01" | strftime("%m/%d") }}
//! {{ (row.updated | coerce_date).year }}
//! {{ datetime(year=1900, month=1, day=1) }}
//! {{ now_local().strftime("%H:%M") }}
//! ```
//!
//! Datetimes are exposed as objects with `year`, `month`, `day`, `hour`,
//! `minute`, `second`, `nanosecond`, `day_of_week`, `day_of_year`,
//! `time_zone` and `epoch` attributes plus a `strftime(pattern)` method.
//!
//! Failed coercion yields undefined. Whether `.year` on that undefined
//! renders empty or raises is the environment's call: use
//! [`UndefinedBehavior::Chainable`](minijinja::UndefinedBehavior::Chainable)
//! to chain freely over missing dates.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use minijinja::value::{from_args, Kwargs, Object, ObjectRepr};
use minijinja::{Environment, Error, ErrorKind, State};

use crate::datetime::DateTimeValue;
use crate::fields::DateFields;
use crate::plugin::{DatePlugin, COERCE_DATE, STRFTIME};
use crate::value::Value;

type JinjaValue = minijinja::Value;

/// A [`DateTimeValue`] living inside a minijinja template.
#[derive(Debug, Clone)]
pub struct DateTimeObject(pub DateTimeValue);

impl Object for DateTimeObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &JinjaValue) -> Option<JinjaValue> {
        let dt = &self.0;
        let value = match key.as_str()? {
            "year" => JinjaValue::from(dt.year()),
            "month" => JinjaValue::from(dt.month()),
            "day" => JinjaValue::from(dt.day()),
            "hour" => JinjaValue::from(dt.hour()),
            "minute" => JinjaValue::from(dt.minute()),
            "second" => JinjaValue::from(dt.second()),
            "nanosecond" => JinjaValue::from(dt.nanosecond()),
            "day_of_week" => JinjaValue::from(dt.day_of_week()),
            "day_of_year" => JinjaValue::from(dt.day_of_year()),
            "time_zone" => {
                JinjaValue::from(dt.time_zone_name().unwrap_or_else(|| "floating".to_string()))
            }
            "epoch" => JinjaValue::from(dt.timestamp()),
            _ => return None,
        };
        Some(value)
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[JinjaValue],
    ) -> Result<JinjaValue, Error> {
        match method {
            STRFTIME => {
                let (pattern,): (&str,) = from_args(args)?;
                Ok(self
                    .0
                    .format(pattern)
                    .map(JinjaValue::from)
                    .unwrap_or(JinjaValue::UNDEFINED))
            }
            _ => Err(Error::from(ErrorKind::UnknownMethod)),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Install the date filters and functions into `env`.
///
/// Filters: `coerce_date`, `strftime(pattern)`.
/// Functions: `datetime(**fields)`, `now_local()`, `now_floating()`.
pub fn register_minijinja(plugin: &DatePlugin, env: &mut Environment<'_>) {
    let shared = Arc::new(plugin.clone());

    let coerce = Arc::clone(&shared);
    env.add_filter(COERCE_DATE, move |value: JinjaValue| -> JinjaValue {
        to_jinja(coerce.coerce_date(&from_jinja(&value)))
    });

    let format = Arc::clone(&shared);
    env.add_filter(
        STRFTIME,
        move |value: JinjaValue, pattern: String| -> JinjaValue {
            format
                .loose_strftime(&from_jinja(&value), &pattern)
                .map(JinjaValue::from)
                .unwrap_or(JinjaValue::UNDEFINED)
        },
    );

    env.add_function("datetime", construct_from_kwargs);
    env.add_function("now_local", || to_jinja(Some(DatePlugin::now_local())));
    env.add_function("now_floating", || {
        to_jinja(Some(DatePlugin::now_floating()))
    });
}

/// `datetime()` is now; `datetime(year=…, month=…, …)` builds from fields.
fn construct_from_kwargs(kwargs: Kwargs) -> Result<JinjaValue, Error> {
    let fields = match kwargs.get::<Option<i32>>("year")? {
        Some(year) => Some(DateFields {
            year,
            month: kwargs.get::<Option<u32>>("month")?.unwrap_or(1),
            day: kwargs.get::<Option<u32>>("day")?.unwrap_or(1),
            hour: kwargs.get::<Option<u32>>("hour")?.unwrap_or(0),
            minute: kwargs.get::<Option<u32>>("minute")?.unwrap_or(0),
            second: kwargs.get::<Option<u32>>("second")?.unwrap_or(0),
            nanosecond: kwargs.get::<Option<u32>>("nanosecond")?.unwrap_or(0),
            time_zone: kwargs.get::<Option<String>>("time_zone")?,
        }),
        None if kwargs.args().next().is_some() => {
            return Err(Error::new(
                ErrorKind::MissingArgument,
                "datetime() needs a year when fields are given",
            ));
        }
        None => None,
    };
    kwargs.assert_all_used()?;

    DatePlugin::construct(fields)
        .map(|dt| to_jinja(Some(dt)))
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

fn to_jinja(dt: Option<DateTimeValue>) -> JinjaValue {
    dt.map_or(JinjaValue::UNDEFINED, |dt| {
        JinjaValue::from_object(DateTimeObject(dt))
    })
}

/// Translate a minijinja value into the plugin's value model.
fn from_jinja(value: &JinjaValue) -> Value {
    use minijinja::value::ValueKind as Kind;

    if let Some(obj) = value.downcast_object_ref::<DateTimeObject>() {
        return Value::DateTime(obj.0.clone());
    }

    match value.kind() {
        Kind::Undefined => Value::Undefined,
        Kind::None => Value::Null,
        Kind::Bool => Value::Bool(value.is_true()),
        Kind::Number => match value.as_i64() {
            Some(n) => Value::Int(n),
            None => f64::try_from(value.clone()).map_or(Value::Undefined, Value::Float),
        },
        Kind::String => Value::Text(value.as_str().unwrap_or_default().to_string()),
        Kind::Seq => value
            .try_iter()
            .map(|items| Value::List(items.map(|item| from_jinja(&item)).collect()))
            .unwrap_or(Value::Undefined),
        Kind::Map => {
            let mut map = BTreeMap::new();
            if let Ok(keys) = value.try_iter() {
                for key in keys {
                    if let (Some(name), Ok(item)) = (key.as_str(), value.get_item(&key)) {
                        map.insert(name.to_string(), from_jinja(&item));
                    }
                }
            }
            Value::Map(map)
        }
        _ => Value::Text(value.to_string()),
    }
}
