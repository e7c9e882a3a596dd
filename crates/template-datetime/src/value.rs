//! Host-agnostic template values.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::datetime::{DateTimeValue, Formattable};

/// The kind a virtual method is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Scalar,
    Mapping,
    Sequence,
}

impl ValueKind {
    pub const ALL: [ValueKind; 3] = [Self::Scalar, Self::Mapping, Self::Sequence];
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scalar => "scalar",
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
        })
    }
}

/// A value as seen by a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(DateTimeValue),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::List(_) => ValueKind::Sequence,
            Self::Map(_) => ValueKind::Mapping,
            _ => ValueKind::Scalar,
        }
    }

    /// `Undefined` and `Null` both mean "nothing here".
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// The text a date parser would see, if the value has one.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Int(n) => Some(Cow::Owned(n.to_string())),
            Self::Float(x) if x.is_finite() => Some(Cow::Owned(x.to_string())),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTimeValue> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// The value's formatting capability, if it has one.
    pub fn as_formattable(&self) -> Option<&dyn Formattable> {
        self.as_datetime().map(|dt| dt as &dyn Formattable)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTimeValue> for Value {
    fn from(dt: DateTimeValue) -> Self {
        Self::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Undefined, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Value::from("x").kind(), ValueKind::Scalar);
        assert_eq!(Value::Undefined.kind(), ValueKind::Scalar);
        assert_eq!(Value::from(vec![1i64, 2]).kind(), ValueKind::Sequence);
        assert_eq!(Value::Map(BTreeMap::new()).kind(), ValueKind::Mapping);
    }

    #[test]
    fn test_text_forms() {
        assert_eq!(Value::from(20160101i64).as_text().as_deref(), Some("20160101"));
        assert_eq!(Value::from(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(Value::from(f64::NAN).as_text(), None);
        assert_eq!(Value::from(true).as_text(), None);
        assert_eq!(Value::Null.as_text(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<DateTimeValue>), Value::Undefined);
        assert!(Value::from(None::<String>).is_absent());
        assert!(Value::Null.is_absent());
        assert!(!Value::from("").is_absent());
    }
}
