//! # template-datetime
//!
//! Date/time convenience for template engines.
//!
//! Template data is full of dates in whatever shape the upstream system
//! produced: ISO stamps, `"January 1st, 2016"`, epoch seconds, `null`.
//! This crate turns such values into chrono-backed datetimes and formats
//! them, without letting a bad value take the whole render down.
//!
//! ## Modules
//!
//! - [`plugin`] — [`DatePlugin`]: coercion, loose strftime, construction, host registration
//! - [`vmethod`] — Virtual-method host trait and an in-memory registry
//! - [`parse`] — Flexible date-string parser over a cascade of chrono formats
//! - [`datetime`] — [`DateTimeValue`] and the [`Formattable`] capability
//! - [`fields`] — Field-based construction arguments
//! - [`zone`] — Floating / local / IANA / fixed-offset zone selection
//! - [`value`] — Host-agnostic template values
//! - [`jinja`] — minijinja filters and functions (feature `minijinja`)
//! - [`error`] — Error types
//!
//! ## Example
//!
//! ```
//! use template_datetime::{DatePlugin, Value, VMethodRegistry, STRFTIME};
//!
//! let mut host = VMethodRegistry::new();
//! DatePlugin::default().register_extensions(&mut host);
//!
//! let out = host
//!     .call(&Value::from("2016-01-01"), STRFTIME, &[Value::from("%m/%d")])
//!     .unwrap();
//! assert_eq!(out, Value::from("01/01"));
//!
//! let missing = host
//!     .call(&Value::from("garbage"), STRFTIME, &[Value::from("%m/%d")])
//!     .unwrap();
//! assert_eq!(missing, Value::Undefined);
//! ```

pub mod datetime;
pub mod error;
pub mod fields;
#[cfg(feature = "minijinja")]
pub mod jinja;
pub mod parse;
pub mod plugin;
pub mod value;
pub mod vmethod;
pub mod zone;

pub use datetime::{DateTimeValue, Formattable};
pub use error::DateError;
pub use fields::DateFields;
#[cfg(feature = "minijinja")]
pub use jinja::{register_minijinja, DateTimeObject};
pub use parse::{parse_flexible, FlexibleParser, ParseOptions};
pub use plugin::{DatePlugin, DatePluginConfig, COERCE_DATE, STRFTIME};
pub use value::{Value, ValueKind};
pub use vmethod::{VMethod, VMethodHost, VMethodRegistry};
pub use zone::ZoneSpec;
