//! Virtual methods: operations a host lets templates call on plain values.
//!
//! A host exposes [`VMethodHost`]; plugins register named methods scoped to
//! a [`ValueKind`]. [`VMethodRegistry`] is a self-contained host suitable
//! for engines without an extension table of their own, and for tests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::DateError;
use crate::value::{Value, ValueKind};

/// A virtual method: receiver plus call arguments in, result out.
pub type VMethod = Arc<dyn Fn(&Value, &[Value]) -> Value + Send + Sync>;

/// Anything that accepts virtual-method registrations.
pub trait VMethodHost {
    fn define_vmethod(&mut self, kind: ValueKind, name: &str, method: VMethod);
}

/// In-memory virtual-method table.
#[derive(Default)]
pub struct VMethodRegistry {
    methods: HashMap<ValueKind, BTreeMap<String, VMethod>>,
}

impl VMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ValueKind, name: &str) -> Option<&VMethod> {
        self.methods.get(&kind)?.get(name)
    }

    pub fn contains(&self, kind: ValueKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    /// Registered names for `kind`, sorted.
    pub fn names(&self, kind: ValueKind) -> Vec<&str> {
        self.methods
            .get(&kind)
            .map(|table| table.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Dispatch `name` on `value` according to the value's kind.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::UnknownMethod`] if nothing is registered under
    /// `name` for the value's kind.
    pub fn call(&self, value: &Value, name: &str, args: &[Value]) -> Result<Value, DateError> {
        let kind = value.kind();
        let method = self.get(kind, name).ok_or_else(|| DateError::UnknownMethod {
            kind,
            name: name.to_string(),
        })?;
        Ok(method(value, args))
    }
}

impl VMethodHost for VMethodRegistry {
    fn define_vmethod(&mut self, kind: ValueKind, name: &str, method: VMethod) {
        self.methods
            .entry(kind)
            .or_default()
            .insert(name.to_string(), method);
    }
}

impl fmt::Debug for VMethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in ValueKind::ALL {
            map.entry(&kind, &self.names(kind));
        }
        map.finish()
    }
}
