//! Registry of named custom coercion types.
//!
//! A registry is built once, wrapped in an [`Arc`], and handed to every
//! [`Caster`](super::Caster) that should see its types. Custom types are
//! consulted in registration order, before any built-in type.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{CasterError, Result};

use super::convert::{self, is_set};
use super::Record;

/// Coercion callback: `(new record so far, field, nullable) -> value`.
pub type CustomCast = Arc<dyn Fn(&Record, &str, bool) -> Value + Send + Sync>;

/// Rule names a custom type may not take.
pub const RESERVED_NAMES: &[&str] = &[
    "allow", "fields", "deny", "nullable", "string", "integer", "float", "boolean", "array",
    "rename", "default",
];

/// Epoch values above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Named custom coercion types.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    casts: IndexMap<String, CustomCast>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the `json` and `timestamp` types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.casts.insert("json".to_string(), Arc::new(cast_json));
        registry
            .casts
            .insert("timestamp".to_string(), Arc::new(cast_timestamp));
        registry
    }

    /// Register a custom type. Re-registering a name replaces its callback
    /// but keeps its original position.
    pub fn register<F>(&mut self, name: impl Into<String>, cast: F) -> Result<&mut Self>
    where
        F: Fn(&Record, &str, bool) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(CasterError::ReservedTypeName(name));
        }
        self.casts.insert(name, Arc::new(cast));
        Ok(self)
    }

    /// Builder form of [`TypeRegistry::register`].
    pub fn with<F>(mut self, name: impl Into<String>, cast: F) -> Result<Self>
    where
        F: Fn(&Record, &str, bool) -> Value + Send + Sync + 'static,
    {
        self.register(name, cast)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&CustomCast> {
        self.casts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.casts.contains_key(name)
    }

    /// Registered names in precedence order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.casts.keys().map(String::as_str)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &CustomCast)> {
        self.casts.iter().map(|(name, cast)| (name.as_str(), cast))
    }

    pub fn len(&self) -> usize {
        self.casts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.casts.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Decode strings holding JSON text.
fn cast_json(row: &Record, field: &str, _nullable: bool) -> Value {
    match row.get(field) {
        Some(Value::String(s)) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
        }
        Some(value) => value.clone(),
        None => Value::Null,
    }
}

/// Normalise date/time values to RFC 3339 in UTC.
fn cast_timestamp(row: &Record, field: &str, nullable: bool) -> Value {
    let value = row.get(field);
    if !is_set(value) {
        return if nullable {
            Value::Null
        } else {
            Value::String(String::new())
        };
    }
    let value = value.unwrap_or(&Value::Null);

    match parse_timestamp(value) {
        Some(ts) => Value::String(ts.to_rfc3339()),
        None => Value::String(convert::to_string(value)),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(Utc.from_utc_datetime(&dt));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| Utc.from_utc_datetime(&dt))
        }
        Value::Number(n) => {
            let ts = n.as_i64()?;
            if ts > EPOCH_MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(ts)
            } else {
                DateTime::from_timestamp(ts, 0)
            }
        }
        _ => None,
    }
}
