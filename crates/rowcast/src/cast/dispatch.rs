//! Name-driven rule configuration.
//!
//! Rules files and other data-driven callers configure a [`Caster`] by rule
//! name instead of by builder method. Names that are neither a known rule nor
//! a registered custom type are treated as a per-field callback when given a
//! callback, and rejected otherwise.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::error::{CasterError, Result};

use super::caster::{Caster, FieldCallback};
use super::types::{FieldSelection, FieldType};
use super::Record;

/// Argument passed along with a rule name.
#[derive(Clone)]
pub enum RuleArg {
    /// Every field (`true` in rules files).
    All,
    Fields(Vec<String>),
    Map(Record),
    Callback(FieldCallback),
}

impl RuleArg {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RuleArg::Fields(fields.into_iter().map(Into::into).collect())
    }

    fn kind(&self) -> &'static str {
        match self {
            RuleArg::All => "all",
            RuleArg::Fields(_) => "field list",
            RuleArg::Map(_) => "map",
            RuleArg::Callback(_) => "callback",
        }
    }

    fn into_selection(self, rule: &str) -> Result<FieldSelection> {
        match self {
            RuleArg::All => Ok(FieldSelection::all()),
            RuleArg::Fields(fields) => Ok(FieldSelection::Only(fields)),
            other => Err(invalid(rule, &format!("expected all or a field list, got {}", other.kind()))),
        }
    }

    fn into_fields(self, rule: &str) -> Result<Vec<String>> {
        match self {
            RuleArg::Fields(fields) => Ok(fields),
            other => Err(invalid(rule, &format!("expected a field list, got {}", other.kind()))),
        }
    }

    fn into_map(self, rule: &str) -> Result<Record> {
        match self {
            RuleArg::Map(map) => Ok(map),
            other => Err(invalid(rule, &format!("expected a map, got {}", other.kind()))),
        }
    }
}

impl fmt::Debug for RuleArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleArg::All => f.write_str("All"),
            RuleArg::Fields(fields) => f.debug_tuple("Fields").field(fields).finish(),
            RuleArg::Map(map) => f.debug_tuple("Map").field(map).finish(),
            RuleArg::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<FieldSelection> for RuleArg {
    fn from(selection: FieldSelection) -> Self {
        match selection {
            FieldSelection::All(_) => RuleArg::All,
            FieldSelection::Only(fields) => RuleArg::Fields(fields),
        }
    }
}

impl TryFrom<Value> for RuleArg {
    type Error = CasterError;

    /// `true`, a string, a list of strings or an object.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(true) => Ok(RuleArg::All),
            Value::String(field) => Ok(RuleArg::Fields(vec![field])),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(field) => Ok(field),
                    other => Err(CasterError::InvalidArgument {
                        rule: "field list".to_string(),
                        message: format!("expected a field name, got {}", other),
                    }),
                })
                .collect::<Result<Vec<_>>>()
                .map(RuleArg::Fields),
            Value::Object(map) => Ok(RuleArg::Map(map)),
            other => Err(CasterError::InvalidArgument {
                rule: "argument".to_string(),
                message: format!("unsupported rule argument {}", other),
            }),
        }
    }
}

impl Caster {
    /// Apply a rule by name.
    ///
    /// | name | argument |
    /// |------|----------|
    /// | registered custom type | all / fields |
    /// | `allow`, `fields`, `deny` | fields |
    /// | `nullable`, `string`, `integer`, `float`, `boolean`, `array` | all / fields |
    /// | `rename` | map of string values |
    /// | `default` | map |
    /// | any other name | callback for the field of that name |
    pub fn call(self, name: &str, arg: RuleArg) -> Result<Self> {
        if self.registry().contains(name) {
            let selection = arg.into_selection(name)?;
            return self.custom_selection(name, selection);
        }

        match name {
            "allow" | "fields" => Ok(self.allow(arg.into_fields(name)?)),
            "deny" => Ok(self.deny(arg.into_fields(name)?)),
            "nullable" => Ok(self.nullable_selection(arg.into_selection(name)?)),
            "string" | "integer" | "float" | "boolean" | "array" => {
                let field_type: FieldType = name.parse()?;
                Ok(self.type_selection(field_type, arg.into_selection(name)?))
            }
            "rename" => {
                let map = arg.into_map(name)?;
                let mut renames = Vec::with_capacity(map.len());
                for (old, new) in map {
                    match new {
                        Value::String(new) => renames.push((old, new)),
                        other => {
                            return Err(invalid(
                                name,
                                &format!("new name for '{}' must be a string, got {}", old, other),
                            ));
                        }
                    }
                }
                Ok(self.rename_many(renames))
            }
            "default" => Ok(self.with_defaults(arg.into_map(name)?)),
            _ => match arg {
                RuleArg::Callback(callback) => {
                    let mut caster = self;
                    caster.push_field_callback(name.to_string(), callback);
                    Ok(caster)
                }
                other => {
                    debug!(rule = name, arg = other.kind(), "undefined rule");
                    Err(CasterError::UndefinedMethod(name.to_string()))
                }
            },
        }
    }
}

fn invalid(rule: &str, message: &str) -> CasterError {
    CasterError::InvalidArgument {
        rule: rule.to_string(),
        message: message.to_string(),
    }
}
