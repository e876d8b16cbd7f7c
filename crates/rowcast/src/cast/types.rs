//! Built-in field types, field selections and inline type specs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CasterError;

/// Token marking a field as nullable inside an inline type spec.
pub const NULLABLE: &str = "nullable";

/// Built-in coercion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Float,
    Integer,
    Boolean,
    Array,
}

impl FieldType {
    /// Order in which typed selections are consulted for a field.
    ///
    /// A field selected under several types gets the first match.
    pub const CAST_ORDER: [FieldType; 5] = [
        FieldType::String,
        FieldType::Float,
        FieldType::Integer,
        FieldType::Boolean,
        FieldType::Array,
    ];

    /// Rule name used by rules files and [`Caster::call`](super::Caster::call).
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Float => "float",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        }
    }

    /// Index into [`FieldType::CAST_ORDER`].
    pub(crate) fn slot(&self) -> usize {
        match self {
            FieldType::String => 0,
            FieldType::Float => 1,
            FieldType::Integer => 2,
            FieldType::Boolean => 3,
            FieldType::Array => 4,
        }
    }
}

impl FromStr for FieldType {
    type Err = CasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "float" => Ok(FieldType::Float),
            "integer" => Ok(FieldType::Integer),
            "boolean" => Ok(FieldType::Boolean),
            "array" => Ok(FieldType::Array),
            _ => Err(CasterError::UnknownType(s.to_string())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Either every field or an explicit list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSelection {
    /// `true` in rules files.
    All(AllMarker),
    Only(Vec<String>),
}

/// Serde helper for the literal `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllMarker;

impl Serialize for AllMarker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bool(true)
    }
}

impl<'de> Deserialize<'de> for AllMarker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match bool::deserialize(deserializer)? {
            true => Ok(AllMarker),
            false => Err(serde::de::Error::custom(
                "expected `true` or a list of field names",
            )),
        }
    }
}

impl FieldSelection {
    /// Selection matching every field.
    pub fn all() -> Self {
        FieldSelection::All(AllMarker)
    }

    /// Selection matching the given fields.
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Only(fields.into_iter().map(Into::into).collect())
    }

    /// Empty explicit selection.
    pub fn none() -> Self {
        FieldSelection::Only(Vec::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FieldSelection::All(_))
    }

    /// True when no field can match.
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldSelection::Only(fields) if fields.is_empty())
    }

    pub fn contains(&self, field: &str) -> bool {
        match self {
            FieldSelection::All(_) => true,
            FieldSelection::Only(fields) => fields.iter().any(|f| f == field),
        }
    }

    /// Merge another selection into this one.
    ///
    /// `All` replaces anything; an explicit list appends to a list and
    /// replaces a previous `All`.
    pub fn merge(&mut self, other: FieldSelection) {
        match (self, other) {
            (FieldSelection::Only(current), FieldSelection::Only(more)) => current.extend(more),
            (slot, other) => *slot = other,
        }
    }

    /// Number of explicitly listed fields (`None` for `All`).
    pub fn len(&self) -> Option<usize> {
        match self {
            FieldSelection::All(_) => None,
            FieldSelection::Only(fields) => Some(fields.len()),
        }
    }
}

impl Default for FieldSelection {
    fn default() -> Self {
        FieldSelection::none()
    }
}

/// Inline type spec attached to an allowed field, e.g. `"integer|nullable"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSpec {
    /// Type names other than `nullable`, in declaration order.
    pub types: Vec<String>,
    pub nullable: bool,
}

impl TypeSpec {
    /// Parse a `|`-separated spec. Empty segments are ignored.
    pub fn parse(spec: &str) -> Self {
        let mut parsed = TypeSpec::default();
        for token in spec.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            if token == NULLABLE {
                parsed.nullable = true;
            } else {
                parsed.types.push(token.to_string());
            }
        }
        parsed
    }

    /// The first declared type, used for built-in coercion.
    pub fn primary(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }

    pub fn names(&self, name: &str) -> bool {
        self.types.iter().any(|t| t == name)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = self.types.iter().map(String::as_str).collect();
        if self.nullable {
            parts.push(NULLABLE);
        }
        f.write_str(&parts.join("|"))
    }
}

/// A field in the allow list, optionally carrying an inline type spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedField {
    pub name: String,
    pub spec: Option<TypeSpec>,
}

impl AllowedField {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: None,
        }
    }

    pub fn typed(name: impl Into<String>, spec: &str) -> Self {
        Self {
            name: name.into(),
            spec: Some(TypeSpec::parse(spec)),
        }
    }
}
