//! The row transformer: a rule set applied to records.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::error::{CasterError, Result};
use crate::helpers::rename_keys;

use super::convert::{cast_field, is_scalar};
use super::registry::TypeRegistry;
use super::types::{AllowedField, FieldSelection, FieldType, TypeSpec};
use super::Record;

/// Per-field callback: `(value, new record so far, original record, field) -> value`.
pub type FieldCallback = Arc<dyn Fn(Value, &Record, &Record, &str) -> Value + Send + Sync>;

/// Whole-record callback: `(new record, original record) -> record`.
pub type RecordCallback = Arc<dyn Fn(Record, &Record) -> Record + Send + Sync>;

/// A rule set for casting records.
///
/// Built fluently and reusable across calls:
///
/// ```
/// use rowcast::{Caster, FieldType};
/// use serde_json::json;
///
/// let caster = Caster::new()
///     .allow(["id", "price", "note"])
///     .with_type(FieldType::Integer, ["id"])
///     .with_type(FieldType::Float, ["price"])
///     .nullable(["note"])
///     .rename("note", "comment");
///
/// let out = caster
///     .transform(&json!({"id": "7", "price": "1.5", "secret": "x"}), false)
///     .unwrap();
/// assert_eq!(out, json!({"id": 7, "price": 1.5}));
/// ```
#[derive(Clone)]
pub struct Caster {
    registry: Arc<TypeRegistry>,
    allowed: Vec<AllowedField>,
    denied: Vec<String>,
    nullable: FieldSelection,
    typed: [FieldSelection; 5],
    custom: IndexMap<String, FieldSelection>,
    renames: IndexMap<String, String>,
    defaults: Record,
    field_callbacks: IndexMap<String, Vec<FieldCallback>>,
    record_callbacks: Vec<RecordCallback>,
}

impl Caster {
    /// Create a caster with no custom types.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TypeRegistry::new()))
    }

    /// Create a caster that can use the custom types of `registry`.
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            allowed: Vec::new(),
            denied: Vec::new(),
            nullable: FieldSelection::none(),
            typed: Default::default(),
            custom: IndexMap::new(),
            renames: IndexMap::new(),
            defaults: Record::new(),
            field_callbacks: IndexMap::new(),
            record_callbacks: Vec::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // =========================================================================
    // Rule setters
    // =========================================================================

    /// Restrict output to these fields, in this order.
    pub fn allow<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.extend(fields.into_iter().map(AllowedField::plain));
        self
    }

    /// Alias of [`Caster::allow`].
    pub fn fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow(fields)
    }

    /// Allow a field with an inline type spec such as `"integer|nullable"`.
    ///
    /// Every type named in the spec must be built-in or registered.
    pub fn allow_typed(mut self, field: impl Into<String>, spec: &str) -> Result<Self> {
        let allowed = AllowedField::typed(field, spec);
        if let Some(spec) = &allowed.spec {
            for name in &spec.types {
                if name.parse::<FieldType>().is_err() && !self.registry.contains(name) {
                    return Err(CasterError::UnknownType(name.clone()));
                }
            }
        }
        self.allowed.push(allowed);
        Ok(self)
    }

    /// Exclude fields. Denial wins over allowance.
    pub fn deny<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Let these fields stay `null` instead of taking a type default.
    pub fn nullable<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nullable_selection(FieldSelection::only(fields))
    }

    /// Let every field stay `null`.
    pub fn nullable_all(self) -> Self {
        self.nullable_selection(FieldSelection::all())
    }

    /// Cast these fields to a built-in type.
    pub fn with_type<I, S>(self, field_type: FieldType, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_selection(field_type, FieldSelection::only(fields))
    }

    /// Cast every field to a built-in type.
    pub fn with_type_all(self, field_type: FieldType) -> Self {
        self.type_selection(field_type, FieldSelection::all())
    }

    /// Cast these fields with a registered custom type.
    pub fn with_custom<I, S>(self, name: &str, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_selection(name, FieldSelection::only(fields))
    }

    /// Cast every field with a registered custom type.
    pub fn with_custom_all(self, name: &str) -> Result<Self> {
        self.custom_selection(name, FieldSelection::all())
    }

    /// Rename `old` to `new` after casting.
    pub fn rename(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.renames.insert(old.into(), new.into());
        self
    }

    pub fn rename_many<I, K, V>(mut self, renames: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.renames
            .extend(renames.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Value used when a field is missing or `null`.
    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    pub fn with_defaults<I, K>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (field, value) in defaults {
            self.defaults.insert(field.into(), value);
        }
        self
    }

    /// Run `callback` on the cast value of each listed field.
    ///
    /// Every callback for a field receives the cast value, not the result of
    /// an earlier callback. The last one registered decides the output.
    pub fn on_field<I, S, F>(mut self, fields: I, callback: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Value, &Record, &Record, &str) -> Value + Send + Sync + 'static,
    {
        let callback: FieldCallback = Arc::new(callback);
        for field in fields {
            self.push_field_callback(field.into(), Arc::clone(&callback));
        }
        self
    }

    /// Post-process each finished record, after renames.
    pub fn on_record<F>(mut self, callback: F) -> Self
    where
        F: Fn(Record, &Record) -> Record + Send + Sync + 'static,
    {
        self.record_callbacks.push(Arc::new(callback));
        self
    }

    /// Add a key to the finished record unless it is already present.
    pub fn add(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut values = Record::new();
        values.insert(key.into(), value.into());
        self.add_many(values)
    }

    /// Add keys to the finished record, skipping those already present.
    pub fn add_many(self, values: Record) -> Self {
        self.on_record(move |mut row, _| {
            for (key, value) in &values {
                if !row.contains_key(key) {
                    row.insert(key.clone(), value.clone());
                }
            }
            row
        })
    }

    /// Overwrite keys of the finished record.
    pub fn merge(self, values: Record) -> Self {
        self.on_record(move |mut row, _| {
            for (key, value) in &values {
                row.insert(key.clone(), value.clone());
            }
            row
        })
    }

    pub(crate) fn nullable_selection(mut self, selection: FieldSelection) -> Self {
        self.nullable.merge(selection);
        self
    }

    pub(crate) fn type_selection(mut self, field_type: FieldType, selection: FieldSelection) -> Self {
        self.typed[field_type.slot()].merge(selection);
        self
    }

    pub(crate) fn custom_selection(mut self, name: &str, selection: FieldSelection) -> Result<Self> {
        if !self.registry.contains(name) {
            return Err(CasterError::UnknownType(name.to_string()));
        }
        self.custom
            .entry(name.to_string())
            .or_default()
            .merge(selection);
        Ok(self)
    }

    pub(crate) fn push_field_callback(&mut self, field: String, callback: FieldCallback) {
        self.field_callbacks.entry(field).or_default().push(callback);
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn allowed_fields(&self) -> &[AllowedField] {
        &self.allowed
    }

    pub fn denied_fields(&self) -> &[String] {
        &self.denied
    }

    pub fn nullable_fields(&self) -> &FieldSelection {
        &self.nullable
    }

    pub fn typed_fields(&self, field_type: FieldType) -> &FieldSelection {
        &self.typed[field_type.slot()]
    }

    pub fn renames(&self) -> &IndexMap<String, String> {
        &self.renames
    }

    pub fn defaults(&self) -> &Record {
        &self.defaults
    }

    pub fn has_default(&self, field: &str) -> bool {
        self.defaults.contains_key(field)
    }

    // =========================================================================
    // Transformation
    // =========================================================================

    /// Cast a record, or a list of records.
    ///
    /// List elements that are neither records nor lists are dropped. With
    /// `add_all_allowed_fields`, allowed fields missing from the input are
    /// emitted with their type default.
    pub fn transform(&self, input: &Value, add_all_allowed_fields: bool) -> Result<Value> {
        match input {
            Value::Object(row) => Ok(Value::Object(
                self.cast_record(row, add_all_allowed_fields),
            )),
            Value::Array(items) => Ok(Value::Array(
                self.cast_list(items, add_all_allowed_fields),
            )),
            other => Err(CasterError::NotARecord(value_kind(other).to_string())),
        }
    }

    /// Cast each record of a slice.
    pub fn cast_many(&self, rows: &[Record], add_all_allowed_fields: bool) -> Vec<Record> {
        rows.iter()
            .map(|row| self.cast_record(row, add_all_allowed_fields))
            .collect()
    }

    /// Cast a single record.
    pub fn cast_record(&self, row: &Record, add_all_allowed_fields: bool) -> Record {
        let inferred: Vec<AllowedField>;
        let fields = if self.allowed.is_empty() {
            inferred = row.keys().map(AllowedField::plain).collect();
            &inferred
        } else {
            &self.allowed
        };

        let mut new_row = Record::new();

        for allowed in fields {
            let field = allowed.name.as_str();

            if self.denied.iter().any(|d| d == field) {
                continue;
            }
            if !add_all_allowed_fields && !row.contains_key(field) && !self.has_default(field) {
                continue;
            }

            let spec = allowed.spec.as_ref();
            let nullable = spec.is_some_and(|s| s.nullable) || self.nullable.contains(field);

            new_row.insert(field.to_string(), self.value_of(row, field));
            let value = self.coerce(field, spec, &new_row, nullable);

            new_row.insert(field.to_string(), value.clone());
            if let Some(callbacks) = self.field_callbacks.get(field) {
                let mut result = None;
                for callback in callbacks {
                    result = Some(callback(value.clone(), &new_row, row, field));
                }
                if let Some(result) = result {
                    new_row.insert(field.to_string(), result);
                }
            }
        }

        let new_row = rename_keys(new_row, &self.renames);
        let new_row = self
            .record_callbacks
            .iter()
            .fold(new_row, |acc, callback| callback(acc, row));

        trace!(fields = new_row.len(), "cast record");
        new_row
    }

    fn cast_list(&self, items: &[Value], add_all_allowed_fields: bool) -> Vec<Value> {
        items
            .iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(Value::Object(
                    self.cast_record(row, add_all_allowed_fields),
                )),
                Value::Array(inner) => Some(Value::Array(
                    self.cast_list(inner, add_all_allowed_fields),
                )),
                _ => None,
            })
            .collect()
    }

    /// Input value, falling back to the default when missing or `null`.
    fn value_of(&self, row: &Record, field: &str) -> Value {
        match row.get(field) {
            Some(value) if !value.is_null() => value.clone(),
            _ => self.defaults.get(field).cloned().unwrap_or(Value::Null),
        }
    }

    /// Pick and apply the coercion for a field.
    ///
    /// Precedence: custom types (registry order), the inline type, typed
    /// selections in [`FieldType::CAST_ORDER`], then string for scalars.
    fn coerce(
        &self,
        field: &str,
        spec: Option<&TypeSpec>,
        new_row: &Record,
        nullable: bool,
    ) -> Value {
        for (name, cast) in self.registry.iter() {
            let selected = self
                .custom
                .get(name)
                .is_some_and(|selection| selection.contains(field));
            if selected || spec.is_some_and(|s| s.names(name)) {
                return cast(new_row, field, nullable);
            }
        }

        let inline = spec
            .and_then(TypeSpec::primary)
            .and_then(|name| name.parse::<FieldType>().ok());
        if let Some(field_type) = inline {
            return cast_field(field_type, new_row, field, nullable);
        }

        for field_type in FieldType::CAST_ORDER {
            if self.typed[field_type.slot()].contains(field) {
                return cast_field(field_type, new_row, field, nullable);
            }
        }

        match new_row.get(field) {
            Some(value) if !value.is_null() && !is_scalar(value) => value.clone(),
            _ => cast_field(FieldType::String, new_row, field, nullable),
        }
    }
}

impl Default for Caster {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Caster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caster")
            .field("registry", &self.registry)
            .field("allowed", &self.allowed)
            .field("denied", &self.denied)
            .field("nullable", &self.nullable)
            .field("typed", &self.typed)
            .field("custom", &self.custom)
            .field("renames", &self.renames)
            .field("defaults", &self.defaults)
            .field(
                "field_callbacks",
                &self.field_callbacks.keys().collect::<Vec<_>>(),
            )
            .field("record_callbacks", &self.record_callbacks.len())
            .finish()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
