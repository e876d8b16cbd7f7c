//! Declarative rule sets loaded from JSON rules files.
//!
//! ```
//! use std::sync::Arc;
//! use rowcast::{RuleSpec, TypeRegistry};
//! use serde_json::json;
//!
//! let spec: RuleSpec = r#"{
//!     "allow": ["id", {"price": "float|nullable"}],
//!     "integer": ["id"],
//!     "rename": {"price": "amount"}
//! }"#
//! .parse()
//! .unwrap();
//!
//! let caster = spec.build(Arc::new(TypeRegistry::with_builtins())).unwrap();
//! let out = caster.transform(&json!({"id": "4", "price": null}), false).unwrap();
//! assert_eq!(out, json!({"id": 4, "amount": null}));
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cast::{Caster, FieldSelection, Record, RuleArg, TypeRegistry, RESERVED_NAMES};
use crate::error::{CasterError, Result};

/// An entry of the `allow` list: a field name, or `{field: "type|nullable"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Plain(String),
    Typed(IndexMap<String, String>),
}

/// A rule set as written in a rules file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<FieldEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<FieldSelection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<FieldSelection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float: Option<FieldSelection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer: Option<FieldSelection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean: Option<FieldSelection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array: Option<FieldSelection>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub rename: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Record::is_empty")]
    pub default: Record,

    /// Keys added to each record when absent.
    #[serde(default, skip_serializing_if = "Record::is_empty")]
    pub add: Record,

    /// Keys overwritten in each record.
    #[serde(default, skip_serializing_if = "Record::is_empty")]
    pub merge: Record,

    /// Custom type selections and anything else, applied by name.
    #[serde(flatten)]
    pub other: IndexMap<String, Value>,
}

/// How many fields a selection covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    All,
    Fields(usize),
}

impl From<&FieldSelection> for Coverage {
    fn from(selection: &FieldSelection) -> Self {
        match selection.len() {
            None => Coverage::All,
            Some(n) => Coverage::Fields(n),
        }
    }
}

/// Rule counts reported by `rowcast check`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    pub allowed: usize,
    pub inline_typed: usize,
    pub denied: usize,
    pub selections: IndexMap<String, Coverage>,
    pub renames: usize,
    pub defaults: usize,
    pub added: usize,
    pub merged: usize,
    /// Keys dispatched by name.
    pub named: Vec<String>,
}

impl RuleSpec {
    /// Load a rules file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|e| CasterError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let spec: RuleSpec = contents.parse()?;
        debug!(file = %path.display(), rules = spec.other.len(), "loaded rules file");
        Ok(spec)
    }

    /// Build a caster that can use the custom types of `registry`.
    ///
    /// Rules apply in a fixed order: allow, deny, selections, rename,
    /// default, add, merge, then the remaining keys in file order.
    pub fn build(&self, registry: Arc<TypeRegistry>) -> Result<Caster> {
        let mut caster = Caster::with_registry(registry);

        for entry in &self.allow {
            caster = match entry {
                FieldEntry::Plain(field) => caster.allow([field.as_str()]),
                FieldEntry::Typed(typed) => {
                    let mut caster = caster;
                    for (field, spec) in typed {
                        caster = caster.allow_typed(field.as_str(), spec)?;
                    }
                    caster
                }
            };
        }

        caster = caster.deny(self.deny.iter().cloned());

        for (name, selection) in self.selections() {
            debug!(rule = name, "applying selection");
            caster = caster.call(name, RuleArg::from(selection.clone()))?;
        }

        caster = caster
            .rename_many(self.rename.clone())
            .with_defaults(self.default.clone());

        if !self.add.is_empty() {
            caster = caster.add_many(self.add.clone());
        }
        if !self.merge.is_empty() {
            caster = caster.merge(self.merge.clone());
        }

        for (name, value) in &self.other {
            debug!(rule = %name, "applying named rule");
            let arg = match RuleArg::try_from(value.clone()) {
                Ok(arg) => arg,
                Err(_) if !is_known_rule(&caster, name) => {
                    return Err(CasterError::UndefinedMethod(name.clone()));
                }
                Err(e) => return Err(e),
            };
            caster = caster.call(name, arg)?;
        }

        Ok(caster)
    }

    pub fn summary(&self) -> RuleSummary {
        let (plain, inline_typed) =
            self.allow
                .iter()
                .fold((0, 0), |(plain, typed), entry| match entry {
                    FieldEntry::Plain(_) => (plain + 1, typed),
                    FieldEntry::Typed(map) => (plain, typed + map.len()),
                });

        RuleSummary {
            allowed: plain + inline_typed,
            inline_typed,
            denied: self.deny.len(),
            selections: self
                .selections()
                .map(|(name, selection)| (name.to_string(), Coverage::from(selection)))
                .collect(),
            renames: self.rename.len(),
            defaults: self.default.len(),
            added: self.add.len(),
            merged: self.merge.len(),
            named: self.other.keys().cloned().collect(),
        }
    }

    /// The selection keys that are set, in cast order.
    fn selections(&self) -> impl Iterator<Item = (&'static str, &FieldSelection)> {
        [
            ("nullable", &self.nullable),
            ("string", &self.string),
            ("float", &self.float),
            ("integer", &self.integer),
            ("boolean", &self.boolean),
            ("array", &self.array),
        ]
        .into_iter()
        .filter_map(|(name, selection)| selection.as_ref().map(|s| (name, s)))
    }
}

impl FromStr for RuleSpec {
    type Err = CasterError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

fn is_known_rule(caster: &Caster, name: &str) -> bool {
    RESERVED_NAMES.contains(&name) || caster.registry().contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtins() -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry::with_builtins())
    }

    #[test]
    fn test_parse_full_rules() {
        let spec: RuleSpec = r#"{
            "allow": ["id", {"price": "float|nullable"}, "tags"],
            "deny": ["password"],
            "nullable": ["note"],
            "integer": ["id"],
            "boolean": true,
            "rename": {"tags": "labels"},
            "default": {"note": null},
            "add": {"source": "import"},
            "merge": {"version": 2},
            "timestamp": ["created_at"]
        }"#
        .parse()
        .unwrap();

        assert_eq!(spec.allow.len(), 3);
        assert_eq!(spec.boolean, Some(FieldSelection::all()));
        assert_eq!(spec.integer, Some(FieldSelection::only(["id"])));
        assert_eq!(spec.other.get("timestamp"), Some(&json!(["created_at"])));
        assert_eq!(spec.default.get("note"), Some(&Value::Null));
    }

    #[test]
    fn test_build_and_transform() {
        let spec: RuleSpec = r#"{
            "allow": ["id", {"price": "float|nullable"}, "tags", "password"],
            "deny": ["password"],
            "integer": ["id"],
            "array": ["tags"],
            "rename": {"tags": "labels"},
            "add": {"source": "import"},
            "merge": {"version": 2}
        }"#
        .parse()
        .unwrap();
        let caster = spec.build(builtins()).unwrap();

        let out = caster
            .transform(
                &json!({"id": "12", "price": "", "tags": "x", "password": "p"}),
                false,
            )
            .unwrap();

        assert_eq!(
            out,
            json!({"id": 12, "price": 0.0, "labels": ["x"], "source": "import", "version": 2})
        );
    }

    #[test]
    fn test_named_custom_type() {
        let spec: RuleSpec = r#"{"timestamp": ["at"]}"#.parse().unwrap();
        let caster = spec.build(builtins()).unwrap();

        let out = caster.transform(&json!({"at": 0}), false).unwrap();
        assert_eq!(out, json!({"at": "1970-01-01T00:00:00+00:00"}));
    }

    #[test]
    fn test_fields_key_is_dispatched() {
        let spec: RuleSpec = r#"{"fields": ["b"]}"#.parse().unwrap();
        let caster = spec.build(builtins()).unwrap();
        assert_eq!(
            caster.transform(&json!({"a": 1, "b": 2}), false).unwrap(),
            json!({"b": "2"})
        );
    }

    #[test]
    fn test_unknown_key_is_undefined_method() {
        for rules in [r#"{"money": ["price"]}"#, r#"{"money": 5}"#] {
            let spec: RuleSpec = rules.parse().unwrap();
            let err = spec.build(builtins()).unwrap_err();
            assert!(matches!(err, CasterError::UndefinedMethod(ref name) if name == "money"));
        }
    }

    #[test]
    fn test_known_key_with_bad_argument() {
        let spec: RuleSpec = r#"{"timestamp": 5}"#.parse().unwrap();
        let err = spec.build(builtins()).unwrap_err();
        assert!(matches!(err, CasterError::InvalidArgument { .. }));
    }

    #[test]
    fn test_false_selection_is_rejected() {
        assert!(r#"{"integer": false}"#.parse::<RuleSpec>().is_err());
    }

    #[test]
    fn test_summary() {
        let spec: RuleSpec = r#"{
            "allow": ["a", {"b": "integer", "c": "json"}],
            "nullable": true,
            "string": ["a"],
            "timestamp": ["d"]
        }"#
        .parse()
        .unwrap();

        let summary = spec.summary();
        assert_eq!(summary.allowed, 3);
        assert_eq!(summary.inline_typed, 2);
        assert_eq!(summary.selections.get("nullable"), Some(&Coverage::All));
        assert_eq!(summary.selections.get("string"), Some(&Coverage::Fields(1)));
        assert_eq!(summary.named, vec!["timestamp"]);
    }
}
