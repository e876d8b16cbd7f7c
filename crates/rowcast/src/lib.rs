//! Rowcast: declarative record casting.
//!
//! Rowcast takes a record (or a list of records) and a rule set, and returns
//! a new record with fields filtered, type-coerced, renamed and defaulted.
//!
//! # Core Principles
//!
//! - **Declarative**: Rules are data, built fluently or loaded from a rules file
//! - **Non-destructive**: Input records are never modified
//! - **Deterministic**: One fixed coercion precedence, output in declared field order
//!
//! # Example
//!
//! ```
//! use rowcast::{Caster, FieldType};
//! use serde_json::json;
//!
//! let caster = Caster::new()
//!     .allow(["id", "active", "tags"])
//!     .with_type(FieldType::Integer, ["id"])
//!     .with_type(FieldType::Boolean, ["active"])
//!     .with_type(FieldType::Array, ["tags"])
//!     .deny(["tags"]);
//!
//! let out = caster
//!     .transform(&json!([{"id": "1", "active": "0"}, {"id": "2", "active": "yes"}]), false)
//!     .unwrap();
//!
//! assert_eq!(out, json!([{"id": 1, "active": false}, {"id": 2, "active": true}]));
//! ```

pub mod cast;
pub mod error;
pub mod helpers;
pub mod input;
pub mod output;
pub mod rules;

pub use cast::{
    AllowedField, Caster, CustomCast, FieldCallback, FieldSelection, FieldType, Record,
    RecordCallback, RuleArg, TypeRegistry, TypeSpec,
};
pub use error::{CasterError, Result};
pub use helpers::{chunk_each, paginate, paginate_with, rename_keys, Page};
pub use input::{InputFormat, Parser, ParserConfig, SourceMetadata};
pub use output::{write_records, OutputFormat};
pub use rules::{Coverage, FieldEntry, RuleSpec, RuleSummary};
