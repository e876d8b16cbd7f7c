//! Record casting: rule sets, coercions and custom types.

mod caster;
pub mod convert;
mod dispatch;
mod registry;
mod types;

/// An associative record. Keys keep their insertion order.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub use caster::{Caster, FieldCallback, RecordCallback};
pub use dispatch::RuleArg;
pub use registry::{CustomCast, RESERVED_NAMES, TypeRegistry};
pub use types::{AllMarker, AllowedField, FieldSelection, FieldType, NULLABLE, TypeSpec};
