//! Fuzz target for casting.
//!
//! Every field of the fuzzed record is cast with every built-in type and
//! both custom built-ins. Casting must never panic.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use rowcast::{Caster, FieldType, TypeRegistry};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10_000 {
        return;
    }

    let Ok(input) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let registry = Arc::new(TypeRegistry::with_builtins());
    for field_type in FieldType::CAST_ORDER {
        let caster = Caster::new().with_type_all(field_type);
        let _ = caster.transform(&input, true);
        let _ = caster.nullable_all().transform(&input, false);
    }
    for name in ["json", "timestamp"] {
        if let Ok(caster) = Caster::with_registry(Arc::clone(&registry)).with_custom_all(name) {
            let _ = caster.transform(&input, false);
        }
    }
});
