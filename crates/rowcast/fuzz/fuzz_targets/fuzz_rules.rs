//! Fuzz target for rules files.
//!
//! Arbitrary bytes are parsed as a rules file and, when valid, built and
//! applied to a fixed record. Errors are fine; panics are not.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use rowcast::{RuleSpec, TypeRegistry};
use serde_json::json;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(spec) = text.parse::<RuleSpec>() else {
        return;
    };

    let _ = spec.summary();
    if let Ok(caster) = spec.build(Arc::new(TypeRegistry::with_builtins())) {
        let record = json!({"id": "1", "name": "ada", "at": 0, "tags": [1], "meta": "{}"});
        let _ = caster.transform(&record, true);
    }
});
