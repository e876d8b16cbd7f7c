//! Fuzz target for the record parser.
//!
//! This fuzzer tests that the JSON, JSON Lines and CSV/TSV readers:
//! 1. Never panic on malformed input
//! 2. Handle all delimiter combinations

#![no_main]

use libfuzzer_sys::fuzz_target;
use rowcast::{InputFormat, Parser};

fuzz_target!(|data: &[u8]| {
    // Only process reasonable-sized inputs to avoid OOM
    if data.len() > 100_000 {
        return;
    }

    let parser = Parser::new();
    for format in [InputFormat::Json, InputFormat::JsonLines, InputFormat::Delimited] {
        let _ = parser.parse_bytes(data, format);
    }
});
