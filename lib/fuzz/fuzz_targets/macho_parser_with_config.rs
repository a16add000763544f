#![no_main]
use libfuzzer_sys::fuzz_target;
use machofile::{Parser, ParserConfig};

// Nested fat binaries and deep export tries are allowed, so the fuzzer can
// reach the code paths that the default limits cut short.
fuzz_target!(|data: &[u8]| {
    let config = ParserConfig {
        max_fat_depth: 4,
        max_export_depth: 1024,
        max_region_records: 1 << 16,
    };
    let _ = Parser::new().config(config).parse(data);
});
