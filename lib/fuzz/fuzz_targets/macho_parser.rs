#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(macho) = machofile::parse(data) {
        let _ = macho.files();
    }
});
