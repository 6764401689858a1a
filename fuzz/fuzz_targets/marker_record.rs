#![no_main]

use libfuzzer_sys::fuzz_target;
use massbuild::record::MarkerRecord;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed markers must come back as errors, never panics
        if let Ok(marker) = MarkerRecord::from_json(input) {
            let _ = marker.key();
        }
    }
});
