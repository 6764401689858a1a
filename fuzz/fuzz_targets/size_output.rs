#![no_main]

use libfuzzer_sys::fuzz_target;
use massbuild::measure::parse_size_output;

fuzz_target!(|data: &[u8]| {
    // Size tool output is decoded lossily, so feed it the same way
    let output = String::from_utf8_lossy(data);
    let _ = parse_size_output(&output);
});
