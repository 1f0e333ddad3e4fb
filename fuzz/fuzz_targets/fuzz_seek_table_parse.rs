#![no_main]

use frameseek::SeekTable;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary bytes must never panic, only return an `Err`.
    let _ = SeekTable::parse_foot(data);
    let _ = SeekTable::parse_head(data);
});
