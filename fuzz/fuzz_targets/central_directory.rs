//! Fuzz target for end record discovery and central directory parsing.
//!
//! Run with: cargo +nightly fuzz run central_directory

#![no_main]

use libfuzzer_sys::fuzz_target;
use spanzip::format::central::{find_end_of_central_directory, parse_central_header, read_zip64_locator};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);
    let Ok((eocd, eocd_offset)) = find_end_of_central_directory(&mut cursor) else {
        return;
    };
    let _ = read_zip64_locator(&mut cursor, eocd_offset);

    // Parse as many central headers as the record claims, capped so a
    // forged count cannot stall the fuzzer.
    let start = (eocd.cd_offset as usize).min(data.len());
    let mut directory = Cursor::new(&data[start..]);
    for _ in 0..eocd.total_entries.min(1024) {
        let offset = start as u64 + directory.position();
        match parse_central_header(&mut directory, offset) {
            Ok(entry) => {
                let _ = entry.compression_method();
                let _ = entry.unix_mode();
                let _ = entry.last_modified.as_system_time();
            }
            Err(_) => break,
        }
    }
});
