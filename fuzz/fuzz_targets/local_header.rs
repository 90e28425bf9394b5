//! Fuzz target for local header and data descriptor parsing.
//!
//! Run with: cargo +nightly fuzz run local_header

#![no_main]

use libfuzzer_sys::fuzz_target;
use spanzip::format::local::{DataDescriptor, LocalFileHeader};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);
    if let Ok(header) = LocalFileHeader::parse(&mut cursor, 0) {
        let _ = header.encoded_len();
    }
    let zip64 = data.first().is_some_and(|b| b & 1 == 1);
    let _ = DataDescriptor::parse(&mut Cursor::new(data), zip64);
});
