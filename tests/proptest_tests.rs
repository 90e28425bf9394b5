//! Property-based tests using proptest.
//!
//! These tests check the framing invariants of entries written with
//! deferred sizes, using an in-memory sink and randomly generated payloads.

mod common;

use std::io::Cursor;

use common::*;
use proptest::prelude::*;
use spanzip::checksum::Crc32;
use spanzip::format::flags;
use spanzip::volume::SeekableSink;
use spanzip::{ArchiveMetadata, ArchiveWriter, CompressionMethod, EncryptionMethod, EntryHeader, VolumeConfig};

fn u16_at(bytes: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([bytes[pos], bytes[pos + 1]])
}

fn u32_at(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap())
}

/// Writes one entry into memory and returns the archive bytes and header.
fn write_in_memory(method: CompressionMethod, encryption: EncryptionMethod, data: &[u8]) -> (Vec<u8>, EntryHeader) {
    let metadata = ArchiveMetadata::from_config(VolumeConfig::single("memory.zip"));
    let sink = SeekableSink::new(Cursor::new(Vec::new())).unwrap();
    let mut writer = ArchiveWriter::with_sink(metadata, sink).unwrap();
    writer.open_entry(&options("entry", method, encryption)).unwrap();
    for chunk in data.chunks(777) {
        writer.write_data(chunk).unwrap();
    }
    writer.close_entry().unwrap();
    let (metadata, sink) = writer.finish().unwrap();
    (sink.into_inner().into_inner(), metadata.entries()[0].clone())
}

fn method_strategy() -> impl Strategy<Value = CompressionMethod> {
    proptest::sample::select(compression_methods())
}

fn encryption_strategy() -> impl Strategy<Value = EncryptionMethod> {
    proptest::sample::select(encryption_methods())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The data descriptor after the payload carries the CRC-32 of the raw
    /// bytes and both sizes, and the recorded header agrees with it.
    #[test]
    fn descriptor_matches_payload(
        data in proptest::collection::vec(any::<u8>(), 0..5000),
        method in method_strategy(),
        encryption in encryption_strategy(),
    ) {
        let (bytes, entry) = write_in_memory(method, encryption, &data);

        prop_assert_ne!(u16_at(&bytes, 6) & flags::SIZES_DEFERRED, 0);
        prop_assert_eq!(entry.uncompressed_size, data.len() as u64);
        let overhead = encryption.overhead();
        prop_assert!(entry.compressed_size >= overhead);

        let name_len = u16_at(&bytes, 26) as usize;
        let extra_len = u16_at(&bytes, 28) as usize;
        let descriptor = 30 + name_len + extra_len + entry.compressed_size as usize;
        prop_assert_eq!(&bytes[descriptor..descriptor + 4], b"PK\x07\x08");
        prop_assert_eq!(u32_at(&bytes, descriptor + 4), entry.crc32);
        prop_assert_eq!(u64::from(u32_at(&bytes, descriptor + 8)), entry.compressed_size);
        prop_assert_eq!(u64::from(u32_at(&bytes, descriptor + 12)), entry.uncompressed_size);

        if entry.has_crc() {
            prop_assert_eq!(entry.crc32, Crc32::compute(&data));
        } else {
            prop_assert_eq!(entry.crc32, 0);
        }
        if method == CompressionMethod::Store {
            prop_assert_eq!(entry.compressed_size, data.len() as u64 + overhead);
        }
    }

    /// A stored entry in a single volume has its local header patched with
    /// exactly the values of its descriptor.
    #[test]
    fn patched_header_matches_descriptor(
        data in proptest::collection::vec(any::<u8>(), 0..3000),
        encryption in encryption_strategy(),
    ) {
        let (bytes, entry) = write_in_memory(CompressionMethod::Store, encryption, &data);

        let name_len = u16_at(&bytes, 26) as usize;
        let extra_len = u16_at(&bytes, 28) as usize;
        let descriptor = 30 + name_len + extra_len + entry.compressed_size as usize;
        prop_assert_eq!(&bytes[14..26], &bytes[descriptor + 4..descriptor + 16]);
    }
}
