//! Split archive and header patch-back integration tests.
//!
//! These tests verify:
//! - Volume naming and the split marker
//! - Local headers never straddle a volume boundary
//! - Stored entries are patched in place only while their volume is current
//! - Data descriptors stay correct when a roll-over happened

mod common;

use std::fs;
use std::path::Path;

use common::*;
use spanzip::format::flags;
use spanzip::{
    ArchiveMetadata, ArchiveWriter, CompressionMethod, DescriptorPolicy, EncryptionMethod, EntryHeader, Error,
    VolumeConfig,
};
use tempfile::tempdir;

fn u16_at(bytes: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([bytes[pos], bytes[pos + 1]])
}

fn u32_at(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap())
}

/// Concatenates every volume in order, returning the bytes and the start
/// offset of each volume within them.
fn concat_volumes(metadata: &ArchiveMetadata) -> (Vec<u8>, Vec<u64>) {
    let last = metadata.end_record().disk_number;
    let mut all = Vec::new();
    let mut starts = Vec::new();
    for volume in 0..=last {
        starts.push(all.len() as u64);
        all.extend(fs::read(metadata.config().volume_path(volume, last)).unwrap());
    }
    (all, starts)
}

fn local_header_start(entry: &EntryHeader, starts: &[u64]) -> usize {
    (starts[entry.volume as usize] + entry.local_header_offset) as usize
}

fn stream_one(path: &Path, split: Option<u64>, options: spanzip::EntryOptions, data: &[u8]) -> ArchiveMetadata {
    write_archive(VolumeConfig::new_unchecked(path, split), &[(options, data)]).unwrap()
}

#[test]
fn volumes_are_named_sequentially() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("seq.zip");
    let data = random_bytes(5000, 3);
    let metadata = stream_one(
        &path,
        Some(TINY_VOLUME_SIZE),
        options("d", CompressionMethod::Store, EncryptionMethod::None),
        &data,
    );

    let count = metadata.volume_count();
    assert!(count >= 5);
    // The last .zNN volume may end early when the central directory moved on.
    for n in 1..count - 1 {
        let name = format!("seq.z{n:02}");
        let bytes = fs::read(dir.path().join(&name)).unwrap();
        assert_eq!(bytes.len() as u64, TINY_VOLUME_SIZE, "{name} filled to the limit");
    }
    assert!(path.exists());
    assert!(!dir.path().join(format!("seq.z{count:02}")).exists());
    assert_eq!(&fs::read(dir.path().join("seq.z01")).unwrap()[..4], b"PK\x07\x08");
}

#[test]
fn local_headers_never_straddle_volumes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("h.zip");
    let payloads: Vec<Vec<u8>> = (0..30).map(|i| random_bytes(50 + i * 13, i as u64)).collect();
    let entries: Vec<_> = payloads
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let name = format!("a-fairly-long-entry-name-number-{i:03}.dat");
            (options(&name, CompressionMethod::Store, EncryptionMethod::None), d.as_slice())
        })
        .collect();
    let metadata = write_archive(VolumeConfig::new_unchecked(&path, Some(512)), &entries).unwrap();

    let last = metadata.end_record().disk_number;
    for entry in metadata.entries() {
        let volume = fs::read(metadata.config().volume_path(entry.volume, last)).unwrap();
        let start = entry.local_header_offset as usize;
        let header_len = 30 + entry.name.len();
        assert!(start + header_len <= volume.len(), "{} header cut by a volume end", entry.name);
        assert_eq!(&volume[start..start + 4], b"PK\x03\x04");
    }
}

#[test]
fn stored_entry_patched_within_one_volume() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p.zip");
    let data = b"stored and patched".to_vec();
    let metadata = stream_one(
        &path,
        None,
        options("p.txt", CompressionMethod::Store, EncryptionMethod::None),
        &data,
    );

    let bytes = fs::read(&path).unwrap();
    let entry = &metadata.entries()[0];
    assert_ne!(u16_at(&bytes, 6) & flags::SIZES_DEFERRED, 0, "descriptor kept by default");
    assert_eq!(u32_at(&bytes, 14), entry.crc32);
    assert_eq!(u32_at(&bytes, 18), data.len() as u32);
    assert_eq!(u32_at(&bytes, 22), data.len() as u32);

    // The descriptor follows the payload and agrees with the patched header.
    let descriptor = 30 + 5 + data.len();
    assert_eq!(&bytes[descriptor..descriptor + 4], b"PK\x07\x08");
    assert_eq!(u32_at(&bytes, descriptor + 4), entry.crc32);
}

#[test]
fn patch_back_without_descriptor_matches_known_sizes_output() {
    let dir = tempdir().unwrap();
    let streamed = dir.path().join("streamed.zip");
    let known = dir.path().join("known.zip");
    let data = random_bytes(3000, 11);

    let streamed_options = options("same.bin", CompressionMethod::Store, EncryptionMethod::None)
        .descriptor_policy(DescriptorPolicy::OmitAfterPatchback);
    stream_one(&streamed, None, streamed_options, &data);

    let crc = spanzip::checksum::Crc32::compute(&data);
    let known_options = options("same.bin", CompressionMethod::Store, EncryptionMethod::None)
        .with_known_sizes(data.len() as u64, crc);
    stream_one(&known, None, known_options, &data);

    assert!(fs::read(&streamed).unwrap() == fs::read(&known).unwrap());
    let opened = ArchiveMetadata::open(&streamed).unwrap();
    assert!(!opened.entries()[0].sizes_deferred());
    assert_eq!(read_entry(&opened, "same.bin", None).unwrap(), data);
}

#[test]
fn roll_over_forbids_patch_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("r.zip");
    let data = random_bytes(5000, 5);
    let opts = options("r.bin", CompressionMethod::Store, EncryptionMethod::None)
        .descriptor_policy(DescriptorPolicy::OmitAfterPatchback);
    let metadata = stream_one(&path, Some(TINY_VOLUME_SIZE), opts, &data);

    let entry = &metadata.entries()[0];
    assert!(entry.sizes_deferred(), "descriptor is the source of truth");

    let (all, starts) = concat_volumes(&metadata);
    let header = local_header_start(entry, &starts);
    assert_ne!(u16_at(&all, header + 6) & flags::SIZES_DEFERRED, 0);
    assert_eq!(u32_at(&all, header + 14), 0, "header CRC left provisional");
    assert_eq!(u32_at(&all, header + 18), 0);
    assert_eq!(u32_at(&all, header + 22), 0);

    let extra_len = u16_at(&all, header + 28) as usize;
    let descriptor = header + 30 + entry.name.len() + extra_len + entry.compressed_size as usize;
    assert_eq!(&all[descriptor..descriptor + 4], b"PK\x07\x08");
    assert_eq!(u32_at(&all, descriptor + 4), spanzip::checksum::Crc32::compute(&data));
    assert_eq!(u32_at(&all, descriptor + 8) as usize, data.len());
    assert_eq!(u32_at(&all, descriptor + 12) as usize, data.len());

    let opened = ArchiveMetadata::open(&path).unwrap();
    assert_eq!(read_entry(&opened, "r.bin", None).unwrap(), data);
}

#[cfg(feature = "deflate")]
#[test]
fn deflated_entries_are_never_patched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("d.zip");
    let data = b"deflate ".repeat(200);
    let metadata = stream_one(
        &path,
        None,
        options("d.txt", CompressionMethod::Deflate, EncryptionMethod::None),
        &data,
    );

    let bytes = fs::read(&path).unwrap();
    assert_eq!(u32_at(&bytes, 14), 0);
    let entry = &metadata.entries()[0];
    let descriptor = 30 + 5 + entry.compressed_size as usize;
    assert_eq!(&bytes[descriptor..descriptor + 4], b"PK\x07\x08");
    assert_eq!(u32_at(&bytes, descriptor + 4), entry.crc32);
    assert_eq!(u32_at(&bytes, descriptor + 8) as u64, entry.compressed_size);
    assert_eq!(u32_at(&bytes, descriptor + 12) as usize, data.len());
}

#[test]
fn missing_volume_is_reported_on_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("m.zip");
    let data = random_bytes(5000, 9);
    let metadata = stream_one(
        &path,
        Some(TINY_VOLUME_SIZE),
        options("m.bin", CompressionMethod::Store, EncryptionMethod::None),
        &data,
    );
    fs::remove_file(dir.path().join("m.z02")).unwrap();

    let result = read_entry(&metadata, "m.bin", None);
    assert!(
        matches!(result, Err(Error::VolumeMissing { volume: 1, .. })),
        "got {result:?}"
    );
}

#[test]
fn split_size_below_minimum_rejected() {
    let dir = tempdir().unwrap();
    let result = ArchiveMetadata::create(dir.path().join("x.zip"), Some(1000));
    assert!(matches!(result, Err(Error::InvalidSplitSize { size: 1000, .. })));
    assert!(ArchiveMetadata::create(dir.path().join("x.zip"), Some(spanzip::MIN_SPLIT_SIZE)).is_ok());
}

#[test]
fn adding_to_split_archive_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("s.zip");
    stream_one(
        &path,
        Some(TINY_VOLUME_SIZE),
        options("a", CompressionMethod::Store, EncryptionMethod::None),
        &random_bytes(3000, 2),
    );
    let opened = ArchiveMetadata::open(&path).unwrap();
    assert!(opened.is_split());
    assert!(matches!(
        ArchiveWriter::create(opened),
        Err(Error::UnsupportedFeature { .. })
    ));
}
