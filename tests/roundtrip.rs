//! Write-then-read integration tests across every compression and
//! encryption combination.

mod common;

use common::*;
use spanzip::{
    AesStrength, AesVendorVersion, ArchiveMetadata, CompressionMethod, EncryptionMethod, Error, VolumeConfig,
};
use tempfile::tempdir;

fn roundtrip_all(size: usize, split: Option<u64>) {
    for method in compression_methods() {
        for encryption in encryption_methods() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("rt.zip");
            let data = random_bytes(size, size as u64);
            let config = VolumeConfig::new_unchecked(&path, split);
            let written = write_archive(config, &[(options("payload.bin", method, encryption), &data[..])])
                .unwrap_or_else(|e| panic!("{method} / {encryption}: write failed: {e}"));

            let entry = &written.entries()[0];
            assert_eq!(entry.uncompressed_size, size as u64, "{method} / {encryption}");
            assert_eq!(entry.encryption, encryption);

            let opened = ArchiveMetadata::open(&path).unwrap();
            assert_eq!(opened.entries(), written.entries(), "{method} / {encryption}");
            let password = encryption.is_encrypted().then_some(PASSWORD);
            let read = read_entry(&opened, "payload.bin", password)
                .unwrap_or_else(|e| panic!("{method} / {encryption}: read failed: {e}"));
            assert!(read == data, "{method} / {encryption}: payload differs");
        }
    }
}

#[test]
fn roundtrip_empty_entries() {
    roundtrip_all(0, None);
}

#[test]
fn roundtrip_small_entries() {
    roundtrip_all(1000, None);
}

#[test]
fn roundtrip_large_entries_across_many_volumes() {
    let size = 16 * TINY_VOLUME_SIZE as usize;
    roundtrip_all(size, Some(TINY_VOLUME_SIZE));

    // Spot-check that the payload really spanned more than ten volumes.
    let dir = tempdir().unwrap();
    let path = dir.path().join("many.zip");
    let data = random_bytes(size, 1);
    let config = VolumeConfig::new_unchecked(&path, Some(TINY_VOLUME_SIZE));
    let metadata = write_archive(
        config,
        &[(options("p", CompressionMethod::Store, EncryptionMethod::None), &data[..])],
    )
    .unwrap();
    assert!(metadata.volume_count() > 10);
    assert_eq!(volume_files(dir.path(), "many") as u32, metadata.volume_count());
}

#[test]
fn empty_entry_has_empty_crc() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("e.zip");
    let metadata = write_archive(
        VolumeConfig::single(&path),
        &[(options("empty", CompressionMethod::Store, EncryptionMethod::None), &[][..])],
    )
    .unwrap();
    let entry = &metadata.entries()[0];
    assert_eq!(entry.crc32, 0);
    assert_eq!(entry.uncompressed_size, 0);
    assert_eq!(entry.compressed_size, 0);
}

#[test]
fn many_entries_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("many.zip");
    let payloads: Vec<Vec<u8>> = (0..25).map(|i| random_bytes(i * 37, i as u64)).collect();
    let entries: Vec<_> = payloads
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let method = compression_methods()[i % compression_methods().len()];
            let encryption = encryption_methods()[i % encryption_methods().len()];
            (options(&format!("dir/file-{i:02}.bin"), method, encryption), data.as_slice())
        })
        .collect();
    write_archive(VolumeConfig::new_unchecked(&path, Some(4096)), &entries).unwrap();

    let opened = ArchiveMetadata::open(&path).unwrap();
    assert_eq!(opened.len(), payloads.len());
    for (i, data) in payloads.iter().enumerate() {
        let name = format!("dir/file-{i:02}.bin");
        let password = opened.entry(&name).unwrap().is_encrypted().then_some(PASSWORD);
        assert_eq!(&read_entry(&opened, &name, password).unwrap(), data, "{name}");
    }
}

#[test]
fn non_ascii_names_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("utf8.zip");
    let name = "données/日本語.txt";
    write_archive(
        VolumeConfig::single(&path),
        &[(options(name, CompressionMethod::Store, EncryptionMethod::None), &b"bonjour"[..])],
    )
    .unwrap();

    let opened = ArchiveMetadata::open(&path).unwrap();
    let entry = opened.entry(name).unwrap();
    assert_ne!(entry.flags & spanzip::format::flags::UTF8, 0);
    assert_eq!(read_entry(&opened, name, None).unwrap(), b"bonjour");
}

#[cfg(feature = "aes")]
#[test]
fn ae1_entries_keep_their_crc() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ae1.zip");
    let data = b"AE-1 keeps the CRC".to_vec();
    let opts = options("x", CompressionMethod::Store, EncryptionMethod::Aes(AesStrength::Aes128))
        .aes_version(AesVendorVersion::Ae1);
    write_archive(VolumeConfig::single(&path), &[(opts, &data[..])]).unwrap();

    let opened = ArchiveMetadata::open(&path).unwrap();
    let entry = opened.entry("x").unwrap();
    assert_eq!(entry.aes_version, AesVendorVersion::Ae1);
    assert_eq!(entry.crc32, spanzip::checksum::Crc32::compute(&data));
    assert_eq!(read_entry(&opened, "x", Some(PASSWORD)).unwrap(), data);
}

#[test]
fn lookup_of_unknown_entry_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.zip");
    let metadata = write_archive(VolumeConfig::single(&path), &[]).unwrap();
    assert!(matches!(read_entry(&metadata, "nope", None), Err(Error::EntryNotFound(_))));
}
