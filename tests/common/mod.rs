//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Read;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spanzip::{
    AesStrength, ArchiveMetadata, ArchiveWriter, CompressionMethod, DosDateTime, EncryptionMethod,
    EntryOptions, NoncePolicy, Password, VolumeConfig,
};

/// Password used for every encrypted test entry.
pub const PASSWORD: &str = "correct horse battery staple";

/// Volume size small enough to produce many volumes from a few KiB.
pub const TINY_VOLUME_SIZE: u64 = 1024;

/// Every compression method built into this configuration.
pub fn compression_methods() -> Vec<CompressionMethod> {
    let mut methods = vec![CompressionMethod::Store];
    #[cfg(feature = "deflate")]
    methods.push(CompressionMethod::Deflate);
    methods
}

/// Every encryption method built into this configuration.
pub fn encryption_methods() -> Vec<EncryptionMethod> {
    let mut methods = vec![EncryptionMethod::None, EncryptionMethod::ZipCrypto];
    #[cfg(feature = "aes")]
    methods.extend([
        EncryptionMethod::Aes(AesStrength::Aes128),
        EncryptionMethod::Aes(AesStrength::Aes192),
        EncryptionMethod::Aes(AesStrength::Aes256),
    ]);
    methods
}

/// A fixed timestamp so that repeated writes produce identical bytes.
pub fn fixed_time() -> DosDateTime {
    DosDateTime::from_system_time(std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_600_000_000))
}

/// Entry options with a fixed time and, if encrypted, the test password.
pub fn options(name: &str, method: CompressionMethod, encryption: EncryptionMethod) -> EntryOptions {
    let options = EntryOptions::new(name)
        .method(method)
        .encryption(encryption)
        .last_modified(fixed_time())
        .nonce_policy(NoncePolicy::deterministic(7));
    if encryption.is_encrypted() {
        options.password(PASSWORD)
    } else {
        options
    }
}

/// Pseudo-random bytes from a fixed seed.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(data.as_mut_slice());
    data
}

/// Writes one archive from `(options, payload)` pairs and finishes it.
pub fn write_archive(config: VolumeConfig, entries: &[(EntryOptions, &[u8])]) -> spanzip::Result<ArchiveMetadata> {
    let mut writer = ArchiveWriter::create(ArchiveMetadata::from_config(config))?;
    for (options, data) in entries {
        writer.open_entry(options)?;
        if !options.is_directory() {
            writer.write_data(data)?;
        }
        writer.close_entry()?;
    }
    let (metadata, _) = writer.finish()?;
    Ok(metadata)
}

/// Reads one entry completely.
pub fn read_entry(metadata: &ArchiveMetadata, name: &str, password: Option<&str>) -> spanzip::Result<Vec<u8>> {
    let password = password.map(Password::new);
    let mut stream = metadata.entry_stream(name, password.as_ref())?;
    let mut out = Vec::new();
    stream.read_to_end(&mut out)?;
    Ok(out)
}

/// Number of files in `dir` whose name starts with `stem.`.
pub fn volume_files(dir: &Path, stem: &str) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&format!("{stem}.")))
        .count()
}
