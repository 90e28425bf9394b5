//! Password handling on the read path.

mod common;

use common::*;
use spanzip::{ArchiveMetadata, CompressionMethod, EncryptionMethod, Error, Password, VolumeConfig, open_entry_stream};
use tempfile::tempdir;

const PAYLOAD: &[u8] = b"The quick brown fox jumps over the lazy dog";

fn encrypted_archive(dir: &std::path::Path, encryption: EncryptionMethod) -> ArchiveMetadata {
    write_archive(
        VolumeConfig::single(dir.join("enc.zip")),
        &[(options("secret.txt", CompressionMethod::Store, encryption), PAYLOAD)],
    )
    .unwrap()
}

#[test]
fn zipcrypto_wrong_password_fails_before_payload() {
    let dir = tempdir().unwrap();
    let metadata = encrypted_archive(dir.path(), EncryptionMethod::ZipCrypto);
    let entry = &metadata.entries()[0];

    // The check byte rejects all but roughly one in 256 wrong passwords;
    // a password that slips through must still fail the CRC.
    let wrong = ["wrong", "guess", "hunter2", "letmein", "password", "123456"];
    let mut rejected_early = 0;
    for candidate in wrong {
        match open_entry_stream(&metadata, entry, Some(&Password::new(candidate))) {
            Err(Error::WrongPassword { .. }) => rejected_early += 1,
            Err(e) => panic!("unexpected error for '{candidate}': {e}"),
            Ok(_) => {
                let result = read_entry(&metadata, "secret.txt", Some(candidate));
                assert!(matches!(result, Err(Error::CrcMismatch { .. })), "{candidate}");
            }
        }
    }
    assert!(rejected_early >= wrong.len() - 1);
    assert_eq!(read_entry(&metadata, "secret.txt", Some(PASSWORD)).unwrap(), PAYLOAD);
}

#[cfg(feature = "aes")]
#[test]
fn aes_wrong_password_fails_before_payload() {
    use spanzip::{AesStrength, PasswordDetectionMethod};

    for strength in [AesStrength::Aes128, AesStrength::Aes192, AesStrength::Aes256] {
        let dir = tempdir().unwrap();
        let metadata = encrypted_archive(dir.path(), EncryptionMethod::Aes(strength));
        let result = open_entry_stream(&metadata, &metadata.entries()[0], Some(&Password::new("wrong")));
        match result {
            Err(Error::WrongPassword { detection_method, .. }) => {
                assert_eq!(detection_method, PasswordDetectionMethod::VerifierMismatch)
            }
            other => panic!("{strength:?}: expected WrongPassword, got {other:?}"),
        }
        assert_eq!(read_entry(&metadata, "secret.txt", Some(PASSWORD)).unwrap(), PAYLOAD);
    }
}

#[test]
fn missing_password_is_reported() {
    let dir = tempdir().unwrap();
    let metadata = encrypted_archive(dir.path(), EncryptionMethod::ZipCrypto);
    let err = read_entry(&metadata, "secret.txt", None).unwrap_err();
    assert!(matches!(err, Error::PasswordRequired { .. }));
    assert!(err.is_recoverable());
    assert!(err.is_encryption_error());
    assert_eq!(err.entry_name(), Some("secret.txt"));
}

#[test]
fn writing_encrypted_entry_without_password_rejected() {
    let dir = tempdir().unwrap();
    let result = write_archive(
        VolumeConfig::single(dir.path().join("x.zip")),
        &[(
            spanzip::EntryOptions::new("x").encryption(EncryptionMethod::ZipCrypto),
            &b"data"[..],
        )],
    );
    assert!(matches!(result, Err(Error::InvalidEntryConfiguration { .. })));
}

#[test]
fn password_ignored_for_plain_entries() {
    let dir = tempdir().unwrap();
    let metadata = write_archive(
        VolumeConfig::single(dir.path().join("p.zip")),
        &[(options("plain", CompressionMethod::Store, EncryptionMethod::None), PAYLOAD)],
    )
    .unwrap();
    assert_eq!(read_entry(&metadata, "plain", Some("anything")).unwrap(), PAYLOAD);
}
