//! Legacy ZIP stream cipher ("ZipCrypto").
//!
//! The cipher keeps three 32-bit keys that are stirred with every plaintext
//! byte. Every encrypted entry starts with a 12-byte header: eleven random
//! bytes followed by a check byte that lets a reader reject a wrong password
//! before touching the payload. The check byte is the high byte of the CRC
//! when it is known up front, otherwise the high byte of the DOS time field.
//!
//! This cipher is weak and kept only for compatibility.

use std::io::{self, Read};

use super::{NoncePolicy, Password};
use crate::checksum::crc32_step;
use crate::codec::EntryFilter;
use crate::error::PasswordDetectionMethod;
use crate::{Error, Result};

/// Length of the encryption header in front of the payload.
pub const HEADER_LEN: usize = 12;

const KEY0_INIT: u32 = 0x1234_5678;
const KEY1_INIT: u32 = 0x2345_6789;
const KEY2_INIT: u32 = 0x3456_7890;

/// Derives the check byte stored in the last header byte.
///
/// `sizes_deferred` entries use the DOS time because the CRC is unknown
/// when the header is written.
pub fn check_byte(sizes_deferred: bool, crc32: u32, dos_time: u16) -> u8 {
    if sizes_deferred {
        (dos_time >> 8) as u8
    } else {
        (crc32 >> 24) as u8
    }
}

#[derive(Clone)]
struct Keys {
    key0: u32,
    key1: u32,
    key2: u32,
}

impl Keys {
    fn new(password: &[u8]) -> Self {
        let mut keys = Self {
            key0: KEY0_INIT,
            key1: KEY1_INIT,
            key2: KEY2_INIT,
        };
        for &byte in password {
            keys.update(byte);
        }
        keys
    }

    #[inline]
    fn update(&mut self, byte: u8) {
        self.key0 = crc32_step(self.key0, byte);
        self.key1 = self
            .key1
            .wrapping_add(self.key0 & 0xFF)
            .wrapping_mul(134_775_813)
            .wrapping_add(1);
        self.key2 = crc32_step(self.key2, (self.key1 >> 24) as u8);
    }

    #[inline]
    fn stream_byte(&self) -> u8 {
        let temp = (self.key2 | 2) & 0xFFFF;
        ((temp * (temp ^ 1)) >> 8) as u8
    }

    #[inline]
    fn encrypt(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ self.stream_byte();
        self.update(plain);
        cipher
    }

    #[inline]
    fn decrypt(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ self.stream_byte();
        self.update(plain);
        plain
    }
}

impl Drop for Keys {
    fn drop(&mut self) {
        self.key0 = 0;
        self.key1 = 0;
        self.key2 = 0;
    }
}

/// Encrypting side of the cipher, used as the write-path cipher filter.
pub struct ZipCryptoEncoder {
    keys: Keys,
}

impl std::fmt::Debug for ZipCryptoEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipCryptoEncoder").finish_non_exhaustive()
    }
}

impl ZipCryptoEncoder {
    /// Creates an encoder and the encrypted 12-byte header to write in front
    /// of the payload.
    pub fn new(password: &Password, check_byte: u8, nonce: &NoncePolicy) -> Result<(Self, [u8; HEADER_LEN])> {
        let mut header = [0u8; HEADER_LEN];
        nonce.fill(&mut header[..HEADER_LEN - 1])?;
        header[HEADER_LEN - 1] = check_byte;

        let mut keys = Keys::new(password.as_bytes());
        for byte in header.iter_mut() {
            *byte = keys.encrypt(*byte);
        }
        Ok((Self { keys }, header))
    }
}

impl EntryFilter for ZipCryptoEncoder {
    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        output.reserve(input.len());
        output.extend(input.iter().map(|&b| self.keys.encrypt(b)));
        Ok(())
    }

    fn finish(&mut self, _output: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }
}

/// Decrypting reader over the header and payload of one entry.
pub struct ZipCryptoReader<R> {
    inner: R,
    keys: Keys,
}

impl<R> std::fmt::Debug for ZipCryptoReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipCryptoReader").finish_non_exhaustive()
    }
}

impl<R: Read> ZipCryptoReader<R> {
    /// Reads and verifies the 12-byte header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WrongPassword`] if the decrypted check byte does not
    /// match `expected_check`. No payload byte has been consumed by then.
    pub fn new(mut inner: R, password: &Password, expected_check: u8, entry_name: &str) -> Result<Self> {
        let mut header = [0u8; HEADER_LEN];
        inner.read_exact(&mut header).map_err(Error::SourceReadFailure)?;

        let mut keys = Keys::new(password.as_bytes());
        for byte in header.iter_mut() {
            *byte = keys.decrypt(*byte);
        }

        if header[HEADER_LEN - 1] != expected_check {
            return Err(Error::WrongPassword {
                entry_name: entry_name.to_string(),
                detection_method: PasswordDetectionMethod::CheckByteMismatch,
            });
        }
        Ok(Self { inner, keys })
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: Read> Read for ZipCryptoReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for byte in &mut buf[..n] {
            *byte = self.keys.decrypt(*byte);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encrypt(password: &str, check: u8, plain: &[u8]) -> Vec<u8> {
        let (mut encoder, header) =
            ZipCryptoEncoder::new(&Password::new(password), check, &NoncePolicy::deterministic(7)).unwrap();
        let mut out = header.to_vec();
        encoder.transform(plain, &mut out).unwrap();
        encoder.finish(&mut out).unwrap();
        out
    }

    #[test]
    fn test_initial_keys_after_empty_password() {
        let keys = Keys::new(b"");
        assert_eq!((keys.key0, keys.key1, keys.key2), (KEY0_INIT, KEY1_INIT, KEY2_INIT));
    }

    #[test]
    fn test_roundtrip() {
        let plain = b"Hello, World! Hello, World!";
        let encrypted = encrypt("secret", 0xEC, plain);
        assert_eq!(encrypted.len(), HEADER_LEN + plain.len());
        assert_ne!(&encrypted[HEADER_LEN..], &plain[..]);

        let mut reader =
            ZipCryptoReader::new(Cursor::new(encrypted), &Password::new("secret"), 0xEC, "a").unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn test_wrong_check_byte_detected() {
        let encrypted = encrypt("secret", 0x12, b"payload");
        let err = ZipCryptoReader::new(Cursor::new(encrypted), &Password::new("secret"), 0x13, "e.txt")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::WrongPassword {
                detection_method: PasswordDetectionMethod::CheckByteMismatch,
                ..
            }
        ));
    }

    #[test]
    fn test_check_byte_source() {
        assert_eq!(check_byte(false, 0xEC4AC3D0, 0x1234), 0xEC);
        assert_eq!(check_byte(true, 0xEC4AC3D0, 0x1234), 0x12);
    }

    #[test]
    fn test_truncated_header() {
        let err = ZipCryptoReader::new(Cursor::new(vec![0u8; 5]), &Password::new("x"), 0, "t").unwrap_err();
        assert!(matches!(err, Error::SourceReadFailure(_)));
    }
}
