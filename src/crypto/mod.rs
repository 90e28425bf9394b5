//! Entry encryption: the legacy ZIP stream cipher and WinZip AES.
//!
//! Encryption sits between compression and the volume sink. On the write
//! path a [`CipherFilter`] produces the cipher header bytes that precede the
//! payload, transforms the compressed bytes, and appends the trailer (the AES
//! authentication code). On the read path a [`DecryptReader`] consumes and
//! validates the header before handing out any payload byte.
//!
//! | Method | Header | Trailer | Password check |
//! |--------|--------|---------|----------------|
//! | ZipCrypto | 12 bytes | none | check byte |
//! | AES-128 | 8 + 2 bytes | 10 bytes | verifier |
//! | AES-192 | 12 + 2 bytes | 10 bytes | verifier |
//! | AES-256 | 16 + 2 bytes | 10 bytes | verifier |

#[cfg(feature = "aes")]
pub mod aes;
mod nonce;
mod password;
pub mod zipcrypto;

use std::io::{self, Read};

use crate::codec::EntryFilter;
use crate::{Error, Result};

pub use nonce::NoncePolicy;
pub use password::Password;
pub use zipcrypto::{ZipCryptoEncoder, ZipCryptoReader};

#[cfg(feature = "aes")]
pub use self::aes::{AesEncoder, AesReader};

/// Length of the AES password verification value.
pub const AES_VERIFIER_LEN: usize = 2;

/// Length of the truncated AES authentication code.
pub const AES_MAC_LEN: usize = 10;

/// AES key size of a WinZip AES entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AesStrength {
    /// 128-bit key, 8-byte salt.
    Aes128 = 1,
    /// 192-bit key, 12-byte salt.
    Aes192 = 2,
    /// 256-bit key, 16-byte salt.
    Aes256 = 3,
}

impl AesStrength {
    /// Parses the strength byte of the AES extra field.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Aes128),
            2 => Some(Self::Aes192),
            3 => Some(Self::Aes256),
            _ => None,
        }
    }

    /// Salt length in bytes.
    pub fn salt_len(self) -> usize {
        match self {
            Self::Aes128 => 8,
            Self::Aes192 => 12,
            Self::Aes256 => 16,
        }
    }

    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }
}

/// WinZip AES format revision.
///
/// AE-1 stores the real CRC-32. AE-2 stores zero and relies on the
/// authentication code alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AesVendorVersion {
    /// AE-1: CRC stored.
    Ae1 = 1,
    /// AE-2: CRC stored as zero.
    #[default]
    Ae2 = 2,
}

impl AesVendorVersion {
    /// Parses the vendor version field of the AES extra field.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Ae1),
            2 => Some(Self::Ae2),
            _ => None,
        }
    }
}

/// Encryption applied to one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EncryptionMethod {
    /// Stored in the clear.
    #[default]
    None,
    /// Legacy ZIP stream cipher.
    ZipCrypto,
    /// WinZip AES with the given key size.
    Aes(AesStrength),
}

impl EncryptionMethod {
    /// Returns `true` for every method except [`None`][Self::None].
    pub fn is_encrypted(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Bytes written in front of the payload.
    pub fn header_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::ZipCrypto => zipcrypto::HEADER_LEN,
            Self::Aes(strength) => strength.salt_len() + AES_VERIFIER_LEN,
        }
    }

    /// Bytes written after the payload.
    pub fn trailer_len(self) -> usize {
        match self {
            Self::Aes(_) => AES_MAC_LEN,
            _ => 0,
        }
    }

    /// Total cipher framing counted in the compressed size.
    pub fn overhead(self) -> u64 {
        (self.header_len() + self.trailer_len()) as u64
    }

    /// Returns `true` if this build can encrypt and decrypt with the method.
    pub fn is_available(self) -> bool {
        match self {
            Self::Aes(_) => cfg!(feature = "aes"),
            _ => true,
        }
    }
}

impl std::fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ZipCrypto => write!(f, "ZipCrypto"),
            Self::Aes(strength) => write!(f, "AES-{}", strength.key_len() * 8),
        }
    }
}

/// Write-path encryption filter for one entry.
#[derive(Debug)]
pub enum CipherFilter {
    /// Pass-through.
    None,
    /// Legacy stream cipher.
    ZipCrypto(ZipCryptoEncoder),
    /// WinZip AES.
    #[cfg(feature = "aes")]
    Aes(AesEncoder),
}

impl CipherFilter {
    /// Creates the filter and returns the header bytes to write before the
    /// payload.
    ///
    /// `check_byte` is only used by ZipCrypto; see
    /// [`zipcrypto::check_byte`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CryptoError`] if an encrypting method has no password
    /// or the nonce source fails, and [`Error::UnsupportedFeature`] if AES
    /// support is compiled out.
    pub fn new(
        method: EncryptionMethod,
        password: Option<&Password>,
        check_byte: u8,
        nonce: &NoncePolicy,
    ) -> Result<(Self, Vec<u8>)> {
        let password = match (method, password) {
            (EncryptionMethod::None, _) => return Ok((Self::None, Vec::new())),
            (_, Some(password)) if !password.is_empty() => password,
            _ => return Err(Error::CryptoError(format!("{} encryption needs a password", method))),
        };

        match method {
            EncryptionMethod::None => Ok((Self::None, Vec::new())),
            EncryptionMethod::ZipCrypto => {
                let (encoder, header) = ZipCryptoEncoder::new(password, check_byte, nonce)?;
                Ok((Self::ZipCrypto(encoder), header.to_vec()))
            }
            #[cfg(feature = "aes")]
            EncryptionMethod::Aes(strength) => {
                let (encoder, header) = AesEncoder::new(password, strength, nonce)?;
                Ok((Self::Aes(encoder), header))
            }
            #[cfg(not(feature = "aes"))]
            EncryptionMethod::Aes(_) => Err(Error::UnsupportedFeature { feature: "aes" }),
        }
    }
}

impl EntryFilter for CipherFilter {
    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::None => {
                output.extend_from_slice(input);
                Ok(())
            }
            Self::ZipCrypto(encoder) => encoder.transform(input, output),
            #[cfg(feature = "aes")]
            Self::Aes(encoder) => encoder.transform(input, output),
        }
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::None => Ok(()),
            Self::ZipCrypto(encoder) => encoder.finish(output),
            #[cfg(feature = "aes")]
            Self::Aes(encoder) => encoder.finish(output),
        }
    }
}

/// Read-path decryption layer over the stored bytes of one entry.
///
/// The inner reader must yield exactly the entry's compressed size.
pub enum DecryptReader<R> {
    /// Unencrypted entry.
    Plain(R),
    /// Legacy stream cipher.
    ZipCrypto(ZipCryptoReader<R>),
    /// WinZip AES.
    #[cfg(feature = "aes")]
    Aes(AesReader<R>),
}

impl<R> std::fmt::Debug for DecryptReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Plain(_) => "Plain",
            Self::ZipCrypto(_) => "ZipCrypto",
            #[cfg(feature = "aes")]
            Self::Aes(_) => "Aes",
        };
        f.debug_tuple("DecryptReader").field(&kind).finish()
    }
}

impl<R: Read> DecryptReader<R> {
    /// Opens the decryption layer, consuming and checking the cipher header.
    ///
    /// # Errors
    ///
    /// - [`Error::PasswordRequired`] if the entry is encrypted and no
    ///   non-empty password was supplied
    /// - [`Error::WrongPassword`] if the header rejects the password
    /// - [`Error::UnsupportedFeature`] if AES support is compiled out
    pub fn new(
        inner: R,
        method: EncryptionMethod,
        password: Option<&Password>,
        check_byte: u8,
        stored_size: u64,
        entry_name: &str,
    ) -> Result<Self> {
        let password = match (method, password) {
            (EncryptionMethod::None, _) => return Ok(Self::Plain(inner)),
            (_, Some(password)) if !password.is_empty() => password,
            _ => {
                return Err(Error::PasswordRequired {
                    entry_name: entry_name.to_string(),
                });
            }
        };

        match method {
            EncryptionMethod::None => Ok(Self::Plain(inner)),
            EncryptionMethod::ZipCrypto => Ok(Self::ZipCrypto(ZipCryptoReader::new(
                inner, password, check_byte, entry_name,
            )?)),
            #[cfg(feature = "aes")]
            EncryptionMethod::Aes(strength) => Ok(Self::Aes(AesReader::new(
                inner,
                password,
                strength,
                stored_size,
                entry_name,
            )?)),
            #[cfg(not(feature = "aes"))]
            EncryptionMethod::Aes(_) => {
                let _ = stored_size;
                Err(Error::UnsupportedFeature { feature: "aes" })
            }
        }
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(r) => r.read(buf),
            Self::ZipCrypto(r) => r.read(buf),
            #[cfg(feature = "aes")]
            Self::Aes(r) => r.read(buf),
        }
    }
}
