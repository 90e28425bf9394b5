//! WinZip AES encryption (AE-1 / AE-2).
//!
//! Keys are derived with PBKDF2-HMAC-SHA1 (1000 iterations) from the password
//! and a per-entry salt. The derived block is split into the AES key, the
//! HMAC key, and a two-byte password verifier. The payload is encrypted with
//! AES in CTR mode using a little-endian counter that starts at 1, and an
//! HMAC-SHA1 over the ciphertext, truncated to 10 bytes, follows it.
//!
//! Stored layout: `salt | verifier | ciphertext | mac`.

use std::io::{self, Read};

use ::aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroizing;

use super::{AES_MAC_LEN, AES_VERIFIER_LEN, AesStrength, NoncePolicy, Password};
use crate::codec::EntryFilter;
use crate::error::PasswordDetectionMethod;
use crate::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// PBKDF2 iteration count fixed by the format.
pub const KEY_DERIVATION_ITERATIONS: u32 = 1000;

/// Initial counter block: little-endian 1.
const INITIAL_COUNTER: [u8; 16] = [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Key material derived from a password and salt.
pub struct DerivedKeys {
    encryption: Zeroizing<Vec<u8>>,
    authentication: Zeroizing<Vec<u8>>,
    verifier: [u8; AES_VERIFIER_LEN],
}

impl std::fmt::Debug for DerivedKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeys")
            .field("key_len", &self.encryption.len())
            .finish_non_exhaustive()
    }
}

impl DerivedKeys {
    /// The password verification value stored after the salt.
    pub fn verifier(&self) -> [u8; AES_VERIFIER_LEN] {
        self.verifier
    }
}

/// Derives the AES key, HMAC key and verifier.
pub fn derive_keys(password: &Password, salt: &[u8], strength: AesStrength) -> DerivedKeys {
    let key_len = strength.key_len();
    let mut block = Zeroizing::new(vec![0u8; 2 * key_len + AES_VERIFIER_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, KEY_DERIVATION_ITERATIONS, &mut block);

    DerivedKeys {
        encryption: Zeroizing::new(block[..key_len].to_vec()),
        authentication: Zeroizing::new(block[key_len..2 * key_len].to_vec()),
        verifier: [block[2 * key_len], block[2 * key_len + 1]],
    }
}

enum AesCtr {
    Aes128(ctr::Ctr128LE<Aes128>),
    Aes192(ctr::Ctr128LE<Aes192>),
    Aes256(ctr::Ctr128LE<Aes256>),
}

impl AesCtr {
    fn new(strength: AesStrength, key: &[u8]) -> Result<Self> {
        let cipher = match strength {
            AesStrength::Aes128 => ctr::Ctr128LE::<Aes128>::new_from_slices(key, &INITIAL_COUNTER).map(Self::Aes128),
            AesStrength::Aes192 => ctr::Ctr128LE::<Aes192>::new_from_slices(key, &INITIAL_COUNTER).map(Self::Aes192),
            AesStrength::Aes256 => ctr::Ctr128LE::<Aes256>::new_from_slices(key, &INITIAL_COUNTER).map(Self::Aes256),
        };
        cipher.map_err(|e| Error::CryptoError(format!("AES key setup failed: {}", e)))
    }

    fn apply(&mut self, data: &mut [u8]) {
        match self {
            Self::Aes128(c) => c.apply_keystream(data),
            Self::Aes192(c) => c.apply_keystream(data),
            Self::Aes256(c) => c.apply_keystream(data),
        }
    }
}

fn new_mac(keys: &DerivedKeys) -> Result<HmacSha1> {
    HmacSha1::new_from_slice(&keys.authentication)
        .map_err(|e| Error::CryptoError(format!("HMAC key setup failed: {}", e)))
}

/// Encrypting filter for one AES entry.
pub struct AesEncoder {
    cipher: AesCtr,
    mac: HmacSha1,
}

impl std::fmt::Debug for AesEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesEncoder").finish_non_exhaustive()
    }
}

impl AesEncoder {
    /// Creates an encoder with a fresh salt from `nonce`.
    ///
    /// Returns the encoder and the `salt | verifier` header.
    pub fn new(password: &Password, strength: AesStrength, nonce: &NoncePolicy) -> Result<(Self, Vec<u8>)> {
        let mut salt = vec![0u8; strength.salt_len()];
        nonce.fill(&mut salt)?;

        let keys = derive_keys(password, &salt, strength);
        let encoder = Self {
            cipher: AesCtr::new(strength, &keys.encryption)?,
            mac: new_mac(&keys)?,
        };

        let mut header = salt;
        header.extend_from_slice(&keys.verifier);
        Ok((encoder, header))
    }
}

impl EntryFilter for AesEncoder {
    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let start = output.len();
        output.extend_from_slice(input);
        self.cipher.apply(&mut output[start..]);
        self.mac.update(&output[start..]);
        Ok(())
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        let tag = self.mac.clone().finalize().into_bytes();
        output.extend_from_slice(&tag[..AES_MAC_LEN]);
        Ok(())
    }
}

/// Decrypting reader for one AES entry.
///
/// The authentication code is checked once the ciphertext is exhausted;
/// a mismatch surfaces from `read` as [`Error::AuthenticationFailed`].
pub struct AesReader<R> {
    inner: R,
    cipher: AesCtr,
    mac: HmacSha1,
    remaining: u64,
    authenticated: bool,
    entry_name: String,
}

impl<R> std::fmt::Debug for AesReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesReader")
            .field("remaining", &self.remaining)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

impl<R: Read> AesReader<R> {
    /// Reads the salt and verifier and checks the password.
    ///
    /// `stored_size` is the entry's compressed size, framing included.
    pub fn new(
        mut inner: R,
        password: &Password,
        strength: AesStrength,
        stored_size: u64,
        entry_name: &str,
    ) -> Result<Self> {
        let framing = (strength.salt_len() + AES_VERIFIER_LEN + AES_MAC_LEN) as u64;
        if stored_size < framing {
            return Err(Error::InvalidFormat(format!(
                "AES entry '{}' is {} bytes, shorter than its {} bytes of framing",
                entry_name, stored_size, framing
            )));
        }

        let mut salt = vec![0u8; strength.salt_len()];
        let mut verifier = [0u8; AES_VERIFIER_LEN];
        inner.read_exact(&mut salt).map_err(Error::SourceReadFailure)?;
        inner.read_exact(&mut verifier).map_err(Error::SourceReadFailure)?;

        let keys = derive_keys(password, &salt, strength);
        if keys.verifier != verifier {
            return Err(Error::WrongPassword {
                entry_name: entry_name.to_string(),
                detection_method: PasswordDetectionMethod::VerifierMismatch,
            });
        }

        Ok(Self {
            inner,
            cipher: AesCtr::new(strength, &keys.encryption)?,
            mac: new_mac(&keys)?,
            remaining: stored_size - framing,
            authenticated: false,
            entry_name: entry_name.to_string(),
        })
    }

    fn authenticate(&mut self) -> io::Result<()> {
        let mut tag = [0u8; AES_MAC_LEN];
        self.inner.read_exact(&mut tag)?;
        self.mac.clone().verify_truncated_left(&tag).map_err(|_| {
            io::Error::from(Error::AuthenticationFailed {
                entry_name: self.entry_name.clone(),
            })
        })?;
        self.authenticated = true;
        Ok(())
    }
}

impl<R: Read> Read for AesReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            if !self.authenticated {
                self.authenticate()?;
            }
            return Ok(0);
        }

        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "AES ciphertext ended early",
            ));
        }
        self.mac.update(&buf[..n]);
        self.cipher.apply(&mut buf[..n]);
        self.remaining -= n as u64;
        Ok(n)
    }
}
