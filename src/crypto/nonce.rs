//! Sources for salts and cipher header bytes.

use crate::{Error, Result};

/// Policy for generating AES salts and the random part of the ZipCrypto
/// header.
///
/// | Use Case | Recommended Policy |
/// |----------|--------------------|
/// | Production archives | [`Random`][Self::Random] (default) |
/// | Reproducible output, tests | [`Deterministic`][Self::Deterministic] |
/// | Externally supplied values | [`Explicit`][Self::Explicit] |
///
/// Only `Random` is suitable for protecting real data: the other two reuse
/// the same bytes for every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NoncePolicy {
    /// Bytes from the operating system CSPRNG (`getrandom`).
    #[default]
    Random,
    /// Bytes expanded from a seed with SplitMix64.
    Deterministic {
        /// Seed for the expansion.
        seed: u64,
    },
    /// Fixed bytes, repeated as needed to fill the request.
    Explicit(Vec<u8>),
}

impl NoncePolicy {
    /// Creates the default random policy.
    pub fn random() -> Self {
        Self::Random
    }

    /// Creates a deterministic policy from a seed.
    pub fn deterministic(seed: u64) -> Self {
        Self::Deterministic { seed }
    }

    /// Creates an explicit policy.
    pub fn explicit(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Explicit(bytes.into())
    }

    /// Fills `buf` according to the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CryptoError`] if the system random source fails or
    /// an explicit policy holds no bytes.
    pub fn fill(&self, buf: &mut [u8]) -> Result<()> {
        match self {
            Self::Random => getrandom::getrandom(buf)
                .map_err(|e| Error::CryptoError(format!("random source failed: {}", e))),
            Self::Deterministic { seed } => {
                let mut state = *seed;
                for chunk in buf.chunks_mut(8) {
                    let value = splitmix64(&mut state).to_le_bytes();
                    chunk.copy_from_slice(&value[..chunk.len()]);
                }
                Ok(())
            }
            Self::Explicit(bytes) => {
                if bytes.is_empty() {
                    return Err(Error::CryptoError("explicit nonce policy has no bytes".into()));
                }
                for (dst, src) in buf.iter_mut().zip(bytes.iter().cycle()) {
                    *dst = *src;
                }
                Ok(())
            }
        }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_is_repeatable() {
        let policy = NoncePolicy::deterministic(42);
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        policy.fill(&mut a).unwrap();
        policy.fill(&mut b).unwrap();
        assert_eq!(a, b);

        let mut c = [0u8; 16];
        NoncePolicy::deterministic(43).fill(&mut c).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_deterministic_odd_length() {
        let mut buf = [0u8; 11];
        NoncePolicy::deterministic(1).fill(&mut buf).unwrap();
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_explicit_repeats() {
        let mut buf = [0u8; 5];
        NoncePolicy::explicit(vec![1, 2]).fill(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_explicit_empty_fails() {
        let mut buf = [0u8; 4];
        let err = NoncePolicy::explicit(Vec::new()).fill(&mut buf).unwrap_err();
        assert!(matches!(err, Error::CryptoError(_)));
    }

    #[test]
    fn test_random_fills() {
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        NoncePolicy::Random.fill(&mut a).unwrap();
        NoncePolicy::Random.fill(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
