//! Checksum computation utilities.
//!
//! ZIP entries carry a CRC-32 (IEEE 802.3 polynomial) of their uncompressed
//! payload. The writer computes it incrementally over the raw bytes before
//! compression or encryption touch them; the reader recomputes it over the
//! decompressed output.
//!
//! The module also exposes the single-byte CRC step that the legacy
//! ZipCrypto key schedule is built on.
//!
//! # Example
//!
//! ```rust
//! use spanzip::checksum::Crc32;
//!
//! let mut crc = Crc32::new();
//! crc.update(b"Hello, ");
//! crc.update(b"World!");
//! assert_eq!(crc.finalize(), 0xEC4AC3D0);
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

use std::io::{self, Read};

/// Reflected IEEE 802.3 polynomial.
const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Lookup table for the byte-at-a-time CRC step.
const CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Advances a raw (non-inverted) CRC-32 register by one byte.
///
/// This is the primitive the ZipCrypto key schedule uses; it performs no
/// pre- or post-inversion.
#[inline]
pub fn crc32_step(crc: u32, byte: u8) -> u32 {
    CRC_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8)
}

/// CRC-32 checksum calculator.
///
/// Uses the IEEE 802.3 polynomial, the checksum stored in every ZIP header.
#[derive(Clone)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32")
            .field("current", &self.hasher.clone().finalize())
            .finish()
    }
}

impl Crc32 {
    /// Creates a new CRC-32 calculator.
    pub fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }

    /// Updates the checksum with additional data.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Returns the checksum of all data seen so far.
    pub fn finalize(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Resets the checksum to its initial state.
    pub fn reset(&mut self) {
        self.hasher.reset();
    }

    /// Computes the checksum of a single slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

/// A reader wrapper that computes CRC-32 while reading.
///
/// # Example
///
/// ```rust
/// use spanzip::checksum::Crc32Reader;
/// use std::io::{Cursor, Read};
///
/// let mut reader = Crc32Reader::new(Cursor::new(b"Hello, World!"));
/// let mut buffer = Vec::new();
/// reader.read_to_end(&mut buffer).unwrap();
///
/// assert_eq!(reader.crc(), 0xEC4AC3D0);
/// assert_eq!(reader.bytes_read(), 13);
/// ```
pub struct Crc32Reader<R> {
    inner: R,
    crc: Crc32,
    bytes_read: u64,
}

impl<R> Crc32Reader<R> {
    /// Creates a new CRC-32 reader wrapping the given reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            crc: Crc32::new(),
            bytes_read: 0,
        }
    }

    /// Returns the current CRC-32 value.
    pub fn crc(&self) -> u32 {
        self.crc.finalize()
    }

    /// Returns the number of bytes read.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consumes the wrapper and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Crc32Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.crc.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_crc32_basic() {
        assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_empty() {
        assert_eq!(Crc32::compute(b""), 0);
        assert_eq!(Crc32::new().finalize(), 0);
    }

    #[test]
    fn test_crc32_incremental() {
        let mut hasher = Crc32::new();
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        assert_eq!(hasher.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_reset() {
        let mut hasher = Crc32::new();
        hasher.update(b"test");
        hasher.reset();
        hasher.update(b"Hello, World!");
        assert_eq!(hasher.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_table_step_matches_crc32fast() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut crc = 0xFFFF_FFFFu32;
        for &b in data.iter() {
            crc = crc32_step(crc, b);
        }
        assert_eq!(!crc, Crc32::compute(data));
    }

    #[test]
    fn test_crc32_reader() {
        let mut reader = Crc32Reader::new(Cursor::new(b"Hello, World!"));
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).unwrap();

        assert_eq!(reader.crc(), 0xEC4AC3D0);
        assert_eq!(reader.bytes_read(), 13);
    }
}
