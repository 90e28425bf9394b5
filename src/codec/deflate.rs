//! Deflate codec implementation.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::bufread::DeflateDecoder as FlateDecoder;
use flate2::write::DeflateEncoder as FlateEncoder;

use super::EntryFilter;
use crate::{Error, Result};

/// Deflate decoder.
pub struct DeflateDecoder<R> {
    inner: FlateDecoder<R>,
}

impl<R> std::fmt::Debug for DeflateDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateDecoder").finish_non_exhaustive()
    }
}

impl<R: io::BufRead> DeflateDecoder<R> {
    /// Creates a new Deflate decoder.
    ///
    /// # Arguments
    ///
    /// * `input` - The compressed data source (must implement BufRead)
    pub fn new(input: R) -> Self {
        Self {
            inner: FlateDecoder::new(input),
        }
    }

    /// Returns a mutable reference to the compressed data source.
    ///
    /// Bytes past the end of the deflate stream are left in it.
    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }
}

impl<R: io::BufRead> Read for DeflateDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Deflate encoder options.
#[derive(Debug, Clone)]
pub struct DeflateEncoderOptions {
    /// Compression level (0-9, default 6).
    pub level: u32,
}

impl Default for DeflateEncoderOptions {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflateEncoderOptions {
    /// Creates options with the given compression level.
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

/// Deflate compression filter.
///
/// Compressed output accumulates in an internal buffer and is handed over
/// on every `transform`.
pub struct DeflateEncoder {
    inner: FlateEncoder<Vec<u8>>,
}

impl std::fmt::Debug for DeflateEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateEncoder").finish_non_exhaustive()
    }
}

impl DeflateEncoder {
    /// Creates a new Deflate encoder.
    pub fn new(options: &DeflateEncoderOptions) -> Self {
        Self {
            inner: FlateEncoder::new(Vec::new(), Compression::new(options.level)),
        }
    }
}

impl EntryFilter for DeflateEncoder {
    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        self.inner.write_all(input).map_err(Error::Io)?;
        output.append(self.inner.get_mut());
        Ok(())
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        self.inner.try_finish().map_err(Error::Io)?;
        output.append(self.inner.get_mut());
        Ok(())
    }
}
