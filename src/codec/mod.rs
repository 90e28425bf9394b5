//! Compression codecs for ZIP entries.
//!
//! The write path composes filters that share one interface,
//! [`EntryFilter`]: each call to `transform` appends its output to a caller
//! buffer, and `finish` flushes whatever state is left. Compression filters
//! live here; the cipher filters in [`crate::crypto`] implement the same
//! trait so an entry writer can chain them explicitly.
//!
//! The read path builds an [`EntryDecoder`] over the decrypted byte stream.

mod copy;
#[cfg(feature = "deflate")]
pub mod deflate;

use std::io::{self, Read};

use crate::Result;

pub use copy::CopyDecoder;

#[cfg(feature = "deflate")]
pub use deflate::{DeflateDecoder, DeflateEncoder, DeflateEncoderOptions};

/// One stage of the write pipeline.
pub trait EntryFilter {
    /// Transforms `input`, appending the result to `output`.
    ///
    /// A filter may buffer internally and append nothing.
    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()>;

    /// Flushes buffered state and appends any trailer to `output`.
    ///
    /// Called exactly once, after the last `transform`.
    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()>;
}

/// A decoder that reads stored data and produces uncompressed output.
pub trait Decoder: Read + Send {
    /// Returns the compression method this decoder handles.
    fn method(&self) -> CompressionMethod;
}

/// Compression methods supported for entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CompressionMethod {
    /// No compression.
    Store,
    /// Raw deflate.
    #[default]
    Deflate,
}

impl CompressionMethod {
    /// Method code as stored in headers.
    pub fn code(self) -> u16 {
        match self {
            Self::Store => 0,
            Self::Deflate => 8,
        }
    }

    /// Parses a method code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Store),
            8 => Some(Self::Deflate),
            _ => None,
        }
    }

    /// Returns `true` if this build can encode and decode the method.
    pub fn is_available(self) -> bool {
        match self {
            Self::Store => true,
            Self::Deflate => cfg!(feature = "deflate"),
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Deflate => write!(f, "deflate"),
        }
    }
}

/// Write-path compression filter for one entry.
#[derive(Debug)]
pub enum CompressionFilter {
    /// Pass-through.
    Store,
    /// Raw deflate.
    #[cfg(feature = "deflate")]
    Deflate(DeflateEncoder),
}

impl CompressionFilter {
    /// Creates the filter for `method`.
    ///
    /// `level` is clamped to 0..=9 and ignored for [`CompressionMethod::Store`].
    pub fn new(method: CompressionMethod, level: u32) -> Result<Self> {
        match method {
            CompressionMethod::Store => Ok(Self::Store),
            #[cfg(feature = "deflate")]
            CompressionMethod::Deflate => Ok(Self::Deflate(DeflateEncoder::new(
                &DeflateEncoderOptions::with_level(level),
            ))),
            #[cfg(not(feature = "deflate"))]
            CompressionMethod::Deflate => {
                let _ = level;
                Err(crate::Error::UnsupportedMethod {
                    method: method.code(),
                })
            }
        }
    }
}

impl EntryFilter for CompressionFilter {
    fn transform(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Store => {
                output.extend_from_slice(input);
                Ok(())
            }
            #[cfg(feature = "deflate")]
            Self::Deflate(encoder) => encoder.transform(input, output),
        }
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Store => Ok(()),
            #[cfg(feature = "deflate")]
            Self::Deflate(encoder) => encoder.finish(output),
        }
    }
}

/// Read-path decompression layer.
pub enum EntryDecoder<R> {
    /// Stored data, limited to the uncompressed size.
    Copy(CopyDecoder<R>),
    /// Raw deflate.
    #[cfg(feature = "deflate")]
    Deflate(DeflateDecoder<io::BufReader<R>>),
}

impl<R> std::fmt::Debug for EntryDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy(_) => f.write_str("EntryDecoder::Copy"),
            #[cfg(feature = "deflate")]
            Self::Deflate(_) => f.write_str("EntryDecoder::Deflate"),
        }
    }
}

impl<R: Read> EntryDecoder<R> {
    /// Consumes whatever the decoder left unread in its input.
    ///
    /// Reading the input to its end triggers trailer checks of the layers
    /// below, such as the AES authentication code.
    pub fn drain_input(&mut self) -> io::Result<u64> {
        match self {
            Self::Copy(decoder) => io::copy(decoder.get_mut(), &mut io::sink()),
            #[cfg(feature = "deflate")]
            Self::Deflate(decoder) => io::copy(decoder.get_mut(), &mut io::sink()),
        }
    }
}

impl<R: Read> Read for EntryDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Copy(decoder) => decoder.read(buf),
            #[cfg(feature = "deflate")]
            Self::Deflate(decoder) => decoder.read(buf),
        }
    }
}

impl<R: Read + Send> Decoder for EntryDecoder<R> {
    fn method(&self) -> CompressionMethod {
        match self {
            Self::Copy(_) => CompressionMethod::Store,
            #[cfg(feature = "deflate")]
            Self::Deflate(_) => CompressionMethod::Deflate,
        }
    }
}

/// Builds the decoder for an entry's stored bytes.
///
/// # Errors
///
/// Returns [`crate::Error::UnsupportedMethod`] if the method is compiled out.
pub fn build_decoder<R: Read>(
    input: R,
    method: CompressionMethod,
    uncompressed_size: u64,
) -> Result<EntryDecoder<R>> {
    match method {
        CompressionMethod::Store => Ok(EntryDecoder::Copy(CopyDecoder::new(input, uncompressed_size))),
        #[cfg(feature = "deflate")]
        CompressionMethod::Deflate => Ok(EntryDecoder::Deflate(DeflateDecoder::new(io::BufReader::new(input)))),
        #[cfg(not(feature = "deflate"))]
        CompressionMethod::Deflate => Err(crate::Error::UnsupportedMethod {
            method: method.code(),
        }),
    }
}
