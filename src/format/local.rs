//! Local file header and data descriptor records.
//!
//! ```text
//! local file header (30 bytes + name + extra)
//!   0  signature            u32  0x04034b50
//!   4  version needed       u16
//!   6  flags                u16
//!   8  method               u16
//!  10  DOS time             u16
//!  12  DOS date             u16
//!  14  CRC-32               u32
//!  18  compressed size      u32
//!  22  uncompressed size    u32
//!  26  name length          u16
//!  28  extra length         u16
//!
//! data descriptor
//!   signature 0x08074b50, CRC-32, compressed size, uncompressed size
//!   (sizes are 8 bytes each when either exceeds 32 bits)
//! ```

use std::io::Read;

use super::reader::{read_bytes, read_u16_le, read_u32_le, read_u64_le};
use super::{DATA_DESCRIPTOR_SIGNATURE, LOCAL_FILE_HEADER_SIGNATURE, LOCAL_FILE_HEADER_SIZE, ZIP64_THRESHOLD};
use crate::timestamp::DosDateTime;
use crate::{Error, Result};

/// A local file header as written in front of each entry's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flags.
    pub flags: u16,
    /// Method code as stored (99 for AES entries).
    pub method: u16,
    /// Last-modified time.
    pub modified: DosDateTime,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed size field (may be `0xFFFFFFFF` with a ZIP64 extra).
    pub compressed_size: u32,
    /// Uncompressed size field (may be `0xFFFFFFFF` with a ZIP64 extra).
    pub uncompressed_size: u32,
    /// Raw name bytes.
    pub name: Vec<u8>,
    /// Raw extra field block.
    pub extra: Vec<u8>,
}

impl LocalFileHeader {
    /// Offset of the CRC-32 field from the start of the header.
    ///
    /// CRC, compressed size and uncompressed size are contiguous from here,
    /// which is what a patch-back rewrites.
    pub const CRC_OFFSET: u64 = 14;

    /// Offset of the flags field from the start of the header.
    pub const FLAGS_OFFSET: u64 = 6;

    /// Total encoded length.
    pub fn encoded_len(&self) -> usize {
        LOCAL_FILE_HEADER_SIZE + self.name.len() + self.extra.len()
    }

    /// Encodes the header.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.method.to_le_bytes());
        out.extend_from_slice(&self.modified.time().to_le_bytes());
        out.extend_from_slice(&self.modified.date().to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(&self.extra);
        out
    }

    /// Parses a header from the reader.
    ///
    /// `offset` is only used to report where a corrupt header was found.
    pub fn parse<R: Read>(r: &mut R, offset: u64) -> Result<Self> {
        let signature = read_u32_le(r)?;
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(Error::corrupt_header(
                offset,
                format!("expected local file header signature, found {:#010x}", signature),
            ));
        }
        let version_needed = read_u16_le(r)?;
        let flags = read_u16_le(r)?;
        let method = read_u16_le(r)?;
        let time = read_u16_le(r)?;
        let date = read_u16_le(r)?;
        let crc32 = read_u32_le(r)?;
        let compressed_size = read_u32_le(r)?;
        let uncompressed_size = read_u32_le(r)?;
        let name_len = read_u16_le(r)? as usize;
        let extra_len = read_u16_le(r)? as usize;
        let name = read_bytes(r, name_len)?;
        let extra = read_bytes(r, extra_len)?;

        Ok(Self {
            version_needed,
            flags,
            method,
            modified: DosDateTime::from_parts(date, time),
            crc32,
            compressed_size,
            uncompressed_size,
            name,
            extra,
        })
    }
}

/// Trailing record carrying the authoritative CRC and sizes of an entry
/// whose local header has the sizes-deferred flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    /// CRC-32 of the uncompressed data (0 for AE-2 entries).
    pub crc32: u32,
    /// Bytes stored, including cipher framing.
    pub compressed_size: u64,
    /// Bytes before compression.
    pub uncompressed_size: u64,
}

impl DataDescriptor {
    /// Returns `true` if the sizes need the 8-byte form.
    pub fn is_zip64(&self) -> bool {
        self.compressed_size > ZIP64_THRESHOLD || self.uncompressed_size > ZIP64_THRESHOLD
    }

    /// Total encoded length, signature included.
    pub fn encoded_len(&self) -> usize {
        if self.is_zip64() { 24 } else { 16 }
    }

    /// Encodes the descriptor. The optional signature is always written.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&DATA_DESCRIPTOR_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        if self.is_zip64() {
            out.extend_from_slice(&self.compressed_size.to_le_bytes());
            out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        } else {
            out.extend_from_slice(&(self.compressed_size as u32).to_le_bytes());
            out.extend_from_slice(&(self.uncompressed_size as u32).to_le_bytes());
        }
        out
    }

    /// Parses a descriptor, with or without its optional signature.
    ///
    /// `zip64` selects the 8-byte size form.
    pub fn parse<R: Read>(r: &mut R, zip64: bool) -> Result<Self> {
        let first = read_u32_le(r)?;
        let crc32 = if first == DATA_DESCRIPTOR_SIGNATURE {
            read_u32_le(r)?
        } else {
            first
        };
        let (compressed_size, uncompressed_size) = if zip64 {
            (read_u64_le(r)?, read_u64_le(r)?)
        } else {
            (read_u32_le(r)? as u64, read_u32_le(r)? as u64)
        };
        Ok(Self {
            crc32,
            compressed_size,
            uncompressed_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::flags;
    use std::io::Cursor;

    fn sample_header() -> LocalFileHeader {
        LocalFileHeader {
            version_needed: 20,
            flags: flags::SIZES_DEFERRED,
            method: 8,
            modified: DosDateTime::from_parts(0x5021, 0x0000),
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            name: b"dir/file.txt".to_vec(),
            extra: Vec::new(),
        }
    }

    #[test]
    fn test_local_header_layout() {
        let header = sample_header();
        let bytes = header.encode();
        assert_eq!(bytes.len(), 30 + 12);
        assert_eq!(&bytes[0..4], b"PK\x03\x04");
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), flags::SIZES_DEFERRED);
        assert_eq!(u16::from_le_bytes([bytes[26], bytes[27]]), 12);
        assert_eq!(&bytes[30..], b"dir/file.txt");
    }

    #[test]
    fn test_local_header_parse() {
        let mut header = sample_header();
        header.crc32 = 0xDEADBEEF;
        header.extra = vec![0x55, 0x54, 0x01, 0x00, 0x07];
        let bytes = header.encode();
        let parsed = LocalFileHeader::parse(&mut Cursor::new(&bytes), 0).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_crc_offset_points_at_crc() {
        let mut header = sample_header();
        header.crc32 = 0x11223344;
        let bytes = header.encode();
        let at = LocalFileHeader::CRC_OFFSET as usize;
        assert_eq!(&bytes[at..at + 4], &0x11223344u32.to_le_bytes());
    }

    #[test]
    fn test_bad_signature() {
        let bytes = [0u8; 30];
        let err = LocalFileHeader::parse(&mut Cursor::new(&bytes), 0x40).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 0x40, .. }));
    }

    #[test]
    fn test_descriptor_small() {
        let descriptor = DataDescriptor {
            crc32: 0xEC4AC3D0,
            compressed_size: 13,
            uncompressed_size: 13,
        };
        let bytes = descriptor.encode();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], b"PK\x07\x08");
        let parsed = DataDescriptor::parse(&mut Cursor::new(&bytes), false).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_descriptor_zip64() {
        let descriptor = DataDescriptor {
            crc32: 1,
            compressed_size: 0x1_0000_0000,
            uncompressed_size: 5,
        };
        assert!(descriptor.is_zip64());
        let bytes = descriptor.encode();
        assert_eq!(bytes.len(), 24);
        let parsed = DataDescriptor::parse(&mut Cursor::new(&bytes), true).unwrap();
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn test_descriptor_without_signature() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        let parsed = DataDescriptor::parse(&mut Cursor::new(&bytes), false).unwrap();
        assert_eq!(
            parsed,
            DataDescriptor {
                crc32: 7,
                compressed_size: 3,
                uncompressed_size: 4
            }
        );
    }
}
