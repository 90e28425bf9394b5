//! Extra field records.
//!
//! Each extra field is `id: u16, size: u16, data: [u8; size]`. Two are
//! understood here: the ZIP64 extended information field (`0x0001`) and the
//! WinZip AES field (`0x9901`). Unknown fields are preserved by skipping them.

use super::extra_id;
use super::reader::{u16_at, u32_at, u64_at};
use crate::crypto::{AesStrength, AesVendorVersion};
use crate::{Error, Result};

/// Iterator over `(id, data)` pairs of an extra field block.
///
/// Iteration stops at the first truncated record.
#[derive(Debug, Clone)]
pub struct ExtraFields<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for ExtraFields<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < 4 {
            return None;
        }
        let id = u16_at(self.data, 0);
        let size = u16_at(self.data, 2) as usize;
        if self.data.len() < 4 + size {
            log::debug!("Truncated extra field {:#06x} ignored", id);
            self.data = &[];
            return None;
        }
        let payload = &self.data[4..4 + size];
        self.data = &self.data[4 + size..];
        Some((id, payload))
    }
}

/// Iterates the records of an extra field block.
pub fn extra_fields(data: &[u8]) -> ExtraFields<'_> {
    ExtraFields { data }
}

/// Returns the payload of the first record with the given ID.
pub fn find_extra(data: &[u8], id: u16) -> Option<&[u8]> {
    extra_fields(data).find(|(field_id, _)| *field_id == id).map(|(_, payload)| payload)
}

/// ZIP64 extended information (`0x0001`).
///
/// Only the values whose 32-bit (or 16-bit) header counterparts overflowed
/// are present, always in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zip64ExtendedInfo {
    /// Uncompressed size.
    pub uncompressed_size: Option<u64>,
    /// Compressed size.
    pub compressed_size: Option<u64>,
    /// Offset of the local header within its volume.
    pub local_header_offset: Option<u64>,
    /// Volume holding the local header.
    pub disk_start: Option<u32>,
}

impl Zip64ExtendedInfo {
    /// Returns `true` if no value is present.
    pub fn is_empty(&self) -> bool {
        self.uncompressed_size.is_none()
            && self.compressed_size.is_none()
            && self.local_header_offset.is_none()
            && self.disk_start.is_none()
    }

    /// Encodes the complete record including its header.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(28);
        for value in [
            self.uncompressed_size,
            self.compressed_size,
            self.local_header_offset,
        ]
        .into_iter()
        .flatten()
        {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        if let Some(disk) = self.disk_start {
            payload.extend_from_slice(&disk.to_le_bytes());
        }

        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&extra_id::ZIP64.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    /// Parses a record payload.
    ///
    /// The flags say which header fields overflowed and therefore which
    /// values the payload must carry.
    pub fn parse(
        payload: &[u8],
        uncompressed: bool,
        compressed: bool,
        offset: bool,
        disk: bool,
    ) -> Result<Self> {
        let mut info = Self::default();
        let mut pos = 0usize;

        let next_u64 = |pos: &mut usize, what: &str| -> Result<u64> {
            if payload.len() < *pos + 8 {
                return Err(Error::InvalidFormat(format!(
                    "ZIP64 extra field too short for {}",
                    what
                )));
            }
            let value = u64_at(payload, *pos);
            *pos += 8;
            Ok(value)
        };

        if uncompressed {
            info.uncompressed_size = Some(next_u64(&mut pos, "uncompressed size")?);
        }
        if compressed {
            info.compressed_size = Some(next_u64(&mut pos, "compressed size")?);
        }
        if offset {
            info.local_header_offset = Some(next_u64(&mut pos, "local header offset")?);
        }
        if disk {
            if payload.len() < pos + 4 {
                return Err(Error::InvalidFormat(
                    "ZIP64 extra field too short for disk number".into(),
                ));
            }
            info.disk_start = Some(u32_at(payload, pos));
        }
        Ok(info)
    }
}

/// WinZip AES extra field (`0x9901`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesExtraField {
    /// AE-1 or AE-2.
    pub vendor_version: AesVendorVersion,
    /// Key size.
    pub strength: AesStrength,
    /// The compression method applied before encryption.
    pub compression_method: u16,
}

impl AesExtraField {
    /// Payload size of the record.
    pub const DATA_SIZE: u16 = 7;

    /// Encodes the complete record including its header.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + Self::DATA_SIZE as usize);
        out.extend_from_slice(&extra_id::AES.to_le_bytes());
        out.extend_from_slice(&Self::DATA_SIZE.to_le_bytes());
        out.extend_from_slice(&(self.vendor_version as u16).to_le_bytes());
        out.extend_from_slice(b"AE");
        out.push(self.strength as u8);
        out.extend_from_slice(&self.compression_method.to_le_bytes());
        out
    }

    /// Parses a record payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::DATA_SIZE as usize {
            return Err(Error::InvalidFormat(format!(
                "AES extra field too short: {} bytes",
                payload.len()
            )));
        }
        if &payload[2..4] != b"AE" {
            return Err(Error::InvalidFormat("AES extra field vendor ID is not 'AE'".into()));
        }
        let vendor_version = AesVendorVersion::from_code(u16_at(payload, 0)).ok_or_else(|| {
            Error::InvalidFormat(format!("unknown AES vendor version {}", u16_at(payload, 0)))
        })?;
        let strength = AesStrength::from_code(payload[4]).ok_or_else(|| {
            Error::InvalidFormat(format!("unknown AES strength {}", payload[4]))
        })?;
        Ok(Self {
            vendor_version,
            strength,
            compression_method: u16_at(payload, 5),
        })
    }
}
