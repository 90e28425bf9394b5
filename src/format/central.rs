//! Central directory and end-of-archive records.
//!
//! ```text
//! central directory header (46 bytes + name + extra + comment)
//!   0  signature            u32  0x02014b50
//!   4  version made by      u16
//!   6  version needed       u16
//!   8  flags                u16
//!  10  method               u16
//!  12  DOS time             u16
//!  14  DOS date             u16
//!  16  CRC-32               u32
//!  20  compressed size      u32
//!  24  uncompressed size    u32
//!  28  name length          u16
//!  30  extra length         u16
//!  32  comment length       u16
//!  34  disk number start    u16
//!  36  internal attributes  u16
//!  38  external attributes  u32
//!  42  local header offset  u32
//! ```

use std::io::{Read, Seek, SeekFrom};

use super::extra::{AesExtraField, Zip64ExtendedInfo, find_extra};
use super::reader::{read_bytes, read_u16_le, read_u32_le, read_u64_le, u16_at, u32_at};
use super::{
    AES_METHOD_CODE, CENTRAL_DIRECTORY_HEADER_SIZE, CENTRAL_DIRECTORY_SIGNATURE,
    END_OF_CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIZE, MAX_COMMENT_SIZE,
    ZIP64_COUNT_THRESHOLD, ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE, ZIP64_LOCATOR_SIGNATURE, ZIP64_LOCATOR_SIZE,
    ZIP64_THRESHOLD, decode_name, encode_name, extra_id, flags, version,
};
use crate::crypto::{AesVendorVersion, EncryptionMethod};
use crate::model::{EndOfArchiveRecord, EntryHeader};
use crate::timestamp::DosDateTime;
use crate::{Error, Result};

/// Builds the ZIP64 extra for the values that overflow their central
/// directory fields.
fn central_zip64_info(entry: &EntryHeader) -> Zip64ExtendedInfo {
    let overflow = |v: u64| (v >= ZIP64_THRESHOLD).then_some(v);
    Zip64ExtendedInfo {
        uncompressed_size: overflow(entry.uncompressed_size),
        compressed_size: overflow(entry.compressed_size),
        local_header_offset: overflow(entry.local_header_offset),
        disk_start: (u64::from(entry.volume) >= ZIP64_COUNT_THRESHOLD).then_some(entry.volume),
    }
}

fn clamp32(value: u64) -> u32 {
    if value >= ZIP64_THRESHOLD {
        ZIP64_THRESHOLD as u32
    } else {
        value as u32
    }
}

/// Encodes the central directory header of an entry.
pub fn encode_central_header(entry: &EntryHeader) -> Vec<u8> {
    let (name, _) = encode_name(&entry.name);
    let zip64 = central_zip64_info(entry);

    let mut extra = Vec::new();
    if !zip64.is_empty() {
        extra.extend(zip64.encode());
    }
    if let EncryptionMethod::Aes(strength) = entry.encryption {
        extra.extend(
            AesExtraField {
                vendor_version: entry.aes_version,
                strength,
                compression_method: entry.method,
            }
            .encode(),
        );
    }

    let mut version_needed = entry.version_needed;
    if !zip64.is_empty() {
        version_needed = version_needed.max(version::ZIP64);
    }
    let disk_start = if zip64.disk_start.is_some() {
        ZIP64_COUNT_THRESHOLD as u16
    } else {
        entry.volume as u16
    };

    let mut out = Vec::with_capacity(CENTRAL_DIRECTORY_HEADER_SIZE + name.len() + extra.len());
    out.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&entry.version_made_by.to_le_bytes());
    out.extend_from_slice(&version_needed.to_le_bytes());
    out.extend_from_slice(&entry.flags.to_le_bytes());
    out.extend_from_slice(&entry.stored_method_code().to_le_bytes());
    out.extend_from_slice(&entry.last_modified.time().to_le_bytes());
    out.extend_from_slice(&entry.last_modified.date().to_le_bytes());
    out.extend_from_slice(&entry.crc32.to_le_bytes());
    out.extend_from_slice(&clamp32(entry.compressed_size).to_le_bytes());
    out.extend_from_slice(&clamp32(entry.uncompressed_size).to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&disk_start.to_le_bytes());
    out.extend_from_slice(&entry.internal_attributes.to_le_bytes());
    out.extend_from_slice(&entry.external_attributes.to_le_bytes());
    out.extend_from_slice(&clamp32(entry.local_header_offset).to_le_bytes());
    out.extend_from_slice(&name);
    out.extend_from_slice(&extra);
    out
}

/// Parses one central directory header.
///
/// `offset` is only used for error reporting.
pub fn parse_central_header<R: Read>(r: &mut R, offset: u64) -> Result<EntryHeader> {
    let signature = read_u32_le(r)?;
    if signature != CENTRAL_DIRECTORY_SIGNATURE {
        return Err(Error::corrupt_header(
            offset,
            format!("expected central directory signature, found {:#010x}", signature),
        ));
    }
    let version_made_by = read_u16_le(r)?;
    let version_needed = read_u16_le(r)?;
    let entry_flags = read_u16_le(r)?;
    let stored_method = read_u16_le(r)?;
    let time = read_u16_le(r)?;
    let date = read_u16_le(r)?;
    let crc32 = read_u32_le(r)?;
    let compressed_size = read_u32_le(r)?;
    let uncompressed_size = read_u32_le(r)?;
    let name_len = read_u16_le(r)? as usize;
    let extra_len = read_u16_le(r)? as usize;
    let comment_len = read_u16_le(r)? as usize;
    let disk_start = read_u16_le(r)?;
    let internal_attributes = read_u16_le(r)?;
    let external_attributes = read_u32_le(r)?;
    let local_header_offset = read_u32_le(r)?;
    let name = read_bytes(r, name_len)?;
    let extra = read_bytes(r, extra_len)?;
    let _comment = read_bytes(r, comment_len)?;

    let mut entry = EntryHeader {
        name: decode_name(&name),
        method: stored_method,
        encryption: EncryptionMethod::None,
        aes_version: AesVendorVersion::default(),
        flags: entry_flags,
        crc32,
        compressed_size: u64::from(compressed_size),
        uncompressed_size: u64::from(uncompressed_size),
        last_modified: DosDateTime::from_parts(date, time),
        internal_attributes,
        external_attributes,
        version_made_by,
        version_needed,
        volume: u32::from(disk_start),
        local_header_offset: u64::from(local_header_offset),
    };

    let needs_zip64 = [
        u64::from(uncompressed_size) == ZIP64_THRESHOLD,
        u64::from(compressed_size) == ZIP64_THRESHOLD,
        u64::from(local_header_offset) == ZIP64_THRESHOLD,
        u64::from(disk_start) == ZIP64_COUNT_THRESHOLD,
    ];
    if needs_zip64.iter().any(|&b| b) {
        let payload = find_extra(&extra, extra_id::ZIP64).ok_or_else(|| {
            Error::corrupt_header(offset, format!("entry '{}' lacks its ZIP64 extra field", entry.name))
        })?;
        let info = Zip64ExtendedInfo::parse(payload, needs_zip64[0], needs_zip64[1], needs_zip64[2], needs_zip64[3])?;
        if let Some(v) = info.uncompressed_size {
            entry.uncompressed_size = v;
        }
        if let Some(v) = info.compressed_size {
            entry.compressed_size = v;
        }
        if let Some(v) = info.local_header_offset {
            entry.local_header_offset = v;
        }
        if let Some(v) = info.disk_start {
            entry.volume = v;
        }
    }

    if entry_flags & flags::ENCRYPTED != 0 {
        if stored_method == AES_METHOD_CODE {
            let payload = find_extra(&extra, extra_id::AES).ok_or_else(|| {
                Error::corrupt_header(offset, format!("AES entry '{}' lacks its AES extra field", entry.name))
            })?;
            let aes = AesExtraField::parse(payload)?;
            entry.encryption = EncryptionMethod::Aes(aes.strength);
            entry.aes_version = aes.vendor_version;
            entry.method = aes.compression_method;
        } else {
            entry.encryption = EncryptionMethod::ZipCrypto;
        }
    }

    Ok(entry)
}

/// End of central directory record (`0x06054b50`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this volume.
    pub disk_number: u16,
    /// Volume where the central directory starts.
    pub cd_disk: u16,
    /// Entries on this volume.
    pub entries_on_disk: u16,
    /// Entries in total.
    pub total_entries: u16,
    /// Central directory size.
    pub cd_size: u32,
    /// Central directory offset within `cd_disk`.
    pub cd_offset: u32,
    /// Archive comment.
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Encodes the record.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(END_OF_CENTRAL_DIRECTORY_SIZE + self.comment.len());
        out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.cd_disk.to_le_bytes());
        out.extend_from_slice(&self.entries_on_disk.to_le_bytes());
        out.extend_from_slice(&self.total_entries.to_le_bytes());
        out.extend_from_slice(&self.cd_size.to_le_bytes());
        out.extend_from_slice(&self.cd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }

    /// Parses the record from a slice starting at its signature.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < END_OF_CENTRAL_DIRECTORY_SIZE {
            return Err(Error::InvalidFormat("end of central directory record truncated".into()));
        }
        if u32_at(data, 0) != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(Error::InvalidFormat("bad end of central directory signature".into()));
        }
        let comment_len = u16_at(data, 20) as usize;
        let comment_end = (END_OF_CENTRAL_DIRECTORY_SIZE + comment_len).min(data.len());
        Ok(Self {
            disk_number: u16_at(data, 4),
            cd_disk: u16_at(data, 6),
            entries_on_disk: u16_at(data, 8),
            total_entries: u16_at(data, 10),
            cd_size: u32_at(data, 12),
            cd_offset: u32_at(data, 16),
            comment: data[END_OF_CENTRAL_DIRECTORY_SIZE..comment_end].to_vec(),
        })
    }

    /// Returns `true` if any field holds its "see ZIP64" marker value.
    pub fn needs_zip64(&self) -> bool {
        u64::from(self.disk_number) == ZIP64_COUNT_THRESHOLD
            || u64::from(self.cd_disk) == ZIP64_COUNT_THRESHOLD
            || u64::from(self.entries_on_disk) == ZIP64_COUNT_THRESHOLD
            || u64::from(self.total_entries) == ZIP64_COUNT_THRESHOLD
            || u64::from(self.cd_size) == ZIP64_THRESHOLD
            || u64::from(self.cd_offset) == ZIP64_THRESHOLD
    }
}

/// ZIP64 end of central directory record (`0x06064b50`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zip64EndOfCentralDirectory {
    /// "Version made by" field.
    pub version_made_by: u16,
    /// "Version needed" field.
    pub version_needed: u16,
    /// Number of this volume.
    pub disk_number: u32,
    /// Volume where the central directory starts.
    pub cd_disk: u32,
    /// Entries on this volume.
    pub entries_on_disk: u64,
    /// Entries in total.
    pub total_entries: u64,
    /// Central directory size.
    pub cd_size: u64,
    /// Central directory offset within `cd_disk`.
    pub cd_offset: u64,
}

impl Zip64EndOfCentralDirectory {
    /// Encodes the record without extensible data.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE);
        out.extend_from_slice(&ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&((ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE - 12) as u64).to_le_bytes());
        out.extend_from_slice(&self.version_made_by.to_le_bytes());
        out.extend_from_slice(&self.version_needed.to_le_bytes());
        out.extend_from_slice(&self.disk_number.to_le_bytes());
        out.extend_from_slice(&self.cd_disk.to_le_bytes());
        out.extend_from_slice(&self.entries_on_disk.to_le_bytes());
        out.extend_from_slice(&self.total_entries.to_le_bytes());
        out.extend_from_slice(&self.cd_size.to_le_bytes());
        out.extend_from_slice(&self.cd_offset.to_le_bytes());
        out
    }

    /// Parses the record; extensible data is ignored.
    pub fn parse<R: Read>(r: &mut R) -> Result<Self> {
        if read_u32_le(r)? != ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            return Err(Error::InvalidFormat("bad ZIP64 end of central directory signature".into()));
        }
        let _record_size = read_u64_le(r)?;
        Ok(Self {
            version_made_by: read_u16_le(r)?,
            version_needed: read_u16_le(r)?,
            disk_number: read_u32_le(r)?,
            cd_disk: read_u32_le(r)?,
            entries_on_disk: read_u64_le(r)?,
            total_entries: read_u64_le(r)?,
            cd_size: read_u64_le(r)?,
            cd_offset: read_u64_le(r)?,
        })
    }
}

/// ZIP64 end of central directory locator (`0x07064b50`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64Locator {
    /// Volume holding the ZIP64 end record.
    pub eocd64_disk: u32,
    /// Offset of the ZIP64 end record within that volume.
    pub eocd64_offset: u64,
    /// Total number of volumes.
    pub total_disks: u32,
}

impl Zip64Locator {
    /// Encodes the locator.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ZIP64_LOCATOR_SIZE);
        out.extend_from_slice(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&self.eocd64_disk.to_le_bytes());
        out.extend_from_slice(&self.eocd64_offset.to_le_bytes());
        out.extend_from_slice(&self.total_disks.to_le_bytes());
        out
    }

    /// Parses the locator from a slice, returning `None` if the signature
    /// does not match.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < ZIP64_LOCATOR_SIZE || u32_at(data, 0) != ZIP64_LOCATOR_SIGNATURE {
            return None;
        }
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&data[8..16]);
        Some(Self {
            eocd64_disk: u32_at(data, 4),
            eocd64_offset: u64::from_le_bytes(offset),
            total_disks: u32_at(data, 16),
        })
    }
}

/// Returns `true` if the end record needs the ZIP64 end record and locator.
pub fn end_record_needs_zip64(record: &EndOfArchiveRecord) -> bool {
    u64::from(record.disk_number) >= ZIP64_COUNT_THRESHOLD
        || u64::from(record.cd_disk) >= ZIP64_COUNT_THRESHOLD
        || record.entries_on_disk >= ZIP64_COUNT_THRESHOLD
        || record.total_entries >= ZIP64_COUNT_THRESHOLD
        || record.cd_size >= ZIP64_THRESHOLD
        || record.cd_offset >= ZIP64_THRESHOLD
}

/// Encoded length of the end records for `record`.
pub fn end_records_len(record: &EndOfArchiveRecord) -> usize {
    let zip64 = if end_record_needs_zip64(record) {
        ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE + ZIP64_LOCATOR_SIZE
    } else {
        0
    };
    zip64 + END_OF_CENTRAL_DIRECTORY_SIZE + record.comment.len()
}

/// Encodes the end records: ZIP64 end record and locator when needed, then
/// the end of central directory record.
///
/// `position` is the offset within the last volume where the records start.
pub fn encode_end_records(record: &EndOfArchiveRecord, position: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(end_records_len(record));
    if end_record_needs_zip64(record) {
        out.extend(
            Zip64EndOfCentralDirectory {
                version_made_by: version::MADE_BY,
                version_needed: version::ZIP64,
                disk_number: record.disk_number,
                cd_disk: record.cd_disk,
                entries_on_disk: record.entries_on_disk,
                total_entries: record.total_entries,
                cd_size: record.cd_size,
                cd_offset: record.cd_offset,
            }
            .encode(),
        );
        out.extend(
            Zip64Locator {
                eocd64_disk: record.disk_number,
                eocd64_offset: position,
                total_disks: record.disk_number + 1,
            }
            .encode(),
        );
    }

    let clamp16 = |v: u64| v.min(ZIP64_COUNT_THRESHOLD) as u16;
    out.extend(
        EndOfCentralDirectory {
            disk_number: clamp16(u64::from(record.disk_number)),
            cd_disk: clamp16(u64::from(record.cd_disk)),
            entries_on_disk: clamp16(record.entries_on_disk),
            total_entries: clamp16(record.total_entries),
            cd_size: clamp32(record.cd_size),
            cd_offset: clamp32(record.cd_offset),
            comment: record.comment.clone(),
        }
        .encode(),
    );
    out
}

/// Locates the end of central directory record by scanning backwards.
///
/// Returns the record and its offset. The scan covers the largest possible
/// comment and accepts a candidate only if its comment length reaches the
/// end of the file exactly.
pub fn find_end_of_central_directory<R: Read + Seek>(r: &mut R) -> Result<(EndOfCentralDirectory, u64)> {
    let file_len = r.seek(SeekFrom::End(0))?;
    if file_len < END_OF_CENTRAL_DIRECTORY_SIZE as u64 {
        return Err(Error::InvalidFormat("file too small to be a ZIP archive".into()));
    }

    let search_len = (MAX_COMMENT_SIZE + END_OF_CENTRAL_DIRECTORY_SIZE).min(file_len as usize);
    let search_start = file_len - search_len as u64;
    r.seek(SeekFrom::Start(search_start))?;
    let buf = read_bytes(r, search_len)?;

    for i in (0..=search_len - END_OF_CENTRAL_DIRECTORY_SIZE).rev() {
        if u32_at(&buf, i) != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
            continue;
        }
        let comment_len = u16_at(&buf, i + 20) as usize;
        if comment_len == search_len - i - END_OF_CENTRAL_DIRECTORY_SIZE {
            let record = EndOfCentralDirectory::parse(&buf[i..])?;
            return Ok((record, search_start + i as u64));
        }
    }

    Err(Error::InvalidFormat("end of central directory record not found".into()))
}

/// Reads the ZIP64 locator in front of the end record at `eocd_offset`, if
/// present.
pub fn read_zip64_locator<R: Read + Seek>(r: &mut R, eocd_offset: u64) -> Result<Option<Zip64Locator>> {
    if eocd_offset < ZIP64_LOCATOR_SIZE as u64 {
        return Ok(None);
    }
    r.seek(SeekFrom::Start(eocd_offset - ZIP64_LOCATOR_SIZE as u64))?;
    let buf = read_bytes(r, ZIP64_LOCATOR_SIZE)?;
    Ok(Zip64Locator::parse(&buf))
}
