//! In-memory description of one archive.
//!
//! [`ArchiveMetadata`] owns the entry records, the volume configuration and
//! the end-of-archive record. The write path appends finalized
//! [`EntryHeader`]s and replaces the end record when the archive is
//! finished; the read path only looks entries up.

use std::path::PathBuf;

use crate::codec::CompressionMethod;
use crate::crypto::{AesVendorVersion, EncryptionMethod};
use crate::format::{AES_METHOD_CODE, flags};
use crate::timestamp::DosDateTime;
use crate::volume::VolumeConfig;
use crate::Result;

/// One archive member as recorded in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry name; directories end with `/`.
    pub name: String,
    /// Compression method code applied to the payload.
    ///
    /// For AES entries this is the method from the AES extra field, not 99.
    pub method: u16,
    /// Encryption applied after compression.
    pub encryption: EncryptionMethod,
    /// AES format revision; only meaningful for AES entries.
    pub aes_version: AesVendorVersion,
    /// General purpose bit flags.
    pub flags: u16,
    /// CRC-32 of the uncompressed data (0 for AE-2 entries).
    pub crc32: u32,
    /// Stored size, cipher framing included.
    pub compressed_size: u64,
    /// Size before compression.
    pub uncompressed_size: u64,
    /// Last-modified time.
    pub last_modified: DosDateTime,
    /// Internal file attributes.
    pub internal_attributes: u16,
    /// External file attributes (Unix mode in the upper 16 bits when the
    /// host is Unix).
    pub external_attributes: u32,
    /// "Version made by" field.
    pub version_made_by: u16,
    /// "Version needed to extract" field.
    pub version_needed: u16,
    /// Volume holding the local header.
    pub volume: u32,
    /// Offset of the local header within its volume.
    pub local_header_offset: u64,
}

impl EntryHeader {
    /// Returns `true` if the entry is a directory.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || self.name.ends_with('\\')
    }

    /// Returns `true` if the entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.flags & flags::ENCRYPTED != 0
    }

    /// Returns `true` if the local header deferred CRC and sizes to a data
    /// descriptor.
    pub fn sizes_deferred(&self) -> bool {
        self.flags & flags::SIZES_DEFERRED != 0
    }

    /// The compression method, if this build knows it.
    pub fn compression_method(&self) -> Option<CompressionMethod> {
        CompressionMethod::from_code(self.method)
    }

    /// Method code as it appears in the headers.
    pub fn stored_method_code(&self) -> u16 {
        match self.encryption {
            EncryptionMethod::Aes(_) => AES_METHOD_CODE,
            _ => self.method,
        }
    }

    /// Returns `true` if the stored CRC is meaningful.
    ///
    /// AE-2 entries store zero and rely on the authentication code.
    pub fn has_crc(&self) -> bool {
        !matches!(
            (self.encryption, self.aes_version),
            (EncryptionMethod::Aes(_), AesVendorVersion::Ae2)
        )
    }

    /// The Unix mode bits, if the entry was made on a Unix host.
    pub fn unix_mode(&self) -> Option<u32> {
        if self.version_made_by >> 8 == u16::from(crate::format::host::UNIX) {
            Some(self.external_attributes >> 16)
        } else {
            None
        }
    }
}

/// End-of-archive record in its 64-bit form.
///
/// On disk this is the end of central directory record, plus the ZIP64 end
/// record and locator when any value overflows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndOfArchiveRecord {
    /// Volume holding the end record (the last volume).
    pub disk_number: u32,
    /// Volume where the central directory starts.
    pub cd_disk: u32,
    /// Central directory entries on the last volume.
    pub entries_on_disk: u64,
    /// Central directory entries in total.
    pub total_entries: u64,
    /// Size of the central directory in bytes.
    pub cd_size: u64,
    /// Offset of the central directory within `cd_disk`.
    pub cd_offset: u64,
    /// Archive comment.
    pub comment: Vec<u8>,
}

/// Structural state of one archive.
#[derive(Debug, Clone)]
pub struct ArchiveMetadata {
    config: VolumeConfig,
    entries: Vec<EntryHeader>,
    end_record: EndOfArchiveRecord,
    existing: bool,
}

impl ArchiveMetadata {
    /// Describes a new, empty archive at `path`.
    ///
    /// `split_size` enables split output with the given volume limit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSplitSize`] if the limit is below
    /// [`crate::volume::MIN_SPLIT_SIZE`].
    pub fn create(path: impl Into<PathBuf>, split_size: Option<u64>) -> Result<Self> {
        let config = match split_size {
            Some(size) => VolumeConfig::split(path, size)?,
            None => VolumeConfig::single(path),
        };
        Ok(Self::from_config(config))
    }

    /// Describes a new, empty archive with an explicit volume configuration.
    pub fn from_config(config: VolumeConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            end_record: EndOfArchiveRecord::default(),
            existing: false,
        }
    }

    pub(crate) fn from_parts(config: VolumeConfig, entries: Vec<EntryHeader>, end_record: EndOfArchiveRecord) -> Self {
        Self {
            config,
            entries,
            end_record,
            existing: true,
        }
    }

    /// The volume configuration.
    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// All entries in central directory order.
    pub fn entries(&self) -> &[EntryHeader] {
        &self.entries
    }

    /// Looks an entry up by name.
    pub fn entry(&self, name: &str) -> Option<&EntryHeader> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The end-of-archive record.
    ///
    /// For a new archive this is all zeros until the writer finishes.
    pub fn end_record(&self) -> &EndOfArchiveRecord {
        &self.end_record
    }

    /// Returns `true` if the archive was read from disk rather than created.
    pub fn is_existing(&self) -> bool {
        self.existing
    }

    /// Returns `true` if the archive spans, or may span, several volumes.
    pub fn is_split(&self) -> bool {
        self.config.is_split() || self.end_record.disk_number > 0
    }

    /// Number of volume files.
    pub fn volume_count(&self) -> u32 {
        self.end_record.disk_number + 1
    }

    pub(crate) fn push_entry(&mut self, entry: EntryHeader) {
        self.entries.push(entry);
    }

    pub(crate) fn set_end_record(&mut self, record: EndOfArchiveRecord) {
        self.end_record = record;
        self.existing = true;
    }
}
