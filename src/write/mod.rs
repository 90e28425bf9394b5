//! Entry framing writer.
//!
//! [`ArchiveWriter`] streams entries into a [`VolumeSink`]. Each entry goes
//! through the same state machine:
//!
//! ```text
//! Idle --open_entry--> HeaderWritten --write_data--> Streaming
//!   ^                        |                           |
//!   +-------close_entry------+---------close_entry-------+
//! ```
//!
//! and [`ArchiveWriter::finish`] moves the writer to `Closed` after writing
//! the central directory.
//!
//! Data flows through the compression filter, then the encryption filter,
//! then the sink. The CRC-32 is computed over the raw input.
//!
//! When the sizes cannot be known before the data is written, the local
//! header carries the sizes-deferred flag and zeros, and a data descriptor
//! follows the payload. Stored entries that did not cross a volume boundary
//! additionally get their local header corrected in place.
//!
//! # Example
//!
//! ```rust,no_run
//! use spanzip::write::{ArchiveWriter, EntryOptions};
//! use spanzip::ArchiveMetadata;
//!
//! let metadata = ArchiveMetadata::create("out.zip", None)?;
//! let mut writer = ArchiveWriter::create(metadata)?;
//!
//! writer.open_entry(&EntryOptions::new("hello.txt"))?;
//! writer.write_data(b"Hello, World!")?;
//! writer.close_entry()?;
//!
//! let (metadata, _sink) = writer.finish()?;
//! assert_eq!(metadata.len(), 1);
//! # Ok::<(), spanzip::Error>(())
//! ```

mod header_encode;
pub(crate) mod options;
mod writer_init;

pub use options::{DescriptorPolicy, EntryOptions, KnownSizes};

use std::io;

use crate::checksum::Crc32;
use crate::codec::{CompressionFilter, CompressionMethod, EntryFilter};
use crate::crypto::{AesVendorVersion, CipherFilter, EncryptionMethod, zipcrypto};
use crate::format::local::DataDescriptor;
use crate::format::{ZIP64_THRESHOLD, flags};
use crate::model::{ArchiveMetadata, EntryHeader};
use crate::timestamp::DosDateTime;
use crate::volume::VolumeSink;
use crate::{Error, Result};

use header_encode::{
    DOS_DIRECTORY_ATTRIBUTE, build_local_header, entry_flags, header_patches, sizes_fit, version_made_by,
    version_needed,
};

/// State of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Between entries.
    Idle,
    /// An entry's header is written and no data has arrived yet.
    HeaderWritten,
    /// Entry data is being written.
    Streaming,
    /// The archive is finished.
    Closed,
}

/// The entry currently being written.
#[derive(Debug)]
struct OpenEntry {
    header: EntryHeader,
    name_len: usize,
    local_zip64: bool,
    deferred: bool,
    compression: CompressionFilter,
    cipher: CipherFilter,
    crc: Crc32,
    known_sizes: Option<KnownSizes>,
    descriptor_policy: DescriptorPolicy,
}

/// A streaming ZIP writer over a volume sink.
pub struct ArchiveWriter<S: VolumeSink> {
    sink: S,
    metadata: ArchiveMetadata,
    state: WriterState,
    current: Option<OpenEntry>,
    comment: Vec<u8>,
    compressed_buf: Vec<u8>,
    encrypted_buf: Vec<u8>,
}

impl<S: VolumeSink> ArchiveWriter<S> {
    /// The current state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// The archive metadata, including every entry closed so far.
    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Sets the archive comment written with the end record.
    ///
    /// Comments longer than 65535 bytes are truncated.
    pub fn set_comment(&mut self, comment: impl Into<Vec<u8>>) {
        let mut comment = comment.into();
        comment.truncate(crate::format::MAX_COMMENT_SIZE);
        self.comment = comment;
    }

    /// Starts a new entry and writes its local header and cipher header.
    ///
    /// Directory entries are stored unencrypted with an empty payload.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEntryConfiguration`] if the options are invalid, the
    ///   name is already in the archive, or another entry is still open
    /// - [`Error::SinkWriteFailure`] if the sink fails
    pub fn open_entry(&mut self, options: &EntryOptions) -> Result<()> {
        if self.state != WriterState::Idle {
            return Err(Error::invalid_entry(
                &options.name,
                format!("writer is in state {:?}, expected Idle", self.state),
            ));
        }
        check_new_entry(&self.metadata, options)?;
        let options = options.normalized();

        let deferred = !options.sizes_known_upfront();
        let modified = options.last_modified.unwrap_or_else(DosDateTime::now);
        let overhead = options.encryption.overhead();

        let (crc32, compressed_size, uncompressed_size) = match (deferred, options.known_sizes) {
            (false, Some(known)) => {
                let stored_crc = stored_crc(options.encryption, options.aes_version, known.crc32);
                (stored_crc, known.uncompressed_size + overhead, known.uncompressed_size)
            }
            _ => (0, 0, 0),
        };
        let local_zip64 = if deferred {
            options.size_hint.is_some_and(|hint| hint >= ZIP64_THRESHOLD)
        } else {
            compressed_size >= ZIP64_THRESHOLD
        };

        let mut external_attributes = options.external_attributes;
        if options.is_directory() {
            external_attributes |= DOS_DIRECTORY_ATTRIBUTE;
        }

        let mut header = EntryHeader {
            name: options.name.clone(),
            method: options.method.code(),
            encryption: options.encryption,
            aes_version: options.aes_version,
            flags: entry_flags(&options.name, options.encryption.is_encrypted(), deferred),
            crc32,
            compressed_size,
            uncompressed_size,
            last_modified: modified,
            internal_attributes: 0,
            external_attributes,
            version_made_by: version_made_by(external_attributes),
            version_needed: version_needed(&options, local_zip64),
            volume: 0,
            local_header_offset: 0,
        };

        let check_byte = zipcrypto::check_byte(
            deferred,
            options.known_sizes.map_or(0, |k| k.crc32),
            modified.time(),
        );
        let (cipher, cipher_header) = CipherFilter::new(
            options.encryption,
            options.password.as_ref(),
            check_byte,
            &options.nonce_policy,
        )?;
        let compression = CompressionFilter::new(options.method, options.level)?;

        let local = build_local_header(&header, local_zip64);
        let local_bytes = local.encode();
        self.sink
            .ensure_room((local_bytes.len() + cipher_header.len()) as u64)?;
        header.volume = self.sink.current_volume();
        header.local_header_offset = self.sink.volume_position();
        self.sink.write_all(&local_bytes)?;
        self.sink.write_all(&cipher_header)?;

        log::debug!(
            "Opened entry '{}' ({}, {}) at volume {} offset {}{}",
            header.name,
            options.method,
            options.encryption,
            header.volume,
            header.local_header_offset,
            if deferred { ", sizes deferred" } else { "" }
        );

        // From here on the sizes count what has actually been written.
        header.compressed_size = cipher_header.len() as u64;
        header.uncompressed_size = 0;

        self.current = Some(OpenEntry {
            header,
            name_len: local.name.len(),
            local_zip64,
            deferred,
            compression,
            cipher,
            crc: Crc32::new(),
            known_sizes: options.known_sizes,
            descriptor_policy: options.descriptor_policy,
        });
        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Writes entry data.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEntryConfiguration`] if no entry is open or data is
    ///   written to a directory entry
    /// - [`Error::SinkWriteFailure`] if the sink fails
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let entry = match (self.state, self.current.as_mut()) {
            (WriterState::HeaderWritten | WriterState::Streaming, Some(entry)) => entry,
            _ => return Err(Error::invalid_entry("", "no entry is open")),
        };
        if data.is_empty() {
            return Ok(());
        }
        if entry.header.is_directory() {
            return Err(Error::invalid_entry(
                &entry.header.name,
                "directory entries have no payload",
            ));
        }

        entry.crc.update(data);
        entry.header.uncompressed_size += data.len() as u64;

        self.compressed_buf.clear();
        entry.compression.transform(data, &mut self.compressed_buf)?;
        if !self.compressed_buf.is_empty() {
            self.encrypted_buf.clear();
            entry.cipher.transform(&self.compressed_buf, &mut self.encrypted_buf)?;
            self.sink.write_all(&self.encrypted_buf)?;
            entry.header.compressed_size += self.encrypted_buf.len() as u64;
        }
        self.state = WriterState::Streaming;
        Ok(())
    }

    /// Finishes the open entry and records it in the metadata.
    ///
    /// Flushes the compressor, appends the cipher trailer, then either
    /// corrects the local header in place, writes a data descriptor, or both.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEntryConfiguration`] if no entry is open or the data
    ///   does not match sizes declared with
    ///   [`EntryOptions::with_known_sizes`]
    /// - [`Error::SinkWriteFailure`] if the sink fails
    pub fn close_entry(&mut self) -> Result<&EntryHeader> {
        let mut entry = match (self.state, self.current.take()) {
            (WriterState::HeaderWritten | WriterState::Streaming, Some(entry)) => entry,
            (_, current) => {
                self.current = current;
                return Err(Error::invalid_entry("", "no entry is open"));
            }
        };
        // The entry is gone from the writer whatever happens below.
        self.state = WriterState::Idle;

        self.compressed_buf.clear();
        entry.compression.finish(&mut self.compressed_buf)?;
        self.encrypted_buf.clear();
        entry.cipher.transform(&self.compressed_buf, &mut self.encrypted_buf)?;
        entry.cipher.finish(&mut self.encrypted_buf)?;
        self.sink.write_all(&self.encrypted_buf)?;
        entry.header.compressed_size += self.encrypted_buf.len() as u64;

        let crc = entry.crc.finalize();
        if let Some(known) = entry.known_sizes {
            if known.crc32 != crc || known.uncompressed_size != entry.header.uncompressed_size {
                return Err(Error::invalid_entry(
                    &entry.header.name,
                    format!(
                        "data (size {}, CRC {:08x}) does not match the declared size {} and CRC {:08x}",
                        entry.header.uncompressed_size, crc, known.uncompressed_size, known.crc32
                    ),
                ));
            }
        }
        entry.header.crc32 = stored_crc(entry.header.encryption, entry.header.aes_version, crc);

        if entry.deferred {
            self.finalize_deferred(&mut entry)?;
        }

        log::debug!(
            "Closed entry '{}': {} -> {} bytes, CRC {:08x}",
            entry.header.name,
            entry.header.uncompressed_size,
            entry.header.compressed_size,
            entry.header.crc32
        );
        self.metadata.push_entry(entry.header);
        self.metadata
            .entries()
            .last()
            .ok_or_else(|| Error::invalid_entry("", "entry was not recorded"))
    }

    /// Patch-back and descriptor handling for an entry with deferred sizes.
    fn finalize_deferred(&mut self, entry: &mut OpenEntry) -> Result<()> {
        let rolled_over = self.sink.current_volume() != entry.header.volume;
        let can_patch_back = entry.header.method == CompressionMethod::Store.code()
            && !rolled_over
            && sizes_fit(&entry.header, entry.local_zip64);

        let omit_descriptor = can_patch_back
            && entry.descriptor_policy == DescriptorPolicy::OmitAfterPatchback
            && entry.header.encryption != EncryptionMethod::ZipCrypto;

        if can_patch_back {
            if omit_descriptor {
                entry.header.flags &= !flags::SIZES_DEFERRED;
            }
            for (relative, bytes) in
                header_patches(&entry.header, entry.name_len, entry.local_zip64, omit_descriptor)
            {
                self.sink.patch_back(
                    entry.header.volume,
                    entry.header.local_header_offset + relative,
                    &bytes,
                )?;
            }
            log::debug!(
                "Patched local header of '{}'{}",
                entry.header.name,
                if omit_descriptor { " and omitted its descriptor" } else { "" }
            );
        } else if rolled_over && entry.header.method == CompressionMethod::Store.code() {
            log::debug!(
                "Entry '{}' spans volumes {}..={}; the data descriptor is authoritative",
                entry.header.name,
                entry.header.volume,
                self.sink.current_volume()
            );
        }

        if !omit_descriptor {
            let descriptor = DataDescriptor {
                crc32: entry.header.crc32,
                compressed_size: entry.header.compressed_size,
                uncompressed_size: entry.header.uncompressed_size,
            };
            self.sink.write_all(&descriptor.encode())?;
        }
        Ok(())
    }
}

/// Checks that `options` describe an entry that may be added to `metadata`.
pub(crate) fn check_new_entry(metadata: &ArchiveMetadata, options: &EntryOptions) -> Result<()> {
    options.validate()?;
    if metadata.entry(&options.name).is_some() {
        return Err(Error::invalid_entry(&options.name, "an entry with this name already exists"));
    }
    Ok(())
}

/// CRC value stored in the headers; AE-2 stores zero.
fn stored_crc(encryption: EncryptionMethod, aes_version: AesVendorVersion, crc: u32) -> u32 {
    match (encryption, aes_version) {
        (EncryptionMethod::Aes(_), AesVendorVersion::Ae2) => 0,
        _ => crc,
    }
}

impl<S: VolumeSink> io::Write for ArchiveWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_data(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: VolumeSink> std::fmt::Debug for ArchiveWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("state", &self.state)
            .field("entries", &self.metadata.len())
            .field("current", &self.current.as_ref().map(|e| &e.header.name))
            .finish_non_exhaustive()
    }
}
