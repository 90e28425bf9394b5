//! Decrypting, decompressing entry reader.

use std::io::{self, Read};

use crate::checksum::Crc32Reader;
use crate::codec::{EntryDecoder, build_decoder};
use crate::crypto::{DecryptReader, Password, zipcrypto};
use crate::format::flags;
use crate::format::local::LocalFileHeader;
use crate::model::{ArchiveMetadata, EntryHeader};
use crate::volume::VolumeReader;
use crate::{Error, Result};

type Layers = Crc32Reader<EntryDecoder<DecryptReader<io::Take<VolumeReader>>>>;

/// A sequential source over one entry's uncompressed data.
///
/// The stream ends at the declared uncompressed size. On reaching the end it
/// verifies the AES authentication code, the CRC-32 (except for AE-2
/// entries) and the size; a failed check is returned as the final read
/// error and can be recovered with [`Error::from_io`].
///
/// Each stream owns its own volume cursor, so several streams of one archive
/// may be read at the same time.
pub struct EntryStream {
    inner: Layers,
    entry: EntryHeader,
    verified: bool,
}

/// Opens an entry for reading.
///
/// The local header is read and the cipher header is checked before this
/// returns, so a wrong password fails here rather than on the first read.
///
/// # Errors
///
/// - [`Error::PasswordRequired`] if the entry is encrypted and no password
///   was given
/// - [`Error::WrongPassword`] if the cipher header rejects the password
/// - [`Error::UnsupportedMethod`] / [`Error::UnsupportedFeature`] for methods
///   this build cannot read
/// - [`Error::VolumeMissing`] / [`Error::CorruptHeader`] for damaged archives
pub fn open_entry_stream(
    metadata: &ArchiveMetadata,
    entry: &EntryHeader,
    password: Option<&Password>,
) -> Result<EntryStream> {
    if entry.flags & flags::STRONG_ENCRYPTION != 0 {
        return Err(Error::UnsupportedFeature {
            feature: "strong encryption",
        });
    }
    let method = entry
        .compression_method()
        .ok_or(Error::UnsupportedMethod { method: entry.method })?;

    let mut reader = VolumeReader::open(
        metadata.config(),
        metadata.end_record().disk_number,
        entry.volume,
        entry.local_header_offset,
    )?;
    let local = LocalFileHeader::parse(&mut reader, entry.local_header_offset)?;

    let check_byte = zipcrypto::check_byte(
        local.flags & flags::SIZES_DEFERRED != 0,
        entry.crc32,
        local.modified.time(),
    );
    let decrypted = DecryptReader::new(
        reader.take(entry.compressed_size),
        entry.encryption,
        password,
        check_byte,
        entry.compressed_size,
        &entry.name,
    )?;
    let decoder = build_decoder(decrypted, method, entry.uncompressed_size)?;

    log::debug!(
        "Reading entry '{}' ({}, {}) from volume {} offset {}",
        entry.name,
        method,
        entry.encryption,
        entry.volume,
        entry.local_header_offset
    );
    Ok(EntryStream {
        inner: Crc32Reader::new(decoder),
        entry: entry.clone(),
        verified: false,
    })
}

impl EntryStream {
    /// The entry being read.
    pub fn entry(&self) -> &EntryHeader {
        &self.entry
    }

    /// Uncompressed bytes returned so far.
    pub fn bytes_read(&self) -> u64 {
        self.inner.bytes_read()
    }

    fn verify(&mut self) -> Result<()> {
        self.verified = true;
        self.inner.get_mut().drain_input()?;

        let size = self.inner.bytes_read();
        if size != self.entry.uncompressed_size {
            return Err(Error::InvalidFormat(format!(
                "entry '{}' produced {} bytes, expected {}",
                self.entry.name, size, self.entry.uncompressed_size
            )));
        }
        if self.entry.has_crc() && self.inner.crc() != self.entry.crc32 {
            return Err(Error::CrcMismatch {
                entry_name: self.entry.name.clone(),
                expected: self.entry.crc32,
                actual: self.inner.crc(),
            });
        }
        Ok(())
    }
}

impl Read for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.verified || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n == 0 {
            self.verify()?;
        }
        Ok(n)
    }
}

impl std::fmt::Debug for EntryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStream")
            .field("entry", &self.entry.name)
            .field("bytes_read", &self.inner.bytes_read())
            .field("verified", &self.verified)
            .finish()
    }
}
