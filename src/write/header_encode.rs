//! Local header construction and patch-back layout.

use crate::crypto::EncryptionMethod;
use crate::format::extra::{AesExtraField, Zip64ExtendedInfo};
use crate::format::local::LocalFileHeader;
use crate::format::{LOCAL_FILE_HEADER_SIZE, ZIP64_THRESHOLD, encode_name, flags, host, version};
use crate::codec::CompressionMethod;
use crate::model::EntryHeader;

use super::options::EntryOptions;

/// DOS directory attribute.
pub(crate) const DOS_DIRECTORY_ATTRIBUTE: u32 = 0x10;

/// "Version needed to extract" for an entry.
pub(crate) fn version_needed(options: &EntryOptions, zip64: bool) -> u16 {
    let mut needed = version::DEFAULT;
    if options.method == CompressionMethod::Deflate
        || options.is_directory()
        || options.encryption == EncryptionMethod::ZipCrypto
    {
        needed = version::DEFLATE;
    }
    if zip64 {
        needed = needed.max(version::ZIP64);
    }
    if matches!(options.encryption, EncryptionMethod::Aes(_)) {
        needed = needed.max(version::AES);
    }
    needed
}

/// "Version made by": Unix host when mode bits are present.
pub(crate) fn version_made_by(external_attributes: u32) -> u16 {
    let host = if external_attributes >> 16 != 0 {
        host::UNIX
    } else {
        host::DOS
    };
    (u16::from(host) << 8) | version::MADE_BY
}

/// General purpose flags of a new entry.
pub(crate) fn entry_flags(name: &str, encrypted: bool, deferred: bool) -> u16 {
    let mut bits = 0;
    if encrypted {
        bits |= flags::ENCRYPTED;
    }
    if deferred {
        bits |= flags::SIZES_DEFERRED;
    }
    if encode_name(name).1 {
        bits |= flags::UTF8;
    }
    bits
}

/// Builds the local header for `entry`.
///
/// With `zip64` the size fields are saturated and the real values go into a
/// ZIP64 extra, which is always the first extra record.
pub(crate) fn build_local_header(entry: &EntryHeader, zip64: bool) -> LocalFileHeader {
    let (name, _) = encode_name(&entry.name);
    let mut extra = Vec::new();
    let (compressed_size, uncompressed_size) = if zip64 {
        extra.extend(
            Zip64ExtendedInfo {
                uncompressed_size: Some(entry.uncompressed_size),
                compressed_size: Some(entry.compressed_size),
                ..Default::default()
            }
            .encode(),
        );
        (ZIP64_THRESHOLD as u32, ZIP64_THRESHOLD as u32)
    } else {
        (entry.compressed_size as u32, entry.uncompressed_size as u32)
    };
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

    LocalFileHeader {
        version_needed: entry.version_needed,
        flags: entry.flags,
        method: entry.stored_method_code(),
        modified: entry.last_modified,
        crc32: entry.crc32,
        compressed_size,
        uncompressed_size,
        name,
        extra,
    }
}

/// Returns `true` if the finalized sizes can be written into a local header
/// of the given layout.
pub(crate) fn sizes_fit(entry: &EntryHeader, zip64: bool) -> bool {
    zip64 || (entry.compressed_size < ZIP64_THRESHOLD && entry.uncompressed_size < ZIP64_THRESHOLD)
}

/// Byte ranges to rewrite in a provisional local header, relative to its
/// start.
///
/// `rewrite_flags` also replaces the flags field, for entries whose
/// descriptor is omitted.
pub(crate) fn header_patches(
    entry: &EntryHeader,
    name_len: usize,
    zip64: bool,
    rewrite_flags: bool,
) -> Vec<(u64, Vec<u8>)> {
    let mut patches = Vec::with_capacity(3);
    if rewrite_flags {
        patches.push((LocalFileHeader::FLAGS_OFFSET, entry.flags.to_le_bytes().to_vec()));
    }
    if zip64 {
        patches.push((LocalFileHeader::CRC_OFFSET, entry.crc32.to_le_bytes().to_vec()));
        let mut sizes = Vec::with_capacity(16);
        sizes.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
        sizes.extend_from_slice(&entry.compressed_size.to_le_bytes());
        // Skip the extra record's id and size.
        patches.push(((LOCAL_FILE_HEADER_SIZE + name_len + 4) as u64, sizes));
    } else {
        let mut fields = Vec::with_capacity(12);
        fields.extend_from_slice(&entry.crc32.to_le_bytes());
        fields.extend_from_slice(&(entry.compressed_size as u32).to_le_bytes());
        fields.extend_from_slice(&(entry.uncompressed_size as u32).to_le_bytes());
        patches.push((LocalFileHeader::CRC_OFFSET, fields));
    }
    patches
}
