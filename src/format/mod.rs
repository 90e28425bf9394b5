//! ZIP format constants, record layouts, and low-level parsing utilities.
//!
//! All multi-byte integers in ZIP records are little-endian. The records
//! implemented here are:
//!
//! | Record | Signature | Module |
//! |--------|-----------|--------|
//! | Local file header | `0x04034b50` | [`local`] |
//! | Data descriptor | `0x08074b50` | [`local`] |
//! | Central directory header | `0x02014b50` | [`central`] |
//! | End of central directory | `0x06054b50` | [`central`] |
//! | ZIP64 end of central directory | `0x06064b50` | [`central`] |
//! | ZIP64 end of central directory locator | `0x07064b50` | [`central`] |

pub mod central;
pub mod extra;
pub mod local;
pub mod reader;

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory file header signature (`PK\x01\x02`).
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;

/// Data descriptor signature (`PK\x07\x08`).
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Marker written as the first four bytes of volume 0 of a split archive.
///
/// Shares its value with the data descriptor signature.
pub const SPLIT_ARCHIVE_MARKER: u32 = 0x0807_4b50;

/// End of central directory signature (`PK\x05\x06`).
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// ZIP64 end of central directory record signature (`PK\x06\x06`).
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0606_4b50;

/// ZIP64 end of central directory locator signature (`PK\x06\x07`).
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;

/// Fixed part of a local file header.
pub const LOCAL_FILE_HEADER_SIZE: usize = 30;

/// Fixed part of a central directory header.
pub const CENTRAL_DIRECTORY_HEADER_SIZE: usize = 46;

/// Fixed part of the end of central directory record.
pub const END_OF_CENTRAL_DIRECTORY_SIZE: usize = 22;

/// Size of the ZIP64 end of central directory record (without extensible data).
pub const ZIP64_END_OF_CENTRAL_DIRECTORY_SIZE: usize = 56;

/// Size of the ZIP64 end of central directory locator.
pub const ZIP64_LOCATOR_SIZE: usize = 20;

/// Largest value a 32-bit size or offset field can hold without ZIP64.
///
/// A field equal to this value means "see the ZIP64 extra field".
pub const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Largest entry count / disk number a 16-bit field can hold without ZIP64.
pub const ZIP64_COUNT_THRESHOLD: u64 = 0xFFFF;

/// Maximum archive comment length.
pub const MAX_COMMENT_SIZE: usize = 0xFFFF;

/// Method code stored in headers of WinZip AES encrypted entries.
pub const AES_METHOD_CODE: u16 = 99;

/// General purpose bit flags.
pub mod flags {
    /// Bit 0: the entry is encrypted.
    pub const ENCRYPTED: u16 = 1 << 0;
    /// Bit 3: CRC and sizes are zero in the local header and follow the
    /// payload in a data descriptor.
    pub const SIZES_DEFERRED: u16 = 1 << 3;
    /// Bit 6: strong encryption (not supported).
    pub const STRONG_ENCRYPTION: u16 = 1 << 6;
    /// Bit 11: the name is UTF-8 encoded.
    pub const UTF8: u16 = 1 << 11;
}

/// "Version needed to extract" values.
pub mod version {
    /// Stored entries without extensions.
    pub const DEFAULT: u16 = 10;
    /// Deflate, directories, and ZipCrypto.
    pub const DEFLATE: u16 = 20;
    /// ZIP64 extensions.
    pub const ZIP64: u16 = 45;
    /// WinZip AES encryption.
    pub const AES: u16 = 51;
    /// Specification version written in "version made by".
    pub const MADE_BY: u16 = 51;
}

/// Host system byte of "version made by".
pub mod host {
    /// MS-DOS and compatible attributes.
    pub const DOS: u8 = 0;
    /// Unix mode bits in the upper 16 bits of the external attributes.
    pub const UNIX: u8 = 3;
}

/// Extra field header IDs.
pub mod extra_id {
    /// ZIP64 extended information.
    pub const ZIP64: u16 = 0x0001;
    /// WinZip AES encryption information.
    pub const AES: u16 = 0x9901;
}

/// Encodes a name for a header, returning the bytes and whether the UTF-8
/// flag is required.
pub fn encode_name(name: &str) -> (Vec<u8>, bool) {
    (name.as_bytes().to_vec(), !name.is_ascii())
}

/// Decodes a header name. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
