//! Per-entry write options.

use crate::codec::CompressionMethod;
use crate::crypto::{AesStrength, AesVendorVersion, EncryptionMethod, NoncePolicy, Password};
use crate::timestamp::DosDateTime;
use crate::{Error, Result};

/// Whether a data descriptor follows an entry whose local header was
/// corrected in place.
///
/// A patched header already carries the final CRC and sizes, so the
/// descriptor is redundant. Some readers still expect one whenever the
/// sizes-deferred flag was set when the entry started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DescriptorPolicy {
    /// Keep the sizes-deferred flag and always write the descriptor.
    #[default]
    Always,
    /// Clear the sizes-deferred flag during the patch and skip the
    /// descriptor.
    ///
    /// Not applied to ZipCrypto entries, whose check byte was derived from
    /// the timestamp because the flag was set.
    OmitAfterPatchback,
}

/// CRC and size of the data, declared before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownSizes {
    /// Uncompressed size in bytes.
    pub uncompressed_size: u64,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
}

/// Options for one archive entry.
///
/// # Example
///
/// ```rust
/// use spanzip::write::EntryOptions;
/// use spanzip::{AesStrength, CompressionMethod, EncryptionMethod};
///
/// let options = EntryOptions::new("docs/report.txt")
///     .method(CompressionMethod::Deflate)
///     .level(9)
///     .encryption(EncryptionMethod::Aes(AesStrength::Aes256))
///     .password("secret");
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct EntryOptions {
    /// Entry name. Names ending in `/` or `\` are directories.
    pub name: String,
    /// Compression method.
    pub method: CompressionMethod,
    /// Compression level (0-9).
    pub level: u32,
    /// Encryption method.
    pub encryption: EncryptionMethod,
    /// Password, required when encrypting.
    pub password: Option<Password>,
    /// WinZip AES revision.
    pub aes_version: AesVendorVersion,
    /// Source of salts and cipher header bytes.
    pub nonce_policy: NoncePolicy,
    /// Last-modified time; the current time when unset.
    pub last_modified: Option<DosDateTime>,
    /// External attributes. Unix mode bits go in the upper 16 bits.
    pub external_attributes: u32,
    /// Descriptor handling after a successful patch-back.
    pub descriptor_policy: DescriptorPolicy,
    /// Whether CRC and sizes may be deferred to a data descriptor.
    ///
    /// Stream sources always defer. File tasks that turn this off compute the
    /// CRC before writing stored entries.
    pub write_data_descriptor: bool,
    /// Expected uncompressed size; a hint above 4 GiB adds a ZIP64 extra to
    /// the local header.
    pub size_hint: Option<u64>,
    /// Declared CRC and size, letting stored entries skip the descriptor.
    pub known_sizes: Option<KnownSizes>,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            method: CompressionMethod::Deflate,
            level: 6,
            encryption: EncryptionMethod::None,
            password: None,
            aes_version: AesVendorVersion::default(),
            nonce_policy: NoncePolicy::default(),
            last_modified: None,
            external_attributes: 0,
            descriptor_policy: DescriptorPolicy::default(),
            write_data_descriptor: true,
            size_hint: None,
            known_sizes: None,
        }
    }
}

impl std::fmt::Debug for EntryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryOptions")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("level", &self.level)
            .field("encryption", &self.encryption)
            .field("has_password", &self.password.is_some())
            .field("aes_version", &self.aes_version)
            .field("descriptor_policy", &self.descriptor_policy)
            .field("write_data_descriptor", &self.write_data_descriptor)
            .field("size_hint", &self.size_hint)
            .field("known_sizes", &self.known_sizes)
            .finish_non_exhaustive()
    }
}

impl EntryOptions {
    /// Creates options for an entry with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the compression method.
    pub fn method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the compression level, clamping values above 9.
    pub fn level(mut self, level: u32) -> Self {
        self.level = level.min(9);
        self
    }

    /// Sets the encryption method.
    pub fn encryption(mut self, encryption: EncryptionMethod) -> Self {
        self.encryption = encryption;
        self
    }

    /// Shorthand for WinZip AES with the given strength.
    pub fn aes(self, strength: AesStrength) -> Self {
        self.encryption(EncryptionMethod::Aes(strength))
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the AES revision.
    pub fn aes_version(mut self, version: AesVendorVersion) -> Self {
        self.aes_version = version;
        self
    }

    /// Sets the nonce policy.
    pub fn nonce_policy(mut self, policy: NoncePolicy) -> Self {
        self.nonce_policy = policy;
        self
    }

    /// Sets the last-modified time.
    pub fn last_modified(mut self, time: DosDateTime) -> Self {
        self.last_modified = Some(time);
        self
    }

    /// Sets the external attributes.
    pub fn external_attributes(mut self, attributes: u32) -> Self {
        self.external_attributes = attributes;
        self
    }

    /// Sets Unix mode bits (stored in the upper 16 bits of the external
    /// attributes).
    pub fn unix_mode(mut self, mode: u32) -> Self {
        self.external_attributes = (self.external_attributes & 0xFFFF) | (mode << 16);
        self
    }

    /// Sets the descriptor policy.
    pub fn descriptor_policy(mut self, policy: DescriptorPolicy) -> Self {
        self.descriptor_policy = policy;
        self
    }

    /// Allows or forbids deferring CRC and sizes to a data descriptor.
    pub fn write_data_descriptor(mut self, enabled: bool) -> Self {
        self.write_data_descriptor = enabled;
        self
    }

    /// Sets the expected uncompressed size.
    pub fn size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }

    /// Declares the CRC and size of the data ahead of time.
    pub fn with_known_sizes(mut self, uncompressed_size: u64, crc32: u32) -> Self {
        self.known_sizes = Some(KnownSizes {
            uncompressed_size,
            crc32,
        });
        self
    }

    /// Returns `true` if the entry is a directory.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || self.name.ends_with('\\')
    }

    /// Returns `true` if the local header will carry the final CRC and sizes.
    ///
    /// Only stored entries with declared sizes qualify; for anything else
    /// the compressed size is unknown until the data has been written.
    pub fn sizes_known_upfront(&self) -> bool {
        self.is_directory() || (self.method == CompressionMethod::Store && self.known_sizes.is_some())
    }

    /// Returns a copy adjusted for directory entries: stored, unencrypted,
    /// empty.
    pub(crate) fn normalized(&self) -> Self {
        let mut options = self.clone();
        if options.is_directory() {
            if options.encryption.is_encrypted() {
                log::debug!("Directory entry '{}' is written unencrypted", options.name);
            }
            options.method = CompressionMethod::Store;
            options.encryption = EncryptionMethod::None;
            options.known_sizes = Some(KnownSizes {
                uncompressed_size: 0,
                crc32: 0,
            });
        }
        options
    }

    /// Checks the options without touching any output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntryConfiguration`] for an empty name, a
    /// method or cipher this build lacks, or encryption without a password.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_entry(&self.name, "entry name is empty"));
        }
        if self.name.len() > u16::MAX as usize {
            return Err(Error::invalid_entry(&self.name, "entry name is longer than 65535 bytes"));
        }
        if self.is_directory() {
            return Ok(());
        }
        if !self.method.is_available() {
            return Err(Error::invalid_entry(
                &self.name,
                format!("compression method {} is not available in this build", self.method),
            ));
        }
        if !self.encryption.is_available() {
            return Err(Error::invalid_entry(
                &self.name,
                format!("encryption {} is not available in this build", self.encryption),
            ));
        }
        if self.encryption.is_encrypted() && self.password.as_ref().is_none_or(Password::is_empty) {
            return Err(Error::invalid_entry(
                &self.name,
                format!("{} encryption requires a password", self.encryption),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EntryOptions::new("a.txt");
        assert_eq!(options.method, CompressionMethod::Deflate);
        assert_eq!(options.level, 6);
        assert_eq!(options.descriptor_policy, DescriptorPolicy::Always);
        assert_eq!(options.aes_version, AesVendorVersion::Ae2);
        assert!(options.write_data_descriptor);
        assert!(!options.sizes_known_upfront());
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(EntryOptions::new("a").level(15).level, 9);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = EntryOptions::new("").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidEntryConfiguration { .. }));
    }

    #[test]
    fn test_encryption_requires_password() {
        let options = EntryOptions::new("a").encryption(EncryptionMethod::ZipCrypto);
        assert!(options.validate().is_err());
        assert!(options.clone().password("").validate().is_err());
        assert!(options.password("pw").validate().is_ok());
    }

    #[test]
    fn test_directory_normalized() {
        let options = EntryOptions::new("dir/")
            .encryption(EncryptionMethod::ZipCrypto)
            .method(CompressionMethod::Deflate);
        assert!(options.validate().is_ok(), "directories need no password");
        let normalized = options.normalized();
        assert_eq!(normalized.method, CompressionMethod::Store);
        assert_eq!(normalized.encryption, EncryptionMethod::None);
        assert!(normalized.sizes_known_upfront());
    }

    #[test]
    fn test_known_sizes_only_upfront_for_store() {
        let options = EntryOptions::new("a").with_known_sizes(13, 0xEC4AC3D0);
        assert!(!options.sizes_known_upfront());
        assert!(options.method(CompressionMethod::Store).sizes_known_upfront());
    }

    #[test]
    fn test_unix_mode() {
        let options = EntryOptions::new("a").external_attributes(0x20).unix_mode(0o100644);
        assert_eq!(options.external_attributes, (0o100644 << 16) | 0x20);
    }

    #[test]
    fn test_debug_hides_password() {
        let options = EntryOptions::new("a").password("hunter2");
        assert!(!format!("{:?}", options).contains("hunter2"));
    }
}
