//! Error types for ZIP archive operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when framing, writing, or extracting ZIP entries, along with
//! a convenient [`Result<T>`] type alias.
//!
//! # Error Categories
//!
//! | Category | Variants | Typical Cause |
//! |----------|----------|---------------|
//! | Configuration | [`InvalidEntryConfiguration`][Error::InvalidEntryConfiguration] | Rejected before any I/O |
//! | I/O | [`SinkWriteFailure`][Error::SinkWriteFailure], [`SourceReadFailure`][Error::SourceReadFailure], [`Io`][Error::Io] | File system faults |
//! | Structure | [`UnsupportedPatchback`][Error::UnsupportedPatchback] | Header rewrite across a volume boundary |
//! | Security | [`WrongPassword`][Error::WrongPassword], [`AuthenticationFailed`][Error::AuthenticationFailed] | Cipher verification |
//! | Control | [`Cancelled`][Error::Cancelled] | Cooperative stop requested |
//!
//! # Example
//!
//! ```rust
//! use spanzip::Error;
//!
//! fn describe(error: &Error) -> &'static str {
//!     match error {
//!         Error::WrongPassword { .. } => "bad password",
//!         Error::Cancelled => "cancelled",
//!         e if e.is_corruption() => "damaged archive",
//!         _ => "other failure",
//!     }
//! }
//!
//! assert_eq!(describe(&Error::Cancelled), "cancelled");
//! ```
//!
//! # Errors inside `Read`/`Write` implementations
//!
//! The entry streams implement [`std::io::Read`], so failures detected while
//! streaming (CRC mismatch, authentication failure) travel as an
//! [`io::Error`] wrapping this crate's [`Error`]. Use [`Error::from_io`] to
//! recover the typed error.

use std::io;

/// How a wrong password was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PasswordDetectionMethod {
    /// The AES password verification value did not match.
    VerifierMismatch,

    /// The last byte of the decrypted legacy 12-byte header did not match the
    /// CRC or timestamp check byte.
    CheckByteMismatch,
}

impl std::fmt::Display for PasswordDetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VerifierMismatch => write!(f, "AES password verifier mismatch"),
            Self::CheckByteMismatch => write!(f, "encryption header check byte mismatch"),
        }
    }
}

/// Helper struct for formatting CrcMismatch error messages.
struct CrcMismatchDisplay<'a> {
    entry_name: &'a str,
    expected: u32,
    actual: u32,
}

impl std::fmt::Display for CrcMismatchDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CRC mismatch for entry '{}': expected {:#010x}, got {:#010x}",
            self.entry_name, self.expected, self.actual
        )
    }
}

/// The main error type for ZIP archive operations.
///
/// Every failure aborts the current entry operation and surfaces to the
/// caller. Nothing is retried and nothing is rolled back: an entry that failed
/// halfway stays in the output volumes, and it is up to the caller to discard
/// or re-create the archive.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error that is not attributable to a specific sink or source.
    ///
    /// Mostly raised while opening or parsing archive files.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// The entry configuration was rejected before any byte was written.
    ///
    /// Raised for an empty name, a name that collides with an existing entry,
    /// an unsupported compression/encryption combination, or encryption
    /// requested without a password.
    #[error("Invalid configuration for entry '{entry}': {reason}")]
    InvalidEntryConfiguration {
        /// The entry name as supplied by the caller.
        entry: String,
        /// Why the configuration was rejected.
        reason: String,
    },

    /// Writing to the output volumes failed.
    ///
    /// The underlying error is propagated verbatim.
    #[error("Failed to write archive data: {0}")]
    SinkWriteFailure(#[source] io::Error),

    /// Reading the entry source or an archive volume failed.
    #[error("Failed to read source data: {0}")]
    SourceReadFailure(#[source] io::Error),

    /// A header rewrite targeted bytes that are no longer in the current volume.
    ///
    /// Once the sink has rolled over to a new volume, bytes in earlier volumes
    /// cannot be rewritten. The entry writer avoids this by falling back to the
    /// data descriptor, so seeing this error from the writer indicates a bug.
    #[error("Cannot rewrite bytes in volume {volume}: the sink has moved on to volume {current_volume}")]
    UnsupportedPatchback {
        /// The volume holding the bytes to rewrite.
        volume: u32,
        /// The volume the sink is currently writing.
        current_volume: u32,
    },

    /// The password is incorrect.
    ///
    /// Detected from the cipher header before any payload byte is returned.
    ///
    /// **Note:** If no password was provided at all, [`Error::PasswordRequired`]
    /// is returned instead.
    #[error("Wrong password for entry '{entry_name}' ({detection_method})")]
    WrongPassword {
        /// The entry that could not be decrypted.
        entry_name: String,
        /// How the wrong password was detected.
        detection_method: PasswordDetectionMethod,
    },

    /// A password is required but none (or an empty one) was provided.
    #[error("Password required for encrypted entry '{entry_name}'")]
    PasswordRequired {
        /// The encrypted entry.
        entry_name: String,
    },

    /// The AES authentication code of an entry did not match its content.
    ///
    /// The ciphertext was modified after it was written.
    #[error("Authentication code mismatch for entry '{entry_name}'")]
    AuthenticationFailed {
        /// The entry that failed authentication.
        entry_name: String,
    },

    /// The CRC checksum does not match the expected value.
    #[error("{}", CrcMismatchDisplay { entry_name: entry_name.as_str(), expected: *expected, actual: *actual })]
    CrcMismatch {
        /// The entry with the CRC mismatch.
        entry_name: String,
        /// The expected CRC value from the archive.
        expected: u32,
        /// The actual CRC value of the extracted data.
        actual: u32,
    },

    /// The operation was cancelled through the progress monitor.
    ///
    /// Partially written entries are left in place.
    #[error("Operation cancelled")]
    Cancelled,

    /// The file is not a ZIP archive or a required record is missing.
    #[error("Invalid ZIP format: {0}")]
    InvalidFormat(String),

    /// An archive record is corrupt or truncated.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// The entry uses a compression method this build cannot handle.
    #[error("Unsupported compression method: {method}")]
    UnsupportedMethod {
        /// The method code from the header.
        method: u16,
    },

    /// The archive uses a feature that is not supported.
    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature {
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// No entry with the given name exists in the archive.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// A volume file of a split archive is missing.
    #[error("Volume {volume} missing: expected at '{path}'")]
    VolumeMissing {
        /// The volume number (0-based) that is missing.
        volume: u32,
        /// The expected path of the missing volume.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The split volume size is below the supported minimum.
    #[error("Split size {size} is below the minimum of {minimum} bytes")]
    InvalidSplitSize {
        /// The requested volume size.
        size: u64,
        /// The smallest accepted volume size.
        minimum: u64,
    },

    /// A cryptographic primitive failed.
    ///
    /// This indicates an internal error such as a failed random number
    /// generator, which should not occur under normal circumstances.
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
}

impl Error {
    /// Creates an `InvalidEntryConfiguration` error.
    pub fn invalid_entry(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidEntryConfiguration {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Creates a CorruptHeader error.
    pub fn corrupt_header(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Recovers a typed error from an [`io::Error`].
    ///
    /// Errors produced by this crate's `Read`/`Write` implementations wrap an
    /// [`Error`]; those are unwrapped. Any other I/O error becomes
    /// [`Error::Io`].
    pub fn from_io(error: io::Error) -> Self {
        if !error.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io(error);
        }
        let kind = error.kind();
        match error.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(ours)) => *ours,
            _ => Error::Io(io::Error::from(kind)),
        }
    }

    /// Returns `true` if this error might be recoverable.
    ///
    /// - `WrongPassword` / `PasswordRequired`: retry with a different password
    /// - `VolumeMissing`: the user can provide the missing volume file
    /// - `Cancelled`: the operation can be restarted
    /// - I/O errors of a transient kind (`WouldBlock`, `Interrupted`, `TimedOut`)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::WrongPassword { .. } => true,
            Error::PasswordRequired { .. } => true,
            Error::Cancelled => true,
            Error::VolumeMissing { .. } => true,
            Error::Io(e) | Error::SinkWriteFailure(e) | Error::SourceReadFailure(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns `true` if this is a data corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CrcMismatch { .. } | Error::CorruptHeader { .. } | Error::AuthenticationFailed { .. }
        )
    }

    /// Returns `true` if this is an encryption-related error.
    pub fn is_encryption_error(&self) -> bool {
        matches!(
            self,
            Error::WrongPassword { .. }
                | Error::PasswordRequired { .. }
                | Error::AuthenticationFailed { .. }
                | Error::CryptoError(_)
        )
    }

    /// Returns the entry name associated with this error, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::InvalidEntryConfiguration { entry, .. } => Some(entry.as_str()),
            Error::WrongPassword { entry_name, .. }
            | Error::PasswordRequired { entry_name }
            | Error::AuthenticationFailed { entry_name }
            | Error::CrcMismatch { entry_name, .. } => Some(entry_name.as_str()),
            Error::EntryNotFound(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::from_io(error)
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Io(e) | Error::SinkWriteFailure(e) | Error::SourceReadFailure(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// A specialized Result type for ZIP operations.
pub type Result<T> = std::result::Result<T, Error>;
