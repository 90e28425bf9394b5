//! # spanzip
//!
//! A streaming ZIP entry engine with split-archive output and per-entry
//! encryption.
//!
//! Entries are written from arbitrary byte sources without knowing their
//! size in advance, across output volumes that roll over at a configured
//! size, and encrypted with either the traditional ZIP stream cipher
//! (ZipCrypto) or WinZip AES. Reading reverses the pipeline and verifies
//! CRC-32 and AES authentication codes as the entry is consumed.
//!
//! ## Quick Start
//!
//! ### Writing an Archive
//!
//! ```rust,no_run
//! use spanzip::{ArchiveMetadata, ArchiveWriter, CompressionMethod, EntryOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let metadata = ArchiveMetadata::create("out.zip", None)?;
//!     let mut writer = ArchiveWriter::create(metadata)?;
//!
//!     writer.open_entry(&EntryOptions::new("hello.txt"))?;
//!     writer.write_data(b"Hello, World!")?;
//!     writer.close_entry()?;
//!
//!     writer.open_entry(&EntryOptions::new("raw.bin").method(CompressionMethod::Store))?;
//!     writer.write_data(&[0u8; 1024])?;
//!     writer.close_entry()?;
//!
//!     let (metadata, _) = writer.finish()?;
//!     println!("Wrote {} entries", metadata.len());
//!     Ok(())
//! }
//! ```
//!
//! ### Split Archives
//!
//! ```rust,no_run
//! use spanzip::{ArchiveMetadata, ArchiveWriter, EntryOptions, Result};
//!
//! fn main() -> Result<()> {
//!     // Volumes of at most 1 MiB: out.z01, out.z02, ..., out.zip
//!     let metadata = ArchiveMetadata::create("out.zip", Some(1024 * 1024))?;
//!     let mut writer = ArchiveWriter::create(metadata)?;
//!     writer.open_entry(&EntryOptions::new("big.bin"))?;
//!     std::io::copy(&mut std::fs::File::open("big.bin")?, &mut writer)?;
//!     writer.close_entry()?;
//!     writer.finish()?;
//!     Ok(())
//! }
//! ```
//!
//! ### Encrypted Entries
//!
//! ```rust,ignore
//! # #[cfg(feature = "aes")]
//! use spanzip::{AesStrength, ArchiveMetadata, EntryOptions, Result};
//! use std::io::Read;
//!
//! # #[cfg(feature = "aes")]
//! fn main() -> Result<()> {
//!     let metadata = ArchiveMetadata::open("secret.zip")?;
//!     let mut stream = metadata.entry_stream("notes.txt", Some(&"secret".into()))?;
//!     let mut text = String::new();
//!     stream.read_to_string(&mut text)?;
//!     Ok(())
//! }
//! # #[cfg(not(feature = "aes"))]
//! # fn main() {}
//! ```
//!
//! ### Tasks and Progress
//!
//! The [`task`] module wraps whole operations so they can run on a worker
//! thread while another thread watches a [`ProgressMonitor`] or cancels.
//!
//! ```rust,no_run
//! use spanzip::task::{ExecutionMode, ExtractEntryTask, execute};
//! use spanzip::{ArchiveMetadata, ProgressMonitor, Result};
//!
//! fn main() -> Result<()> {
//!     let metadata = ArchiveMetadata::open("archive.zip")?;
//!     let monitor = ProgressMonitor::shared();
//!     let task = ExtractEntryTask::new(metadata, "docs/readme.md", "out/readme.md");
//!     let handle = execute(task, ExecutionMode::Background, monitor.clone());
//!     while !handle.is_finished() {
//!         println!("{}%", monitor.percent_done());
//!         std::thread::sleep(std::time::Duration::from_millis(100));
//!     }
//!     handle.wait()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `deflate` | Yes | Deflate compression via flate2 |
//! | `aes` | Yes | WinZip AES-128/192/256 encryption |
//!
//! ZipCrypto and stored entries are always available.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Errors raised inside `Read`/`Write`
//! implementations travel as [`std::io::Error`] and are turned back into the
//! typed [`Error`] by `?` or [`Error::from_io`]:
//!
//! ```rust,no_run
//! use spanzip::{ArchiveMetadata, Error};
//!
//! fn open(path: &str) -> spanzip::Result<()> {
//!     match ArchiveMetadata::open(path) {
//!         Ok(metadata) => {
//!             println!("{} entries", metadata.len());
//!             Ok(())
//!         }
//!         Err(Error::VolumeMissing { volume, path, .. }) => {
//!             eprintln!("volume {volume} not found at {path}");
//!             Ok(())
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # fn main() {}
//! ```
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

/// Buffer size used when tasks pump payload bytes (4 KiB).
pub const BUFFER_SIZE: usize = 4096;

pub mod checksum;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod format;
pub mod model;
pub mod progress;
pub mod read;
pub mod task;
pub mod timestamp;
pub mod volume;
pub mod write;

pub use error::{Error, PasswordDetectionMethod, Result};
pub use timestamp::DosDateTime;

pub use codec::CompressionMethod;
pub use crypto::{AesStrength, AesVendorVersion, EncryptionMethod, NoncePolicy, Password};

// Re-export the archive model at crate root for convenience
pub use model::{ArchiveMetadata, EndOfArchiveRecord, EntryHeader};

// Re-export reading and writing API
pub use read::{EntryStream, open_entry_stream};
pub use write::{ArchiveWriter, DescriptorPolicy, EntryOptions, WriterState};

// Re-export volume API
pub use volume::{MIN_SPLIT_SIZE, VolumeConfig};

// Re-export progress API
pub use progress::{ProgressMonitor, TaskKind, TaskResult, TaskState};
