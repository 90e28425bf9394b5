//! Archive reading.
//!
//! [`ArchiveMetadata::open`] reads the central directory of an existing
//! archive; [`open_entry_stream`] returns a [`Read`](std::io::Read) source
//! over one entry's data.
//!
//! # Example
//!
//! ```rust,no_run
//! use spanzip::{ArchiveMetadata, Password};
//! use std::io::Read;
//!
//! let archive = ArchiveMetadata::open("archive.zip")?;
//! for entry in archive.entries() {
//!     println!("{}: {} bytes", entry.name, entry.uncompressed_size);
//! }
//!
//! let password = Password::new("secret");
//! let mut content = String::new();
//! archive
//!     .entry_stream("notes.txt", Some(&password))?
//!     .read_to_string(&mut content)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod archive_open;
mod entry_stream;

pub use entry_stream::{EntryStream, open_entry_stream};

use crate::crypto::Password;
use crate::model::ArchiveMetadata;
use crate::{Error, Result};

impl ArchiveMetadata {
    /// Opens the entry called `name` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntryNotFound`] if there is no such entry, and the
    /// errors of [`open_entry_stream`] otherwise.
    pub fn entry_stream(&self, name: &str, password: Option<&Password>) -> Result<EntryStream> {
        let entry = self
            .entry(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))?;
        open_entry_stream(self, entry, password)
    }
}
