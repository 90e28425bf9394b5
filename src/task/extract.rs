//! Extracting one entry to the file system.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::crypto::Password;
use crate::model::{ArchiveMetadata, EntryHeader};
use crate::progress::{ProgressMonitor, TaskKind};
use crate::read::open_entry_stream;
use crate::{Error, Result};

use super::{ArchiveTask, pump};

/// Extracts one entry to a destination path.
///
/// Missing parent directories are created. A directory entry becomes a
/// directory. After the data is written the entry's modification time is
/// applied to the destination; on Unix, recorded permission bits are
/// restored as well. Failing to restore either is logged and ignored.
///
/// The output is the number of bytes written.
pub struct ExtractEntryTask {
    metadata: ArchiveMetadata,
    entry_name: String,
    destination: PathBuf,
    password: Option<Password>,
}

impl ExtractEntryTask {
    /// Creates a task that extracts `entry_name` to `destination`.
    pub fn new(metadata: ArchiveMetadata, entry_name: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            entry_name: entry_name.into(),
            destination: destination.into(),
            password: None,
        }
    }

    /// Sets the password for an encrypted entry.
    pub fn password(mut self, password: impl Into<Password>) -> Self {
        self.password = Some(password.into());
        self
    }

    fn entry(&self) -> Result<&EntryHeader> {
        self.metadata
            .entry(&self.entry_name)
            .ok_or_else(|| Error::EntryNotFound(self.entry_name.clone()))
    }
}

impl ArchiveTask for ExtractEntryTask {
    type Output = u64;

    fn kind(&self) -> TaskKind {
        TaskKind::Extract
    }

    fn total_work(&self) -> Result<u64> {
        Ok(self.entry()?.uncompressed_size)
    }

    fn run(self, monitor: &ProgressMonitor) -> Result<u64> {
        let entry = self.entry()?;
        monitor.set_file_name(Some(entry.name.clone()));

        if entry.is_directory() {
            fs::create_dir_all(&self.destination).map_err(Error::SinkWriteFailure)?;
            restore_attributes(&self.destination, entry);
            return Ok(0);
        }

        let mut stream = open_entry_stream(&self.metadata, entry, self.password.as_ref())?;
        if let Some(parent) = self.destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(Error::SinkWriteFailure)?;
        }
        let mut out = BufWriter::new(File::create(&self.destination).map_err(Error::SinkWriteFailure)?);
        let written = pump(&mut stream, monitor, |chunk| {
            out.write_all(chunk).map_err(Error::SinkWriteFailure)
        })?;
        out.into_inner()
            .map_err(|e| Error::SinkWriteFailure(e.into_error()))?
            .sync_all()
            .map_err(Error::SinkWriteFailure)?;

        restore_attributes(&self.destination, entry);
        log::debug!(
            "Extracted '{}' to {} ({written} bytes)",
            entry.name,
            self.destination.display()
        );
        Ok(written)
    }
}

fn restore_attributes(path: &Path, entry: &EntryHeader) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = entry.unix_mode().map(|mode| mode & 0o7777).filter(|&mode| mode != 0) {
            if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
                log::warn!("Could not set permissions of {}: {e}", path.display());
            }
        }
    }

    match entry.last_modified.as_system_time() {
        Some(time) => {
            if let Err(e) = filetime::set_file_mtime(path, filetime::FileTime::from_system_time(time)) {
                log::warn!("Could not set modification time of {}: {e}", path.display());
            }
        }
        None => log::warn!(
            "Entry '{}' has an invalid modification time; leaving {} unchanged",
            entry.name,
            path.display()
        ),
    }
}
