//! Adding entries from files.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::checksum::Crc32;
use crate::codec::CompressionMethod;
use crate::model::ArchiveMetadata;
use crate::progress::{ProgressMonitor, TaskKind};
use crate::timestamp::DosDateTime;
use crate::write::{ArchiveWriter, EntryOptions, check_new_entry};
use crate::{BUFFER_SIZE, Error, Result};

use super::{ArchiveTask, pump};

/// Adds one or more files to an archive in a single writer session.
///
/// Total work is the sum of the file lengths. For each file the task fills
/// in what the options leave open: the modification time comes from the
/// file, directories get a trailing `/`, and on Unix the permission bits are
/// recorded.
///
/// A stored file whose options disable the data descriptor is read twice:
/// once to compute its CRC-32, then again to write it behind a final local
/// header.
pub struct AddFileTask {
    metadata: ArchiveMetadata,
    files: Vec<(PathBuf, EntryOptions)>,
}

impl AddFileTask {
    /// Creates a task that adds the file at `path`.
    pub fn new(metadata: ArchiveMetadata, path: impl Into<PathBuf>, options: EntryOptions) -> Self {
        Self {
            metadata,
            files: vec![(path.into(), options)],
        }
    }

    /// Queues another file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, options: EntryOptions) -> Self {
        self.files.push((path.into(), options));
        self
    }

    /// Completes the options of one file from its file-system metadata.
    fn prepare(path: &Path, options: &EntryOptions) -> Result<(EntryOptions, bool)> {
        let meta = fs::metadata(path).map_err(Error::SourceReadFailure)?;
        let mut options = options.clone();
        let is_dir = meta.is_dir();
        if is_dir && !options.is_directory() {
            options.name.push('/');
        }
        if options.last_modified.is_none() {
            if let Ok(modified) = meta.modified() {
                options.last_modified = Some(DosDateTime::from_system_time(modified));
            }
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if options.external_attributes == 0 {
                options = options.unix_mode(meta.mode());
            }
        }
        if !is_dir {
            options.size_hint = Some(meta.len());
        }
        Ok((options, is_dir))
    }
}

impl ArchiveTask for AddFileTask {
    type Output = ArchiveMetadata;

    fn kind(&self) -> TaskKind {
        TaskKind::AddFile
    }

    fn total_work(&self) -> Result<u64> {
        let mut total = 0u64;
        for (path, _) in &self.files {
            let meta = fs::metadata(path).map_err(Error::SourceReadFailure)?;
            if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }

    fn run(self, monitor: &ProgressMonitor) -> Result<ArchiveMetadata> {
        let mut prepared = Vec::with_capacity(self.files.len());
        for (path, options) in &self.files {
            let (options, is_dir) = Self::prepare(path, options)?;
            check_new_entry(&self.metadata, &options)?;
            if prepared.iter().any(|(_, other, _): &(&Path, EntryOptions, bool)| other.name == options.name) {
                return Err(Error::invalid_entry(&options.name, "the name is queued twice"));
            }
            prepared.push((path.as_path(), options, is_dir));
        }

        let mut writer = ArchiveWriter::create(self.metadata)?;
        for (path, mut options, is_dir) in prepared {
            monitor.set_file_name(Some(options.name.clone()));
            if is_dir {
                writer.open_entry(&options)?;
                writer.close_entry()?;
                continue;
            }

            if options.method == CompressionMethod::Store && !options.write_data_descriptor {
                let (size, crc) = checksum_file(path, monitor)?;
                options = options.with_known_sizes(size, crc);
            }

            let mut source = BufReader::new(File::open(path).map_err(Error::SourceReadFailure)?);
            writer.open_entry(&options)?;
            pump(&mut source, monitor, |chunk| writer.write_data(chunk))?;
            let entry = writer.close_entry()?;
            log::debug!(
                "Added {} as '{}' ({} -> {} bytes)",
                path.display(),
                entry.name,
                entry.uncompressed_size,
                entry.compressed_size
            );
        }
        let (metadata, _) = writer.finish()?;
        Ok(metadata)
    }
}

/// Reads a file once to learn its length and CRC-32.
fn checksum_file(path: &Path, monitor: &ProgressMonitor) -> Result<(u64, u32)> {
    let mut file = File::open(path).map_err(Error::SourceReadFailure)?;
    let mut crc = Crc32::new();
    let mut buf = [0u8; BUFFER_SIZE];
    let mut size = 0u64;
    loop {
        if monitor.is_cancel_requested() {
            return Err(Error::Cancelled);
        }
        let n = file.read(&mut buf).map_err(Error::SourceReadFailure)?;
        if n == 0 {
            return Ok((size, crc.finalize()));
        }
        crc.update(&buf[..n]);
        size += n as u64;
    }
}
