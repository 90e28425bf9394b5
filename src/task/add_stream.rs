//! Adding one entry from a non-seekable stream.

use std::io::Read;

use crate::model::ArchiveMetadata;
use crate::progress::{ProgressMonitor, TaskKind};
use crate::write::{ArchiveWriter, EntryOptions, check_new_entry};
use crate::Result;

use super::{ArchiveTask, pump};

/// Adds one entry whose bytes come from an arbitrary reader.
///
/// The length of the source is unknown, so sizes are always deferred: the
/// entry gets a data descriptor, and a stored entry that stayed within one
/// volume has its local header rewritten after the payload. Total work is
/// reported as 0.
///
/// On success the task returns the updated archive metadata.
pub struct AddStreamTask<R> {
    metadata: ArchiveMetadata,
    source: R,
    options: EntryOptions,
}

impl<R: Read + Send + 'static> AddStreamTask<R> {
    /// Creates a task that adds `source` to the archive as one entry.
    pub fn new(metadata: ArchiveMetadata, source: R, options: EntryOptions) -> Self {
        Self {
            metadata,
            source,
            options,
        }
    }
}

impl<R: Read + Send + 'static> ArchiveTask for AddStreamTask<R> {
    type Output = ArchiveMetadata;

    fn kind(&self) -> TaskKind {
        TaskKind::AddStream
    }

    fn total_work(&self) -> Result<u64> {
        Ok(0)
    }

    fn run(mut self, monitor: &ProgressMonitor) -> Result<ArchiveMetadata> {
        let mut options = self.options;
        options.known_sizes = None;
        options.write_data_descriptor = true;
        check_new_entry(&self.metadata, &options)?;
        monitor.set_file_name(Some(options.name.clone()));

        let mut writer = ArchiveWriter::create(self.metadata)?;
        writer.open_entry(&options)?;
        if !options.is_directory() {
            let written = pump(&mut self.source, monitor, |chunk| writer.write_data(chunk))?;
            log::debug!("Streamed {written} bytes into '{}'", options.name);
        }
        writer.close_entry()?;
        let (metadata, _) = writer.finish()?;
        Ok(metadata)
    }
}
