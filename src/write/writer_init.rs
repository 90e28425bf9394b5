//! Writer initialization and finalization.
//!
//! This module creates writers for new and existing archives and writes the
//! central directory and end records when the archive is finished.

use crate::format::central::{encode_central_header, encode_end_records, end_records_len};
use crate::format::SPLIT_ARCHIVE_MARKER;
use crate::model::{ArchiveMetadata, EndOfArchiveRecord};
use crate::volume::{SplitVolumeWriter, VolumeSink};
use crate::{Error, Result};

use super::{ArchiveWriter, WriterState};

impl ArchiveWriter<SplitVolumeWriter> {
    /// Creates a writer for the archive described by `metadata`.
    ///
    /// A new archive is created at the configured path, truncating any file
    /// already there. An archive read with
    /// [`ArchiveMetadata::open`](crate::ArchiveMetadata::open) is appended
    /// to: its central directory is cut off and rewritten by
    /// [`finish`](ArchiveWriter::finish), together with the new entries.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFeature`] when adding to an existing split archive
    /// - [`Error::SinkWriteFailure`] if the file cannot be created or opened
    pub fn create(metadata: ArchiveMetadata) -> Result<Self> {
        let sink = if metadata.is_existing() {
            if metadata.is_split() {
                return Err(Error::UnsupportedFeature {
                    feature: "adding entries to a split archive",
                });
            }
            let truncate_at = metadata.end_record().cd_offset;
            SplitVolumeWriter::open_append(metadata.config().clone(), truncate_at)?
        } else {
            SplitVolumeWriter::create(metadata.config().clone())?
        };
        Self::with_sink(metadata, sink)
    }
}

impl<S: VolumeSink> ArchiveWriter<S> {
    /// Creates a writer over an explicit sink.
    ///
    /// A split sink that has not been written to yet receives the split
    /// archive marker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SinkWriteFailure`] if writing the marker fails.
    pub fn with_sink(metadata: ArchiveMetadata, mut sink: S) -> Result<Self> {
        if sink.is_split() && sink.total_written() == 0 {
            sink.write_all(&SPLIT_ARCHIVE_MARKER.to_le_bytes())?;
        }
        let comment = metadata.end_record().comment.clone();
        Ok(Self {
            sink,
            metadata,
            state: WriterState::Idle,
            current: None,
            comment,
            compressed_buf: Vec::new(),
            encrypted_buf: Vec::new(),
        })
    }

    /// Writes the central directory and end records, closes the sink, and
    /// returns the updated metadata together with the sink.
    ///
    /// An entry that is still open is closed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SinkWriteFailure`] if the sink fails.
    pub fn finish(mut self) -> Result<(ArchiveMetadata, S)> {
        if self.current.is_some() {
            self.close_entry()?;
        }

        let mut cd_start: Option<(u32, u64)> = None;
        let mut cd_size = 0u64;
        let mut on_last_volume = 0u64;
        let mut last_volume = self.sink.current_volume();

        for entry in self.metadata.entries() {
            let bytes = encode_central_header(entry);
            self.sink.ensure_room(bytes.len() as u64)?;
            if self.sink.current_volume() != last_volume {
                last_volume = self.sink.current_volume();
                on_last_volume = 0;
            }
            cd_start.get_or_insert((self.sink.current_volume(), self.sink.volume_position()));
            self.sink.write_all(&bytes)?;
            cd_size += bytes.len() as u64;
            on_last_volume += 1;
        }
        let (cd_disk, cd_offset) =
            cd_start.unwrap_or((self.sink.current_volume(), self.sink.volume_position()));

        let mut record = EndOfArchiveRecord {
            disk_number: self.sink.current_volume(),
            cd_disk,
            entries_on_disk: on_last_volume,
            total_entries: self.metadata.len() as u64,
            cd_size,
            cd_offset,
            comment: std::mem::take(&mut self.comment),
        };
        self.sink.ensure_room(end_records_len(&record) as u64)?;
        if self.sink.current_volume() != record.disk_number {
            record.disk_number = self.sink.current_volume();
            record.entries_on_disk = 0;
        }
        let position = self.sink.volume_position();
        self.sink.write_all(&encode_end_records(&record, position))?;
        let total = self.sink.close()?;

        log::debug!(
            "Finished archive: {} entries, central directory {} bytes at volume {} offset {}, {} volume(s), {} bytes",
            record.total_entries,
            record.cd_size,
            record.cd_disk,
            record.cd_offset,
            record.disk_number + 1,
            total
        );

        self.state = WriterState::Closed;
        self.metadata.set_end_record(record);
        Ok((self.metadata, self.sink))
    }
}
