//! Volume sinks for the write path.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use super::VolumeConfig;
use crate::{Error, Result};

/// Output of an archive writer.
///
/// A sink tracks which volume it is writing and how far into it, so that
/// entry framing can decide whether a header can still be rewritten.
pub trait VolumeSink {
    /// Writes all bytes, rolling over to new volumes as needed.
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    /// The volume currently being written (0-based).
    fn current_volume(&self) -> u32;

    /// Bytes written to the current volume.
    fn volume_position(&self) -> u64;

    /// Returns `true` if the sink may roll over.
    fn is_split(&self) -> bool;

    /// Rolls over before a record of `len` bytes that would not fit in the
    /// current volume.
    ///
    /// Records such as local headers are never split across volumes.
    fn ensure_room(&mut self, len: u64) -> Result<()>;

    /// Overwrites bytes at `offset` of `volume`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPatchback`] if `volume` is not the current
    /// volume.
    fn patch_back(&mut self, volume: u32, offset: u64, bytes: &[u8]) -> Result<()>;

    /// Logical bytes written across all volumes.
    fn total_written(&self) -> u64;

    /// Flushes and closes the sink, returning the logical byte count.
    fn close(&mut self) -> Result<u64>;
}

fn write_failure(e: io::Error) -> Error {
    Error::SinkWriteFailure(e)
}

fn check_patch_range(volume: u32, current: u32, offset: u64, len: usize, position: u64) -> Result<()> {
    if volume != current {
        return Err(Error::UnsupportedPatchback {
            volume,
            current_volume: current,
        });
    }
    if offset + len as u64 > position {
        return Err(Error::SinkWriteFailure(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("patch at {}+{} past written position {}", offset, len, position),
        )));
    }
    Ok(())
}

/// A file sink that splits its output across volume files.
///
/// The volume being written always lives at the base path. On roll-over it
/// is closed and renamed to its numbered name, and a fresh file is created
/// at the base path. Roll-over is lazy: a volume is filled to the limit and
/// the next one is only opened when another byte arrives.
///
/// # Example
///
/// ```rust,no_run
/// use spanzip::volume::{SplitVolumeWriter, VolumeConfig, VolumeSink};
///
/// let config = VolumeConfig::split("archive.zip", 1024 * 1024)?;
/// let mut writer = SplitVolumeWriter::create(config)?;
/// writer.write_all(&[0u8; 3 * 1024 * 1024])?;
/// let total = writer.close()?;
/// assert_eq!(total, 3 * 1024 * 1024);
/// # Ok::<(), spanzip::Error>(())
/// ```
pub struct SplitVolumeWriter {
    config: VolumeConfig,
    file: Option<BufWriter<File>>,
    current_volume: u32,
    position: u64,
    total_written: u64,
    completed_sizes: Vec<u64>,
}

impl SplitVolumeWriter {
    /// Creates a new archive, truncating any file at the base path.
    pub fn create(config: VolumeConfig) -> Result<Self> {
        let file = File::create(config.base_path()).map_err(write_failure)?;
        Ok(Self {
            config,
            file: Some(BufWriter::new(file)),
            current_volume: 0,
            position: 0,
            total_written: 0,
            completed_sizes: Vec::new(),
        })
    }

    /// Opens an existing single-file archive for appending, truncating it at
    /// `truncate_at` (the old central directory offset).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] for split configurations.
    pub fn open_append(config: VolumeConfig, truncate_at: u64) -> Result<Self> {
        if config.is_split() {
            return Err(Error::UnsupportedFeature {
                feature: "appending to a split archive",
            });
        }
        let mut file = OpenOptions::new()
            .write(true)
            .open(config.base_path())
            .map_err(write_failure)?;
        file.set_len(truncate_at).map_err(write_failure)?;
        file.seek(SeekFrom::Start(truncate_at)).map_err(write_failure)?;
        log::debug!("Appending to {} at offset {}", config.base_path().display(), truncate_at);

        Ok(Self {
            config,
            file: Some(BufWriter::new(file)),
            current_volume: 0,
            position: truncate_at,
            total_written: truncate_at,
            completed_sizes: Vec::new(),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// Sizes of the volumes closed so far.
    pub fn completed_sizes(&self) -> &[u64] {
        &self.completed_sizes
    }

    fn file_mut(&mut self) -> Result<&mut BufWriter<File>> {
        self.file
            .as_mut()
            .ok_or_else(|| write_failure(io::Error::other("volume writer is closed")))
    }

    fn roll_over(&mut self) -> Result<()> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| write_failure(io::Error::other("volume writer is closed")))?;
        file.flush().map_err(write_failure)?;
        drop(file);

        let finished = self.config.split_volume_path(self.current_volume);
        fs::rename(self.config.base_path(), &finished).map_err(write_failure)?;
        self.completed_sizes.push(self.position);

        let next = File::create(self.config.base_path()).map_err(write_failure)?;
        self.file = Some(BufWriter::new(next));
        self.current_volume += 1;
        self.position = 0;
        log::debug!(
            "Rolled over to volume {} after closing {}",
            self.current_volume,
            finished.display()
        );
        Ok(())
    }
}

impl VolumeSink for SplitVolumeWriter {
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            let room = match self.config.split_size() {
                Some(limit) => {
                    if self.position >= limit {
                        self.roll_over()?;
                    }
                    usize::try_from(limit - self.position).unwrap_or(usize::MAX)
                }
                None => usize::MAX,
            };
            let n = buf.len().min(room);
            self.file_mut()?.write_all(&buf[..n]).map_err(write_failure)?;
            self.position += n as u64;
            self.total_written += n as u64;
            buf = &buf[n..];
        }
        Ok(())
    }

    fn current_volume(&self) -> u32 {
        self.current_volume
    }

    fn volume_position(&self) -> u64 {
        self.position
    }

    fn is_split(&self) -> bool {
        self.config.is_split()
    }

    fn ensure_room(&mut self, len: u64) -> Result<()> {
        if let Some(limit) = self.config.split_size() {
            if self.position > 0 && self.position + len > limit {
                self.roll_over()?;
            }
        }
        Ok(())
    }

    fn patch_back(&mut self, volume: u32, offset: u64, bytes: &[u8]) -> Result<()> {
        check_patch_range(volume, self.current_volume, offset, bytes.len(), self.position)?;
        let position = self.position;
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(offset)).map_err(write_failure)?;
        file.write_all(bytes).map_err(write_failure)?;
        file.seek(SeekFrom::Start(position)).map_err(write_failure)?;
        Ok(())
    }

    fn total_written(&self) -> u64 {
        self.total_written
    }

    fn close(&mut self) -> Result<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(write_failure)?;
            file.get_ref().sync_all().map_err(write_failure)?;
            self.completed_sizes.push(self.position);
        }
        Ok(self.total_written)
    }
}

impl Drop for SplitVolumeWriter {
    fn drop(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                log::warn!("Failed to flush volume {} on drop: {}", self.current_volume, e);
            }
        }
    }
}

impl std::fmt::Debug for SplitVolumeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitVolumeWriter")
            .field("config", &self.config)
            .field("current_volume", &self.current_volume)
            .field("position", &self.position)
            .field("total_written", &self.total_written)
            .finish()
    }
}

/// A single-volume sink over any seekable writer, such as a `Cursor`.
pub struct SeekableSink<W> {
    inner: W,
    start: u64,
    position: u64,
}

impl<W: Write + Seek> SeekableSink<W> {
    /// Wraps a writer; offsets are relative to its current position.
    pub fn new(mut inner: W) -> Result<Self> {
        let start = inner.stream_position().map_err(write_failure)?;
        Ok(Self {
            inner,
            start,
            position: 0,
        })
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Returns a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write + Seek> VolumeSink for SeekableSink<W> {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).map_err(write_failure)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn current_volume(&self) -> u32 {
        0
    }

    fn volume_position(&self) -> u64 {
        self.position
    }

    fn is_split(&self) -> bool {
        false
    }

    fn ensure_room(&mut self, _len: u64) -> Result<()> {
        Ok(())
    }

    fn patch_back(&mut self, volume: u32, offset: u64, bytes: &[u8]) -> Result<()> {
        check_patch_range(volume, 0, offset, bytes.len(), self.position)?;
        self.inner
            .seek(SeekFrom::Start(self.start + offset))
            .map_err(write_failure)?;
        self.inner.write_all(bytes).map_err(write_failure)?;
        self.inner
            .seek(SeekFrom::Start(self.start + self.position))
            .map_err(write_failure)?;
        Ok(())
    }

    fn total_written(&self) -> u64 {
        self.position
    }

    fn close(&mut self) -> Result<u64> {
        self.inner.flush().map_err(write_failure)?;
        Ok(self.position)
    }
}

impl<W> std::fmt::Debug for SeekableSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeekableSink")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
