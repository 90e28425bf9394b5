//! Configuration for split archives.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Smallest accepted split volume size (64 KiB).
pub const MIN_SPLIT_SIZE: u64 = 64 * 1024;

/// Output location and split limit of an archive.
///
/// Volume `n` (0-based) of a split archive is named `<stem>.z<NN>` with
/// `NN = n + 1`, at least two digits. The last volume always carries the
/// base name (`<stem>.zip`) and holds the central directory.
///
/// # Example
///
/// ```rust
/// use spanzip::volume::VolumeConfig;
/// use std::path::PathBuf;
///
/// let config = VolumeConfig::split("backup.zip", 1024 * 1024).unwrap();
/// assert_eq!(config.volume_path(0, 2), PathBuf::from("backup.z01"));
/// assert_eq!(config.volume_path(1, 2), PathBuf::from("backup.z02"));
/// assert_eq!(config.volume_path(2, 2), PathBuf::from("backup.zip"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeConfig {
    base_path: PathBuf,
    split_size: Option<u64>,
}

impl VolumeConfig {
    /// A single-file archive.
    pub fn single(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            split_size: None,
        }
    }

    /// A split archive with volumes of at most `split_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSplitSize`] if `split_size` is below
    /// [`MIN_SPLIT_SIZE`].
    pub fn split(base_path: impl Into<PathBuf>, split_size: u64) -> Result<Self> {
        if split_size < MIN_SPLIT_SIZE {
            return Err(Error::InvalidSplitSize {
                size: split_size,
                minimum: MIN_SPLIT_SIZE,
            });
        }
        Ok(Self::new_unchecked(base_path, Some(split_size)))
    }

    /// Creates a configuration without validating the split size.
    ///
    /// Intended for tests that need many small volumes.
    pub fn new_unchecked(base_path: impl Into<PathBuf>, split_size: Option<u64>) -> Self {
        Self {
            base_path: base_path.into(),
            split_size,
        }
    }

    /// The path of the archive, which is also the path of its last volume.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The volume size limit, if splitting is enabled.
    pub fn split_size(&self) -> Option<u64> {
        self.split_size
    }

    /// Returns `true` if splitting is enabled.
    pub fn is_split(&self) -> bool {
        self.split_size.is_some()
    }

    /// Path of a completed (non-last) split volume.
    pub fn split_volume_path(&self, volume: u32) -> PathBuf {
        self.base_path.with_extension(format!("z{:02}", u64::from(volume) + 1))
    }

    /// Path of `volume` in an archive whose last volume is `last_volume`.
    pub fn volume_path(&self, volume: u32, last_volume: u32) -> PathBuf {
        if volume >= last_volume {
            self.base_path.clone()
        } else {
            self.split_volume_path(volume)
        }
    }
}
