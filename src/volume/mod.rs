//! Split (multi-volume) archive support.
//!
//! A split archive is one logical byte stream cut into files of at most a
//! configured size. Offsets inside the archive are always `(volume, offset
//! within volume)` pairs.
//!
//! # Writing
//!
//! ```rust,no_run
//! use spanzip::volume::{SplitVolumeWriter, VolumeConfig};
//!
//! let config = VolumeConfig::split("archive.zip", 10 * 1024 * 1024)?;
//! let sink = SplitVolumeWriter::create(config)?;
//! # Ok::<(), spanzip::Error>(())
//! ```
//!
//! # Volume Naming Convention
//!
//! - `archive.z01` - first volume
//! - `archive.z02` - second volume
//! - `archive.zip` - last volume, holding the central directory
//!
//! The number has at least two digits. While writing, the volume in progress
//! lives at `archive.zip` and is renamed when the next one starts.

mod config;
mod reader;
mod writer;

pub use config::{MIN_SPLIT_SIZE, VolumeConfig};
pub use reader::VolumeReader;
pub use writer::{SeekableSink, SplitVolumeWriter, VolumeSink};
