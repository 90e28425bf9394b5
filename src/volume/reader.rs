//! Sequential reader across split volumes.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use super::VolumeConfig;
use crate::{Error, Result};

/// A reader that starts at `(volume, offset)` and continues through the
/// following volume files as each one is exhausted.
///
/// Volume files are opened lazily, one at a time; the handle is released when
/// the reader moves on or is dropped. Each reader is an independent cursor.
pub struct VolumeReader {
    config: VolumeConfig,
    last_volume: u32,
    volume: u32,
    current: Option<BufReader<File>>,
}

impl VolumeReader {
    /// Opens a cursor at `offset` within `volume`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VolumeMissing`] if the volume file cannot be opened.
    pub fn open(config: &VolumeConfig, last_volume: u32, volume: u32, offset: u64) -> Result<Self> {
        let mut reader = Self {
            config: config.clone(),
            last_volume,
            volume,
            current: None,
        };
        let file = reader.open_volume(volume)?;
        let mut file = BufReader::new(file);
        file.seek(SeekFrom::Start(offset)).map_err(Error::SourceReadFailure)?;
        reader.current = Some(file);
        Ok(reader)
    }

    /// The volume the cursor is currently in.
    pub fn current_volume(&self) -> u32 {
        self.volume
    }

    fn open_volume(&self, volume: u32) -> Result<File> {
        let path = self.config.volume_path(volume, self.last_volume);
        File::open(&path).map_err(|source| Error::VolumeMissing {
            volume,
            path: path.display().to_string(),
            source,
        })
    }

    fn advance(&mut self) -> Result<bool> {
        self.current = None;
        if self.volume >= self.last_volume {
            return Ok(false);
        }
        self.volume += 1;
        let file = self.open_volume(self.volume)?;
        self.current = Some(BufReader::new(file));
        log::debug!("Continuing read in volume {}", self.volume);
        Ok(true)
    }
}

impl Read for VolumeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let Some(file) = self.current.as_mut() else {
                return Ok(0);
            };
            let n = file.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            if !self.advance()? {
                return Ok(0);
            }
        }
    }
}

impl std::fmt::Debug for VolumeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeReader")
            .field("volume", &self.volume)
            .field("last_volume", &self.last_volume)
            .field("open", &self.current.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn three_volumes(dir: &TempDir) -> VolumeConfig {
        let base = dir.path().join("a.zip");
        fs::write(dir.path().join("a.z01"), b"0123456789").unwrap();
        fs::write(dir.path().join("a.z02"), b"abcdefghij").unwrap();
        fs::write(&base, b"KLMNO").unwrap();
        VolumeConfig::new_unchecked(base, Some(10))
    }

    #[test]
    fn test_read_across_volumes() {
        let dir = TempDir::new().unwrap();
        let config = three_volumes(&dir);

        let mut reader = VolumeReader::open(&config, 2, 0, 7).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"789abcdefghijKLMNO");
        assert_eq!(reader.current_volume(), 2);
    }

    #[test]
    fn test_read_exact_spanning_boundary() {
        let dir = TempDir::new().unwrap();
        let config = three_volumes(&dir);

        let mut reader = VolumeReader::open(&config, 2, 1, 8).unwrap();
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ijKL");
    }

    #[test]
    fn test_missing_volume() {
        let dir = TempDir::new().unwrap();
        let config = three_volumes(&dir);
        fs::remove_file(dir.path().join("a.z02")).unwrap();

        let mut reader = VolumeReader::open(&config, 2, 0, 0).unwrap();
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert!(matches!(Error::from_io(err), Error::VolumeMissing { volume: 1, .. }));

        assert!(matches!(
            VolumeReader::open(&config, 2, 1, 0),
            Err(Error::VolumeMissing { volume: 1, .. })
        ));
    }
}
