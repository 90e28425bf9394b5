//! Archive opening.
//!
//! The end of central directory record is located in the base file, which
//! is always the last volume. The central directory itself may start in an
//! earlier volume and is read through a [`VolumeReader`].

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;

use crate::format::central::{
    Zip64EndOfCentralDirectory, find_end_of_central_directory, parse_central_header, read_zip64_locator,
};
use crate::model::{ArchiveMetadata, EndOfArchiveRecord};
use crate::volume::{VolumeConfig, VolumeReader};
use crate::{Error, Result};

impl ArchiveMetadata {
    /// Reads the structure of an existing archive.
    ///
    /// `path` names the archive's last volume (`archive.zip`); earlier
    /// volumes of a split archive are expected next to it as `archive.z01`,
    /// `archive.z02`, and so on.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidFormat`] if no end of central directory record is found
    /// - [`Error::CorruptHeader`] if a central directory header is damaged
    /// - [`Error::VolumeMissing`] if a volume holding the central directory
    ///   is absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = VolumeConfig::single(&path);
        let mut file = BufReader::new(File::open(&path)?);

        let (eocd, eocd_offset) = find_end_of_central_directory(&mut file)?;
        let mut record = EndOfArchiveRecord {
            disk_number: u32::from(eocd.disk_number),
            cd_disk: u32::from(eocd.cd_disk),
            entries_on_disk: u64::from(eocd.entries_on_disk),
            total_entries: u64::from(eocd.total_entries),
            cd_size: u64::from(eocd.cd_size),
            cd_offset: u64::from(eocd.cd_offset),
            comment: eocd.comment.clone(),
        };

        if let Some(locator) = read_zip64_locator(&mut file, eocd_offset)? {
            let last_volume = locator.total_disks.saturating_sub(1).max(locator.eocd64_disk);
            let mut reader = VolumeReader::open(&config, last_volume, locator.eocd64_disk, locator.eocd64_offset)?;
            let zip64 = Zip64EndOfCentralDirectory::parse(&mut reader)?;
            log::debug!(
                "ZIP64 end record: {} entries, central directory at volume {} offset {}",
                zip64.total_entries,
                zip64.cd_disk,
                zip64.cd_offset
            );
            record.disk_number = zip64.disk_number;
            record.cd_disk = zip64.cd_disk;
            record.entries_on_disk = zip64.entries_on_disk;
            record.total_entries = zip64.total_entries;
            record.cd_size = zip64.cd_size;
            record.cd_offset = zip64.cd_offset;
        } else if eocd.needs_zip64() {
            return Err(Error::InvalidFormat(
                "end record refers to ZIP64 values but no ZIP64 locator was found".into(),
            ));
        }
        drop(file);

        let mut directory = Vec::new();
        VolumeReader::open(&config, record.disk_number, record.cd_disk, record.cd_offset)?
            .take(record.cd_size)
            .read_to_end(&mut directory)?;
        if (directory.len() as u64) < record.cd_size {
            return Err(Error::InvalidFormat(format!(
                "central directory truncated: {} of {} bytes",
                directory.len(),
                record.cd_size
            )));
        }

        let mut cursor = Cursor::new(directory.as_slice());
        let mut entries = Vec::new();
        for _ in 0..record.total_entries {
            let offset = record.cd_offset + cursor.position();
            entries.push(parse_central_header(&mut cursor, offset)?);
        }

        log::debug!(
            "Opened {}: {} entries in {} volume(s)",
            path.display(),
            entries.len(),
            record.disk_number + 1
        );
        Ok(Self::from_parts(config, entries, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CompressionMethod;
    use crate::crypto::{AesStrength, EncryptionMethod};
    use crate::write::{ArchiveWriter, EntryOptions};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_open_written_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.zip");
        let mut writer = ArchiveWriter::create(ArchiveMetadata::create(&path, None).unwrap()).unwrap();
        writer.set_comment("hello");
        writer.open_entry(&EntryOptions::new("one.txt")).unwrap();
        writer.write_data(b"first").unwrap();
        writer.close_entry().unwrap();
        writer
            .open_entry(&EntryOptions::new("two.bin").aes(AesStrength::Aes192).password("pw"))
            .unwrap();
        writer.write_data(b"second").unwrap();
        writer.close_entry().unwrap();
        let (written, _) = writer.finish().unwrap();

        let opened = ArchiveMetadata::open(&path).unwrap();
        assert!(opened.is_existing());
        assert!(!opened.is_split());
        assert_eq!(opened.entries(), written.entries());
        assert_eq!(opened.end_record().comment, b"hello");

        let two = opened.entry("two.bin").unwrap();
        assert_eq!(two.encryption, EncryptionMethod::Aes(AesStrength::Aes192));
        assert_eq!(two.compression_method(), Some(CompressionMethod::Deflate));
    }

    #[test]
    fn test_open_split_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.zip");
        let config = VolumeConfig::new_unchecked(&path, Some(512));
        let mut writer = ArchiveWriter::create(ArchiveMetadata::from_config(config)).unwrap();
        for i in 0..20 {
            writer
                .open_entry(&EntryOptions::new(format!("file-{i:02}.txt")).method(CompressionMethod::Store))
                .unwrap();
            writer.write_data(&[i as u8; 100]).unwrap();
            writer.close_entry().unwrap();
        }
        let (written, _) = writer.finish().unwrap();
        assert!(written.volume_count() > 3);

        let opened = ArchiveMetadata::open(&path).unwrap();
        assert!(opened.is_split());
        assert_eq!(opened.volume_count(), written.volume_count());
        assert_eq!(opened.entries(), written.entries());
    }

    #[test]
    fn test_missing_volume_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.zip");
        let config = VolumeConfig::new_unchecked(&path, Some(256));
        let mut writer = ArchiveWriter::create(ArchiveMetadata::from_config(config)).unwrap();
        for i in 0..10 {
            writer
                .open_entry(&EntryOptions::new(format!("{i}")).method(CompressionMethod::Store))
                .unwrap();
            writer.write_data(&[0u8; 10]).unwrap();
            writer.close_entry().unwrap();
        }
        let (written, _) = writer.finish().unwrap();
        let cd_disk = written.end_record().cd_disk;
        assert!(cd_disk < written.end_record().disk_number, "central directory spans volumes");
        fs::remove_file(written.config().split_volume_path(cd_disk)).unwrap();
        assert!(matches!(ArchiveMetadata::open(&path), Err(Error::VolumeMissing { .. })));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.zip");
        fs::write(&path, vec![0xAAu8; 1000]).unwrap();
        assert!(matches!(ArchiveMetadata::open(&path), Err(Error::InvalidFormat(_))));
    }
}
