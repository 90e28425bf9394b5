//! Low-level binary reading utilities for ZIP record parsing.

use std::io::{self, Read};

/// Reads a single byte.
pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads an unsigned 16-bit little-endian integer.
pub fn read_u16_le<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Reads an unsigned 32-bit little-endian integer.
pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads an unsigned 64-bit little-endian integer.
pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Reads exact number of bytes into a new vector.
pub fn read_bytes<R: Read>(r: &mut R, count: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads a little-endian u16 at `pos` of a slice.
///
/// The caller guarantees `pos + 2 <= data.len()`.
#[inline]
pub(crate) fn u16_at(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

/// Reads a little-endian u32 at `pos` of a slice.
#[inline]
pub(crate) fn u32_at(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// Reads a little-endian u64 at `pos` of a slice.
#[inline]
pub(crate) fn u64_at(data: &[u8], pos: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[pos..pos + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_u16_le() {
        let data = [0x01, 0x02];
        let mut cursor = Cursor::new(&data);
        assert_eq!(read_u16_le(&mut cursor).unwrap(), 0x0201);
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut cursor = Cursor::new(&data);
        assert_eq!(read_u32_le(&mut cursor).unwrap(), 0x04030201);
    }

    #[test]
    fn test_read_u64_le() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut cursor = Cursor::new(&data);
        assert_eq!(read_u64_le(&mut cursor).unwrap(), 0x0807060504030201);
    }

    #[test]
    fn test_read_eof() {
        let data = [0x01u8];
        let mut cursor = Cursor::new(&data);
        assert!(read_u32_le(&mut cursor).is_err());
    }

    #[test]
    fn test_read_bytes() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut cursor = Cursor::new(&data);
        let result = read_bytes(&mut cursor, 3).unwrap();
        assert_eq!(result, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_slice_helpers() {
        let data = [0xAA, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(u16_at(&data, 1), 0x0201);
        assert_eq!(u32_at(&data, 1), 0x04030201);
        assert_eq!(u64_at(&data, 1), 0x0807060504030201);
    }
}
