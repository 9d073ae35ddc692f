//! Byte storage behind regular files and symlinks.

use crate::error::{VfsError, VfsResult};

/// A resizable byte buffer with positioned access.
///
/// The length is the file size. Gaps created by writing or truncating
/// past the end are zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Content {
    bytes: Vec<u8>,
}

impl Content {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer holding `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the whole buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copy bytes starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes copied; 0 means `offset` is at or past
    /// the end of data.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> usize {
        let len = self.bytes.len() as u64;
        if offset >= len {
            return 0;
        }
        let start = offset as usize;
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        n
    }

    /// Write `buf` at `offset`, growing the buffer as needed.
    ///
    /// Always writes the whole slice. An empty write never grows the
    /// buffer. Fails without touching the buffer if the end of the write
    /// cannot be addressed or allocated.
    pub fn write_at(&mut self, buf: &[u8], offset: u64) -> VfsResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or_else(|| VfsError::file_too_large(format!("write at offset {offset}")))?;
        self.grow_to(end)?;

        // Both bounds fit in usize once grow_to succeeds.
        let start = offset as usize;
        self.bytes[start..start + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    /// Resize to exactly `size` bytes.
    pub fn truncate(&mut self, size: u64) -> VfsResult<()> {
        match usize::try_from(size) {
            Ok(len) if len <= self.bytes.len() => {
                self.bytes.truncate(len);
                Ok(())
            }
            _ => self.grow_to(size),
        }
    }

    /// Zero-extend to at least `len` bytes.
    fn grow_to(&mut self, len: u64) -> VfsResult<()> {
        let too_large = || VfsError::file_too_large(format!("size {len}"));
        let len = usize::try_from(len).map_err(|_| too_large())?;
        if len > self.bytes.len() {
            self.bytes
                .try_reserve_exact(len - self.bytes.len())
                .map_err(|_| too_large())?;
            self.bytes.resize(len, 0);
        }
        Ok(())
    }

    /// Drop all bytes.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut c = Content::new();
        assert_eq!(c.write_at(b"hello world", 0).unwrap(), 11);
        assert_eq!(c.len(), 11);

        let mut buf = [0u8; 5];
        assert_eq!(c.read_at(&mut buf, 6), 5);
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_short_read_at_tail() {
        let c = Content::from_bytes(b"abc".to_vec());
        let mut buf = [0u8; 8];
        assert_eq!(c.read_at(&mut buf, 1), 2);
        assert_eq!(&buf[..2], b"bc");
    }

    #[test]
    fn test_read_past_end() {
        let c = Content::from_bytes(b"abc".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(c.read_at(&mut buf, 3), 0);
        assert_eq!(c.read_at(&mut buf, 100), 0);
    }

    #[test]
    fn test_write_past_end_zero_fills_gap() {
        let mut c = Content::from_bytes(b"ab".to_vec());
        c.write_at(b"xy", 5).unwrap();
        assert_eq!(c.as_bytes(), b"ab\0\0\0xy");
    }

    #[test]
    fn test_overwrite_inside_keeps_length() {
        let mut c = Content::from_bytes(b"abcdef".to_vec());
        c.write_at(b"XY", 2).unwrap();
        assert_eq!(c.as_bytes(), b"abXYef");
        assert_eq!(c.len(), 6);
    }

    #[test]
    fn test_truncate_shrink_then_grow_zeroes() {
        let mut c = Content::from_bytes(b"abcdef".to_vec());
        c.truncate(2).unwrap();
        assert_eq!(c.as_bytes(), b"ab");
        c.truncate(5).unwrap();
        assert_eq!(c.as_bytes(), b"ab\0\0\0");
    }

    #[test]
    fn test_length_is_max_of_old_and_write_end() {
        for (initial, offset, data) in [
            (&b"0123456789"[..], 3u64, &b"xyz"[..]),
            (&b"0123"[..], 2, &b"abcdef"[..]),
            (&b""[..], 4, &b"q"[..]),
        ] {
            let mut c = Content::from_bytes(initial.to_vec());
            c.write_at(data, offset).unwrap();
            let expected = initial.len().max(offset as usize + data.len());
            assert_eq!(c.len(), expected);

            let mut back = vec![0u8; data.len()];
            c.read_at(&mut back, offset);
            assert_eq!(back, data);
        }
    }

    #[test]
    fn test_empty_write_does_not_grow() {
        let mut c = Content::from_bytes(b"ab".to_vec());
        assert_eq!(c.write_at(b"", 1 << 40).unwrap(), 0);
        assert_eq!(c.write_at(b"", u64::MAX).unwrap(), 0);
        assert_eq!(c.as_bytes(), b"ab");
    }

    #[test]
    fn test_write_end_overflowing_u64_fails() {
        let mut c = Content::from_bytes(b"ab".to_vec());
        let err = c.write_at(b"x", u64::MAX).unwrap_err();
        assert!(matches!(&err, VfsError::Io(e) if e.kind() == std::io::ErrorKind::FileTooLarge));
        assert_eq!(c.as_bytes(), b"ab");
    }

    #[test]
    fn test_unallocatable_write_fails() {
        let mut c = Content::new();
        assert!(c.write_at(b"x", 1 << 63).is_err());
        assert!(c.is_empty());
    }

    #[test]
    fn test_unallocatable_truncate_fails() {
        let mut c = Content::from_bytes(b"abc".to_vec());
        assert!(c.truncate(u64::MAX).is_err());
        assert_eq!(c.as_bytes(), b"abc");

        c.truncate(1).unwrap();
        assert_eq!(c.as_bytes(), b"a");
    }
}
