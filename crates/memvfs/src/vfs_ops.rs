//! Path-based async operations.
//!
//! This trait exposes the filesystem in a way that's designed for RPC:
//! path-based, no handle state, explicit offset/size. [`MemFs`] implements
//! it on top of its handle API so it can be mounted behind an async
//! router.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{VfsError, VfsResult};
use crate::memfs::MemFs;
use crate::ops::{File, Filesystem};
use crate::types::{FileInfo, OpenFlags};

/// Path-based VFS operations.
///
/// Paths are absolute within the backend. Nothing here follows a symlink
/// except `read`, `write` and `truncate`, which act on file content.
#[async_trait]
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get entry attributes (symlinks are not followed).
    async fn getattr(&self, path: &Path) -> VfsResult<FileInfo>;

    /// Read directory entries.
    ///
    /// Returns all entries in the directory (no pagination).
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<FileInfo>>;

    /// Read file contents.
    ///
    /// Reads up to `size` bytes starting at `offset`.
    /// Returns fewer bytes if EOF is reached.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    /// Read symbolic link target.
    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write data to an existing file at `offset`.
    ///
    /// Returns the number of bytes written.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32>;

    /// Create a new, empty file. Fails if the path exists.
    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileInfo>;

    /// Create a directory (and parents). Existing directories are fine.
    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileInfo>;

    /// Remove a file, symlink or empty directory.
    async fn remove(&self, path: &Path) -> VfsResult<()>;

    /// Rename a file or directory.
    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Truncate a file to the specified size.
    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    /// Create a symbolic link at `path` pointing to `target`.
    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileInfo>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Returns true if this filesystem is read-only.
    fn read_only(&self) -> bool;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read entire file contents.
    async fn read_all(&self, path: &Path) -> VfsResult<Vec<u8>> {
        const CHUNK: u32 = 64 * 1024;
        let mut data = Vec::new();
        loop {
            let chunk = self.read(path, data.len() as u64, CHUNK).await?;
            let done = chunk.len() < CHUNK as usize;
            data.extend_from_slice(&chunk);
            if done {
                return Ok(data);
            }
        }
    }

    /// Write entire file contents.
    ///
    /// Convenience method that truncates and writes the whole file.
    async fn write_all(&self, path: &Path, data: &[u8]) -> VfsResult<()> {
        // Create or truncate
        if self.exists(path).await {
            self.truncate(path, 0).await?;
        } else {
            self.create(path, 0o644).await?;
        }
        self.write(path, 0, data).await?;
        Ok(())
    }
}

/// Byte count as reported over the wire, which is capped at `u32`.
fn byte_count(n: usize) -> VfsResult<u32> {
    u32::try_from(n)
        .map_err(|_| VfsError::file_too_large(format!("{n} bytes in one write")))
}

#[async_trait]
impl VfsOps for MemFs {
    async fn getattr(&self, path: &Path) -> VfsResult<FileInfo> {
        Filesystem::lstat(self, path)
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<FileInfo>> {
        Filesystem::read_dir(self, path)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let file = Filesystem::open(self, path)?;
        let mut buf = vec![0u8; size as usize];
        let n = file.read_at(&mut buf, offset)?;
        buf.truncate(n);
        Ok(buf)
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        Filesystem::readlink(self, path)
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let file = self.open_file(path, OpenFlags::WRONLY, 0)?;
        byte_count(file.write_at(data, offset)?)
    }

    async fn create(&self, path: &Path, mode: u32) -> VfsResult<FileInfo> {
        let file = self.open_file(
            path,
            OpenFlags::RDWR | OpenFlags::CREATE | OpenFlags::EXCL,
            mode,
        )?;
        file.stat()
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<FileInfo> {
        self.mkdir_all(path, mode)?;
        Filesystem::lstat(self, path)
    }

    async fn remove(&self, path: &Path) -> VfsResult<()> {
        Filesystem::remove(self, path)
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        Filesystem::rename(self, from, to)
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        let mut file = self.open_file(path, OpenFlags::WRONLY, 0)?;
        file.truncate(size)
    }

    async fn symlink(&self, path: &Path, target: &Path) -> VfsResult<FileInfo> {
        Filesystem::symlink(self, target, path)?;
        Filesystem::lstat(self, path)
    }

    fn read_only(&self) -> bool {
        false
    }
}
