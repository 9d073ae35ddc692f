//! Filesystem and file handle traits.
//!
//! These mirror the usual POSIX surface so an in-memory store can stand
//! in for a disk-backed one. A confinement layer (chroot, mount table)
//! is expected to sit in front and hand over absolute paths.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::VfsResult;
use crate::types::{Capability, FileInfo, OpenFlags};

/// An open file.
pub trait File: io::Read + io::Write + io::Seek + Send + std::fmt::Debug {
    /// Path the handle was opened with.
    fn name(&self) -> &Path;

    /// Read at `offset` without moving the position.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize>;

    /// Write at `offset` without moving the position.
    fn write_at(&self, buf: &[u8], offset: u64) -> VfsResult<usize>;

    /// Resize the file to `size` bytes.
    fn truncate(&mut self, size: u64) -> VfsResult<()>;

    /// Close the handle. Fails if already closed.
    fn close(&mut self) -> VfsResult<()>;

    /// Acquire an advisory lock.
    fn lock(&self) -> VfsResult<()>;

    /// Release an advisory lock.
    fn unlock(&self) -> VfsResult<()>;

    /// Current metadata of the underlying file.
    fn stat(&self) -> VfsResult<FileInfo>;
}

/// Core filesystem operations.
pub trait Filesystem: Send + Sync {
    /// Handle type returned by open calls.
    type File: File;

    /// Create or truncate a file, opened read-write.
    fn create(&self, path: &Path) -> VfsResult<Self::File>;

    /// Open an existing file read-only.
    fn open(&self, path: &Path) -> VfsResult<Self::File> {
        self.open_file(path, OpenFlags::RDONLY, 0)
    }

    /// Open with explicit flags; `perm` applies when a file is created.
    fn open_file(&self, path: &Path, flags: OpenFlags, perm: u32) -> VfsResult<Self::File>;

    /// Metadata, following symlinks.
    fn stat(&self, path: &Path) -> VfsResult<FileInfo>;

    /// Metadata of the entry itself, never following symlinks.
    fn lstat(&self, path: &Path) -> VfsResult<FileInfo>;

    /// Directory listing sorted by name.
    fn read_dir(&self, path: &Path) -> VfsResult<Vec<FileInfo>>;

    /// Create a directory and any missing parents.
    fn mkdir_all(&self, path: &Path, perm: u32) -> VfsResult<()>;

    /// Rename a file or directory.
    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Remove a file or an empty directory.
    fn remove(&self, path: &Path) -> VfsResult<()>;

    /// Create a symlink at `link` pointing to `target`.
    fn symlink(&self, target: &Path, link: &Path) -> VfsResult<()>;

    /// Read a symlink's stored target.
    fn readlink(&self, link: &Path) -> VfsResult<PathBuf>;

    /// Create and open a new uniquely named file in `dir`.
    fn temp_file(&self, dir: &Path, prefix: &str) -> VfsResult<Self::File>;

    /// Operations this filesystem supports.
    fn capabilities(&self) -> Capability;

    /// Join path elements and clean the result lexically.
    ///
    /// Empty elements are skipped and later elements never reset to the
    /// root. A relative result that cleans away entirely is `.`.
    fn join(&self, elems: &[&str]) -> PathBuf {
        let elems: Vec<&str> = elems.iter().copied().filter(|e| !e.is_empty()).collect();
        let Some(first) = elems.first() else {
            return PathBuf::new();
        };
        let absolute = first.starts_with('/');

        let mut parts: Vec<&str> = Vec::new();
        for part in elems.iter().flat_map(|e| e.split('/')) {
            match part {
                "" | "." => {}
                ".." => {
                    if parts.last().is_some_and(|p| *p != "..") {
                        parts.pop();
                    } else if !absolute {
                        parts.push("..");
                    }
                }
                name => parts.push(name),
            }
        }

        let mut joined = if absolute {
            PathBuf::from("/")
        } else {
            PathBuf::new()
        };
        joined.extend(parts);
        if joined.as_os_str().is_empty() {
            joined.push(".");
        }
        joined
    }
}

/// Metadata mutation.
pub trait Change {
    /// Set permission bits.
    fn chmod(&self, path: &Path, perm: u32) -> VfsResult<()>;

    /// Set access and modification times.
    fn chtimes(&self, path: &Path, atime: SystemTime, mtime: SystemTime) -> VfsResult<()>;
}
