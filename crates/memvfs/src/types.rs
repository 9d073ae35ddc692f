//! Core VFS types.
//!
//! Metadata types are serializable so they can cross an RPC boundary;
//! flag sets are `bitflags` with Linux `fcntl.h` bit values.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::os_info::{self, OsFileInfo};

/// Mask applied to permission bits (rwx for user/group/other plus setuid/setgid/sticky).
pub const PERM_MASK: u32 = 0o7777;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// Entry kind plus permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMode {
    /// Entry kind.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
}

impl FileMode {
    /// Mode for a regular file.
    pub fn file(perm: u32) -> Self {
        Self {
            kind: FileType::File,
            perm: perm & PERM_MASK,
        }
    }

    /// Mode for a directory.
    pub fn directory(perm: u32) -> Self {
        Self {
            kind: FileType::Directory,
            perm: perm & PERM_MASK,
        }
    }

    /// Mode for a symbolic link. Link permissions are always 0o777.
    pub fn symlink() -> Self {
        Self {
            kind: FileType::Symlink,
            perm: 0o777,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

/// Result of a stat call.
///
/// `os` carries identity fields only a real filesystem can supply; it is
/// always `None` for in-memory entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// Base name of the path that was asked for.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Kind and permissions.
    pub mode: FileMode,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Platform identity fields, when backed by a real OS entry.
    pub os: Option<OsFileInfo>,
}

impl FileInfo {
    /// Build a portable FileInfo from real OS metadata.
    pub fn from_metadata(name: impl Into<String>, meta: &std::fs::Metadata) -> Self {
        let file_type = meta.file_type();
        let kind = if file_type.is_dir() {
            FileType::Directory
        } else if file_type.is_symlink() {
            FileType::Symlink
        } else {
            FileType::File
        };

        Self {
            name: name.into(),
            size: meta.len(),
            mode: FileMode {
                kind,
                perm: permission_bits(meta),
            },
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            os: os_info::from_metadata(meta),
        }
    }

    /// Base name of the entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.mode.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.mode.is_symlink()
    }
}

#[cfg(unix)]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & PERM_MASK
}

#[cfg(not(unix))]
fn permission_bits(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o666 }
}

bitflags! {
    /// Open file flags.
    ///
    /// The access mode is the low two bits: no bit set means read-only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Write-only access.
        const WRONLY = 0o1;
        /// Read and write access.
        const RDWR = 0o2;
        /// Create if not exists.
        const CREATE = 0o100;
        /// Exclusive create (fail if exists).
        const EXCL = 0o200;
        /// Truncate on open.
        const TRUNC = 0o1000;
        /// Every write lands at end of file.
        const APPEND = 0o2000;
    }
}

impl OpenFlags {
    /// Read-only access.
    pub const RDONLY: OpenFlags = OpenFlags::empty();

    /// Returns true if the access mode permits reads.
    pub fn can_read(&self) -> bool {
        !self.contains(OpenFlags::WRONLY)
    }

    /// Returns true if the access mode permits writes.
    pub fn can_write(&self) -> bool {
        self.intersects(OpenFlags::WRONLY | OpenFlags::RDWR)
    }

    /// Returns true if a missing file should be created.
    pub fn is_create(&self) -> bool {
        self.contains(OpenFlags::CREATE)
    }

    /// Returns true if an existing path must be rejected.
    pub fn is_exclusive(&self) -> bool {
        self.contains(OpenFlags::EXCL)
    }

    /// Returns true if the file is emptied on open.
    pub fn is_truncate(&self) -> bool {
        self.contains(OpenFlags::TRUNC)
    }

    /// Returns true if writes go to end of file.
    pub fn is_append(&self) -> bool {
        self.contains(OpenFlags::APPEND)
    }
}

bitflags! {
    /// Operations a filesystem implementation supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capability: u32 {
        /// Files can be written.
        const WRITE = 1 << 0;
        /// Files can be read.
        const READ = 1 << 1;
        /// A single handle can both read and write.
        const READ_AND_WRITE = 1 << 2;
        /// Handles can seek.
        const SEEK = 1 << 3;
        /// Handles can truncate.
        const TRUNCATE = 1 << 4;
        /// Lock/unlock provide real mutual exclusion.
        const LOCK = 1 << 5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
        assert!(FileType::Symlink.is_symlink());
    }

    #[test]
    fn test_file_mode_constructors() {
        let file = FileMode::file(0o100644);
        assert!(file.is_file());
        assert_eq!(file.perm, 0o644);

        let dir = FileMode::directory(0o755);
        assert!(dir.is_dir());
        assert_eq!(dir.perm, 0o755);

        assert_eq!(FileMode::symlink().perm, 0o777);
    }

    #[test]
    fn test_open_flags_access_mode() {
        assert!(OpenFlags::RDONLY.can_read());
        assert!(!OpenFlags::RDONLY.can_write());

        assert!(!OpenFlags::WRONLY.can_read());
        assert!(OpenFlags::WRONLY.can_write());

        let rw = OpenFlags::RDWR | OpenFlags::CREATE | OpenFlags::TRUNC;
        assert!(rw.can_read());
        assert!(rw.can_write());
        assert!(rw.is_create());
        assert!(rw.is_truncate());
        assert!(!rw.is_exclusive());

        // Creation flags do not change the access mode.
        let ro_create = OpenFlags::RDONLY | OpenFlags::CREATE;
        assert!(ro_create.can_read());
        assert!(!ro_create.can_write());
    }

    #[test]
    fn test_open_flags_from_raw_bits() {
        // O_WRONLY | O_CREAT | O_APPEND on Linux
        let flags = OpenFlags::from_bits_truncate(0o1 | 0o100 | 0o2000);
        assert!(flags.can_write());
        assert!(flags.is_create());
        assert!(flags.is_append());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_info_from_metadata() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"twelve bytes").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        let info = FileInfo::from_metadata("data.bin", &std::fs::metadata(&path).unwrap());
        assert_eq!(info.name(), "data.bin");
        assert_eq!(info.size, 12);
        assert!(info.is_file());
        assert_eq!(info.mode.perm, 0o640);
        assert!(info.os.is_some_and(|os| os.nlink == 1));

        let dir_info = FileInfo::from_metadata("d", &std::fs::metadata(dir.path()).unwrap());
        assert!(dir_info.is_dir());
    }
}
