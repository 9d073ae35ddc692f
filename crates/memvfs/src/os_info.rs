//! Low-level identity fields of real filesystem entries.
//!
//! The in-memory tree has no inodes, owners, or devices. Collaborators
//! that stat real files and need those fields decode them here.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Platform identity fields of a real filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsFileInfo {
    /// Number of hard links.
    pub nlink: u32,
    /// Owning user ID.
    pub uid: u32,
    /// Owning group ID.
    pub gid: u32,
    /// Device major number (of the device this entry represents).
    pub major: u32,
    /// Device minor number.
    pub minor: u32,
    /// Inode number.
    pub inode: u64,
    /// Last access time, nanosecond precision.
    pub atime: SystemTime,
    /// Last status change time, nanosecond precision.
    pub ctime: SystemTime,
}

/// Decode identity fields from OS metadata.
///
/// Returns `None` on targets that do not expose a Unix stat structure.
#[cfg(unix)]
pub fn from_metadata(meta: &std::fs::Metadata) -> Option<OsFileInfo> {
    use std::os::unix::fs::MetadataExt;

    let rdev = meta.rdev() as rustix::fs::Dev;
    Some(OsFileInfo {
        nlink: meta.nlink() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        major: rustix::fs::major(rdev),
        minor: rustix::fs::minor(rdev),
        inode: meta.ino(),
        atime: unix_time(meta.atime(), meta.atime_nsec()),
        ctime: unix_time(meta.ctime(), meta.ctime_nsec()),
    })
}

#[cfg(not(unix))]
pub fn from_metadata(_meta: &std::fs::Metadata) -> Option<OsFileInfo> {
    None
}

/// Seconds plus nanoseconds since the epoch; seconds may be negative.
#[cfg(unix)]
fn unix_time(secs: i64, nsec: i64) -> SystemTime {
    use std::time::{Duration, UNIX_EPOCH};

    let nanos = Duration::from_nanos(nsec.clamp(0, 999_999_999) as u64);
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64) + nanos
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + nanos
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_regular_file_identity() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let meta = std::fs::metadata(file.path()).unwrap();

        let info = from_metadata(&meta).expect("unix metadata");
        assert!(info.nlink >= 1);
        assert_eq!(info.inode, meta.ino());
        assert_eq!(info.uid, meta.uid());
        assert_eq!(info.gid, meta.gid());
        // Regular files are not device nodes.
        assert_eq!((info.major, info.minor), (0, 0));
        assert!(info.ctime > UNIX_EPOCH);
    }

    #[test]
    fn test_directory_link_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("child")).unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();

        let info = from_metadata(&meta).unwrap();
        assert_eq!(info.nlink as u64, meta.nlink());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_device_numbers() {
        // /dev/null is character device 1:3 on Linux.
        let meta = std::fs::metadata("/dev/null").unwrap();
        let info = from_metadata(&meta).unwrap();
        assert_eq!((info.major, info.minor), (1, 3));
    }

    #[test]
    fn test_unix_time() {
        assert_eq!(unix_time(0, 0), UNIX_EPOCH);
        assert_eq!(
            unix_time(10, 500),
            UNIX_EPOCH + Duration::from_secs(10) + Duration::from_nanos(500)
        );
        assert_eq!(unix_time(-1, 0), UNIX_EPOCH - Duration::from_secs(1));
    }
}
