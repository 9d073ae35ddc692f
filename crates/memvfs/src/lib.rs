//! # memvfs
//!
//! In-process virtual filesystem. A tree of files, directories and
//! symlinks lives entirely in memory and is driven through handles that
//! behave like file descriptors.
//!
//! Key components:
//!
//! - [`MemFs`] - The filesystem: open/create/stat/rename/remove/symlink
//! - [`MemFile`] - An open handle, implementing `Read`/`Write`/`Seek`
//! - [`Filesystem`] / [`File`] - Traits a disk-backed store can implement too
//! - [`VfsOps`] - Path-based async surface for mounting behind an RPC layer
//! - [`os_info`] - Identity fields (inode, owner, device) of real OS entries
//!
//! ## Design Decisions
//!
//! - **Flat path index**: entries are keyed by normalized absolute path;
//!   listings filter on parent path.
//! - **Shared entries**: every handle holds a reference to the entry it
//!   was opened on, so writes are visible through all handles at once and
//!   an open handle outlives removal of its path.
//! - **No real locking**: `lock`/`unlock` on handles are no-ops.

mod config;
mod content;
mod error;
mod handle;
mod memfs;
mod ops;
pub mod os_info;
mod storage;
mod types;
mod vfs_ops;

pub use config::{MemFsConfig, DEFAULT_MAX_SYMLINK_DEPTH};
pub use content::Content;
pub use error::{VfsError, VfsResult};
pub use handle::MemFile;
pub use memfs::MemFs;
pub use ops::{Change, File, Filesystem};
pub use os_info::OsFileInfo;
pub use types::{Capability, FileInfo, FileMode, FileType, OpenFlags, PERM_MASK};
pub use vfs_ops::VfsOps;
