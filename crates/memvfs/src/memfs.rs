//! In-memory filesystem.
//!
//! All data is ephemeral and lost when the [`MemFs`] is dropped.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

use crate::config::MemFsConfig;
use crate::content::Content;
use crate::error::{VfsError, VfsResult};
use crate::handle::MemFile;
use crate::ops::{Change, Filesystem};
use crate::storage::{base_name, normalize, EntryRef, Storage};
use crate::types::{Capability, FileInfo, FileMode, OpenFlags, PERM_MASK};

/// In-memory filesystem.
///
/// Thread-safe via internal `RwLock`s, but there is no cross-call
/// atomicity: callers that need it serialize access themselves.
#[derive(Debug)]
pub struct MemFs {
    storage: RwLock<Storage>,
    config: MemFsConfig,
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a symlink entry at `path` points, made absolute.
///
/// Relative targets are taken from the link's own directory.
fn link_target(path: &Path, entry: &EntryRef) -> Option<PathBuf> {
    let target = PathBuf::from(entry.read().link_target()?);
    if target.has_root() {
        Some(normalize(&target))
    } else {
        let dir = path.parent().unwrap_or(Path::new("/"));
        Some(normalize(&dir.join(target)))
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

impl MemFs {
    /// Create an empty filesystem holding only `/`.
    pub fn new() -> Self {
        Self::with_config(MemFsConfig::default())
    }

    /// Create an empty filesystem with explicit settings.
    pub fn with_config(config: MemFsConfig) -> Self {
        Self {
            storage: RwLock::new(Storage::new(config.default_dir_perm)),
            config,
        }
    }

    /// Active settings.
    pub fn config(&self) -> &MemFsConfig {
        &self.config
    }

    fn get(&self, path: &Path) -> Option<EntryRef> {
        self.storage.read().get(path)
    }

    /// Count one symlink hop, failing once the configured limit is passed.
    fn hop(&self, hops: &mut u32, origin: &Path) -> VfsResult<()> {
        *hops += 1;
        if *hops > self.config.max_symlink_depth {
            return Err(VfsError::too_many_symlinks(path_str(origin)));
        }
        Ok(())
    }

    /// Follow symlinks from `path` to the entry they designate.
    fn resolve(&self, path: &Path) -> VfsResult<(PathBuf, EntryRef)> {
        let mut current = normalize(path);
        let mut hops = 0;
        loop {
            let entry = self
                .get(&current)
                .ok_or_else(|| VfsError::not_found(path_str(&current)))?;
            match link_target(&current, &entry) {
                Some(target) => {
                    self.hop(&mut hops, path)?;
                    current = target;
                }
                None => return Ok((current, entry)),
            }
        }
    }

    /// Remove `path` and everything beneath it.
    ///
    /// Returns the number of entries removed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn remove_all(&self, path: &Path) -> VfsResult<usize> {
        self.storage.write().remove_all(path)
    }
}

impl Filesystem for MemFs {
    type File = MemFile;

    fn create(&self, path: &Path) -> VfsResult<MemFile> {
        self.open_file(
            path,
            OpenFlags::RDWR | OpenFlags::CREATE | OpenFlags::TRUNC,
            self.config.default_file_perm,
        )
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn open_file(&self, path: &Path, flags: OpenFlags, perm: u32) -> VfsResult<MemFile> {
        let mut current = normalize(path);
        let mut hops = 0;

        let entry = loop {
            match self.get(&current) {
                None => {
                    if !flags.is_create() {
                        return Err(VfsError::not_found(path_str(&current)));
                    }
                    break self.storage.write().create(
                        &current,
                        FileMode::file(perm),
                        flags.is_exclusive(),
                    )?;
                }
                Some(entry) => {
                    if flags.is_exclusive() {
                        return Err(VfsError::already_exists(path_str(&current)));
                    }
                    match link_target(&current, &entry) {
                        Some(target) => {
                            self.hop(&mut hops, path)?;
                            current = target;
                        }
                        None => break entry,
                    }
                }
            }
        };

        if entry.read().mode.is_dir() {
            return Err(VfsError::is_a_directory(path_str(&current)));
        }

        Ok(MemFile::open(path.to_path_buf(), entry, flags))
    }

    fn stat(&self, path: &Path) -> VfsResult<FileInfo> {
        let (_, entry) = self.resolve(path)?;
        // Report the name that was asked for, even through a symlink.
        let info = entry.read().info(base_name(path));
        Ok(info)
    }

    fn lstat(&self, path: &Path) -> VfsResult<FileInfo> {
        let entry = self
            .get(path)
            .ok_or_else(|| VfsError::not_found(path_str(&normalize(path))))?;
        let info = entry.read().info(base_name(path));
        Ok(info)
    }

    fn read_dir(&self, path: &Path) -> VfsResult<Vec<FileInfo>> {
        let (resolved, entry) = self.resolve(path)?;
        if !entry.read().mode.is_dir() {
            return Err(VfsError::not_a_directory(path_str(&resolved)));
        }

        let children = self.storage.read().children(&resolved);
        Ok(children
            .into_iter()
            .map(|(name, child)| child.read().info(name))
            .collect())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn mkdir_all(&self, path: &Path, perm: u32) -> VfsResult<()> {
        self.storage
            .write()
            .create(path, FileMode::directory(perm), false)?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.storage.write().rename(from, to)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn remove(&self, path: &Path) -> VfsResult<()> {
        self.storage.write().remove(path)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn symlink(&self, target: &Path, link: &Path) -> VfsResult<()> {
        let target = target.to_string_lossy().into_owned();
        let mut storage = self.storage.write();
        // Any existing entry, dangling links included, blocks the new link.
        let entry = storage.create(link, FileMode::symlink(), true)?;
        entry.write().content = Some(Content::from_bytes(target));
        Ok(())
    }

    fn readlink(&self, link: &Path) -> VfsResult<PathBuf> {
        let entry = self
            .get(link)
            .ok_or_else(|| VfsError::not_found(path_str(&normalize(link))))?;
        let target = entry.read().link_target();
        target
            .map(PathBuf::from)
            .ok_or_else(|| VfsError::not_a_symlink(path_str(&normalize(link))))
    }

    fn temp_file(&self, dir: &Path, prefix: &str) -> VfsResult<MemFile> {
        let dir = normalize(dir);
        for _ in 0..self.config.temp_attempts {
            let path = dir.join(format!("{prefix}{}", Uuid::new_v4().simple()));
            match self.open_file(
                &path,
                OpenFlags::RDWR | OpenFlags::CREATE | OpenFlags::EXCL,
                0o600,
            ) {
                Err(VfsError::AlreadyExists(existing)) => {
                    tracing::warn!(path = %existing, "temp file name collision, retrying");
                }
                other => return other,
            }
        }
        Err(VfsError::other(format!(
            "could not create temp file in {}",
            dir.display()
        )))
    }

    fn capabilities(&self) -> Capability {
        Capability::WRITE
            | Capability::READ
            | Capability::READ_AND_WRITE
            | Capability::SEEK
            | Capability::TRUNCATE
    }
}

impl Change for MemFs {
    fn chmod(&self, path: &Path, perm: u32) -> VfsResult<()> {
        let (_, entry) = self.resolve(path)?;
        entry.write().mode.perm = perm & PERM_MASK;
        Ok(())
    }

    /// Virtual entries keep no access time; `atime` is discarded.
    fn chtimes(&self, path: &Path, _atime: SystemTime, mtime: SystemTime) -> VfsResult<()> {
        let (_, entry) = self.resolve(path)?;
        entry.write().mtime = mtime;
        Ok(())
    }
}
