//! Path-indexed entry registry.
//!
//! Entries live in a flat map keyed by normalized absolute path. Children
//! of a directory are found by filtering keys on their parent, which is
//! fine for the tree sizes this store is meant for.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::content::Content;
use crate::error::{VfsError, VfsResult};
use crate::types::{FileInfo, FileMode};

/// An entry shared between the tree and every handle open on it.
pub(crate) type EntryRef = Arc<RwLock<Entry>>;

/// One node of the tree.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) mode: FileMode,
    pub(crate) mtime: SystemTime,
    /// `None` for directories. For symlinks, the UTF-8 target path.
    pub(crate) content: Option<Content>,
}

impl Entry {
    fn new(mode: FileMode) -> Self {
        let content = if mode.is_dir() {
            None
        } else {
            Some(Content::new())
        };
        Self {
            mode,
            mtime: SystemTime::now(),
            content,
        }
    }

    fn shared(mode: FileMode) -> EntryRef {
        Arc::new(RwLock::new(Self::new(mode)))
    }

    /// Size in bytes (0 for directories).
    pub(crate) fn size(&self) -> u64 {
        self.content.as_ref().map_or(0, |c| c.len() as u64)
    }

    /// Refresh the modification time.
    pub(crate) fn touch(&mut self) {
        self.mtime = SystemTime::now();
    }

    /// Stored target if this is a symlink.
    pub(crate) fn link_target(&self) -> Option<String> {
        if !self.mode.is_symlink() {
            return None;
        }
        self.content
            .as_ref()
            .map(|c| String::from_utf8_lossy(c.as_bytes()).into_owned())
    }

    /// Metadata for this entry, reported under `name`.
    pub(crate) fn info(&self, name: impl Into<String>) -> FileInfo {
        FileInfo {
            name: name.into(),
            size: self.size(),
            mode: self.mode,
            mtime: self.mtime,
            os: None,
        }
    }
}

/// Normalize a path: make it absolute, resolve `.` and `..` lexically.
///
/// `..` never climbs above `/`.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(s) => result.push(s),
        }
    }
    result
}

/// Last component of a normalized path, or `/` for the root.
pub(crate) fn base_name(path: &Path) -> String {
    normalize(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string())
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

fn is_root(path: &Path) -> bool {
    path.parent().is_none()
}

/// The entry tree.
#[derive(Debug)]
pub(crate) struct Storage {
    entries: HashMap<PathBuf, EntryRef>,
    /// Permissions for directories created implicitly as parents.
    dir_perm: u32,
}

impl Storage {
    /// Create a tree holding only the root directory.
    pub(crate) fn new(dir_perm: u32) -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::from("/"),
            Entry::shared(FileMode::directory(dir_perm)),
        );
        Self { entries, dir_perm }
    }

    /// Number of entries, root included.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Exact lookup. No symlink is followed.
    pub(crate) fn get(&self, path: &Path) -> Option<EntryRef> {
        self.entries.get(&normalize(path)).cloned()
    }

    /// Create an entry at `path`, creating missing parent directories.
    ///
    /// An existing entry is reused when the kinds agree and `exclusive` is
    /// not set.
    pub(crate) fn create(
        &mut self,
        path: &Path,
        mode: FileMode,
        exclusive: bool,
    ) -> VfsResult<EntryRef> {
        let path = normalize(path);

        if let Some(existing) = self.entries.get(&path) {
            if exclusive {
                return Err(VfsError::already_exists(path_str(&path)));
            }
            let existing_mode = existing.read().mode;
            if existing_mode.kind != mode.kind {
                return Err(VfsError::already_exists(path_str(&path)));
            }
            return Ok(Arc::clone(existing));
        }

        let parent_perm = if mode.is_dir() { mode.perm } else { self.dir_perm };
        self.ensure_parents(&path, parent_perm)?;

        let entry = Entry::shared(mode);
        self.entries.insert(path.clone(), Arc::clone(&entry));
        tracing::debug!(path = %path.display(), kind = ?mode.kind, "created entry");
        Ok(entry)
    }

    /// Ensure every ancestor of `path` exists as a directory.
    ///
    /// Nothing is inserted unless every existing ancestor is a directory.
    fn ensure_parents(&mut self, path: &Path, perm: u32) -> VfsResult<()> {
        let mut missing = Vec::new();
        for ancestor in path.ancestors().skip(1) {
            match self.entries.get(ancestor) {
                Some(entry) => {
                    if !entry.read().mode.is_dir() {
                        return Err(VfsError::not_a_directory(path_str(ancestor)));
                    }
                }
                None => missing.push(ancestor.to_path_buf()),
            }
        }

        for dir in missing.into_iter().rev() {
            tracing::debug!(path = %dir.display(), "created implicit parent");
            self.entries
                .insert(dir, Entry::shared(FileMode::directory(perm)));
        }
        Ok(())
    }

    /// Direct children of `path`, sorted by name.
    pub(crate) fn children(&self, path: &Path) -> Vec<(String, EntryRef)> {
        let path = normalize(path);
        let mut result: Vec<(String, EntryRef)> = self
            .entries
            .iter()
            .filter(|(key, _)| key.parent() == Some(path.as_path()))
            .filter_map(|(key, entry)| {
                key.file_name()
                    .map(|name| (name.to_string_lossy().into_owned(), Arc::clone(entry)))
            })
            .collect();

        // Sort for consistent ordering
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    fn has_children(&self, path: &Path) -> bool {
        self.entries.keys().any(|k| k.parent() == Some(path))
    }

    /// Move `from` (and everything under it) to `to`.
    ///
    /// Only keys change; entries and their content are moved as-is.
    pub(crate) fn rename(&mut self, from: &Path, to: &Path) -> VfsResult<()> {
        let from = normalize(from);
        let to = normalize(to);

        if is_root(&from) || is_root(&to) {
            return Err(VfsError::permission_denied("cannot rename root"));
        }

        let entry = self
            .entries
            .get(&from)
            .ok_or_else(|| VfsError::not_found(path_str(&from)))?;
        if from == to {
            return Ok(());
        }

        let is_dir = entry.read().mode.is_dir();
        if is_dir && to.starts_with(&from) {
            return Err(VfsError::invalid_path(format!(
                "cannot move {} into itself",
                from.display()
            )));
        }

        if let Some(existing) = self.entries.get(&to) {
            let existing_is_dir = existing.read().mode.is_dir();
            match (is_dir, existing_is_dir) {
                (true, false) => return Err(VfsError::not_a_directory(path_str(&to))),
                (false, true) => return Err(VfsError::is_a_directory(path_str(&to))),
                (true, true) if self.has_children(&to) => {
                    return Err(VfsError::directory_not_empty(path_str(&to)));
                }
                _ => {}
            }
        }

        self.ensure_parents(&to, self.dir_perm)?;

        let moved: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|k| k.starts_with(&from))
            .cloned()
            .collect();

        for old in moved {
            let Some(entry) = self.entries.remove(&old) else {
                continue;
            };
            let new_path = match old.strip_prefix(&from) {
                Ok(rel) if !rel.as_os_str().is_empty() => to.join(rel),
                _ => to.clone(),
            };
            self.entries.insert(new_path, entry);
        }

        tracing::debug!(from = %from.display(), to = %to.display(), "renamed");
        Ok(())
    }

    /// Remove a single entry. Directories must be empty.
    pub(crate) fn remove(&mut self, path: &Path) -> VfsResult<()> {
        let path = normalize(path);

        if is_root(&path) {
            return Err(VfsError::permission_denied("cannot remove root"));
        }

        let entry = self
            .entries
            .get(&path)
            .ok_or_else(|| VfsError::not_found(path_str(&path)))?;

        if entry.read().mode.is_dir() && self.has_children(&path) {
            return Err(VfsError::directory_not_empty(path_str(&path)));
        }

        self.entries.remove(&path);
        tracing::debug!(path = %path.display(), "removed");
        Ok(())
    }

    /// Remove an entry and everything beneath it.
    ///
    /// Returns the number of entries removed.
    pub(crate) fn remove_all(&mut self, path: &Path) -> VfsResult<usize> {
        let path = normalize(path);

        if is_root(&path) {
            return Err(VfsError::permission_denied("cannot remove root"));
        }
        if !self.entries.contains_key(&path) {
            return Err(VfsError::not_found(path_str(&path)));
        }

        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(&path));
        let removed = before - self.entries.len();
        tracing::debug!(path = %path.display(), removed, "removed tree");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> Storage {
        Storage::new(0o755)
    }

    fn file(perm: u32) -> FileMode {
        FileMode::file(perm)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/b")), Path::new("/a/b"));
        assert_eq!(normalize(Path::new("/a/./b/")), Path::new("/a/b"));
        assert_eq!(normalize(Path::new("/a/b/../c")), Path::new("/a/c"));
        assert_eq!(normalize(Path::new("/../..")), Path::new("/"));
        assert_eq!(normalize(Path::new("")), Path::new("/"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/a/b/f.txt")), "f.txt");
        assert_eq!(base_name(Path::new("/")), "/");
    }

    #[test]
    fn test_get_absent_is_none() {
        let s = storage();
        assert!(s.get(Path::new("/missing")).is_none());
        assert!(s.get(Path::new("/")).is_some());
    }

    #[test]
    fn test_create_makes_parents() {
        let mut s = storage();
        s.create(Path::new("/a/b/c/file.txt"), file(0o644), false)
            .unwrap();

        for dir in ["/a", "/a/b", "/a/b/c"] {
            let entry = s.get(Path::new(dir)).unwrap();
            let entry = entry.read();
            assert!(entry.mode.is_dir());
            assert_eq!(entry.mode.perm, 0o755);
        }
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn test_mkdir_parents_inherit_perm() {
        let mut s = storage();
        s.create(Path::new("/x/y"), FileMode::directory(0o700), false)
            .unwrap();
        assert_eq!(s.get(Path::new("/x")).unwrap().read().mode.perm, 0o700);
    }

    #[test]
    fn test_create_exclusive_conflict() {
        let mut s = storage();
        s.create(Path::new("/f"), file(0o644), false).unwrap();
        let err = s.create(Path::new("/f"), file(0o644), true).unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));
    }

    #[test]
    fn test_create_reuses_existing() {
        let mut s = storage();
        let first = s.create(Path::new("/f"), file(0o644), false).unwrap();
        let second = s.create(Path::new("/f"), file(0o600), false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_create_kind_mismatch() {
        let mut s = storage();
        s.create(Path::new("/f"), file(0o644), false).unwrap();
        let err = s
            .create(Path::new("/f"), FileMode::directory(0o755), false)
            .unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));
    }

    #[test]
    fn test_create_under_file_fails_cleanly() {
        let mut s = storage();
        s.create(Path::new("/f"), file(0o644), false).unwrap();
        let before = s.len();

        let err = s
            .create(Path::new("/f/g/h"), file(0o644), false)
            .unwrap_err();
        assert!(matches!(err, VfsError::NotADirectory(_)));
        assert_eq!(s.len(), before);
    }

    #[test]
    fn test_children_sorted_and_direct_only() {
        let mut s = storage();
        s.create(Path::new("/d/zeta"), file(0o644), false).unwrap();
        s.create(Path::new("/d/alpha"), file(0o644), false).unwrap();
        s.create(Path::new("/d/sub/deep"), file(0o644), false).unwrap();

        let names: Vec<_> = s
            .children(Path::new("/d"))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["alpha", "sub", "zeta"]);
    }

    #[test]
    fn test_children_of_root() {
        let mut s = storage();
        s.create(Path::new("/one"), file(0o644), false).unwrap();
        let names: Vec<_> = s
            .children(Path::new("/"))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["one"]);
    }

    #[test]
    fn test_rename_keeps_entry() {
        let mut s = storage();
        let entry = s.create(Path::new("/old"), file(0o644), false).unwrap();
        s.rename(Path::new("/old"), Path::new("/new")).unwrap();

        assert!(s.get(Path::new("/old")).is_none());
        let moved = s.get(Path::new("/new")).unwrap();
        assert!(Arc::ptr_eq(&entry, &moved));
    }

    #[test]
    fn test_rename_directory_moves_subtree() {
        let mut s = storage();
        s.create(Path::new("/src/a/file"), file(0o644), false).unwrap();
        s.rename(Path::new("/src"), Path::new("/dst")).unwrap();

        assert!(s.get(Path::new("/src")).is_none());
        assert!(s.get(Path::new("/src/a/file")).is_none());
        assert!(s.get(Path::new("/dst/a/file")).is_some());
    }

    #[test]
    fn test_rename_prefix_is_component_wise() {
        let mut s = storage();
        s.create(Path::new("/a/x"), file(0o644), false).unwrap();
        s.create(Path::new("/ab/y"), file(0o644), false).unwrap();
        s.rename(Path::new("/a"), Path::new("/c")).unwrap();

        assert!(s.get(Path::new("/ab/y")).is_some());
        assert!(s.get(Path::new("/c/x")).is_some());
    }

    #[test]
    fn test_rename_into_itself() {
        let mut s = storage();
        s.create(Path::new("/a/b"), FileMode::directory(0o755), false)
            .unwrap();
        let err = s.rename(Path::new("/a"), Path::new("/a/b/c")).unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath(_)));
    }

    #[test]
    fn test_rename_over_file_replaces() {
        let mut s = storage();
        let src = s.create(Path::new("/src"), file(0o644), false).unwrap();
        s.create(Path::new("/dst"), file(0o644), false).unwrap();
        s.rename(Path::new("/src"), Path::new("/dst")).unwrap();
        assert!(Arc::ptr_eq(&src, &s.get(Path::new("/dst")).unwrap()));
    }

    #[test]
    fn test_rename_over_nonempty_dir() {
        let mut s = storage();
        s.create(Path::new("/a"), FileMode::directory(0o755), false)
            .unwrap();
        s.create(Path::new("/b/child"), file(0o644), false).unwrap();
        let err = s.rename(Path::new("/a"), Path::new("/b")).unwrap_err();
        assert!(matches!(err, VfsError::DirectoryNotEmpty(_)));
    }

    #[test]
    fn test_rename_missing() {
        let mut s = storage();
        let err = s.rename(Path::new("/nope"), Path::new("/x")).unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[test]
    fn test_remove_nonempty_dir_refused() {
        let mut s = storage();
        s.create(Path::new("/d/f"), file(0o644), false).unwrap();
        let err = s.remove(Path::new("/d")).unwrap_err();
        assert!(matches!(err, VfsError::DirectoryNotEmpty(_)));
        assert!(s.get(Path::new("/d/f")).is_some());

        s.remove(Path::new("/d/f")).unwrap();
        s.remove(Path::new("/d")).unwrap();
        assert!(s.get(Path::new("/d")).is_none());
    }

    #[test]
    fn test_remove_root_refused() {
        let mut s = storage();
        assert!(matches!(
            s.remove(Path::new("/")).unwrap_err(),
            VfsError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_remove_all() {
        let mut s = storage();
        s.create(Path::new("/d/a/b"), file(0o644), false).unwrap();
        s.create(Path::new("/d/c"), file(0o644), false).unwrap();
        s.create(Path::new("/dd"), file(0o644), false).unwrap();

        assert_eq!(s.remove_all(Path::new("/d")).unwrap(), 4);
        assert!(s.get(Path::new("/d")).is_none());
        assert!(s.get(Path::new("/dd")).is_some());
    }
}
