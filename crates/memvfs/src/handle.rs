//! Open file handles.

use std::fmt;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{VfsError, VfsResult};
use crate::ops::File;
use crate::storage::{base_name, Entry, EntryRef};
use crate::types::{FileInfo, OpenFlags};

/// A handle onto an in-memory file.
///
/// Handles opened on the same path share the file's bytes but keep their
/// own position and flags. A handle stays usable after its path is
/// removed or renamed.
pub struct MemFile {
    name: PathBuf,
    entry: EntryRef,
    position: u64,
    flags: OpenFlags,
    closed: bool,
}

impl fmt::Debug for MemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemFile")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("flags", &self.flags)
            .field("closed", &self.closed)
            .finish()
    }
}

impl MemFile {
    /// Bind a new handle, applying `TRUNC` and `APPEND`.
    pub(crate) fn open(name: PathBuf, entry: EntryRef, flags: OpenFlags) -> Self {
        let mut position = 0;
        {
            let mut guard = entry.write();
            if flags.is_truncate() {
                if let Some(content) = guard.content.as_mut() {
                    content.clear();
                }
                guard.touch();
            }
            if flags.is_append() {
                position = guard.size();
            }
        }

        Self {
            name,
            entry,
            position,
            flags,
            closed: false,
        }
    }

    /// Current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Flags this handle was opened with.
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Returns true once [`File::close`] has succeeded.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> VfsResult<()> {
        if self.closed {
            Err(VfsError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_readable(&self) -> VfsResult<()> {
        self.check_open()?;
        if self.flags.can_read() {
            Ok(())
        } else {
            Err(VfsError::Unsupported("read"))
        }
    }

    fn check_writable(&self) -> VfsResult<()> {
        self.check_open()?;
        if self.flags.can_write() {
            Ok(())
        } else {
            Err(VfsError::Unsupported("write"))
        }
    }

    fn len(&self) -> u64 {
        self.entry.read().size()
    }

    /// Write into an entry the caller already holds locked.
    fn write_locked(&self, entry: &mut Entry, buf: &[u8], offset: u64) -> VfsResult<usize> {
        let n = match entry.content.as_mut() {
            Some(content) => content.write_at(buf, offset)?,
            None => return Err(VfsError::is_a_directory(self.name.display().to_string())),
        };
        entry.touch();
        Ok(n)
    }
}

impl File for MemFile {
    fn name(&self) -> &Path {
        &self.name
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        self.check_readable()?;
        let entry = self.entry.read();
        Ok(entry
            .content
            .as_ref()
            .map_or(0, |content| content.read_at(buf, offset)))
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> VfsResult<usize> {
        self.check_writable()?;
        let mut entry = self.entry.write();
        self.write_locked(&mut entry, buf, offset)
    }

    fn truncate(&mut self, size: u64) -> VfsResult<()> {
        self.check_writable()?;
        let mut entry = self.entry.write();
        if let Some(content) = entry.content.as_mut() {
            content.truncate(size)?;
        }
        entry.touch();
        Ok(())
    }

    fn close(&mut self) -> VfsResult<()> {
        self.check_open()?;
        self.closed = true;
        tracing::trace!(name = %self.name.display(), "closed");
        Ok(())
    }

    /// Always succeeds; provides no mutual exclusion.
    fn lock(&self) -> VfsResult<()> {
        Ok(())
    }

    /// Always succeeds.
    fn unlock(&self) -> VfsResult<()> {
        Ok(())
    }

    fn stat(&self) -> VfsResult<FileInfo> {
        Ok(self.entry.read().info(base_name(&self.name)))
    }
}

impl io::Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(buf, self.position)?;
        self.position += n as u64;
        tracing::trace!(name = %self.name.display(), n, position = self.position, "read");
        Ok(n)
    }
}

impl io::Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_writable()?;
        let n = {
            // End of file is read and written under one lock so append
            // handles never land on top of each other.
            let mut entry = self.entry.write();
            if self.flags.is_append() {
                self.position = entry.size();
            }
            self.write_locked(&mut entry, buf, self.position)?
        };
        self.position += n as u64;
        tracing::trace!(name = %self.name.display(), n, position = self.position, "write");
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()?;
        Ok(())
    }
}

impl io::Seek for MemFile {
    /// Seeking past the end is allowed; a negative result is rejected and
    /// leaves the position unchanged.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        let (base, offset) = match pos {
            SeekFrom::Start(n) => {
                self.position = n;
                return Ok(n);
            }
            SeekFrom::Current(n) => (self.position, n),
            SeekFrom::End(n) => (self.len(), n),
        };

        match base.checked_add_signed(offset) {
            Some(n) => {
                self.position = n;
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
