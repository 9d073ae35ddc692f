//! Filesystem configuration.

use serde::{Deserialize, Serialize};

use crate::error::{VfsError, VfsResult};

/// Default bound on symlink hops, matching Linux `MAXSYMLINKS`.
pub const DEFAULT_MAX_SYMLINK_DEPTH: u32 = 40;

/// Tunables for [`MemFs`](crate::MemFs).
///
/// Loaded from TOML; every field is optional:
///
/// ```toml
/// max_symlink_depth = 8
/// default_file_perm = 0o644
/// default_dir_perm = 0o700
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemFsConfig {
    /// Symlink hops allowed while resolving one path.
    pub max_symlink_depth: u32,
    /// Permissions for files made by `create`.
    pub default_file_perm: u32,
    /// Permissions for the root and implicitly created parents.
    pub default_dir_perm: u32,
    /// Names tried by `temp_file` before giving up.
    pub temp_attempts: u32,
}

impl Default for MemFsConfig {
    fn default() -> Self {
        Self {
            max_symlink_depth: DEFAULT_MAX_SYMLINK_DEPTH,
            default_file_perm: 0o666,
            default_dir_perm: 0o755,
            temp_attempts: 10_000,
        }
    }
}

impl MemFsConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> VfsResult<Self> {
        toml::from_str(s).map_err(|e| VfsError::Config(e.to_string()))
    }

    /// Set the symlink hop limit.
    pub fn with_max_symlink_depth(mut self, depth: u32) -> Self {
        self.max_symlink_depth = depth;
        self
    }

    /// Set the default file permissions.
    pub fn with_default_file_perm(mut self, perm: u32) -> Self {
        self.default_file_perm = perm;
        self
    }

    /// Set the default directory permissions.
    pub fn with_default_dir_perm(mut self, perm: u32) -> Self {
        self.default_dir_perm = perm;
        self
    }
}
