//! Backup path allocation.
//!
//! Every compensating operation that needs to preserve pre-existing state
//! parks it under a dedicated backup directory. The store only hands out
//! unique paths; creating (and later deleting) the entry is the caller's job.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory of the base temp path that holds all backup entries.
const BACKUP_DIR_NAME: &str = "txfile-backups";

/// Allocates unique temporary paths under a configured root.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Creates a store rooted under the process temp directory.
    pub fn new() -> Self {
        Self::with_base(std::env::temp_dir())
    }

    /// Creates a store rooted under `base`.
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            root: base.into().join(BACKUP_DIR_NAME),
        }
    }

    /// The directory all allocated paths live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the backup root if absent. Idempotent.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Returns a fresh path under the root with the given suffix.
    ///
    /// The file name is a 128-bit random token as 32 fixed-width hex digits,
    /// unique with overwhelming probability; collisions are not otherwise
    /// guarded. The target itself is not created.
    pub fn new_path(&self, extension: &str) -> Result<PathBuf> {
        self.ensure_root()?;
        let token: u128 = rand::random();
        let ext = extension.trim_start_matches('.');
        let name = if ext.is_empty() {
            format!("{token:032x}")
        } else {
            format!("{token:032x}.{ext}")
        };
        Ok(self.root.join(name))
    }

    /// Returns a fresh path carrying over `original`'s extension.
    pub fn new_path_for(&self, original: &Path) -> Result<PathBuf> {
        let ext = original.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.new_path(ext)
    }
}

impl Default for BackupStore {
    fn default() -> Self {
        Self::new()
    }
}
