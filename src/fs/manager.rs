//! The file operation facade.

use crate::backup::BackupStore;
use crate::error::{Result, TxFileError};
use crate::fs::util;
use crate::ops::Operation;
use crate::txn::{Registry, TransactionId};

use std::fs;
use std::path::{Path, PathBuf};

/// Public surface for transactional and plain file operations.
///
/// Every mutating method takes an explicit transaction parameter. With
/// `None` the call goes straight to the OS primitive and errors propagate
/// unchanged. With `Some(id)` the mutation runs immediately as a
/// compensating operation enlisted on that transaction, and remains
/// revocable until the coordinator commits.
#[derive(Debug, Clone)]
pub struct FileManager {
    store: BackupStore,
}

impl FileManager {
    /// Creates a manager with the default backup root under the process
    /// temp directory.
    pub fn new() -> Self {
        Self {
            store: BackupStore::new(),
        }
    }

    /// Creates a manager whose backups live under `base`.
    pub fn with_backup_base(base: impl Into<PathBuf>) -> Self {
        Self {
            store: BackupStore::with_base(base),
        }
    }

    /// The directory holding this manager's backups.
    pub fn backup_root(&self) -> &Path {
        self.store.root()
    }

    /// Runs `op` immediately and enlists it on `id`'s transaction.
    ///
    /// A failed execute is not enlisted; whatever backup it already made for
    /// its own partial work is cleaned up here, and the transaction remains
    /// usable for subsequent operations.
    fn enlist_and_run(&self, id: &TransactionId, mut op: Operation) -> Result<()> {
        let enlistment = Registry::global().enlist(id);
        if let Err(e) = op.execute(&self.store) {
            if let Err(cleanup) = op.release_backup() {
                log::warn!(
                    "failed to release backup of failed {}: {}",
                    op.describe(),
                    cleanup
                );
            }
            return Err(e);
        }
        enlistment.push(op)
    }

    /// Copies `src` to `dst`.
    ///
    /// Fails with [`TxFileError::AlreadyExists`] before mutating anything if
    /// `dst` exists and `overwrite` is false.
    pub fn copy(
        &self,
        tx: Option<&TransactionId>,
        src: &Path,
        dst: &Path,
        overwrite: bool,
    ) -> Result<()> {
        match tx {
            Some(id) => {
                self.enlist_and_run(id, Operation::copy(src.to_path_buf(), dst.to_path_buf(), overwrite))
            }
            None => {
                if !src.exists() {
                    return Err(TxFileError::NotFound(src.to_path_buf()));
                }
                if dst.exists() && !overwrite {
                    return Err(TxFileError::AlreadyExists(dst.to_path_buf()));
                }
                fs::copy(src, dst)?;
                Ok(())
            }
        }
    }

    /// Moves a file, preferring an atomic same-volume rename with a
    /// cross-device copy-then-delete fallback.
    pub fn move_file(&self, tx: Option<&TransactionId>, src: &Path, dst: &Path) -> Result<()> {
        match tx {
            Some(id) => {
                self.enlist_and_run(id, Operation::move_file(src.to_path_buf(), dst.to_path_buf()))
            }
            None => {
                if !src.exists() {
                    return Err(TxFileError::NotFound(src.to_path_buf()));
                }
                if dst.exists() {
                    return Err(TxFileError::AlreadyExists(dst.to_path_buf()));
                }
                util::move_path(src, dst)
            }
        }
    }

    /// Deletes a file. No-op if the path does not exist.
    pub fn delete(&self, tx: Option<&TransactionId>, path: &Path) -> Result<()> {
        match tx {
            Some(id) => self.enlist_and_run(id, Operation::delete(path.to_path_buf())),
            None => {
                if path.exists() {
                    fs::remove_file(path)?;
                }
                Ok(())
            }
        }
    }

    /// Recursively deletes a directory. No-op if it does not exist.
    pub fn delete_directory(&self, tx: Option<&TransactionId>, path: &Path) -> Result<()> {
        match tx {
            Some(id) => self.enlist_and_run(id, Operation::delete_directory(path.to_path_buf())),
            None => {
                if path.is_dir() {
                    fs::remove_dir_all(path)?;
                }
                Ok(())
            }
        }
    }

    /// Creates the full directory chain for `path`.
    pub fn create_directory(&self, tx: Option<&TransactionId>, path: &Path) -> Result<()> {
        match tx {
            Some(id) => self.enlist_and_run(id, Operation::create_directory(path.to_path_buf())),
            None => {
                fs::create_dir_all(path)?;
                Ok(())
            }
        }
    }

    /// Renames a directory on the same volume.
    pub fn move_directory(&self, tx: Option<&TransactionId>, src: &Path, dst: &Path) -> Result<()> {
        match tx {
            Some(id) => self.enlist_and_run(
                id,
                Operation::move_directory(src.to_path_buf(), dst.to_path_buf()),
            ),
            None => {
                if !src.is_dir() {
                    return Err(TxFileError::NotFound(src.to_path_buf()));
                }
                if dst.exists() {
                    return Err(TxFileError::AlreadyExists(dst.to_path_buf()));
                }
                fs::rename(src, dst)?;
                Ok(())
            }
        }
    }

    /// Writes UTF-8 text, replacing any existing content.
    pub fn write_all_text(
        &self,
        tx: Option<&TransactionId>,
        path: &Path,
        contents: &str,
    ) -> Result<()> {
        self.write_all_bytes(tx, path, contents.as_bytes())
    }

    /// Writes raw bytes, replacing any existing content.
    pub fn write_all_bytes(
        &self,
        tx: Option<&TransactionId>,
        path: &Path,
        contents: &[u8],
    ) -> Result<()> {
        match tx {
            Some(id) => {
                self.enlist_and_run(id, Operation::write(path.to_path_buf(), contents.to_vec()))
            }
            None => {
                fs::write(path, contents)?;
                Ok(())
            }
        }
    }

    /// Appends UTF-8 text, creating the file when absent.
    pub fn append_all_text(
        &self,
        tx: Option<&TransactionId>,
        path: &Path,
        contents: &str,
    ) -> Result<()> {
        match tx {
            Some(id) => self.enlist_and_run(
                id,
                Operation::append(path.to_path_buf(), contents.to_string()),
            ),
            None => util::append_text(path, contents),
        }
    }

    /// Protects `path`'s current content for the duration of the
    /// transaction: an abort restores it (or removes the path, if it did not
    /// exist at snapshot time). Without a transaction this is a no-op.
    pub fn snapshot(&self, tx: Option<&TransactionId>, path: &Path) -> Result<()> {
        match tx {
            Some(id) => self.enlist_and_run(id, Operation::snapshot(path.to_path_buf())),
            None => {
                log::debug!("snapshot of {} outside a transaction, nothing to do", path.display());
                Ok(())
            }
        }
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    pub fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    /// Visits files under `path`, optionally recursing into subdirectories.
    ///
    /// The visitor returns `true` to keep walking; returning `false` stops
    /// the listing early.
    pub fn list_files(
        &self,
        path: &Path,
        recursive: bool,
        mut visit: impl FnMut(&Path) -> bool,
    ) -> Result<()> {
        if !path.is_dir() {
            return Err(TxFileError::NotFound(path.to_path_buf()));
        }

        let max_depth = if recursive { None } else { Some(1) };
        let walker = ignore::WalkBuilder::new(path)
            .standard_filters(false)
            .max_depth(max_depth)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("skipping entry due to error: {e}");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            if !visit(entry.path()) {
                break;
            }
        }

        Ok(())
    }

    /// Returns a unique file name under the backup root without creating it.
    pub fn create_temp_file_name(&self, extension: Option<&str>) -> Result<PathBuf> {
        self.store.new_path(extension.unwrap_or("tmp"))
    }

    /// Creates and returns a unique directory, under `parent` when given,
    /// otherwise under the backup root.
    pub fn create_temp_directory(
        &self,
        parent: Option<&Path>,
        prefix: Option<&str>,
    ) -> Result<PathBuf> {
        let unique = self.store.new_path("")?;
        let token = unique
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let name = format!("{}{token}", prefix.unwrap_or(""));

        let dir = match parent {
            Some(parent) => parent.join(name),
            None => self.store.root().join(name),
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}
