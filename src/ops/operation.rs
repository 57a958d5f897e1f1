//! Per-kind forward/undo logic for transactional mutations.

use crate::backup::BackupStore;
use crate::error::{Result, TxFileError};
use crate::fs::util;

use std::fs;
use std::path::{Path, PathBuf};

/// A single enlisted mutation with enough captured state to undo it.
///
/// One variant per mutation kind. `execute` performs the forward action and
/// must complete any backup before the original is touched, so a failure
/// mid-execute always leaves a valid undo path. `rollback` restores the
/// pre-execute state and tolerates a partially failed execute. A backup path,
/// once set, belongs to this operation alone.
#[derive(Debug)]
pub(crate) enum Operation {
    /// Copy `src` over `dst`, optionally replacing an existing destination.
    Copy {
        src: PathBuf,
        dst: PathBuf,
        overwrite: bool,
        backup: Option<PathBuf>,
    },
    /// Rename a file, with a cross-device copy fallback.
    Move { src: PathBuf, dst: PathBuf },
    /// Remove a file, parking its content in a backup first.
    Delete {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
    /// Relocate a whole directory tree to a backup location.
    DeleteDirectory {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
    /// Overwrite (or create) a file with the given payload.
    Write {
        path: PathBuf,
        contents: Vec<u8>,
        backup: Option<PathBuf>,
    },
    /// Append to (or create) a file.
    Append {
        path: PathBuf,
        text: String,
        backup: Option<PathBuf>,
    },
    /// Create a directory chain, remembering where the created part starts.
    CreateDirectory {
        path: PathBuf,
        created_root: Option<PathBuf>,
    },
    /// Plain same-volume directory rename. No backup, no copy fallback.
    MoveDirectory { src: PathBuf, dst: PathBuf },
    /// Protect a file's current content without mutating it.
    Snapshot {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
}

impl Operation {
    pub(crate) fn copy(src: PathBuf, dst: PathBuf, overwrite: bool) -> Self {
        Operation::Copy {
            src,
            dst,
            overwrite,
            backup: None,
        }
    }

    pub(crate) fn move_file(src: PathBuf, dst: PathBuf) -> Self {
        Operation::Move { src, dst }
    }

    pub(crate) fn delete(path: PathBuf) -> Self {
        Operation::Delete { path, backup: None }
    }

    pub(crate) fn delete_directory(path: PathBuf) -> Self {
        Operation::DeleteDirectory { path, backup: None }
    }

    pub(crate) fn write(path: PathBuf, contents: Vec<u8>) -> Self {
        Operation::Write {
            path,
            contents,
            backup: None,
        }
    }

    pub(crate) fn append(path: PathBuf, text: String) -> Self {
        Operation::Append {
            path,
            text,
            backup: None,
        }
    }

    pub(crate) fn create_directory(path: PathBuf) -> Self {
        Operation::CreateDirectory {
            path,
            created_root: None,
        }
    }

    pub(crate) fn move_directory(src: PathBuf, dst: PathBuf) -> Self {
        Operation::MoveDirectory { src, dst }
    }

    pub(crate) fn snapshot(path: PathBuf) -> Self {
        Operation::Snapshot { path, backup: None }
    }

    /// Performs the forward mutation, capturing backups first.
    pub(crate) fn execute(&mut self, store: &BackupStore) -> Result<()> {
        log::debug!("executing {}", self.describe());
        match self {
            Operation::Copy {
                src,
                dst,
                overwrite,
                backup,
            } => {
                if !src.exists() {
                    return Err(TxFileError::NotFound(src.clone()));
                }
                if dst.exists() {
                    if !*overwrite {
                        return Err(TxFileError::AlreadyExists(dst.clone()));
                    }
                    let parked = store.new_path_for(dst)?;
                    fs::copy(&dst, &parked)?;
                    *backup = Some(parked);
                }
                fs::copy(&src, &dst)?;
                Ok(())
            }
            Operation::Move { src, dst } => {
                if !src.exists() {
                    return Err(TxFileError::NotFound(src.clone()));
                }
                if dst.exists() {
                    return Err(TxFileError::AlreadyExists(dst.clone()));
                }
                util::move_path(src, dst)
            }
            Operation::Delete { path, backup } => {
                if path.exists() {
                    let parked = store.new_path_for(path)?;
                    fs::copy(&path, &parked)?;
                    *backup = Some(parked);
                    fs::remove_file(path)?;
                }
                Ok(())
            }
            Operation::DeleteDirectory { path, backup } => {
                if path.is_dir() {
                    let parked = store.new_path("")?;
                    util::move_path(path, &parked)?;
                    *backup = Some(parked);
                }
                Ok(())
            }
            Operation::Write {
                path,
                contents,
                backup,
            } => {
                if path.exists() {
                    let parked = store.new_path_for(path)?;
                    fs::copy(&path, &parked)?;
                    *backup = Some(parked);
                }
                fs::write(path, contents)?;
                Ok(())
            }
            Operation::Append { path, text, backup } => {
                if path.exists() {
                    let parked = store.new_path_for(path)?;
                    fs::copy(&path, &parked)?;
                    *backup = Some(parked);
                }
                util::append_text(path, text)
            }
            Operation::CreateDirectory { path, created_root } => {
                // Remember the topmost component that does not exist yet;
                // rollback removes the chain from there down, never above.
                for ancestor in path.ancestors() {
                    if ancestor.as_os_str().is_empty() || ancestor.exists() {
                        break;
                    }
                    *created_root = Some(ancestor.to_path_buf());
                }
                fs::create_dir_all(path)?;
                Ok(())
            }
            Operation::MoveDirectory { src, dst } => {
                if !src.is_dir() {
                    return Err(TxFileError::NotFound(src.clone()));
                }
                if dst.exists() {
                    return Err(TxFileError::AlreadyExists(dst.clone()));
                }
                fs::rename(&src, &dst)?;
                Ok(())
            }
            Operation::Snapshot { path, backup } => {
                if path.exists() {
                    let parked = store.new_path_for(path)?;
                    fs::copy(&path, &parked)?;
                    *backup = Some(parked);
                }
                Ok(())
            }
        }
    }

    /// Restores the state observed before `execute`.
    pub(crate) fn rollback(&self) -> Result<()> {
        log::debug!("rolling back {}", self.describe());
        match self {
            Operation::Copy { dst, backup, .. } => match backup {
                Some(parked) => util::restore_file(parked, dst),
                None => {
                    if dst.exists() {
                        fs::remove_file(dst)?;
                    }
                    Ok(())
                }
            },
            Operation::Move { src, dst } => {
                if dst.exists() {
                    util::move_path(dst, src)?;
                }
                Ok(())
            }
            Operation::Delete { path, backup } => match backup {
                Some(parked) => util::restore_file(parked, path),
                None => Ok(()),
            },
            Operation::DeleteDirectory { path, backup } => match backup {
                Some(parked) => util::move_path(parked, path),
                None => Ok(()),
            },
            Operation::Write { path, backup, .. } | Operation::Append { path, backup, .. } => {
                match backup {
                    Some(parked) => util::restore_file(parked, path),
                    None => {
                        if path.exists() {
                            fs::remove_file(path)?;
                        }
                        Ok(())
                    }
                }
            }
            Operation::CreateDirectory { created_root, .. } => {
                if let Some(root) = created_root {
                    if root.exists() {
                        fs::remove_dir_all(root)?;
                    }
                }
                Ok(())
            }
            Operation::MoveDirectory { src, dst } => {
                if dst.is_dir() {
                    fs::rename(&dst, &src)?;
                }
                Ok(())
            }
            Operation::Snapshot { path, backup } => match backup {
                Some(parked) => util::restore_file(parked, path),
                None => {
                    if path.exists() {
                        fs::remove_file(path)?;
                    }
                    Ok(())
                }
            },
        }
    }

    /// Deletes the backup entry once it is no longer needed.
    pub(crate) fn release_backup(&self) -> Result<()> {
        match self {
            Operation::DeleteDirectory { backup, .. } => {
                if let Some(parked) = backup {
                    if parked.exists() {
                        fs::remove_dir_all(parked)?;
                    }
                }
                Ok(())
            }
            Operation::Copy { backup, .. }
            | Operation::Delete { backup, .. }
            | Operation::Write { backup, .. }
            | Operation::Append { backup, .. }
            | Operation::Snapshot { backup, .. } => {
                if let Some(parked) = backup {
                    if parked.exists() {
                        fs::remove_file(parked)?;
                    }
                }
                Ok(())
            }
            Operation::Move { .. }
            | Operation::MoveDirectory { .. }
            | Operation::CreateDirectory { .. } => Ok(()),
        }
    }

    /// The backup entry held by this operation, if any.
    pub(crate) fn backup_path(&self) -> Option<&Path> {
        match self {
            Operation::Copy { backup, .. }
            | Operation::Delete { backup, .. }
            | Operation::DeleteDirectory { backup, .. }
            | Operation::Write { backup, .. }
            | Operation::Append { backup, .. }
            | Operation::Snapshot { backup, .. } => backup.as_deref(),
            Operation::Move { .. }
            | Operation::MoveDirectory { .. }
            | Operation::CreateDirectory { .. } => None,
        }
    }

    /// Human-readable operation label for logs and error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Operation::Copy { src, dst, .. } => {
                format!("copy {} → {}", src.display(), dst.display())
            }
            Operation::Move { src, dst } => {
                format!("move {} → {}", src.display(), dst.display())
            }
            Operation::Delete { path, .. } => format!("delete {}", path.display()),
            Operation::DeleteDirectory { path, .. } => {
                format!("delete directory {}", path.display())
            }
            Operation::Write { path, .. } => format!("write {}", path.display()),
            Operation::Append { path, .. } => format!("append {}", path.display()),
            Operation::CreateDirectory { path, .. } => {
                format!("create directory {}", path.display())
            }
            Operation::MoveDirectory { src, dst } => {
                format!("move directory {} → {}", src.display(), dst.display())
            }
            Operation::Snapshot { path, .. } => format!("snapshot {}", path.display()),
        }
    }
}
