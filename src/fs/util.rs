//! Shared low-level filesystem helpers.

use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Moves `from` to `to`, creating missing parent directories first.
///
/// Tries an atomic `rename()` when both paths are on the same filesystem;
/// otherwise falls back to copy-then-delete-source. Works for files and
/// directory trees. The source is removed only after the destination copy
/// fully succeeded.
pub(crate) fn move_path(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }

    if is_same_filesystem(from, to)? {
        fs::rename(from, to)?;
        Ok(())
    } else {
        log::debug!(
            "cross-device move, copying {} → {}",
            from.display(),
            to.display()
        );
        copy_then_remove(from, to)
    }
}

/// Cross-filesystem move: copy everything, then delete the source.
fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
    if from.is_dir() {
        copy_dir_recursive(from, to)?;
        fs::remove_dir_all(from)?;
    } else {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

/// Checks if paths are on same filesystem.
///
/// Determines if atomic `rename()` is possible, or if cross-filesystem
/// copy+delete is required.
fn is_same_filesystem(path1: &Path, path2: &Path) -> Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let meta1 = fs::metadata(path1)?;
        let meta2_parent = path2.parent().unwrap_or(path2);
        let meta2 = fs::metadata(meta2_parent)?;
        Ok(meta1.dev() == meta2.dev())
    }

    #[cfg(not(unix))]
    {
        let path1_str = path1.to_string_lossy();
        let path2_str = path2.to_string_lossy();

        if path1_str.len() >= 2 && path2_str.len() >= 2 {
            Ok(path1_str.chars().next() == path2_str.chars().next())
        } else {
            Ok(true)
        }
    }
}

/// Recursively copies directory tree, preserving relative structure.
pub(crate) fn copy_dir_recursive(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;

    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let from_path = entry.path();
        let to_path = to.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir_recursive(&from_path, &to_path)?;
        } else {
            fs::copy(&from_path, &to_path)?;
        }
    }

    Ok(())
}

/// Appends `text` to `path`, creating the file when absent.
pub(crate) fn append_text(path: &Path, text: &str) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// Copies a backup entry back over `path`, recreating missing parents.
pub(crate) fn restore_file(backup: &Path, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(backup, path)?;
    Ok(())
}
