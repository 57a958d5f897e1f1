//! Shared helpers for integration tests.
//!
//! Each test gets its own temp sandbox and backup root; transaction ids are
//! process-unique so tests can run in parallel against the global registry.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use txfile::{FileManager, TransactionId};

static NEXT_TX: AtomicUsize = AtomicUsize::new(0);

/// Returns a transaction id no other test will use.
pub fn unique_tx(label: &str) -> TransactionId {
    let n = NEXT_TX.fetch_add(1, Ordering::Relaxed);
    TransactionId::new(format!("{label}-{}-{n}", std::process::id()))
}

pub struct Sandbox {
    pub temp: TempDir,
    pub fm: FileManager,
}

/// Creates a temp directory with a file manager whose backups live inside it.
#[allow(unused)]
pub fn sandbox() -> Sandbox {
    let temp = TempDir::new().unwrap();
    let fm = FileManager::with_backup_base(temp.path());
    Sandbox { temp, fm }
}

/// Number of entries currently parked under the backup root.
#[allow(unused)]
pub fn backup_entries(fm: &FileManager) -> usize {
    match fs::read_dir(fm.backup_root()) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Reads a file as a string, panicking with the path on failure.
#[allow(unused)]
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}
