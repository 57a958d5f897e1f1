//! Aborting before commit must restore every touched path byte-for-byte and
//! remove everything the transaction created.

mod common;

use common::{backup_entries, read, sandbox, unique_tx};
use std::fs;
use txfile::{Participant, Registry};

#[test]
fn rollback_restores_overwritten_file_exactly() {
    let s = sandbox();
    let path = s.temp.path().join("config.toml");
    fs::write(&path, "old").unwrap();

    let tx = unique_tx("rb-write-existing");
    s.fm.write_all_text(Some(&tx), &path, "new").unwrap();
    assert_eq!(read(&path), "new");

    Registry::global().enlist(&tx).rollback().unwrap();

    assert_eq!(read(&path), "old");
    assert_eq!(backup_entries(&s.fm), 0);
    assert!(!Registry::global().is_active(&tx));
}

#[test]
fn rollback_removes_file_that_did_not_exist() {
    let s = sandbox();
    let path = s.temp.path().join("fresh.txt");

    let tx = unique_tx("rb-write-fresh");
    s.fm.write_all_text(Some(&tx), &path, "temporary").unwrap();
    assert!(path.exists());

    Registry::global().enlist(&tx).rollback().unwrap();
    assert!(!path.exists());
}

#[test]
fn rollback_restores_binary_content_byte_for_byte() {
    let s = sandbox();
    let path = s.temp.path().join("blob.bin");
    let original: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    fs::write(&path, &original).unwrap();

    let tx = unique_tx("rb-bytes");
    s.fm.write_all_bytes(Some(&tx), &path, b"clobbered").unwrap();

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(fs::read(&path).unwrap(), original);
}

#[test]
fn rollback_undoes_append() {
    let s = sandbox();
    let existing = s.temp.path().join("log.txt");
    let fresh = s.temp.path().join("new-log.txt");
    fs::write(&existing, "line1\n").unwrap();

    let tx = unique_tx("rb-append");
    s.fm.append_all_text(Some(&tx), &existing, "line2\n").unwrap();
    s.fm.append_all_text(Some(&tx), &fresh, "only\n").unwrap();
    assert_eq!(read(&existing), "line1\nline2\n");

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(read(&existing), "line1\n");
    assert!(!fresh.exists());
}

#[test]
fn rollback_restores_deleted_file() {
    let s = sandbox();
    let path = s.temp.path().join("precious.dat");
    fs::write(&path, "irreplaceable").unwrap();

    let tx = unique_tx("rb-delete");
    s.fm.delete(Some(&tx), &path).unwrap();
    assert!(!path.exists());

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(read(&path), "irreplaceable");
}

#[test]
fn rollback_of_missing_file_delete_is_noop() {
    let s = sandbox();
    let path = s.temp.path().join("never-was.txt");

    let tx = unique_tx("rb-delete-missing");
    s.fm.delete(Some(&tx), &path).unwrap();

    Registry::global().enlist(&tx).rollback().unwrap();
    assert!(!path.exists());
}

#[test]
fn rollback_restores_deleted_directory_tree() {
    let s = sandbox();
    let dir = s.temp.path().join("project");
    fs::create_dir_all(dir.join("src/nested")).unwrap();
    fs::write(dir.join("src/main.rs"), "fn main() {}").unwrap();
    fs::write(dir.join("src/nested/lib.rs"), "pub fn f() {}").unwrap();

    let tx = unique_tx("rb-delete-dir");
    s.fm.delete_directory(Some(&tx), &dir).unwrap();
    assert!(!dir.exists());

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(read(&dir.join("src/main.rs")), "fn main() {}");
    assert_eq!(read(&dir.join("src/nested/lib.rs")), "pub fn f() {}");
    assert_eq!(backup_entries(&s.fm), 0);
}

#[test]
fn rollback_removes_only_created_directory_suffix() {
    let s = sandbox();
    let pre_existing = s.temp.path().join("a");
    fs::create_dir(&pre_existing).unwrap();

    let tx = unique_tx("rb-create-dir");
    s.fm.create_directory(Some(&tx), &pre_existing.join("b/c")).unwrap();
    assert!(pre_existing.join("b/c").is_dir());

    Registry::global().enlist(&tx).rollback().unwrap();
    assert!(!pre_existing.join("b").exists());
    assert!(pre_existing.is_dir());
}

#[test]
fn rollback_reverses_file_move() {
    let s = sandbox();
    let src = s.temp.path().join("from.txt");
    let dst = s.temp.path().join("into/to.txt");
    fs::write(&src, "cargo").unwrap();

    let tx = unique_tx("rb-move");
    s.fm.move_file(Some(&tx), &src, &dst).unwrap();
    assert!(!src.exists());
    assert_eq!(read(&dst), "cargo");

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(read(&src), "cargo");
    assert!(!dst.exists());
}

#[test]
fn rollback_reverses_directory_move() {
    let s = sandbox();
    let src = s.temp.path().join("old-name");
    let dst = s.temp.path().join("new-name");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("kept.txt"), "kept").unwrap();

    let tx = unique_tx("rb-move-dir");
    s.fm.move_directory(Some(&tx), &src, &dst).unwrap();
    assert!(!src.exists());

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(read(&src.join("kept.txt")), "kept");
    assert!(!dst.exists());
}

#[test]
fn rollback_restores_overwritten_copy_destination() {
    let s = sandbox();
    let src = s.temp.path().join("src.txt");
    let dst = s.temp.path().join("dst.txt");
    fs::write(&src, "incoming").unwrap();
    fs::write(&dst, "previous").unwrap();

    let tx = unique_tx("rb-copy-overwrite");
    s.fm.copy(Some(&tx), &src, &dst, true).unwrap();
    assert_eq!(read(&dst), "incoming");

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(read(&dst), "previous");
    assert_eq!(read(&src), "incoming");
}

#[test]
fn rollback_removes_copy_destination_that_did_not_exist() {
    let s = sandbox();
    let src = s.temp.path().join("src.txt");
    let dst = s.temp.path().join("dst.txt");
    fs::write(&src, "incoming").unwrap();

    let tx = unique_tx("rb-copy-fresh");
    s.fm.copy(Some(&tx), &src, &dst, false).unwrap();

    Registry::global().enlist(&tx).rollback().unwrap();
    assert!(!dst.exists());
    assert!(src.exists());
}

#[test]
fn snapshot_restores_out_of_band_mutation() {
    let s = sandbox();
    let path = s.temp.path().join("guarded.txt");
    fs::write(&path, "protected").unwrap();

    let tx = unique_tx("rb-snapshot");
    s.fm.snapshot(Some(&tx), &path).unwrap();

    // Mutated outside the facade entirely
    fs::write(&path, "trampled").unwrap();

    Registry::global().enlist(&tx).rollback().unwrap();
    assert_eq!(read(&path), "protected");
}

#[test]
fn snapshot_of_absent_path_removes_it_on_rollback() {
    let s = sandbox();
    let path = s.temp.path().join("not-yet.txt");

    let tx = unique_tx("rb-snapshot-absent");
    s.fm.snapshot(Some(&tx), &path).unwrap();
    fs::write(&path, "appeared").unwrap();

    Registry::global().enlist(&tx).rollback().unwrap();
    assert!(!path.exists());
}

#[test]
fn write_then_delete_same_file_ends_up_absent_after_abort() {
    let s = sandbox();
    let path = s.temp.path().join("ephemeral.txt");

    let tx = unique_tx("rb-write-then-delete");
    let t = Some(&tx);
    s.fm.write_all_text(t, &path, "abc").unwrap();
    s.fm.delete(t, &path).unwrap();
    assert!(!path.exists());

    // Reverse order: the delete is undone first (restoring "abc"), then the
    // write is undone, removing the file it created.
    Registry::global().enlist(&tx).rollback().unwrap();
    assert!(!path.exists());
}

#[test]
fn rollback_undoes_dependent_changes_in_reverse_order() {
    let s = sandbox();
    let dir = s.temp.path().join("staging");
    let file = dir.join("payload.txt");

    let tx = unique_tx("rb-ordering");
    let t = Some(&tx);
    s.fm.create_directory(t, &dir).unwrap();
    s.fm.write_all_text(t, &file, "inside a created dir").unwrap();

    Registry::global().enlist(&tx).rollback().unwrap();
    assert!(!file.exists());
    assert!(!dir.exists());
}

#[test]
fn rollback_is_callable_exactly_once() {
    let s = sandbox();
    let tx = unique_tx("rb-once");
    s.fm.write_all_text(Some(&tx), &s.temp.path().join("f.txt"), "x")
        .unwrap();

    let participant = Registry::global().enlist(&tx);
    participant.rollback().unwrap();
    assert!(!Registry::global().is_active(&tx));

    assert!(participant.rollback().is_err());
    assert!(participant.commit().is_err());
}

#[test]
fn in_doubt_resolves_as_rollback() {
    let s = sandbox();
    let path = s.temp.path().join("limbo.txt");

    let tx = unique_tx("rb-in-doubt");
    s.fm.write_all_text(Some(&tx), &path, "uncertain").unwrap();

    Registry::global().enlist(&tx).in_doubt().unwrap();
    assert!(!path.exists());
    assert!(!Registry::global().is_active(&tx));
}

#[test]
fn enlistments_joined_from_another_thread_share_one_transaction() {
    let s = sandbox();
    let root = s.temp.path();
    let tx = unique_tx("rb-cross-thread");

    s.fm.write_all_text(Some(&tx), &root.join("main-thread.txt"), "a")
        .unwrap();

    // The coordinator flowed the id into a worker; its operation joins the
    // same participant.
    std::thread::scope(|scope| {
        let fm = s.fm.clone();
        let tx = tx.clone();
        let path = root.join("worker-thread.txt");
        scope.spawn(move || {
            fm.write_all_text(Some(&tx), &path, "b").unwrap();
        });
    });

    let participant = Registry::global().enlist(&tx);
    assert_eq!(participant.len(), 2);

    participant.rollback().unwrap();
    assert!(!root.join("main-thread.txt").exists());
    assert!(!root.join("worker-thread.txt").exists());
}

#[test]
fn rollback_failure_escalates_but_frees_the_slot() {
    let s = sandbox();
    let path = s.temp.path().join("torn.txt");
    fs::write(&path, "original").unwrap();

    let tx = unique_tx("rb-escalates");
    s.fm.write_all_text(Some(&tx), &path, "changed").unwrap();

    // Destroy the backup behind the transaction's back
    let entry = fs::read_dir(s.fm.backup_root())
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    fs::remove_file(entry.path()).unwrap();

    let err = Registry::global().enlist(&tx).rollback().unwrap_err();
    assert!(matches!(err, txfile::TxFileError::RollbackFailed(_)));
    // The slot is not leaked even though the undo failed
    assert!(!Registry::global().is_active(&tx));
}
