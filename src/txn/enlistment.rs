//! The per-transaction participant adapter.
//!
//! An enlistment owns the ordered list of compensating operations performed
//! under one transaction identifier. The coordinator resolves it through the
//! registry and drives it with the two-phase [`Participant`] protocol: commit
//! discards backups, rollback undoes operations in reverse enlistment order.

use crate::error::{Result, TxFileError};
use crate::ops::Operation;
use crate::txn::id::TransactionId;
use crate::txn::registry::Registry;

use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle of an enlistment.
///
/// `Committed` and `RolledBack` are terminal; the enlistment leaves the
/// registry on entering either and must never be reused afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnlistmentState {
    /// Accepting operations.
    Active,
    /// Verifying readiness to commit.
    Preparing,
    /// Voted ready; awaiting the coordinator's decision.
    Prepared,
    /// Releasing backups.
    Committing,
    /// All mutations stand.
    Committed,
    /// Undoing operations.
    RollingBack,
    /// All mutations undone (or undo was attempted for every one).
    RolledBack,
}

/// The coordinator-facing two-phase-commit contract.
///
/// The coordinator alone decides the global outcome across all of its
/// participants; this side only votes and obeys.
pub trait Participant {
    /// Votes ready-to-commit.
    fn prepare(&self) -> Result<()>;
    /// Makes all enlisted mutations permanent and releases backups.
    fn commit(&self) -> Result<()>;
    /// Undoes all enlisted mutations in reverse enlistment order.
    fn rollback(&self) -> Result<()>;
    /// Resolution for a transaction whose outcome is unknown.
    fn in_doubt(&self) -> Result<()>;
}

struct Inner {
    id: TransactionId,
    operations: Vec<Operation>,
    state: EnlistmentState,
}

/// Participant adapter for exactly one transaction.
///
/// Cheap to clone; every clone addresses the same underlying state, so the
/// enlisting threads and the coordinator observe one list of operations.
#[derive(Clone)]
pub struct Enlistment {
    inner: Arc<Mutex<Inner>>,
}

impl Enlistment {
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                id,
                operations: Vec::new(),
                state: EnlistmentState::Active,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves valid state behind; keep going.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The transaction this enlistment belongs to.
    pub fn id(&self) -> TransactionId {
        self.lock().id.clone()
    }

    pub fn state(&self) -> EnlistmentState {
        self.lock().state
    }

    /// Number of enlisted operations.
    pub fn len(&self) -> usize {
        self.lock().operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().operations.is_empty()
    }

    /// Appends an operation whose forward action has already run.
    ///
    /// Valid only while `Active`. A late arrival after the transaction has
    /// completed is undone on the spot before the error is returned, so the
    /// stray mutation does not survive outside the transaction's outcome.
    pub(crate) fn push(&self, op: Operation) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.state == EnlistmentState::Active {
                inner.operations.push(op);
                return Ok(());
            }
        }

        log::error!(
            "rejecting {} enlisted after transaction completion",
            op.describe()
        );
        if let Err(e) = op.rollback() {
            log::error!("failed to undo rejected {}: {}", op.describe(), e);
        }
        if let Err(e) = op.release_backup() {
            log::warn!("failed to release backup of rejected {}: {}", op.describe(), e);
        }
        Err(TxFileError::Other(anyhow::anyhow!(
            "transaction is no longer active"
        )))
    }
}

impl Participant for Enlistment {
    /// Verifies every recorded backup is still intact before voting yes.
    fn prepare(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != EnlistmentState::Active {
            return Err(TxFileError::Other(anyhow::anyhow!(
                "cannot prepare from state {:?}",
                inner.state
            )));
        }
        inner.state = EnlistmentState::Preparing;

        let torn = inner.operations.iter().find_map(|op| {
            op.backup_path()
                .filter(|backup| !backup.exists())
                .map(|backup| (op.describe(), backup.to_path_buf()))
        });
        if let Some((describe, backup)) = torn {
            log::error!("backup missing for {describe}, refusing to prepare");
            // Still eligible for rollback
            inner.state = EnlistmentState::Active;
            return Err(TxFileError::NotFound(backup));
        }

        inner.state = EnlistmentState::Prepared;
        log::debug!(
            "transaction {} prepared with {} operations",
            inner.id,
            inner.operations.len()
        );
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let id = {
            let mut inner = self.lock();
            match inner.state {
                // Single-phase commit skips prepare
                EnlistmentState::Active | EnlistmentState::Prepared => {}
                other => {
                    return Err(TxFileError::Other(anyhow::anyhow!(
                        "cannot commit from state {:?}",
                        other
                    )));
                }
            }
            inner.state = EnlistmentState::Committing;

            // Applied mutations stand regardless of cleanup hiccups.
            for op in &inner.operations {
                if let Err(e) = op.release_backup() {
                    log::warn!("failed to release backup for {}: {}", op.describe(), e);
                }
            }

            inner.state = EnlistmentState::Committed;
            log::info!(
                "committed transaction {} ({} operations)",
                inner.id,
                inner.operations.len()
            );
            inner.id.clone()
        };

        Registry::global().remove(&id);
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let (id, errors) = {
            let mut inner = self.lock();
            match inner.state {
                EnlistmentState::Committing
                | EnlistmentState::Committed
                | EnlistmentState::RollingBack
                | EnlistmentState::RolledBack => {
                    return Err(TxFileError::Other(anyhow::anyhow!(
                        "cannot roll back from state {:?}",
                        inner.state
                    )));
                }
                _ => {}
            }
            inner.state = EnlistmentState::RollingBack;
            log::warn!(
                "rolling back transaction {} ({} operations)",
                inner.id,
                inner.operations.len()
            );

            // Reverse enlistment order: later dependent changes are undone
            // before whatever they depended on. Every undo is attempted even
            // after a failure. An operation whose undo failed keeps its
            // backup on disk.
            let mut errors = Vec::new();
            for op in inner.operations.iter().rev() {
                match op.rollback() {
                    Ok(()) => {
                        if let Err(e) = op.release_backup() {
                            log::warn!(
                                "failed to release backup for {}: {}",
                                op.describe(),
                                e
                            );
                        }
                    }
                    Err(e) => {
                        log::error!("failed to undo {}: {}", op.describe(), e);
                        errors.push(format!("{}: {}", op.describe(), e));
                    }
                }
            }

            inner.state = EnlistmentState::RolledBack;
            (inner.id.clone(), errors)
        };

        // The slot is freed even after a failed undo
        Registry::global().remove(&id);

        if errors.is_empty() {
            log::info!("rollback of transaction {} completed", id);
            Ok(())
        } else {
            Err(TxFileError::RollbackFailed(errors.join("; ")))
        }
    }

    /// Without a durable log the safe resolution is to undo.
    fn in_doubt(&self) -> Result<()> {
        log::warn!("transaction {} in doubt, rolling back", self.id());
        self.rollback()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let terminal = matches!(
            self.state,
            EnlistmentState::Committed | EnlistmentState::RolledBack
        );
        if !terminal && !self.operations.is_empty() {
            log::warn!(
                "transaction {} dropped without commit or rollback; {} applied operations left standing",
                self.id,
                self.operations.len()
            );
        }
    }
}
