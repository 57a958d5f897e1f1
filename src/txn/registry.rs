//! Process-wide transaction registry.
//!
//! Maps each transaction identifier to its enlistment. This is an intentional
//! shared singleton with process lifetime, initialized on first use. The lock
//! is held only for lookup, insert and remove, never across file I/O, so slow
//! I/O on one transaction never blocks unrelated transactions.

use crate::txn::enlistment::Enlistment;
use crate::txn::id::TransactionId;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Mapping of active transaction identifiers to their enlistments.
pub struct Registry {
    entries: Mutex<HashMap<TransactionId, Enlistment>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransactionId, Enlistment>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the enlistment for `id`, creating it on first use.
    ///
    /// This is the coordinator contract: the returned handle answers the
    /// prepare/commit/rollback protocol for exactly this transaction.
    pub fn enlist(&self, id: &TransactionId) -> Enlistment {
        let mut entries = self.lock();
        entries
            .entry(id.clone())
            .or_insert_with(|| {
                log::debug!("creating enlistment for transaction {id}");
                Enlistment::new(id.clone())
            })
            .clone()
    }

    /// Frees the slot for a completed transaction.
    pub(crate) fn remove(&self, id: &TransactionId) {
        if self.lock().remove(id).is_some() {
            log::debug!("removed enlistment for transaction {id}");
        }
    }

    /// Number of currently active enlistments. Diagnostic only.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Whether `id` currently has an enlistment. Diagnostic only.
    pub fn is_active(&self, id: &TransactionId) -> bool {
        self.lock().contains_key(id)
    }
}
