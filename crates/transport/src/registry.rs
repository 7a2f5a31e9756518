//! Per-connection transaction table
//!
//! Each connection owns a [`TransactionRegistry`]: it allocates fresh
//! transaction ids and holds every live transaction until the transaction
//! signals its own removal. Lookups come from the transport progress
//! thread (matching an arriving completion to its transaction), so the
//! table is a concurrent map rather than a locked one.

use crate::connection::Connection;
use crate::transaction::{Transaction, WaitOptions};
use dashmap::DashMap;
use rdmalink_core::TransactionId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Id-keyed table of a connection's live transactions
///
/// # Thread Safety
///
/// All operations are thread-safe. Id allocation is a single atomic
/// increment; map access goes through DashMap's sharded locking.
pub struct TransactionRegistry {
    /// Next transaction id, starting at 1
    next_id: AtomicU64,
    /// Live transactions keyed by id
    table: DashMap<TransactionId, Arc<Transaction>>,
    /// Wait-gate options handed to every created transaction
    wait: WaitOptions,
}

impl TransactionRegistry {
    /// Create an empty registry with default wait options
    pub fn new() -> Self {
        Self::with_wait_options(WaitOptions::default())
    }

    /// Create an empty registry with explicit wait options
    pub fn with_wait_options(wait: WaitOptions) -> Self {
        TransactionRegistry {
            next_id: AtomicU64::new(0),
            table: DashMap::new(),
            wait,
        }
    }

    /// Create a fresh transaction owned by `conn` and register it
    ///
    /// The transaction is returned in `NotStarted` state; the caller is
    /// expected to issue its low-level operations and then `start` it.
    pub fn create(&self, conn: &Arc<dyn Connection>) -> Arc<Transaction> {
        let id = TransactionId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let tx = Arc::new(Transaction::new(id, Arc::clone(conn), self.wait));
        self.table.insert(id, Arc::clone(&tx));
        tx
    }

    /// Look up a live transaction by id
    pub fn get(&self, id: TransactionId) -> Option<Arc<Transaction>> {
        self.table.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a transaction from the table
    ///
    /// Removing an id that was already removed is a no-op; the forced
    /// error path and `close()` may both deregister the same transaction.
    pub fn remove(&self, id: TransactionId) -> Option<Arc<Transaction>> {
        self.table.remove(&id).map(|(_, tx)| tx)
    }

    /// Number of live transactions
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
