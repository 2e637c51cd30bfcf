//! Shared append-only transaction ledger
//!
//! This module provides the `Ledger`, the single piece of state shared by
//! every card session and the snapshotter.
//!
//! # Design
//!
//! Transactions live in a `Vec` behind a `parking_lot::RwLock`. An append
//! takes the write lock just long enough to assign the next sequence id and
//! push, so sequence order and storage order are the same total order. A
//! snapshot takes the read lock just long enough to clone the vector
//! (copy-on-read); exporting the copy happens with no lock held.
//!
//! # Thread Safety
//!
//! - Appends from different sessions serialize on a short critical section
//! - A snapshot never observes a half-written entry
//! - No lock is ever held across an `.await`

use crate::types::{SequenceId, Transaction, TransactionRecord};
use parking_lot::RwLock;

/// Append-only, concurrency-safe transaction ledger
///
/// Share it between tasks with `Arc<Ledger>`.
#[derive(Debug, Default)]
pub struct Ledger {
    /// Transactions in append order; entry `i` has sequence id `i + 1`
    transactions: RwLock<Vec<Transaction>>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its sequence id
    ///
    /// Ids start at 1 and increase by one per append, in the order appends
    /// acquire the lock.
    pub fn append(&self, record: TransactionRecord) -> SequenceId {
        let mut transactions = self.transactions.write();
        let sequence = transactions.len() as SequenceId + 1;
        transactions.push(Transaction::from_record(sequence, record));
        sequence
    }

    /// Point-in-time copy of every transaction, in ledger order
    pub fn snapshot_all(&self) -> Vec<Transaction> {
        self.transactions.read().clone()
    }

    /// Number of transactions recorded so far
    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
