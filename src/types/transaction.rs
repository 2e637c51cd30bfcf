//! Transaction-related types for the Metro Card Simulator
//!
//! This module defines transaction kinds, the unsequenced record a session
//! produces, and the immutable sequenced transaction stored in the ledger.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Ledger sequence identifier
///
/// Assigned by the ledger in append order, starting at 1.
pub type SequenceId = u64;

/// Transaction kinds supported by the card terminal
///
/// The serialized and displayed form is the wire label clients send as a
/// message prefix, which is also the `Tipo` column of the snapshot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TransactionKind {
    /// Credit funds to the card
    ///
    /// Always succeeds and increases the balance by the amount.
    #[default]
    #[serde(rename = "Recarga")]
    Recharge,

    /// Pay for a trip
    ///
    /// Requires a balance at least equal to the amount. On success the
    /// destination station advances by one.
    #[serde(rename = "Consumo")]
    Consumption,
}

impl TransactionKind {
    /// Length in characters of every kind label
    pub const LABEL_LEN: usize = 7;

    /// Wire label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Recharge => "Recarga",
            TransactionKind::Consumption => "Consumo",
        }
    }

    /// Recognize a kind label at the start of a message
    ///
    /// Returns `None` when the message starts with neither label.
    pub fn from_prefix(message: &str) -> Option<Self> {
        [TransactionKind::Recharge, TransactionKind::Consumption]
            .into_iter()
            .find(|kind| message.starts_with(kind.label()))
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unsequenced transaction record
///
/// Built by a session once a command has been applied to its balance and
/// handed to the ledger, which assigns the sequence id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Recharge or consumption
    pub kind: TransactionKind,

    /// Amount of the recharge or trip, never negative
    pub amount: Decimal,

    /// Card balance right after this transaction was applied
    pub balance_after: Decimal,
}

/// Stored transaction
///
/// Immutable once appended. Lives until process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    /// Position in the ledger's total order
    pub sequence: SequenceId,

    /// Recharge or consumption
    pub kind: TransactionKind,

    /// Amount of the recharge or trip
    pub amount: Decimal,

    /// Card balance right after this transaction was applied
    pub balance_after: Decimal,
}

impl Transaction {
    /// Attach a sequence id to a record
    pub fn from_record(sequence: SequenceId, record: TransactionRecord) -> Self {
        Transaction {
            sequence,
            kind: record.kind,
            amount: record.amount,
            balance_after: record.balance_after,
        }
    }

    /// The record this transaction was created from
    pub fn record(&self) -> TransactionRecord {
        TransactionRecord {
            kind: self.kind,
            amount: self.amount,
            balance_after: self.balance_after,
        }
    }
}
