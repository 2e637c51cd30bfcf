//! CSV format handling for ledger snapshots
//!
//! This module centralizes the snapshot table layout, providing:
//! - SnapshotTable and SnapshotRow built from ledger transactions
//! - Snapshot serialization to any synchronous writer
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::io::protocol::format_amount;
use crate::types::{TerminalError, Transaction, TransactionKind};
use serde::Serialize;
use std::io::Write;

/// Name of the exported table
pub const SNAPSHOT_TABLE_NAME: &str = "Movimientos";

/// Fixed column header of the exported table
pub const SNAPSHOT_HEADER: [&str; 3] = ["Tipo", "Monto", "Saldo Restante"];

/// One exported row
///
/// Amounts are pre-rendered without trailing zeros so the file reads the
/// same way the status frames do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    pub kind: TransactionKind,
    pub amount: String,
    pub balance_after: String,
}

impl SnapshotRow {
    /// Row values in column order
    pub fn fields(&self) -> [&str; 3] {
        [self.kind.label(), &self.amount, &self.balance_after]
    }
}

impl From<&Transaction> for SnapshotRow {
    fn from(tx: &Transaction) -> Self {
        SnapshotRow {
            kind: tx.kind,
            amount: format_amount(tx.amount),
            balance_after: format_amount(tx.balance_after),
        }
    }
}

/// A full ledger export
///
/// Rows are kept in ledger order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTable {
    pub name: &'static str,
    pub rows: Vec<SnapshotRow>,
}

impl SnapshotTable {
    /// Build a table from a ledger snapshot
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        SnapshotTable {
            name: SNAPSHOT_TABLE_NAME,
            rows: transactions.iter().map(SnapshotRow::from).collect(),
        }
    }

    /// Column header
    pub fn header(&self) -> [&'static str; 3] {
        SNAPSHOT_HEADER
    }

    /// Number of data rows (header excluded)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Write a snapshot table in CSV format
///
/// Writes the header row followed by one row per transaction.
///
/// # Arguments
///
/// * `table` - The table to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(TerminalError)` if a write error occurred
pub fn write_transactions_csv(
    table: &SnapshotTable,
    output: &mut dyn Write,
) -> Result<(), TerminalError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer.write_record(table.header())?;

    for row in &table.rows {
        writer.serialize(row)?;
    }

    writer.flush()?;

    Ok(())
}
