//! Core traits for snapshot export
//!
//! This module defines the seam between the snapshotter and the durable
//! tabular storage it exports to, so file-backed and in-memory sinks can be
//! used interchangeably.

use crate::io::csv_format::SnapshotTable;
use crate::types::TerminalError;
use async_trait::async_trait;

/// Trait for durable tabular storage of ledger snapshots
///
/// Each call replaces whatever a previous call wrote at the same destination.
/// Implementations must be safe to share between tasks.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Write the whole table, overwriting prior output
    async fn write_table(&self, table: &SnapshotTable) -> Result<(), TerminalError>;

    /// Human-readable destination for log lines
    fn destination(&self) -> String;
}
