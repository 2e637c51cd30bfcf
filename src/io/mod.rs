//! I/O module
//!
//! Handles the wire protocol and ledger export.
//!
//! # Components
//!
//! - `protocol` - Inbound command parsing and outbound frame rendering
//! - `csv_format` - Snapshot table layout and CSV serialization
//! - `csv_sink` - File and writer sinks for snapshots

pub mod csv_format;
pub mod csv_sink;
pub mod protocol;

pub use csv_format::{write_transactions_csv, SnapshotRow, SnapshotTable};
pub use csv_sink::{CsvFileSink, WriterSink};
pub use protocol::{parse_command, Command, Response, ResponseStyle};
