//! Metro Card Simulator Library
//! # Overview
//!
//! This library simulates a metro card terminal: WebSocket clients send
//! recharges and trip payments, receive their balance and destination back,
//! and every applied transaction is recorded in a shared ledger that is
//! periodically exported to CSV.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (CardState, Transaction, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::session`] - Per-connection card state and command handling
//!   - [`core::ledger`] - Shared append-only transaction ledger
//!   - [`core::snapshotter`] - Periodic ledger export
//! - [`io`] - Wire protocol and CSV export
//! - [`server`] - WebSocket accept loop and connection handling
//!
//! # Protocol
//!
//! Each text frame is a seven-character kind label followed by an amount:
//!
//! - **Recarga**: Credit funds to the card
//! - **Consumo**: Pay for a trip (requires sufficient balance), advancing the
//!   destination station
//!
//! A frame without a recognized label reuses the previous kind. Frames whose
//! amount cannot be parsed are ignored without a reply.
//!
//! # Card State
//!
//! Each connection maintains:
//! - `balance`: Starts at zero and never goes negative
//! - `destination`: Station 1 to 10, advancing cyclically on each paid trip
//! - `pending_kind`: The last kind label seen

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod server;
pub mod types;

pub use core::{Ledger, Session, SnapshotSink, Snapshotter};
pub use io::{write_transactions_csv, CsvFileSink, Response, ResponseStyle, WriterSink};
pub use server::{Server, ServerConfig, SnapshotTarget};
pub use types::{
    CardState, SequenceId, Station, TerminalError, Transaction, TransactionKind,
    TransactionRecord,
};
