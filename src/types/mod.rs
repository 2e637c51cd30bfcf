//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `card`: Per-connection card state and stations
//! - `transaction`: Transaction kinds, records and sequence ids
//! - `error`: Error types for the terminal

pub mod card;
pub mod error;
pub mod transaction;

pub use card::{CardState, Station};
pub use error::TerminalError;
pub use transaction::{SequenceId, Transaction, TransactionKind, TransactionRecord};
