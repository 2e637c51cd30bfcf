//! Core business logic module
//!
//! This module contains the card terminal's core components:
//! - `traits` - Trait abstraction for snapshot sinks
//! - `ledger` - Shared append-only transaction ledger
//! - `session` - Per-connection card state and command handling
//! - `snapshotter` - Periodic ledger export

pub mod ledger;
pub mod session;
pub mod snapshotter;
pub mod traits;

pub use ledger::Ledger;
pub use session::Session;
pub use snapshotter::{SnapshotReport, Snapshotter, SnapshotterHandle};
pub use traits::SnapshotSink;
