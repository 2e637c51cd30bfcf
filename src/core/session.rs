//! Per-connection card session
//!
//! A `Session` owns one connection's card state (balance, destination
//! station, pending kind) and interprets that connection's frames as
//! commands against it. Successful commands are appended to the shared
//! [`Ledger`].
//!
//! # Behaviour
//!
//! - **Recharge**: always succeeds, balance increases
//! - **Consumption**: succeeds when the balance covers it; the balance
//!   decreases and the destination advances. Otherwise the insufficient-funds
//!   notice is returned and nothing is recorded
//! - **Malformed frames**: no reply, no balance change, nothing recorded
//!
//! A recognized label updates the pending kind before the amount is parsed,
//! so a labelled frame with a bad amount still switches the mode for the
//! frames that follow.

use crate::core::ledger::Ledger;
use crate::io::protocol::{parse_command, Command, Response};
use crate::types::{
    CardState, Station, TerminalError, Transaction, TransactionKind, TransactionRecord,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, trace};

/// Card session for one connection
#[derive(Debug)]
pub struct Session {
    card: CardState,
    ledger: Arc<Ledger>,
    /// Peer label for log lines
    peer: String,
}

impl Session {
    /// Create a session with a fresh card
    ///
    /// # Arguments
    ///
    /// * `ledger` - The shared ledger successful transactions are appended to
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_peer(ledger, "local")
    }

    /// Create a session whose log lines name the given peer
    pub fn with_peer(ledger: Arc<Ledger>, peer: impl Into<String>) -> Self {
        Session {
            card: CardState::new(),
            ledger,
            peer: peer.into(),
        }
    }

    /// Current balance
    pub fn balance(&self) -> Decimal {
        self.card.balance
    }

    /// Current destination station
    pub fn destination(&self) -> Station {
        self.card.destination
    }

    /// Kind applied to frames without a label
    pub fn pending_kind(&self) -> TransactionKind {
        self.card.pending_kind
    }

    /// Handle one inbound frame
    ///
    /// # Arguments
    ///
    /// * `bytes` - Raw frame payload, expected to be UTF-8 text
    ///
    /// # Returns
    ///
    /// * `Some(Response::Status)` - The command was applied and recorded
    /// * `Some(Response::InsufficientFunds)` - A trip was rejected
    /// * `None` - The frame was malformed and ignored
    pub fn handle_message(&mut self, bytes: &[u8]) -> Option<Response> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.handle_text(text),
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "Ignoring non UTF-8 frame");
                None
            }
        }
    }

    /// Handle one decoded text frame
    pub fn handle_text(&mut self, text: &str) -> Option<Response> {
        debug!(peer = %self.peer, message = %text, "Message received");

        if let Some(kind) = TransactionKind::from_prefix(text) {
            self.card.pending_kind = kind;
        }

        let command = match parse_command(text, self.card.pending_kind) {
            Ok(command) => command,
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "Ignoring malformed message");
                return None;
            }
        };

        match self.apply(command) {
            Ok(tx) => {
                trace!(peer = %self.peer, sequence = tx.sequence, "Transaction recorded");
                Some(Response::Status {
                    balance: self.card.balance,
                    destination: self.card.destination,
                })
            }
            Err(e) if e.is_user_visible() => {
                debug!(peer = %self.peer, error = ?e, "Trip rejected");
                Some(Response::InsufficientFunds)
            }
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "Ignoring command");
                None
            }
        }
    }

    /// Apply a parsed command to the card and record it
    ///
    /// # Returns
    ///
    /// * `Ok(Transaction)` - The transaction as stored in the ledger
    /// * `Err(TerminalError::InsufficientFunds)` - Trip rejected, state unchanged
    /// * `Err(TerminalError::ArithmeticOverflow)` - Recharge out of range, state unchanged
    pub fn apply(&mut self, command: Command) -> Result<Transaction, TerminalError> {
        match command.kind {
            TransactionKind::Recharge => {
                self.card.balance = self
                    .card
                    .balance
                    .checked_add(command.amount)
                    .ok_or_else(|| TerminalError::arithmetic_overflow("recharge"))?;
            }
            TransactionKind::Consumption => {
                if self.card.balance < command.amount {
                    return Err(TerminalError::insufficient_funds(
                        self.card.balance,
                        command.amount,
                    ));
                }
                self.card.balance -= command.amount;
                self.card.destination = self.card.destination.next();
            }
        }

        let record = TransactionRecord {
            kind: command.kind,
            amount: command.amount,
            balance_after: self.card.balance,
        };
        let sequence = self.ledger.append(record);

        Ok(Transaction::from_record(sequence, record))
    }
}
