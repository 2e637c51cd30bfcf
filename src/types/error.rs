//! Error types for the Metro Card Simulator
//!
//! This module defines all error types that can occur while serving card
//! sessions and exporting the ledger.
//!
//! # Error Categories
//!
//! - **Malformed input**: unparsable amount or truncated message, silently ignored
//! - **Insufficient funds**: user-visible, reported inline to the client
//! - **Transport errors**: end a single session
//! - **Export errors**: I/O or CSV failures during a snapshot tick, the tick is skipped

use rust_decimal::Decimal;
use thiserror::Error;

/// Literal notice sent to a client whose balance cannot pay a trip
pub const INSUFFICIENT_FUNDS_NOTICE: &str = "Saldo insuficiente para el viaje.";

/// Main error type for the terminal
///
/// Every error is local to one session or one snapshot tick; none of them
/// is fatal to the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerminalError {
    /// Message could not be interpreted as a command
    ///
    /// This is a recoverable error - the message is dropped without a reply
    /// and the session state is unchanged.
    #[error("Malformed message '{message}': {reason}")]
    MalformedMessage {
        /// The offending message text (lossy if it was not UTF-8)
        message: String,
        /// Why it was rejected
        reason: String,
    },

    /// Balance does not cover the requested trip
    ///
    /// This is a recoverable, user-visible error. The Display text is the
    /// exact notice clients receive.
    #[error("{}", INSUFFICIENT_FUNDS_NOTICE)]
    InsufficientFunds {
        /// Balance at the time of the attempt
        balance: Decimal,
        /// Trip amount requested
        requested: Decimal,
    },

    /// Balance arithmetic would leave the decimal range
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
    },

    /// I/O error occurred while binding, accepting, or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV serialization error during a snapshot export
    #[error("CSV error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    CsvError {
        /// Output line where the error occurred (if available)
        line: Option<u64>,
        /// Description of the CSV error
        message: String,
    },

    /// WebSocket handshake or framing error
    ///
    /// Terminates the affected session only.
    #[error("WebSocket error: {message}")]
    WebSocketError {
        /// Description of the transport error
        message: String,
    },
}

// Conversion from io::Error to TerminalError
impl From<std::io::Error> for TerminalError {
    fn from(error: std::io::Error) -> Self {
        TerminalError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to TerminalError
impl From<csv::Error> for TerminalError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        TerminalError::CsvError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for TerminalError {
    fn from(error: csv_async::Error) -> Self {
        TerminalError::CsvError {
            line: None,
            message: error.to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TerminalError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        TerminalError::WebSocketError {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl TerminalError {
    /// Create a MalformedMessage error
    pub fn malformed(message: &str, reason: &str) -> Self {
        TerminalError::MalformedMessage {
            message: message.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(balance: Decimal, requested: Decimal) -> Self {
        TerminalError::InsufficientFunds { balance, requested }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        TerminalError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }

    /// Whether this error should be reported back to the client
    pub fn is_user_visible(&self) -> bool {
        matches!(self, TerminalError::InsufficientFunds { .. })
    }
}
