//! Wire protocol for card terminal messages
//!
//! Inbound frames look like `<KindLabel><AmountText>`, for example
//! `Recarga:50.0` or `Consumo:20`. The label is always seven characters
//! long; the amount is read from character offset seven. A message without a
//! recognized label keeps the kind of the previous one and is still read at
//! the same offset.
//!
//! Outbound frames are either a status line or the insufficient-funds notice.
//! Both are plain text, optionally wrapped in ANSI colour codes.

use crate::types::error::INSUFFICIENT_FUNDS_NOTICE;
use crate::types::{Station, TerminalError, TransactionKind};
use rust_decimal::Decimal;
use std::str::FromStr;

const ANSI_CYAN: &str = "\u{1b}[36m";
const ANSI_RED: &str = "\u{1b}[31m";
const ANSI_RESET: &str = "\u{1b}[0m";

/// A parsed inbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Kind to apply, from the frame's label or the pending kind
    pub kind: TransactionKind,

    /// Non-negative amount
    pub amount: Decimal,
}

/// Parse one text frame into a command
///
/// # Arguments
///
/// * `text` - The decoded frame
/// * `pending_kind` - Kind to use when the frame carries no label
///
/// # Returns
///
/// * `Ok(Command)` - A command with a non-negative amount
/// * `Err(TerminalError::MalformedMessage)` - Frame too short, or amount unparsable or negative
pub fn parse_command(text: &str, pending_kind: TransactionKind) -> Result<Command, TerminalError> {
    let kind = TransactionKind::from_prefix(text).unwrap_or(pending_kind);

    // Offset counts characters, not bytes
    let mut chars = text.chars();
    for _ in 0..TransactionKind::LABEL_LEN {
        chars
            .next()
            .ok_or_else(|| TerminalError::malformed(text, "message shorter than kind label"))?;
    }
    let amount_text = chars.as_str();

    let amount = parse_amount(amount_text)
        .ok_or_else(|| TerminalError::malformed(text, "invalid amount"))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(TerminalError::malformed(text, "negative amount"));
    }

    Ok(Command { kind, amount })
}

/// Parse a period-decimal amount, skipping one optional `:` separator
fn parse_amount(amount_text: &str) -> Option<Decimal> {
    let amount_text = amount_text.strip_prefix(':').unwrap_or(amount_text).trim();
    if amount_text.is_empty() {
        return None;
    }
    Decimal::from_str(amount_text).ok()
}

/// Render a decimal without trailing zeros (`50.0` becomes `50`)
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// How outbound frames are decorated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseStyle {
    /// Colour codes for terminal clients
    #[default]
    Ansi,
    /// Bare text
    Plain,
}

/// Outbound frame produced by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// State after a successful recharge or trip
    Status {
        /// Current balance
        balance: Decimal,
        /// Current destination station
        destination: Station,
    },

    /// The trip was rejected
    InsufficientFunds,
}

impl Response {
    /// Text of the frame without styling
    pub fn text(&self) -> String {
        match self {
            Response::Status {
                balance,
                destination,
            } => format!(
                "Saldo actual: {}. Destino: Estación {}.",
                format_amount(*balance),
                destination
            ),
            Response::InsufficientFunds => INSUFFICIENT_FUNDS_NOTICE.to_string(),
        }
    }

    /// Text of the frame in the requested style
    pub fn render(&self, style: ResponseStyle) -> String {
        match style {
            ResponseStyle::Plain => self.text(),
            ResponseStyle::Ansi => {
                let colour = match self {
                    Response::Status { .. } => ANSI_CYAN,
                    Response::InsufficientFunds => ANSI_RED,
                };
                format!("{}{}{}", colour, self.text(), ANSI_RESET)
            }
        }
    }
}
