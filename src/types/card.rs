//! Card-related types for the Metro Card Simulator
//!
//! This module defines the per-connection card state and the destination
//! station counter it carries.

use super::transaction::TransactionKind;
use rust_decimal::Decimal;
use std::fmt;

/// Destination station on the line
///
/// Always within `1..=10`. Advances cyclically, 10 wraps back to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Station(u8);

impl Station {
    /// Number of stations on the line
    pub const COUNT: u8 = 10;

    /// The station every card starts at
    pub const FIRST: Station = Station(1);

    /// Build a station from its number, if it is on the line
    pub fn new(number: u8) -> Option<Self> {
        (1..=Self::COUNT).contains(&number).then_some(Station(number))
    }

    /// Station number in `1..=10`
    pub fn number(&self) -> u8 {
        self.0
    }

    /// The station after this one: `(n % 10) + 1`
    pub fn next(&self) -> Self {
        Station((self.0 % Self::COUNT) + 1)
    }
}

impl Default for Station {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Card state owned by one connection
///
/// Created when the connection is established, dropped when it closes.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardState {
    /// Current balance, starts at zero and never goes negative
    pub balance: Decimal,

    /// Where the next trip goes, advances only on a paid trip
    pub destination: Station,

    /// Last kind label seen
    ///
    /// Reused for messages that carry no recognized label.
    pub pending_kind: TransactionKind,
}

impl CardState {
    /// Create a fresh card: zero balance, station 1, recharge mode
    pub fn new() -> Self {
        Self::default()
    }
}
