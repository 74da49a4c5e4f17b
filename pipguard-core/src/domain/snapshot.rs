//! Position snapshot — broker state frozen for one control-loop iteration.

use serde::{Deserialize, Serialize};

use super::quote::Quote;

/// Which side of the book carries the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    /// `ask_lot == 0 && bid_lot == 0`
    NoPosition,
    /// `ask_lot > bid_lot`
    AskMajority,
    /// `bid_lot > ask_lot`
    BidMajority,
    /// `ask_lot == bid_lot > 0`
    Balanced,
}

impl PositionStatus {
    pub fn from_lots(ask_lot: u64, bid_lot: u64) -> Self {
        use std::cmp::Ordering;
        match ask_lot.cmp(&bid_lot) {
            Ordering::Greater => PositionStatus::AskMajority,
            Ordering::Less => PositionStatus::BidMajority,
            Ordering::Equal if ask_lot == 0 => PositionStatus::NoPosition,
            Ordering::Equal => PositionStatus::Balanced,
        }
    }
}

/// Lots, equity and the quote observed together.
///
/// Built fresh every iteration and shared by reference with every manager.
/// The only mutation is [`PositionSnapshot::override_margin`], kept for
/// operator corrections when the broker reports a stale margin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    ask_lot: u64,
    bid_lot: u64,
    margin: i64,
    effective_margin: i64,
    ask_profit: i64,
    bid_profit: i64,
    quote: Quote,
}

impl PositionSnapshot {
    pub fn new(quote: Quote, ask_lot: u64, bid_lot: u64, margin: i64, effective_margin: i64) -> Self {
        Self {
            ask_lot,
            bid_lot,
            margin,
            effective_margin,
            ask_profit: 0,
            bid_profit: 0,
            quote,
        }
    }

    /// Attach the broker-reported floating profit of each side.
    pub fn with_profits(mut self, ask_profit: i64, bid_profit: i64) -> Self {
        self.ask_profit = ask_profit;
        self.bid_profit = bid_profit;
        self
    }

    pub fn override_margin(&mut self, margin: i64) {
        self.margin = margin;
    }

    pub fn ask_lot(&self) -> u64 {
        self.ask_lot
    }

    pub fn bid_lot(&self) -> u64 {
        self.bid_lot
    }

    pub fn margin(&self) -> i64 {
        self.margin
    }

    pub fn effective_margin(&self) -> i64 {
        self.effective_margin
    }

    pub fn ask_profit(&self) -> i64 {
        self.ask_profit
    }

    pub fn bid_profit(&self) -> i64 {
        self.bid_profit
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    /// Floating profit of the whole position.
    pub fn position_profit(&self) -> i64 {
        self.ask_profit + self.bid_profit
    }

    pub fn status(&self) -> PositionStatus {
        PositionStatus::from_lots(self.ask_lot, self.bid_lot)
    }

    pub fn has_position(&self) -> bool {
        self.status() != PositionStatus::NoPosition
    }

    pub fn more_lot(&self) -> u64 {
        self.ask_lot.max(self.bid_lot)
    }

    pub fn less_lot(&self) -> u64 {
        self.ask_lot.min(self.bid_lot)
    }
}
