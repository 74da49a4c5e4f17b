//! Lot manager — next order size with bounded geometric escalation.
//!
//! # Formula
//! ```text
//! limit    = initial_lot * magnification ^ escalation_count
//! next_lot = initial_lot                      if no position
//!          = more - less                      if more >= limit
//!          = more * magnification - less      otherwise
//! ```
//!
//! Below the cap an order both grows exposure and narrows the imbalance;
//! at the cap it only rebalances to parity.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LotConfig;
use crate::domain::PositionSnapshot;

/// Which configured initial lot is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotMode {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotManager {
    mode: LotMode,
    initial_positive: u64,
    initial_negative: u64,
    magnification: u64,
    escalation_count: u32,
}

impl LotManager {
    pub fn new(config: &LotConfig) -> Self {
        Self {
            mode: LotMode::Positive,
            initial_positive: config.initial_positive,
            initial_negative: config.initial_negative,
            magnification: config.magnification,
            escalation_count: config.escalation_count,
        }
    }

    pub fn mode(&self) -> LotMode {
        self.mode
    }

    pub fn mode_positive(&mut self) {
        self.mode = LotMode::Positive;
    }

    pub fn mode_negative(&mut self) {
        self.mode = LotMode::Negative;
    }

    pub fn initial_lot(&self) -> u64 {
        match self.mode {
            LotMode::Positive => self.initial_positive,
            LotMode::Negative => self.initial_negative,
        }
    }

    pub fn magnification(&self) -> u64 {
        self.magnification
    }

    pub fn escalation_count(&self) -> u32 {
        self.escalation_count
    }

    /// Allow one more escalation step.
    pub fn increment(&mut self) {
        self.escalation_count = self.escalation_count.saturating_add(1);
        debug!(escalation_count = self.escalation_count, limit = self.limit(), "lot limit raised");
    }

    /// Remove one escalation step (never below zero).
    pub fn decrement(&mut self) {
        self.escalation_count = self.escalation_count.saturating_sub(1);
        debug!(escalation_count = self.escalation_count, limit = self.limit(), "lot limit lowered");
    }

    pub fn reset_escalation(&mut self) {
        self.escalation_count = 0;
    }

    /// Per-side lot cap. Saturates instead of overflowing.
    pub fn limit(&self) -> u64 {
        self.initial_lot()
            .saturating_mul(self.magnification.saturating_pow(self.escalation_count))
    }

    pub fn next_lot(&self, snapshot: &PositionSnapshot) -> u64 {
        if !snapshot.has_position() {
            return self.initial_lot();
        }

        let more = snapshot.more_lot();
        let less = snapshot.less_lot();
        if more >= self.limit() {
            more - less
        } else {
            more.saturating_mul(self.magnification) - less
        }
    }

    /// Either side has reached the cap.
    pub fn is_limit(&self, snapshot: &PositionSnapshot) -> bool {
        let limit = self.limit();
        snapshot.ask_lot() >= limit || snapshot.bid_lot() >= limit
    }
}
