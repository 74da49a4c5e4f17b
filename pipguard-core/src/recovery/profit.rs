//! Profit targets for "recovered with profit" checks.
//!
//! A target is a small capability object: given the current snapshot it
//! returns how much equity above the episode's starting margin counts as
//! profit. Each target is tested on its own; the recovery manager only sees
//! the trait.

use serde::{Deserialize, Serialize};

use crate::domain::PositionSnapshot;

pub trait ProfitTarget: Send + Sync {
    fn profit(&self, snapshot: &PositionSnapshot) -> i64;

    /// Target name for logging
    fn name(&self) -> &str;
}

/// Constant amount regardless of position size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProfit {
    pub amount: i64,
}

impl ProfitTarget for FixedProfit {
    fn profit(&self, _snapshot: &PositionSnapshot) -> i64 {
        self.amount
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Percentage of the snapshot's margin (e.g. `1.0` = 1%), rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginPercent {
    pub percent: f64,
}

impl ProfitTarget for MarginPercent {
    fn profit(&self, snapshot: &PositionSnapshot) -> i64 {
        (snapshot.margin() as f64 * self.percent / 100.0).round() as i64
    }

    fn name(&self) -> &str {
        "margin_percent"
    }
}

/// Fixed amount per lot of the larger side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerLot {
    pub amount: i64,
}

impl ProfitTarget for PerLot {
    fn profit(&self, snapshot: &PositionSnapshot) -> i64 {
        self.amount.saturating_mul(snapshot.more_lot() as i64)
    }

    fn name(&self) -> &str {
        "per_lot"
    }
}

/// The smaller of two targets.
pub struct Capped {
    first: Box<dyn ProfitTarget>,
    second: Box<dyn ProfitTarget>,
}

impl Capped {
    pub fn new(first: Box<dyn ProfitTarget>, second: Box<dyn ProfitTarget>) -> Self {
        Self { first, second }
    }
}

impl ProfitTarget for Capped {
    fn profit(&self, snapshot: &PositionSnapshot) -> i64 {
        self.first.profit(snapshot).min(self.second.profit(snapshot))
    }

    fn name(&self) -> &str {
        "capped"
    }
}

/// Serializable profit target selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfitTargetConfig {
    Fixed { amount: i64 },
    MarginPercent { percent: f64 },
    PerLot { amount: i64 },
    Capped {
        first: Box<ProfitTargetConfig>,
        second: Box<ProfitTargetConfig>,
    },
}

impl Default for ProfitTargetConfig {
    /// 1% of margin, but never more than 1000 per lot.
    fn default() -> Self {
        ProfitTargetConfig::Capped {
            first: Box::new(ProfitTargetConfig::MarginPercent { percent: 1.0 }),
            second: Box::new(ProfitTargetConfig::PerLot { amount: 1_000 }),
        }
    }
}

impl ProfitTargetConfig {
    pub fn build(&self) -> Box<dyn ProfitTarget> {
        match self {
            Self::Fixed { amount } => Box::new(FixedProfit { amount: *amount }),
            Self::MarginPercent { percent } => Box::new(MarginPercent { percent: *percent }),
            Self::PerLot { amount } => Box::new(PerLot { amount: *amount }),
            Self::Capped { first, second } => Box::new(Capped::new(first.build(), second.build())),
        }
    }
}
