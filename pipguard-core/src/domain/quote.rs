//! Quote — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed ask/bid pair for the traded currency pair.
///
/// Prices are integers in the instrument's scaled unit (e.g. 110.050 → 110050),
/// so all threshold arithmetic is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub ask: i64,
    pub bid: i64,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn new(ask: i64, bid: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            ask,
            bid,
            timestamp,
        }
    }

    pub fn spread(&self) -> i64 {
        self.ask - self.bid
    }

    /// Integer midpoint, truncated toward zero.
    pub fn middle(&self) -> i64 {
        (self.ask + self.bid) / 2
    }

    /// A crossed book (`ask < bid`) or a spread wider than `max_spread` is not
    /// a price anyone could trade at.
    pub fn is_doubtful(&self, max_spread: i64) -> bool {
        let spread = self.spread();
        spread < 0 || spread > max_spread
    }
}
