//! Range manager — high/low extremes with a deferred save → apply commit.
//!
//! `save` accumulates pending bounds tick by tick; decision logic only ever
//! sees the committed bounds, which change on an explicit `apply`. A single
//! erratic tick therefore cannot move a boundary until the caller decides to
//! trust it.
//!
//! Pending bounds only widen, and only on the side the position is exposed to:
//! the upper bound while ask-majority, the lower bound while bid-majority.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{PositionSnapshot, PositionStatus};

/// An upper/lower price pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub upper: i64,
    pub lower: i64,
}

impl Bounds {
    /// Extend in the direction of the dominant side. Returns true if changed.
    fn extend(&mut self, snapshot: &PositionSnapshot) -> bool {
        let quote = snapshot.quote();
        match snapshot.status() {
            PositionStatus::AskMajority if quote.ask > self.upper => {
                self.upper = quote.ask;
                true
            }
            PositionStatus::BidMajority if quote.bid < self.lower => {
                self.lower = quote.bid;
                true
            }
            _ => false,
        }
    }
}

/// Observable phase of the two-phase commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangePhase {
    Empty,
    PendingOnly,
    Committed,
    PendingAheadOfCommitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeState {
    /// Nothing observed since the last reset.
    Empty,
    /// Observed but never applied.
    PendingOnly { pending: Bounds },
    /// Pending and committed bounds are identical.
    Committed { bounds: Bounds },
    /// Pending bounds have widened past the committed ones.
    PendingAheadOfCommitted { pending: Bounds, committed: Bounds },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeManager {
    state: RangeState,
}

impl Default for RangeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeManager {
    pub fn new() -> Self {
        Self {
            state: RangeState::Empty,
        }
    }

    /// Clear pending and committed bounds.
    pub fn reset(&mut self) {
        self.state = RangeState::Empty;
    }

    /// Seed or extend the pending bounds from the snapshot's quote.
    pub fn save(&mut self, snapshot: &PositionSnapshot) {
        self.state = match self.state {
            RangeState::Empty => {
                let quote = snapshot.quote();
                RangeState::PendingOnly {
                    pending: Bounds {
                        upper: quote.ask,
                        lower: quote.bid,
                    },
                }
            }
            RangeState::PendingOnly { mut pending } => {
                pending.extend(snapshot);
                RangeState::PendingOnly { pending }
            }
            RangeState::Committed { bounds } => {
                let mut pending = bounds;
                if pending.extend(snapshot) {
                    RangeState::PendingAheadOfCommitted {
                        pending,
                        committed: bounds,
                    }
                } else {
                    RangeState::Committed { bounds }
                }
            }
            RangeState::PendingAheadOfCommitted {
                mut pending,
                committed,
            } => {
                pending.extend(snapshot);
                RangeState::PendingAheadOfCommitted { pending, committed }
            }
        };
    }

    /// Promote pending bounds to committed.
    pub fn apply(&mut self) {
        self.state = match self.state {
            RangeState::Empty => RangeState::Empty,
            RangeState::PendingOnly { pending }
            | RangeState::PendingAheadOfCommitted { pending, .. } => {
                debug!(upper = pending.upper, lower = pending.lower, "range bounds committed");
                RangeState::Committed { bounds: pending }
            }
            committed @ RangeState::Committed { .. } => committed,
        };
    }

    /// Quote strictly inside the committed bounds. False while nothing is committed.
    pub fn is_within_range(&self, snapshot: &PositionSnapshot) -> bool {
        let quote = snapshot.quote();
        self.committed()
            .is_some_and(|b| b.lower < quote.bid && quote.ask < b.upper)
    }

    pub fn committed(&self) -> Option<Bounds> {
        match self.state {
            RangeState::Committed { bounds } => Some(bounds),
            RangeState::PendingAheadOfCommitted { committed, .. } => Some(committed),
            RangeState::Empty | RangeState::PendingOnly { .. } => None,
        }
    }

    pub fn pending(&self) -> Option<Bounds> {
        match self.state {
            RangeState::PendingOnly { pending }
            | RangeState::PendingAheadOfCommitted { pending, .. } => Some(pending),
            RangeState::Committed { bounds } => Some(bounds),
            RangeState::Empty => None,
        }
    }

    pub fn upper_limit(&self) -> Option<i64> {
        self.committed().map(|b| b.upper)
    }

    pub fn lower_limit(&self) -> Option<i64> {
        self.committed().map(|b| b.lower)
    }

    pub fn pending_upper(&self) -> Option<i64> {
        self.pending().map(|b| b.upper)
    }

    pub fn pending_lower(&self) -> Option<i64> {
        self.pending().map(|b| b.lower)
    }

    pub fn phase(&self) -> RangePhase {
        match self.state {
            RangeState::Empty => RangePhase::Empty,
            RangeState::PendingOnly { .. } => RangePhase::PendingOnly,
            RangeState::Committed { .. } => RangePhase::Committed,
            RangeState::PendingAheadOfCommitted { .. } => RangePhase::PendingAheadOfCommitted,
        }
    }

    pub fn state(&self) -> &RangeState {
        &self.state
    }
}
