//! Directional bias: which side of the book broke out most recently.
//!
//! The analyzer reports every accepted quote's breach outcome to a
//! [`DirectionalBias`]; policies only read back the resulting side, so the
//! tracking rule can be swapped without touching callers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreachSide {
    /// Ask reached its breakout threshold (price pushing up).
    Ask,
    /// Bid reached its breakout threshold (price pushing down).
    Bid,
}

pub trait DirectionalBias: Send + Sync {
    /// Record the breach outcome of one accepted quote.
    fn observe(&mut self, ask_reached: bool, bid_reached: bool);

    /// Side of the most recent breach, if any has been observed.
    fn last_breach(&self) -> Option<BreachSide>;

    fn reset(&mut self);
}

/// Remembers the side of the last one-sided breach.
///
/// A quote that reaches both thresholds at once (e.g. the first quote of a
/// window, or a spread blowing out in both directions) carries no direction
/// and leaves the previous side in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastBreachTracker {
    last: Option<BreachSide>,
}

impl LastBreachTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectionalBias for LastBreachTracker {
    fn observe(&mut self, ask_reached: bool, bid_reached: bool) {
        match (ask_reached, bid_reached) {
            (true, false) => self.last = Some(BreachSide::Ask),
            (false, true) => self.last = Some(BreachSide::Bid),
            _ => {}
        }
    }

    fn last_breach(&self) -> Option<BreachSide> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }
}
