//! Adaptive breakout thresholds.
//!
//! While the market is calm the thresholds are the extremes of the full
//! lookback; as the band widens the lookback shrinks step by step so the
//! thresholds follow recent price faster. A narrower window is a subset of
//! the wider one (both end at the newest quote), so narrowing can only raise
//! the bid threshold and lower the ask threshold.

use serde::{Deserialize, Serialize};

use crate::config::NarrowingStep;

/// Thresholds currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Highest ask over the active lookback.
    pub ask: i64,
    /// Lowest bid over the active lookback.
    pub bid: i64,
    /// Band over the full (un-narrowed) lookback.
    pub base_band: i64,
    /// Lookback the thresholds were taken over.
    pub lookback_secs: u64,
    pub narrowed: bool,
}

impl Thresholds {
    pub fn band(&self) -> i64 {
        self.ask - self.bid
    }
}

/// Narrowing step for a band, if the band reached any. The widest band
/// reached wins; `steps` must be sorted by ascending `min_band`.
pub fn narrowing_step(band: i64, steps: &[NarrowingStep]) -> Option<&NarrowingStep> {
    steps.iter().rev().find(|step| band >= step.min_band)
}
