//! Rate analyzer — trailing quote window and adaptive breakout thresholds.
//!
//! Every accepted quote is appended, quotes older than the retention window
//! (measured from the newest quote, never the wall clock) are pruned, and the
//! ask/bid thresholds are recomputed. Replaying the same quote sequence
//! therefore always yields the same thresholds.
//!
//! Queries over an empty window return `None` / `false`: callers treat that as
//! "no signal yet".

pub mod bias;
pub mod threshold;

pub use bias::{BreachSide, DirectionalBias, LastBreachTracker};
pub use threshold::{narrowing_step, Thresholds};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;
use crate::domain::Quote;

/// Outcome of [`RateAnalyzer::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Admission {
    Accepted,
    /// Spread crossed or wider than `max_spread`; not retained.
    Doubtful,
    /// Older than the newest retained quote; not retained.
    OutOfOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAnalyzer<B = LastBreachTracker> {
    config: AnalyzerConfig,
    window: VecDeque<Quote>,
    thresholds: Option<Thresholds>,
    bias: B,
    consecutive_doubtful: u32,
}

impl RateAnalyzer<LastBreachTracker> {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_bias(config, LastBreachTracker::new())
    }
}

impl<B: DirectionalBias> RateAnalyzer<B> {
    pub fn with_bias(config: AnalyzerConfig, bias: B) -> Self {
        Self {
            config,
            window: VecDeque::new(),
            thresholds: None,
            bias,
            consecutive_doubtful: 0,
        }
    }

    pub fn add(&mut self, quote: Quote) -> Admission {
        if quote.is_doubtful(self.config.max_spread) {
            self.consecutive_doubtful += 1;
            warn!(
                ask = quote.ask,
                bid = quote.bid,
                spread = quote.spread(),
                consecutive = self.consecutive_doubtful,
                "doubtful quote excluded from rate window"
            );
            return Admission::Doubtful;
        }

        if let Some(latest) = self.window.back() {
            if quote.timestamp < latest.timestamp {
                warn!(
                    timestamp = %quote.timestamp,
                    latest = %latest.timestamp,
                    "out-of-order quote excluded from rate window"
                );
                return Admission::OutOfOrder;
            }
        }

        self.consecutive_doubtful = 0;
        self.window.push_back(quote);
        self.prune();
        self.recompute_thresholds();

        let ask_reached = self.is_reached_ask_threshold(&quote);
        let bid_reached = self.is_reached_bid_threshold(&quote);
        self.bias.observe(ask_reached, bid_reached);

        Admission::Accepted
    }

    fn prune(&mut self) {
        let Some(newest) = self.window.back().map(|q| q.timestamp) else {
            return;
        };
        let retention = self.config.retention();
        while let Some(front) = self.window.front() {
            if newest - front.timestamp > retention {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn recompute_thresholds(&mut self) {
        let lookback = self.config.threshold_lookback();
        let (Some(ask), Some(bid)) = (self.max_within(lookback), self.min_within(lookback)) else {
            self.thresholds = None;
            return;
        };

        let base_band = ask - bid;
        let mut thresholds = Thresholds {
            ask,
            bid,
            base_band,
            lookback_secs: self.config.threshold_lookback_secs,
            narrowed: false,
        };

        if let Some(step) = narrowing_step(base_band, &self.config.narrowing).copied() {
            let narrow = step.lookback();
            if let (Some(ask), Some(bid)) = (self.max_within(narrow), self.min_within(narrow)) {
                debug!(
                    base_band,
                    band = ask - bid,
                    lookback_secs = step.lookback_secs,
                    "threshold window narrowed"
                );
                thresholds = Thresholds {
                    ask,
                    bid,
                    base_band,
                    lookback_secs: step.lookback_secs,
                    narrowed: true,
                };
            }
        }

        self.thresholds = Some(thresholds);
    }

    /// Quotes no older than `within` relative to the newest quote, newest first.
    fn recent(&self, within: Duration) -> impl Iterator<Item = &Quote> {
        let newest = self.window.back().map(|q| q.timestamp);
        self.window
            .iter()
            .rev()
            .take_while(move |q| newest.is_some_and(|t| t - q.timestamp <= within))
    }

    /// Highest ask within `within` of the newest quote.
    pub fn max_within(&self, within: Duration) -> Option<i64> {
        self.recent(within).map(|q| q.ask).max()
    }

    /// Lowest bid within `within` of the newest quote.
    pub fn min_within(&self, within: Duration) -> Option<i64> {
        self.recent(within).map(|q| q.bid).min()
    }

    pub fn range_within(&self, within: Duration) -> Option<i64> {
        Some(self.max_within(within)? - self.min_within(within)?)
    }

    pub fn is_reached_ask_threshold(&self, quote: &Quote) -> bool {
        self.thresholds.is_some_and(|t| quote.ask >= t.ask)
    }

    pub fn is_reached_bid_threshold(&self, quote: &Quote) -> bool {
        self.thresholds.is_some_and(|t| quote.bid <= t.bid)
    }

    /// Like [`Self::is_reached_ask_threshold`] but against the extreme of an
    /// arbitrary horizon instead of the adaptive threshold.
    pub fn is_reached_ask_threshold_within(&self, quote: &Quote, within: Duration) -> bool {
        self.max_within(within).is_some_and(|max| quote.ask >= max)
    }

    pub fn is_reached_bid_threshold_within(&self, quote: &Quote, within: Duration) -> bool {
        self.min_within(within).is_some_and(|min| quote.bid <= min)
    }

    /// True once the full-lookback band is wide enough to narrow the window.
    pub fn is_moved(&self) -> bool {
        self.thresholds.is_some_and(|t| t.narrowed)
    }

    /// True while the range over the calm window stays below the calm floor.
    /// An empty window is calm.
    pub fn is_calm(&self) -> bool {
        self.range_within(self.config.calm_window())
            .map_or(true, |range| range < self.config.calm_floor)
    }

    pub fn is_ask_up(&self) -> bool {
        self.bias.last_breach() == Some(BreachSide::Ask)
    }

    pub fn is_bid_down(&self) -> bool {
        self.bias.last_breach() == Some(BreachSide::Bid)
    }

    pub fn ask_threshold(&self) -> Option<i64> {
        self.thresholds.map(|t| t.ask)
    }

    pub fn bid_threshold(&self) -> Option<i64> {
        self.thresholds.map(|t| t.bid)
    }

    pub fn thresholds(&self) -> Option<&Thresholds> {
        self.thresholds.as_ref()
    }

    /// Lookback the current thresholds were taken over.
    pub fn active_lookback(&self) -> Option<Duration> {
        self.thresholds
            .map(|t| Duration::seconds(t.lookback_secs as i64))
    }

    /// Doubtful quotes received since the last accepted one.
    pub fn consecutive_doubtful(&self) -> u32 {
        self.consecutive_doubtful
    }

    pub fn latest(&self) -> Option<&Quote> {
        self.window.back()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.window.iter()
    }

    pub fn bias(&self) -> &B {
        &self.bias
    }

    /// Forget the breakout direction; the window and thresholds are kept.
    pub fn reset_bias(&mut self) {
        self.bias.reset();
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}
