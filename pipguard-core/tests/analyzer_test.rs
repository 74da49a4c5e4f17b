//! Integration tests for the rate analyzer.
//!
//! Tests:
//! 1. Documented scenarios (breakout thresholds over a short history)
//! 2. Deterministic replay: timestamps, not the wall clock, drive the window
//! 3. Adaptive narrowing as volatility builds and fades
//! 4. Directional bias contract

use chrono::{DateTime, Duration, TimeZone, Utc};
use pipguard_core::analyzer::{Admission, BreachSide, DirectionalBias, RateAnalyzer};
use pipguard_core::config::AnalyzerConfig;
use pipguard_core::Quote;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap()
}

fn quote_at(secs: i64, ask: i64, bid: i64) -> Quote {
    Quote::new(ask, bid, t0() + Duration::seconds(secs))
}

/// Sine-shaped session: one quote every 5 seconds for `n` ticks.
fn session(n: i64) -> Vec<Quote> {
    (0..n)
        .map(|i| {
            let mid = 110_000 + ((i as f64 * 0.05).sin() * 60.0) as i64;
            quote_at(i * 5, mid + 3, mid - 3)
        })
        .collect()
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn scenario_a_thresholds_span_both_quotes() {
    let mut analyzer = RateAnalyzer::new(AnalyzerConfig::default());
    analyzer.add(quote_at(0, 110_050, 109_950));
    analyzer.add(quote_at(20, 110_200, 110_100));

    assert_eq!(analyzer.ask_threshold(), Some(110_200));
    assert_eq!(analyzer.bid_threshold(), Some(109_950));
    assert!(analyzer.is_reached_ask_threshold(&quote_at(21, 110_200, 110_150)));
    assert!(!analyzer.is_reached_bid_threshold(&quote_at(21, 110_200, 110_150)));
    assert!(analyzer.is_reached_bid_threshold(&quote_at(21, 110_000, 109_900)));
}

#[test]
fn replay_is_deterministic() {
    let quotes = session(600);

    let mut first = RateAnalyzer::new(AnalyzerConfig::default());
    let mut second = RateAnalyzer::new(AnalyzerConfig::default());
    let mut trace_a = Vec::new();
    let mut trace_b = Vec::new();

    for q in &quotes {
        first.add(*q);
        trace_a.push((first.ask_threshold(), first.bid_threshold(), first.is_ask_up()));
    }
    for q in &quotes {
        second.add(*q);
        trace_b.push((second.ask_threshold(), second.bid_threshold(), second.is_ask_up()));
    }

    assert_eq!(trace_a, trace_b);
    assert_eq!(first, second);
}

#[test]
fn retention_is_relative_to_quote_time() {
    let mut analyzer = RateAnalyzer::new(AnalyzerConfig::default());
    for q in session(600) {
        analyzer.add(q);
    }
    // 15 minutes at one quote per 5 seconds = 180 intervals → 181 quotes
    assert_eq!(analyzer.len(), 181);
}

// ──────────────────────────────────────────────
// Adaptive narrowing
// ──────────────────────────────────────────────

#[test]
fn thresholds_narrow_as_band_grows_and_widen_when_spike_expires() {
    let mut analyzer = RateAnalyzer::new(AnalyzerConfig::default());

    // quiet market around 110_000
    for i in 0..60 {
        analyzer.add(quote_at(i * 5, 110_003, 109_997));
    }
    assert!(!analyzer.is_moved());
    assert_eq!(analyzer.active_lookback(), Some(Duration::minutes(10)));

    // spike of 120 units
    analyzer.add(quote_at(300, 110_123, 110_117));
    assert!(analyzer.is_moved());
    assert_eq!(analyzer.active_lookback(), Some(Duration::minutes(1)));
    assert_eq!(analyzer.ask_threshold(), Some(110_123));
    assert_eq!(analyzer.bid_threshold(), Some(109_997));

    // back to quiet; the spike stays in the 10 minute window
    for i in 61..180 {
        analyzer.add(quote_at(i * 5, 110_003, 109_997));
        let t = analyzer.thresholds().unwrap();
        assert!(t.band() <= t.base_band);
    }

    // 10 minutes after the spike it no longer counts
    analyzer.add(quote_at(901, 110_003, 109_997));
    assert!(!analyzer.is_moved());
    assert_eq!(analyzer.ask_threshold(), Some(110_003));
}

#[test]
fn doubtful_burst_does_not_disturb_thresholds() {
    let mut analyzer = RateAnalyzer::new(AnalyzerConfig::default());
    analyzer.add(quote_at(0, 110_010, 110_000));
    for i in 1..=5 {
        assert_eq!(analyzer.add(quote_at(i, 111_000, 110_000)), Admission::Doubtful);
    }
    assert_eq!(analyzer.consecutive_doubtful(), 5);
    assert_eq!(analyzer.ask_threshold(), Some(110_010));
    assert_eq!(analyzer.len(), 1);
}

// ──────────────────────────────────────────────
// Directional bias
// ──────────────────────────────────────────────

/// Bias that only ever reports the ask side, to show the analyzer delegates.
#[derive(Debug, Clone, Default, PartialEq)]
struct AlwaysAsk {
    observed: usize,
}

impl DirectionalBias for AlwaysAsk {
    fn observe(&mut self, _ask_reached: bool, _bid_reached: bool) {
        self.observed += 1;
    }

    fn last_breach(&self) -> Option<BreachSide> {
        (self.observed > 0).then_some(BreachSide::Ask)
    }

    fn reset(&mut self) {
        self.observed = 0;
    }
}

#[test]
fn custom_bias_is_consulted() {
    let mut analyzer = RateAnalyzer::with_bias(AnalyzerConfig::default(), AlwaysAsk::default());
    assert!(!analyzer.is_ask_up());
    analyzer.add(quote_at(0, 110, 100));
    analyzer.add(quote_at(1, 105, 95)); // a bid breakout, ignored by this bias
    assert!(analyzer.is_ask_up());
    assert!(!analyzer.is_bid_down());
    assert_eq!(analyzer.bias().observed, 2);
}

#[test]
fn doubtful_quotes_are_not_observed_by_bias() {
    let mut analyzer = RateAnalyzer::with_bias(AnalyzerConfig::default(), AlwaysAsk::default());
    analyzer.add(quote_at(0, 10_000, 100));
    assert_eq!(analyzer.bias().observed, 0);
}

#[test]
fn default_bias_reports_most_recent_breach_side() {
    let mut analyzer = RateAnalyzer::new(AnalyzerConfig::default());
    analyzer.add(quote_at(0, 110_010, 110_000));

    // rally: each quote makes a new high
    for i in 1..5 {
        analyzer.add(quote_at(i, 110_010 + i * 5, 110_000 + i * 5));
    }
    assert!(analyzer.is_ask_up());

    // sell-off below the window low
    analyzer.add(quote_at(10, 110_000, 109_990));
    assert!(analyzer.is_bid_down());
    assert!(!analyzer.is_ask_up());
}
