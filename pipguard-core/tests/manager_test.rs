//! Integration tests for the recovery, range and lot managers.
//!
//! Tests:
//! 1. Documented scenarios B, C and D
//! 2. A losing episode escalated twice and recovered
//! 3. Range commit driven by recovery milestones

use chrono::{DateTime, Duration, TimeZone, Utc};
use pipguard_core::config::LotConfig;
use pipguard_core::range::{Bounds, RangePhase};
use pipguard_core::recovery::{Capped, MarginPercent, PerLot, ProfitTargetConfig};
use pipguard_core::{
    LotManager, PositionSnapshot, ProfitTarget, Quote, RangeManager, RecoveryError, RecoveryManager,
};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap()
}

struct Tick {
    secs: i64,
    ask: i64,
    bid: i64,
    ask_lot: u64,
    bid_lot: u64,
    margin: i64,
    effective_margin: i64,
}

impl Tick {
    fn snapshot(&self) -> PositionSnapshot {
        let quote = Quote::new(self.ask, self.bid, t0() + Duration::seconds(self.secs));
        PositionSnapshot::new(quote, self.ask_lot, self.bid_lot, self.margin, self.effective_margin)
    }
}

fn flat(effective_margin: i64) -> PositionSnapshot {
    Tick {
        secs: 0,
        ask: 110,
        bid: 100,
        ask_lot: 1,
        bid_lot: 0,
        margin: 100_000,
        effective_margin,
    }
    .snapshot()
}

fn at_lots(ask_lot: u64, bid_lot: u64) -> PositionSnapshot {
    Tick {
        secs: 0,
        ask: 110,
        bid: 100,
        ask_lot,
        bid_lot,
        margin: 100_000,
        effective_margin: 100_000,
    }
    .snapshot()
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn scenario_b_recovery_latches() {
    let mut recovery = RecoveryManager::new();
    recovery.open(&flat(100_000));
    assert!(recovery.is_open());

    assert_eq!(recovery.is_recovered(&flat(100_500)), Ok(true));
    assert!(recovery.is_reached_recover());
}

#[test]
fn scenario_c_lot_sizing() {
    let lots = LotManager::new(&LotConfig {
        initial_positive: 1,
        initial_negative: 1,
        magnification: 3,
        escalation_count: 2,
    });
    assert_eq!(lots.limit(), 9);
    assert_eq!(lots.next_lot(&at_lots(2, 0)), 6);
    assert_eq!(lots.next_lot(&at_lots(9, 1)), 8);
    assert!(lots.is_limit(&at_lots(9, 1)));
}

#[test]
fn scenario_d_range_commit() {
    let mut range = RangeManager::new();
    range.reset();
    range.save(&Tick { secs: 0, ask: 110, bid: 100, ask_lot: 2, bid_lot: 0, margin: 0, effective_margin: 0 }.snapshot());
    assert_eq!(range.pending(), Some(Bounds { upper: 110, lower: 100 }));
    range.apply();

    let inside = Tick { secs: 1, ask: 105, bid: 102, ask_lot: 2, bid_lot: 0, margin: 0, effective_margin: 0 };
    let above = Tick { ask: 111, ..inside };
    assert!(range.is_within_range(&inside.snapshot()));
    assert!(!range.is_within_range(&above.snapshot()));
}

// ──────────────────────────────────────────────
// Episode walkthrough
// ──────────────────────────────────────────────

#[test]
fn losing_episode_escalated_and_recovered() {
    let mut recovery = RecoveryManager::new();
    let mut lots = LotManager::new(&LotConfig::default());

    // enter long 1 lot at 100_000 equity
    let entry = at_lots(1, 0);
    recovery.open(&entry);
    assert!(recovery.is_before_counter_trading());

    // price falls; counter-trade on the bid side
    let losing = Tick { secs: 60, ask: 90, bid: 80, ask_lot: 1, bid_lot: 0, margin: 100_000, effective_margin: 98_000 }
        .snapshot()
        .with_profits(-2_000, 0);
    assert_eq!(recovery.is_recovered(&losing), Ok(false));
    let size = lots.next_lot(&losing);
    assert_eq!(size, 3); // 1 * 3 - 0
    recovery.set_counter_trading_snapshot(&losing).unwrap();
    assert!(recovery.is_after_counter_trading());
    lots.increment();

    // halfway back
    let halfway = Tick { secs: 120, ask: 95, bid: 85, ask_lot: 1, bid_lot: 3, margin: 100_000, effective_margin: 99_000 }
        .snapshot();
    assert_eq!(recovery.recovery_progress(&halfway), Ok(50));
    assert_eq!(lots.next_lot(&halfway), 8); // 3 * 3 - 1, below limit 27

    // recovered with a profit target of 1% of margin capped at 200 per lot
    let target = ProfitTargetConfig::Capped {
        first: Box::new(ProfitTargetConfig::MarginPercent { percent: 1.0 }),
        second: Box::new(ProfitTargetConfig::PerLot { amount: 200 }),
    }
    .build();
    let recovered = Tick { secs: 180, ask: 99, bid: 89, ask_lot: 1, bid_lot: 3, margin: 100_000, effective_margin: 100_400 }
        .snapshot();
    assert_eq!(recovery.is_recovered(&recovered), Ok(true));
    // target = min(1_000, 3 * 200) = 600
    assert_eq!(recovery.is_recovered_with_profit(&recovered, target.as_ref()), Ok(false));
    assert_eq!(recovery.recovery_progress(&recovered), Ok(120));

    let profitable = Tick { secs: 240, ask: 100, bid: 90, ask_lot: 1, bid_lot: 3, margin: 100_000, effective_margin: 100_600 }
        .snapshot();
    assert_eq!(recovery.is_recovered_with_profit(&profitable, target.as_ref()), Ok(true));

    recovery.close();
    assert!(recovery.is_close());
    assert_eq!(
        recovery.recovery_progress(&profitable),
        Err(RecoveryError::NotOpen { operation: "recovery_progress" })
    );
}

#[test]
fn profit_targets_compose() {
    let snap = at_lots(4, 1);
    let capped = Capped::new(
        Box::new(MarginPercent { percent: 0.5 }),
        Box::new(PerLot { amount: 100 }),
    );
    // min(500, 400)
    assert_eq!(capped.profit(&snap), 400);
}

// ──────────────────────────────────────────────
// Range driven by recovery milestones
// ──────────────────────────────────────────────

#[test]
fn range_commits_only_on_milestones() {
    let mut range = RangeManager::new();
    let mut recovery = RecoveryManager::new();

    let ticks = [
        Tick { secs: 0, ask: 110, bid: 100, ask_lot: 1, bid_lot: 0, margin: 100_000, effective_margin: 100_000 },
        Tick { secs: 1, ask: 118, bid: 108, ask_lot: 1, bid_lot: 0, margin: 100_000, effective_margin: 99_500 },
        Tick { secs: 2, ask: 125, bid: 115, ask_lot: 1, bid_lot: 0, margin: 100_000, effective_margin: 100_200 },
        Tick { secs: 3, ask: 140, bid: 130, ask_lot: 1, bid_lot: 0, margin: 100_000, effective_margin: 100_900 },
    ];

    recovery.open(&ticks[0].snapshot());
    let mut committed_upper = Vec::new();
    for tick in &ticks {
        let snap = tick.snapshot();
        range.save(&snap);
        if recovery.is_recovered(&snap).unwrap() && range.phase() != RangePhase::Committed {
            range.apply();
        }
        committed_upper.push(range.upper_limit());
    }

    // first tick recovers trivially (equity == start) and commits the seed
    assert_eq!(committed_upper, vec![Some(110), Some(110), Some(125), Some(140)]);
}
