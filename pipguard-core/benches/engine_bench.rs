//! Criterion benchmarks for PipGuard hot paths.
//!
//! Benchmarks:
//! 1. Rate analyzer add (prune + threshold recompute) at several tick rates
//! 2. Engine observe (analyzer + every manager) over a full session

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pipguard_core::config::AnalyzerConfig;
use pipguard_core::{Engine, EngineConfig, PositionSnapshot, Quote, RateAnalyzer};

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()
}

fn make_quotes(n: usize, interval_ms: i64) -> Vec<Quote> {
    (0..n)
        .map(|i| {
            let mid = 110_000 + ((i as f64 * 0.01).sin() * 120.0) as i64;
            Quote::new(
                mid + 3,
                mid - 3,
                t0() + Duration::milliseconds(i as i64 * interval_ms),
            )
        })
        .collect()
}

// ── 1. Analyzer ──────────────────────────────────────────────────────

fn bench_analyzer_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyzer_add");
    for interval_ms in [250_i64, 1_000, 5_000] {
        let quotes = make_quotes(5_000, interval_ms);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{interval_ms}ms")),
            &quotes,
            |b, quotes| {
                b.iter(|| {
                    let mut analyzer = RateAnalyzer::new(AnalyzerConfig::default());
                    for q in quotes {
                        analyzer.add(*q);
                    }
                    black_box(analyzer.ask_threshold())
                })
            },
        );
    }
    group.finish();
}

// ── 2. Engine ────────────────────────────────────────────────────────

fn bench_engine_observe(c: &mut Criterion) {
    let snapshots: Vec<PositionSnapshot> = make_quotes(5_000, 1_000)
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let lots = if i % 400 < 200 { (2, 1) } else { (1, 3) };
            PositionSnapshot::new(q, lots.0, lots.1, 100_000, 100_000 + (i as i64 % 700) - 350)
        })
        .collect();

    c.bench_function("engine_observe_session", |b| {
        b.iter(|| {
            let mut engine = match Engine::new(EngineConfig::default()) {
                Ok(engine) => engine,
                Err(e) => panic!("default config must be valid: {e}"),
            };
            engine.recovery_mut().open(&snapshots[0]);
            for snap in &snapshots {
                engine.range_mut().save(snap);
                black_box(engine.observe(snap));
            }
        })
    });
}

criterion_group!(benches, bench_analyzer_add, bench_engine_observe);
criterion_main!(benches);
