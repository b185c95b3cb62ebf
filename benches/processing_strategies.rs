//! Benchmark suite for comparing processing strategies
//!
//! This benchmark compares the performance of synchronous and asynchronous
//! journal replay using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//! ```
//!
//! # Benchmark Fixtures
//!
//! Every run starts from the same seed (`cards.csv`: 50 buyers and one
//! seller, `listings.csv`: 20 listings) and replays one of:
//! - `benchmark_small.csv` - Small journal (100 requests)
//! - `benchmark_medium.csv` - Medium journal (1,000 requests)
//! - `benchmark_large.csv` - Large journal (10,000 requests)
//!
//! Each journal includes a mix of:
//! - Orders, some with idempotency keys
//! - Top-ups
//! - Orders with a wrong verification code
//!
//! Seeding happens outside the timed section.

use chrono::Utc;
use divan::Bencher;
use marketplace_orders::cli::StrategyType;
use marketplace_orders::core::{MarketStore, Marketplace};
use marketplace_orders::io::{load_cards, load_listings};
use marketplace_orders::strategy::{create_strategy, BatchConfig};
use std::path::Path;
use std::sync::Arc;

fn main() {
    divan::main();
}

fn seeded_marketplace() -> Marketplace {
    let store = Arc::new(MarketStore::new());
    let seeded_at = Utc::now();
    load_cards(&store, Path::new("benches/fixtures/cards.csv"), seeded_at)
        .expect("Failed to seed cards");
    load_listings(&store, Path::new("benches/fixtures/listings.csv"), seeded_at)
        .expect("Failed to seed listings");
    Marketplace::new(store)
}

fn replay(bencher: Bencher, strategy_type: StrategyType, journal: &str) {
    let path = Path::new("benches/fixtures").join(journal);
    let config = match strategy_type {
        StrategyType::Async => Some(BatchConfig::default()),
        StrategyType::Sync => None,
    };
    let strategy = create_strategy(strategy_type, config);

    bencher
        .with_inputs(seeded_marketplace)
        .bench_values(|marketplace| {
            let mut output = Vec::new();
            strategy
                .process(&marketplace, &path, &mut output)
                .expect("Processing failed");
            output
        });
}

/// Benchmark synchronous replay of the small journal (100 requests)
#[divan::bench]
fn sync_strategy_small(bencher: Bencher) {
    replay(bencher, StrategyType::Sync, "benchmark_small.csv");
}

/// Benchmark asynchronous replay of the small journal (100 requests)
#[divan::bench]
fn async_strategy_small(bencher: Bencher) {
    replay(bencher, StrategyType::Async, "benchmark_small.csv");
}

/// Benchmark synchronous replay of the medium journal (1,000 requests)
#[divan::bench]
fn sync_strategy_medium(bencher: Bencher) {
    replay(bencher, StrategyType::Sync, "benchmark_medium.csv");
}

/// Benchmark asynchronous replay of the medium journal (1,000 requests)
#[divan::bench]
fn async_strategy_medium(bencher: Bencher) {
    replay(bencher, StrategyType::Async, "benchmark_medium.csv");
}

/// Benchmark synchronous replay of the large journal (10,000 requests)
#[divan::bench]
fn sync_strategy_large(bencher: Bencher) {
    replay(bencher, StrategyType::Sync, "benchmark_large.csv");
}

/// Benchmark asynchronous replay of the large journal (10,000 requests)
#[divan::bench]
fn async_strategy_large(bencher: Bencher) {
    replay(bencher, StrategyType::Async, "benchmark_large.csv");
}
