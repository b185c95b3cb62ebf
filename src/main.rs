//! Marketplace order engine CLI
//!
//! Replays a journal of marketplace requests against seeded cards and listings.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --cards cards.csv --listings listings.csv requests.csv > balances.csv
//! cargo run -- --strategy sync --cards cards.csv --listings listings.csv requests.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 \
//!     --cards cards.csv --listings listings.csv \
//!     --listings-out listings_after.csv --orders-out orders.csv requests.csv
//! ```
//!
//! Card balances go to stdout as CSV; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, unreadable or invalid seed, unreadable journal, etc.)

use chrono::Utc;
use marketplace_orders::cli::{self, CliArgs};
use marketplace_orders::core::{MarketStore, Marketplace};
use marketplace_orders::io::{load_cards, load_listings, write_listings_csv, write_orders_csv};
use marketplace_orders::strategy;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();
    init_tracing(args.log_level.as_deref());

    if let Err(e) = run(&args) {
        error!(error = %e, "processing failed");
        process::exit(1);
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: &CliArgs) -> Result<(), String> {
    let store = Arc::new(MarketStore::new());
    let seeded_at = Utc::now();
    if let Some(path) = &args.cards_file {
        load_cards(&store, path, seeded_at)?;
    }
    if let Some(path) = &args.listings_file {
        load_listings(&store, path, seeded_at)?;
    }

    let marketplace = Marketplace::new(Arc::clone(&store));
    let config = match args.strategy {
        cli::StrategyType::Async => Some(args.to_batch_config()),
        cli::StrategyType::Sync => None,
    };
    let strategy = strategy::create_strategy(args.strategy.clone(), config);

    let mut output = std::io::stdout();
    strategy.process(&marketplace, &args.requests_file, &mut output)?;

    if let Some(path) = &args.listings_out {
        let listings = store.inventory().all().map_err(|e| e.to_string())?;
        write_listings_csv(&listings, &mut create_output(path)?)?;
    }
    if let Some(path) = &args.orders_out {
        write_orders_csv(&store.orders().all(), &mut create_output(path)?)?;
    }

    Ok(())
}

fn create_output(path: &Path) -> Result<BufWriter<File>, String> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| format!("Failed to create file '{}': {}", path.display(), e))
}
