use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay a marketplace request journal against seeded cards and listings
#[derive(Parser, Debug)]
#[command(name = "marketplace-orders")]
#[command(
    about = "Replay marketplace requests (orders, top-ups, listing edits) and print card balances",
    long_about = None
)]
pub struct CliArgs {
    /// Request journal CSV
    #[arg(value_name = "REQUESTS", help = "Path to the request journal CSV file")]
    pub requests_file: PathBuf,

    /// Card seed CSV
    #[arg(
        long = "cards",
        value_name = "PATH",
        help = "Cards to load before replaying (card,account,number,code,balance)"
    )]
    pub cards_file: Option<PathBuf>,

    /// Listing seed CSV
    #[arg(
        long = "listings",
        value_name = "PATH",
        help = "Listings to load before replaying (listing,card,name,description,category,stock,price,status)"
    )]
    pub listings_file: Option<PathBuf>,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for file order or 'async' for account-partitioned batches"
    )]
    pub strategy: StrategyType,

    /// Number of requests per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Where to write final listing state
    #[arg(long = "listings-out", value_name = "PATH")]
    pub listings_out: Option<PathBuf>,

    /// Where to write the order ledger
    #[arg(long = "orders-out", value_name = "PATH")]
    pub orders_out: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        help = "Log filter such as 'warn' or 'marketplace_orders=debug' (default: RUST_LOG or 'warn')"
    )]
    pub log_level: Option<String>,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "requests.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "requests.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "requests.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[test]
    fn test_seed_and_output_paths() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--cards",
            "cards.csv",
            "--listings",
            "listings.csv",
            "--listings-out",
            "out/listings.csv",
            "--orders-out",
            "out/orders.csv",
            "--log-level",
            "debug",
            "requests.csv",
        ])
        .unwrap();

        assert_eq!(parsed.requests_file, PathBuf::from("requests.csv"));
        assert_eq!(parsed.cards_file, Some(PathBuf::from("cards.csv")));
        assert_eq!(parsed.listings_file, Some(PathBuf::from("listings.csv")));
        assert_eq!(parsed.listings_out, Some(PathBuf::from("out/listings.csv")));
        assert_eq!(parsed.orders_out, Some(PathBuf::from("out/orders.csv")));
        assert_eq!(parsed.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_optional_paths_default_to_none() {
        let parsed = CliArgs::try_parse_from(["program", "requests.csv"]).unwrap();

        assert!(parsed.cards_file.is_none());
        assert!(parsed.listings_file.is_none());
        assert!(parsed.listings_out.is_none());
        assert!(parsed.orders_out.is_none());
        assert!(parsed.log_level.is_none());
    }

    #[rstest]
    #[case::all_defaults(&["program", "requests.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "requests.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "requests.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "requests.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "requests.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::missing_requests(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "requests.csv"])]
    #[case::non_numeric_batch(&["program", "--batch-size", "many", "requests.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
