//! Asynchronous batch processing strategy
//!
//! Multi-threaded pipeline that reads the journal in batches and processes
//! each batch with account-based partitioning.
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig     (batch_size, max_concurrent_batches)
//!     ├── AsyncReader     (batch CSV reading)
//!     └── BatchProcessor  (account partitioning + tokio tasks)
//!         └── Marketplace (shared store)
//! ```
//!
//! Batches are processed one after another, so an account's requests keep
//! their file order even across batch boundaries. Within a batch, different
//! accounts run in parallel; where they meet on the same card or listing the
//! store's row locks decide the order.

use crate::core::r#async::BatchProcessor;
use crate::core::Marketplace;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_cards_csv;
use crate::strategy::{ProcessingStrategy, ProcessingSummary};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of requests per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                fallback = default.batch_size,
                "invalid batch_size 0, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                fallback = default.max_concurrent_batches,
                "invalid max_concurrent_batches 0, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the journal in batches
    ///
    /// 1. Builds a multi-threaded tokio runtime
    /// 2. Reads batches with AsyncReader
    /// 3. Hands each batch to the BatchProcessor and waits for it
    /// 4. Writes the card balances once the journal is exhausted
    fn process(
        &self,
        marketplace: &Marketplace,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ProcessingSummary, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(marketplace.clone());

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads futures::io, tokio files speak tokio::io
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut summary = ProcessingSummary::default();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                debug!(size = batch.len(), "processing batch");
                for result in processor.process_batch(batch).await {
                    summary.record(&result.result);
                }
            }

            info!(
                accepted = summary.accepted,
                rejected = summary.rejected,
                "journal replayed"
            );

            let cards = marketplace.store().cards().all().map_err(|e| e.to_string())?;
            write_cards_csv(&cards, output)?;

            Ok(summary)
        })
    }
}
