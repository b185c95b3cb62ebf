//! Processing strategy module for journal replay
//!
//! This module defines the Strategy pattern for complete processing pipelines,
//! covering both CSV parsing and request dispatch. Different implementations
//! (synchronous, asynchronous batch) can be selected at runtime.

use crate::cli::StrategyType;
use crate::core::Marketplace;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Counts reported by a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Requests that were accepted
    pub accepted: usize,
    /// Requests the marketplace rejected
    pub rejected: usize,
}

impl ProcessingSummary {
    fn record<T, E>(&mut self, result: &Result<T, E>) {
        if result.is_ok() {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }
}

/// Processing strategy trait for complete journal pipelines
///
/// Each strategy reads requests from a CSV journal, runs them against the
/// given marketplace, and writes the final card balances to `output`.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the journal at `input_path` and write card balances to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessingSummary)` if the journal was read to the end
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error)
    ///
    /// Rejected requests and unreadable rows are logged and do not stop
    /// processing.
    fn process(
        &self,
        marketplace: &Marketplace,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ProcessingSummary, String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
