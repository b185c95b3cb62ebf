//! Batch processing with account-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! journal requests concurrently while keeping each account's requests in
//! file order.
//!
//! # Design
//!
//! The batch is partitioned by calling account. Each partition runs on its own
//! tokio task, one request after another; partitions run concurrently. Requests
//! from different accounts that touch the same card or listing are serialized
//! by the store's row locks, not by the processor.
//!
//! ```text
//! BatchProcessor
//!     └── Marketplace  (shared dispatcher over one MarketStore)
//! ```

use std::collections::HashMap;

use crate::core::marketplace::{Marketplace, RequestOutcome};
use crate::types::{AccountId, OrderError, RequestRecord};
use tracing::error;

/// Result of processing a single request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The request that was processed
    pub request: RequestRecord,

    /// Outcome, or the error that rejected it
    pub result: Result<RequestOutcome, OrderError>,
}

/// Concurrent batch processor
///
/// Cloning is cheap: clones share the same marketplace and store.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    marketplace: Marketplace,
}

impl BatchProcessor {
    pub fn new(marketplace: Marketplace) -> Self {
        Self { marketplace }
    }

    /// Split a batch into per-account request lists, keeping file order
    pub fn partition_by_account(
        &self,
        batch: Vec<RequestRecord>,
    ) -> HashMap<AccountId, Vec<RequestRecord>> {
        let mut account_batches: HashMap<AccountId, Vec<RequestRecord>> = HashMap::new();

        for request in batch {
            account_batches
                .entry(request.account())
                .or_default()
                .push(request);
        }

        account_batches
    }

    /// Process one account's requests sequentially
    pub async fn process_account_requests(
        &self,
        requests: Vec<RequestRecord>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let result = self.marketplace.process(request.clone());
            results.push(ProcessingResult { request, result });
        }

        results
    }

    /// Process a batch, accounts in parallel
    ///
    /// Returns once every partition has finished. A partition whose task
    /// panics is logged and its results are lost; the store rolls back any
    /// transaction it had open.
    pub async fn process_batch(&self, batch: Vec<RequestRecord>) -> Vec<ProcessingResult> {
        let account_batches = self.partition_by_account(batch);

        let mut tasks = Vec::with_capacity(account_batches.len());
        for (account, requests) in account_batches {
            let processor = self.clone();
            let task = tokio::spawn(async move {
                processor.process_account_requests(requests).await
            });
            tasks.push((account, task));
        }

        let mut results = Vec::new();
        for (account, task) in tasks {
            match task.await {
                Ok(account_results) => results.extend(account_results),
                Err(e) => error!(account, error = %e, "partition task failed"),
            }
        }

        results
    }
}
