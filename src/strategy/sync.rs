//! Synchronous processing strategy
//!
//! Single-threaded pipeline that replays a journal strictly in file order.
//! It delegates:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Request dispatch to `Marketplace`
//! - CSV output to `csv_format::write_cards_csv`
//!
//! Requests are read one at a time, so memory use depends on the size of the
//! store, not the length of the journal.

use crate::core::Marketplace;
use crate::io::csv_format::write_cards_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ProcessingSummary};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// ```no_run
/// use marketplace_orders::core::{Marketplace, MarketStore};
/// use marketplace_orders::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let marketplace = Marketplace::new(Arc::new(MarketStore::new()));
/// let mut output = std::io::stdout();
///
/// SyncProcessingStrategy
///     .process(&marketplace, Path::new("requests.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        marketplace: &Marketplace,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<ProcessingSummary, String> {
        let reader = SyncReader::new(input_path)?;
        let mut summary = ProcessingSummary::default();

        for row in reader {
            match row {
                Ok(request) => {
                    let result = marketplace.process(request);
                    summary.record(&result);
                }
                Err(e) => warn!(error = %e, "skipping journal row"),
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
    }
}
