//! Seed loading
//!
//! Restores cards and listings with explicit ids from CSV files before a
//! journal is replayed. Unlike journal rows, a bad seed row is fatal: the
//! journal refers to seeded ids, so replaying it against a partial seed would
//! produce misleading results.

use crate::core::store::MarketStore;
use crate::io::csv_format::{convert_card_row, convert_listing_row, CardRow, ListingRow};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::info;

fn open_csv(path: &Path) -> Result<csv::Reader<File>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;
    Ok(ReaderBuilder::new().trim(Trim::All).from_reader(file))
}

/// Deserialize every row of `path`, passing each to `load` with its line number
fn load_rows<T, F>(path: &Path, mut load: F) -> Result<usize, String>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<(), String>,
{
    let mut reader = open_csv(path)?;
    let mut count = 0;

    for (index, row) in reader.deserialize::<T>().enumerate() {
        let line = index + 2;
        let row = row.map_err(|e| format!("{} line {}: CSV parse error: {}", path.display(), line, e))?;
        load(row).map_err(|e| format!("{} line {}: {}", path.display(), line, e))?;
        count += 1;
    }

    Ok(count)
}

/// Restore every card in `path` (columns: card, account, number, code, balance)
///
/// # Returns
///
/// The number of cards loaded.
pub fn load_cards(store: &MarketStore, path: &Path, created_at: DateTime<Utc>) -> Result<usize, String> {
    let count = load_rows(path, |row: CardRow| {
        let card = convert_card_row(row, created_at)?;
        store.cards().restore(card).map_err(|e| e.to_string())
    })?;
    info!(count, path = %path.display(), "cards loaded");
    Ok(count)
}

/// Restore every listing in `path`
/// (columns: listing, card, name, description, category, stock, price, status)
///
/// Each listing's payout card must already be loaded.
pub fn load_listings(
    store: &MarketStore,
    path: &Path,
    created_at: DateTime<Utc>,
) -> Result<usize, String> {
    let count = load_rows(path, |row: ListingRow| {
        let listing = convert_listing_row(row, created_at)?;
        store
            .cards()
            .get(listing.card)
            .map_err(|e| format!("listing {}: {}", listing.id, e))?;
        store.inventory().restore(listing).map_err(|e| e.to_string())
    })?;
    info!(count, path = %path.display(), "listings loaded");
    Ok(count)
}
