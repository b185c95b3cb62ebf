//! Core business logic module
//!
//! This module contains the order transaction components:
//! - `card_ledger` - Card balances with atomic conditional debit and credit
//! - `inventory` - Listing stock with atomic conditional decrement
//! - `order_ledger` - Append-only order records
//! - `store` - The three tables plus multi-row transactions
//! - `engine` - Order placement (validation and atomic commit)
//! - `marketplace` - Request dispatcher for buyer and seller operations
//! - `traits` - Injectable clock
//! - `async` - Concurrent batch processing

pub mod r#async;
pub mod card_ledger;
pub mod engine;
pub mod inventory;
pub mod marketplace;
pub mod order_ledger;
pub mod store;
pub mod traits;

pub use card_ledger::CardLedger;
pub use engine::OrderEngine;
pub use inventory::Inventory;
pub use marketplace::{Marketplace, RequestOutcome};
pub use order_ledger::OrderLedger;
pub use r#async::BatchProcessor;
pub use store::{MarketStore, StoreTransaction};
pub use traits::{Clock, FixedClock, SystemClock};
