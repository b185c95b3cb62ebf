//! Marketplace Order Engine Library
//!
//! # Overview
//!
//! This library places marketplace orders against stored-value cards and
//! listing stock. An order debits the buyer's card, decrements the listing's
//! stock, credits the seller's payout card and records the order, all as one
//! atomic unit that stays correct when purchases race on the same card or
//! listing.
//!
//! # Architecture
//!
//! - [`types`] - Data model (cards, listings, orders, journal requests) and errors
//! - [`core`] - Business logic:
//!   - [`core::card_ledger`] - Card balances with conditional debit
//!   - [`core::inventory`] - Listing stock with conditional decrement
//!   - [`core::order_ledger`] - Append-only order records
//!   - [`core::store`] - Multi-row transactions over the three tables
//!   - [`core::engine`] - Order placement
//!   - [`core::marketplace`] - Request dispatcher for buyer and seller operations
//! - [`io`] - CSV journal readers, seed loading and output writers
//! - [`strategy`] - Sync and async journal replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Order Placement
//!
//! `OrderEngine::place_order` checks, in order: card ownership and code,
//! listing active, positive quantity, stock, and funds. The stock and funds
//! checks are repeated inside the store transaction against locked rows, and
//! only that second check decides the outcome.
//!
//! # Request Types
//!
//! - **order**: Purchase a listing
//! - **top_up**: Add funds to a card
//! - **restock**: Set a listing's stock
//! - **remove** / **reactivate**: Take a listing down or put it back up

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{MarketStore, Marketplace, OrderEngine, RequestOutcome};
pub use io::write_cards_csv;
pub use types::{
    AccountId, Card, CardId, Listing, ListingId, ListingStatus, NewListing, OrderError, OrderId,
    OrderRecord, OrderRequest, OrderStatus, RequestRecord, RequestType,
};
