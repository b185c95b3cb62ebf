//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `ids`: Identifier aliases
//! - `card`: Funding instrument (card) types
//! - `listing`: Listing (product) types
//! - `order`: Order records and purchase requests
//! - `request`: Request journal records
//! - `error`: Error taxonomy for the order engine and its stores

pub mod card;
pub mod error;
pub mod ids;
pub mod listing;
pub mod order;
pub mod request;

pub use card::{Card, CARD_CODE_LEN, CARD_NUMBER_LEN};
pub use error::OrderError;
pub use ids::{AccountId, CardId, ListingId, OrderId};
pub use listing::{Listing, ListingSnapshot, ListingStatus, NewListing};
pub use order::{OrderRecord, OrderRequest, OrderStatus};
pub use request::{RequestRecord, RequestType};
