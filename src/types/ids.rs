//! Identifier aliases shared by every table

/// Account (user) identifier, resolved by the authentication layer
pub type AccountId = u32;

/// Funding instrument (card) identifier
pub type CardId = u32;

/// Listing (product) identifier
pub type ListingId = u32;

/// Order identifier, drawn from the order ledger sequence
pub type OrderId = u64;
