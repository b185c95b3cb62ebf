//! Listing (product) types
//!
//! A listing is paid out to its owning card and carries the stock and unit
//! price the order engine validates against.

use super::ids::{CardId, ListingId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a listing
///
/// Only `Active` listings are purchasable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Visible and purchasable
    Active,

    /// Taken down by the seller or a moderator; never purchasable
    Removed,
}

impl ListingStatus {
    /// Lowercase name used in CSV output
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Removed => "removed",
        }
    }

    /// Parse a status name, accepting the single-letter storage codes too
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" | "a" => Some(ListingStatus::Active),
            "removed" | "r" => Some(ListingStatus::Removed),
            _ => None,
        }
    }
}

/// Listing row
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Opaque listing identity
    pub id: ListingId,

    /// Seller's payout card
    ///
    /// Fixed at creation; the order engine relies on it not changing.
    pub card: CardId,

    pub name: String,
    pub description: String,
    pub category: String,

    /// Units left, never negative
    pub stock: u32,

    /// Unit price, never negative
    pub price: Decimal,

    pub status: ListingStatus,

    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Read-only view used for order validation
    pub fn snapshot(&self) -> ListingSnapshot {
        ListingSnapshot {
            owner_card: self.card,
            price: self.price,
            stock: self.stock,
            status: self.status,
        }
    }
}

/// Seller input for a new listing
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub name: String,
    pub description: String,
    pub category: String,
    /// Initial stock; must be at least one
    pub stock: i64,
    /// Unit price; must not be negative
    pub price: Decimal,
}

/// Point-in-time view of the fields the order engine checks
///
/// Taken without holding the row lock, so it may be stale by the time an
/// order commits. The commit re-checks everything against the locked row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListingSnapshot {
    pub owner_card: CardId,
    pub price: Decimal,
    pub stock: u32,
    pub status: ListingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("active", Some(ListingStatus::Active))]
    #[case("ACTIVE", Some(ListingStatus::Active))]
    #[case("A", Some(ListingStatus::Active))]
    #[case(" removed ", Some(ListingStatus::Removed))]
    #[case("r", Some(ListingStatus::Removed))]
    #[case("banned", None)]
    fn test_listing_status_parse(#[case] value: &str, #[case] expected: Option<ListingStatus>) {
        assert_eq!(ListingStatus::parse(value), expected);
    }

    #[test]
    fn test_snapshot_copies_validation_fields() {
        let listing = Listing {
            id: 3,
            card: 9,
            name: "Kettle".to_string(),
            description: "Boils water".to_string(),
            category: "kitchen".to_string(),
            stock: 10,
            price: Decimal::new(2000, 2),
            status: ListingStatus::Active,
            created_at: Utc::now(),
        };

        let snapshot = listing.snapshot();
        assert_eq!(snapshot.owner_card, 9);
        assert_eq!(snapshot.price, Decimal::new(2000, 2));
        assert_eq!(snapshot.stock, 10);
        assert_eq!(snapshot.status, ListingStatus::Active);
    }
}
