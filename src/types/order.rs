//! Order types
//!
//! An order ties one buyer card, one listing and (through the listing) one
//! seller card into a single economic event. Orders are immutable once
//! committed.

use super::ids::{AccountId, CardId, ListingId, OrderId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order
///
/// The engine only ever creates `Placed` orders; the remaining states are
/// reserved for fulfilment flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Shipped,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Lowercase name used in CSV output
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }
}

/// Committed order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// Identity assigned inside the commit transaction
    pub id: OrderId,

    /// Card that paid
    pub buyer_card: CardId,

    /// Owner of the buyer card at commit time
    pub buyer_account: AccountId,

    pub listing: ListingId,

    /// Listing's payout card
    pub seller_card: CardId,

    /// Owner of the seller card at commit time
    pub seller_account: AccountId,

    /// Units purchased, always positive
    pub quantity: u32,

    /// Unit price captured from the locked listing row
    pub unit_price: Decimal,

    /// `quantity * unit_price`, the amount moved between the cards
    pub total: Decimal,

    pub status: OrderStatus,

    /// Client-supplied idempotency key, if any
    pub idempotency_key: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Purchase request as received from an authenticated caller
///
/// `quantity` is signed so malformed input can be rejected with
/// `InvalidArgument` instead of failing to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Caller identity, already verified upstream
    pub account: AccountId,
    pub card: CardId,
    /// Verification code supplied by the caller
    pub code: String,
    pub listing: ListingId,
    pub quantity: i64,
    /// Optional key making retries of the same purchase safe
    pub idempotency_key: Option<String>,
}

impl OrderRequest {
    pub fn new(
        account: AccountId,
        card: CardId,
        code: impl Into<String>,
        listing: ListingId,
        quantity: i64,
    ) -> Self {
        OrderRequest {
            account,
            card,
            code: code.into(),
            listing,
            quantity,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}
