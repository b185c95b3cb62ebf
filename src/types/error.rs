//! Error types for the marketplace order engine
//!
//! This module defines every error kind the order engine and its stores can
//! surface to a caller. Each kind maps to exactly one outcome, so callers never
//! need to inspect messages to decide what happened.
//!
//! # Error Categories
//!
//! - **Authorization**: the card is not the caller's, or the code is wrong
//! - **Lookup**: unknown listing or card
//! - **Validation**: malformed quantities, amounts or card details
//! - **Conflict**: insufficient funds or stock, listing taken down
//! - **Infrastructure**: the store could not complete the operation

use super::ids::{AccountId, CardId, ListingId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the order engine
///
/// Variants carry enough context to log the failure. Messages deliberately
/// avoid stating whether a card exists when authorization fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    /// The card does not belong to the caller or the verification code is wrong
    ///
    /// Unknown cards are reported the same way, so the caller learns nothing
    /// about which check failed.
    #[error("Account {account} is not authorized to use card {card}")]
    Unauthorized {
        /// Calling account
        account: AccountId,
        /// Card named in the request
        card: CardId,
    },

    /// Listing does not exist, is not visible to the caller, or is not active
    #[error("Listing {listing} not found")]
    ListingNotFound {
        /// Listing that was requested
        listing: ListingId,
    },

    /// Card does not exist
    ///
    /// Only surfaced by the card ledger primitives; the order engine reports
    /// unknown cards as `Unauthorized`.
    #[error("Card {card} not found")]
    CardNotFound {
        /// Card that was requested
        card: CardId,
    },

    /// A request field is malformed
    #[error("Invalid {field}: {message}")]
    InvalidArgument {
        /// Name of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },

    /// The card cannot cover the requested amount
    ///
    /// No mutation is performed.
    #[error("Insufficient funds on card {card}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Card being debited
        card: CardId,
        /// Balance at the time of the check
        available: Decimal,
        /// Amount that was requested
        requested: Decimal,
    },

    /// The listing does not have enough stock
    ///
    /// No mutation is performed.
    #[error(
        "Insufficient stock on listing {listing}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        /// Listing being purchased
        listing: ListingId,
        /// Stock at the time of the check
        available: u32,
        /// Quantity that was requested
        requested: u32,
    },

    /// The listing was removed before the order could commit
    #[error("Listing {listing} is not available for purchase")]
    ListingUnavailable {
        /// Listing being purchased
        listing: ListingId,
    },

    /// A balance would overflow the decimal range
    #[error("Arithmetic overflow in {operation} for card {card}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Card whose balance would overflow
        card: CardId,
    },

    /// The store could not complete the operation
    ///
    /// Nothing was committed, so the whole request may be retried.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the infrastructure failure
        message: String,
    },
}

// Helper functions for creating common errors

impl OrderError {
    /// Create an Unauthorized error
    pub fn unauthorized(account: AccountId, card: CardId) -> Self {
        OrderError::Unauthorized { account, card }
    }

    /// Create a ListingNotFound error
    pub fn listing_not_found(listing: ListingId) -> Self {
        OrderError::ListingNotFound { listing }
    }

    /// Create a CardNotFound error
    pub fn card_not_found(card: CardId) -> Self {
        OrderError::CardNotFound { card }
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(field: &str, message: impl Into<String>) -> Self {
        OrderError::InvalidArgument {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(card: CardId, available: Decimal, requested: Decimal) -> Self {
        OrderError::InsufficientFunds {
            card,
            available,
            requested,
        }
    }

    /// Create an InsufficientStock error
    pub fn insufficient_stock(listing: ListingId, available: u32, requested: u32) -> Self {
        OrderError::InsufficientStock {
            listing,
            available,
            requested,
        }
    }

    /// Create a ListingUnavailable error
    pub fn listing_unavailable(listing: ListingId) -> Self {
        OrderError::ListingUnavailable { listing }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, card: CardId) -> Self {
        OrderError::ArithmeticOverflow {
            operation: operation.to_string(),
            card,
        }
    }

    /// Create a StoreUnavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        OrderError::StoreUnavailable {
            message: message.into(),
        }
    }

    /// HTTP status a request router should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            OrderError::Unauthorized { .. } => 401,
            OrderError::ListingNotFound { .. } | OrderError::CardNotFound { .. } => 404,
            OrderError::InvalidArgument { .. } => 400,
            OrderError::InsufficientFunds { .. } => 402,
            OrderError::InsufficientStock { .. } | OrderError::ListingUnavailable { .. } => 409,
            OrderError::ArithmeticOverflow { .. } => 422,
            OrderError::StoreUnavailable { .. } => 503,
        }
    }

    /// Whether the caller may retry the whole request
    ///
    /// Only infrastructure failures qualify: every other kind is a definitive
    /// rejection that would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderError::StoreUnavailable { .. })
    }
}
