//! Request journal types
//!
//! A request journal is a stream of operations issued by authenticated
//! callers. Each record names the calling account and the operation to run
//! against the marketplace.

use super::ids::{AccountId, CardId, ListingId};
use super::order::OrderRequest;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Operations a journal record can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Purchase a listing with one of the caller's cards
    Order,

    /// Add funds to one of the caller's cards
    TopUp,

    /// Set the stock of one of the caller's listings
    Restock,

    /// Take one of the caller's listings down
    Remove,

    /// Make one of the caller's removed listings purchasable again
    Reactivate,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Order => "order",
            RequestType::TopUp => "top_up",
            RequestType::Restock => "restock",
            RequestType::Remove => "remove",
            RequestType::Reactivate => "reactivate",
        }
    }
}

/// Validated journal record
///
/// Field presence is checked per request type when the record is decoded,
/// so each variant carries exactly what its operation needs.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestRecord {
    Order(OrderRequest),
    TopUp {
        account: AccountId,
        card: CardId,
        code: String,
        amount: Decimal,
    },
    Restock {
        account: AccountId,
        listing: ListingId,
        code: String,
        quantity: i64,
    },
    Remove {
        account: AccountId,
        listing: ListingId,
        code: String,
    },
    Reactivate {
        account: AccountId,
        listing: ListingId,
        code: String,
    },
}

impl RequestRecord {
    /// Calling account, used to partition journals for parallel processing
    pub fn account(&self) -> AccountId {
        match self {
            RequestRecord::Order(request) => request.account,
            RequestRecord::TopUp { account, .. }
            | RequestRecord::Restock { account, .. }
            | RequestRecord::Remove { account, .. }
            | RequestRecord::Reactivate { account, .. } => *account,
        }
    }

    pub fn request_type(&self) -> RequestType {
        match self {
            RequestRecord::Order(_) => RequestType::Order,
            RequestRecord::TopUp { .. } => RequestType::TopUp,
            RequestRecord::Restock { .. } => RequestType::Restock,
            RequestRecord::Remove { .. } => RequestType::Remove,
            RequestRecord::Reactivate { .. } => RequestType::Reactivate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_is_taken_from_every_variant() {
        let records = [
            RequestRecord::Order(OrderRequest::new(4, 1, "0000", 1, 1)),
            RequestRecord::TopUp {
                account: 4,
                card: 1,
                code: "0000".to_string(),
                amount: Decimal::ONE,
            },
            RequestRecord::Restock {
                account: 4,
                listing: 1,
                code: "0000".to_string(),
                quantity: 5,
            },
            RequestRecord::Remove {
                account: 4,
                listing: 1,
                code: "0000".to_string(),
            },
            RequestRecord::Reactivate {
                account: 4,
                listing: 1,
                code: "0000".to_string(),
            },
        ];

        for record in records {
            assert_eq!(record.account(), 4);
        }
    }

    #[test]
    fn test_request_type_names() {
        let record = RequestRecord::Remove {
            account: 1,
            listing: 2,
            code: "0000".to_string(),
        };
        assert_eq!(record.request_type(), RequestType::Remove);
        assert_eq!(RequestType::TopUp.as_str(), "top_up");
    }
}
