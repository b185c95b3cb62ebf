//! Marketplace request dispatcher
//!
//! `Marketplace` is the surface an authenticated request router talks to. It
//! owns the order engine and offers the card and listing operations that share
//! its consistency domain: opening and topping up cards, listing, restocking
//! and removing products, and reading order history.
//!
//! Every operation that touches a card or a listing checks that it belongs to
//! the calling account and that the caller knows the card's verification code.

use crate::core::engine::{authorize, OrderEngine};
use crate::core::store::MarketStore;
use crate::core::traits::Clock;
use crate::types::{
    AccountId, Card, CardId, Listing, ListingId, ListingStatus, NewListing, OrderError,
    OrderRecord, RequestRecord, RequestType,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a successfully processed journal request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// An order was committed or an idempotent retry was answered
    Order(OrderRecord),
    /// A card balance after a top-up
    Balance { card: CardId, balance: Decimal },
    /// A listing's stock after a restock
    Stock { listing: ListingId, stock: u32 },
    /// A listing's status after removal or reactivation
    Status {
        listing: ListingId,
        status: ListingStatus,
    },
}

/// Dispatcher for buyer and seller operations
#[derive(Debug, Clone)]
pub struct Marketplace {
    engine: OrderEngine,
}

impl Marketplace {
    pub fn new(store: Arc<MarketStore>) -> Self {
        Marketplace {
            engine: OrderEngine::new(store),
        }
    }

    pub fn with_clock(store: Arc<MarketStore>, clock: Arc<dyn Clock>) -> Self {
        Marketplace {
            engine: OrderEngine::with_clock(store, clock),
        }
    }

    pub fn engine(&self) -> &OrderEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<MarketStore> {
        self.engine.store()
    }

    /// Open a card for the caller with a zero balance
    pub fn open_card(&self, account: AccountId, number: &str, code: &str) -> Result<Card, OrderError> {
        let card = self
            .store()
            .cards()
            .open(account, number, code, self.engine.clock().now())?;
        debug!(account, card = card.id, "card opened");
        Ok(card)
    }

    /// The caller's cards, sorted by id
    pub fn cards_of(&self, account: AccountId) -> Result<Vec<Card>, OrderError> {
        self.store().cards().cards_of(account)
    }

    /// Add funds to one of the caller's cards
    ///
    /// # Returns
    ///
    /// The new balance.
    ///
    /// # Errors
    ///
    /// `Unauthorized` as for orders, `InvalidArgument` unless `amount > 0`.
    pub fn top_up(
        &self,
        account: AccountId,
        card: CardId,
        code: &str,
        amount: Decimal,
    ) -> Result<Decimal, OrderError> {
        let cards = self.store().cards();
        authorize(cards, account, card, code)?;
        if amount <= Decimal::ZERO {
            return Err(OrderError::invalid_argument(
                "amount",
                "top-up amount must be positive",
            ));
        }
        cards.credit(card, amount)
    }

    /// Put a product up for sale, paid out to `card`
    pub fn list_product(
        &self,
        account: AccountId,
        card: CardId,
        code: &str,
        listing: NewListing,
    ) -> Result<Listing, OrderError> {
        authorize(self.store().cards(), account, card, code)?;
        let listing = self
            .store()
            .inventory()
            .create(card, listing, self.engine.clock().now())?;
        debug!(account, listing = listing.id, "listing created");
        Ok(listing)
    }

    /// Set the stock of one of the caller's listings
    pub fn restock(
        &self,
        account: AccountId,
        listing: ListingId,
        code: &str,
        quantity: i64,
    ) -> Result<u32, OrderError> {
        self.authorize_seller(account, listing, code)?;
        self.store().inventory().set_stock(listing, quantity)
    }

    /// Take one of the caller's listings down
    pub fn remove_listing(
        &self,
        account: AccountId,
        listing: ListingId,
        code: &str,
    ) -> Result<(), OrderError> {
        self.authorize_seller(account, listing, code)?;
        self.store()
            .inventory()
            .set_status(listing, ListingStatus::Removed)
    }

    /// Make one of the caller's removed listings purchasable again
    pub fn reactivate_listing(
        &self,
        account: AccountId,
        listing: ListingId,
        code: &str,
    ) -> Result<(), OrderError> {
        self.authorize_seller(account, listing, code)?;
        self.store()
            .inventory()
            .set_status(listing, ListingStatus::Active)
    }

    /// Orders the caller paid for, oldest first
    pub fn purchase_history(&self, account: AccountId) -> Vec<OrderRecord> {
        self.store().orders().list_by_buyer(account)
    }

    /// Orders paid out to the caller, oldest first
    pub fn sales_queue(&self, account: AccountId) -> Vec<OrderRecord> {
        self.store().orders().list_by_seller_account(account)
    }

    /// Run one journal request
    pub fn process(&self, request: RequestRecord) -> Result<RequestOutcome, OrderError> {
        let account = request.account();
        let kind = request.request_type();

        let outcome = match request {
            RequestRecord::Order(order) => self.engine.place_order(&order).map(RequestOutcome::Order),
            RequestRecord::TopUp {
                account,
                card,
                code,
                amount,
            } => self
                .top_up(account, card, &code, amount)
                .map(|balance| RequestOutcome::Balance { card, balance }),
            RequestRecord::Restock {
                account,
                listing,
                code,
                quantity,
            } => self
                .restock(account, listing, &code, quantity)
                .map(|stock| RequestOutcome::Stock { listing, stock }),
            RequestRecord::Remove {
                account,
                listing,
                code,
            } => self
                .remove_listing(account, listing, &code)
                .map(|()| RequestOutcome::Status {
                    listing,
                    status: ListingStatus::Removed,
                }),
            RequestRecord::Reactivate {
                account,
                listing,
                code,
            } => self
                .reactivate_listing(account, listing, &code)
                .map(|()| RequestOutcome::Status {
                    listing,
                    status: ListingStatus::Active,
                }),
        };

        // Order rejections are already logged by the engine
        if let Err(error) = &outcome {
            if kind != RequestType::Order {
                warn!(account, request = kind.as_str(), %error, "request rejected");
            }
        }
        outcome
    }

    /// Listing edits need the payout card to be the caller's and its code
    ///
    /// A listing paid out to someone else is reported as not found.
    fn authorize_seller(
        &self,
        account: AccountId,
        listing: ListingId,
        code: &str,
    ) -> Result<(), OrderError> {
        let cards = self.store().cards();
        let payout = self.store().inventory().lookup(listing)?.owner_card;
        let owner = cards
            .lookup_owner(payout)
            .map_err(|error| match error {
                OrderError::CardNotFound { .. } => OrderError::listing_not_found(listing),
                other => other,
            })?;
        if owner != account {
            return Err(OrderError::listing_not_found(listing));
        }
        authorize(cards, account, payout, code)
    }
}
