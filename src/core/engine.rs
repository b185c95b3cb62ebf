//! Order transaction engine
//!
//! This module provides the OrderEngine that places purchases by coordinating
//! the card ledger, the inventory and the order ledger of a [`MarketStore`].
//!
//! The engine enforces, in order:
//! - Card ownership and verification code (`Unauthorized`)
//! - Listing exists and is active (`ListingNotFound`)
//! - Quantity is a positive integer (`InvalidArgument`)
//! - Quantity within the observed stock (`InsufficientStock`)
//! - Cost within the observed balance (`InsufficientFunds`)
//!
//! The last two checks only reject early. The store transaction repeats them
//! against the locked rows, which is what actually keeps balances and stock
//! non-negative when purchases race.

use crate::core::card_ledger::CardLedger;
use crate::core::store::{MarketStore, StoreTransaction};
use crate::core::traits::{Clock, SystemClock};
use crate::types::{
    AccountId, CardId, ListingStatus, OrderError, OrderRecord, OrderRequest, OrderStatus,
};
use constant_time_eq::constant_time_eq;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Check that `card` belongs to `account` and that `code` is its verification code
///
/// Unknown cards, foreign cards and wrong codes all produce the same
/// `Unauthorized` error.
pub(crate) fn authorize(
    cards: &CardLedger,
    account: AccountId,
    card: CardId,
    code: &str,
) -> Result<(), OrderError> {
    let hide_missing = |error: OrderError| match error {
        OrderError::CardNotFound { .. } => OrderError::unauthorized(account, card),
        other => other,
    };

    let owner = cards.lookup_owner(card).map_err(hide_missing)?;
    if owner != account {
        return Err(OrderError::unauthorized(account, card));
    }

    let secret = cards.lookup_secret(card).map_err(hide_missing)?;
    if !constant_time_eq(secret.as_bytes(), code.as_bytes()) {
        return Err(OrderError::unauthorized(account, card));
    }
    Ok(())
}

/// Order placement engine
///
/// Cheap to clone; clones share the same store.
#[derive(Debug, Clone)]
pub struct OrderEngine {
    store: Arc<MarketStore>,
    clock: Arc<dyn Clock>,
}

impl OrderEngine {
    /// Create an engine over `store` using the system clock
    pub fn new(store: Arc<MarketStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<MarketStore>, clock: Arc<dyn Clock>) -> Self {
        OrderEngine { store, clock }
    }

    pub fn store(&self) -> &Arc<MarketStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Place a purchase
    ///
    /// # Arguments
    ///
    /// * `request` - Purchase request from an already authenticated caller
    ///
    /// # Returns
    ///
    /// * `Ok(OrderRecord)` - the committed order, or the order previously
    ///   committed under the same idempotency key
    /// * `Err(OrderError)` - the purchase was rejected and nothing changed
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the card is unknown, not the caller's, or the code
    ///   does not match
    /// - `ListingNotFound` if the listing is unknown or not active
    /// - `InvalidArgument` for a non-positive quantity, or an idempotency key
    ///   reused for a different purchase
    /// - `InsufficientStock` / `InsufficientFunds` from the pre-checks or
    ///   the commit
    /// - `ListingUnavailable` if the listing was removed before commit
    /// - `ArithmeticOverflow` if the total or the seller balance overflows
    /// - `StoreUnavailable` if a store row is unusable
    pub fn place_order(&self, request: &OrderRequest) -> Result<OrderRecord, OrderError> {
        debug!(
            account = request.account,
            card = request.card,
            listing = request.listing,
            quantity = request.quantity,
            "placing order"
        );

        match self.try_place_order(request) {
            Ok(Placement::Committed(order)) => {
                info!(
                    order = order.id,
                    account = order.buyer_account,
                    card = order.buyer_card,
                    listing = order.listing,
                    quantity = order.quantity,
                    total = %order.total,
                    "order placed"
                );
                Ok(order)
            }
            Ok(Placement::Replayed(order)) => {
                info!(
                    order = order.id,
                    account = request.account,
                    card = request.card,
                    "idempotent retry answered with existing order"
                );
                Ok(order)
            }
            Err(error) => {
                warn!(
                    account = request.account,
                    card = request.card,
                    listing = request.listing,
                    %error,
                    "order rejected"
                );
                Err(error)
            }
        }
    }

    fn try_place_order(&self, request: &OrderRequest) -> Result<Placement, OrderError> {
        let cards = self.store.cards();

        authorize(cards, request.account, request.card, &request.code)?;

        // Fast path for retries; repeated under the buyer lock at commit
        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = self.store.orders().find_by_key(request.card, key) {
                return replay(existing, request).map(Placement::Replayed);
            }
        }

        let listing = match self.store.inventory().lookup(request.listing) {
            Ok(listing) if listing.status == ListingStatus::Active => listing,
            Ok(_) => return Err(OrderError::listing_not_found(request.listing)),
            Err(error) => return Err(error),
        };

        let quantity = validate_quantity(request.quantity)?;

        if quantity > listing.stock {
            return Err(OrderError::insufficient_stock(
                request.listing,
                listing.stock,
                quantity,
            ));
        }

        let cost = order_total(listing.price, quantity, request.card)?;
        let balance = cards.balance(request.card)?;
        if cost > balance {
            return Err(OrderError::insufficient_funds(request.card, balance, cost));
        }

        self.store.transaction(
            &[request.card, listing.owner_card],
            request.listing,
            |tx| self.commit(tx, request, listing.owner_card, quantity),
        )
    }

    /// Steps run with the buyer, seller and listing rows locked
    fn commit(
        &self,
        tx: &mut StoreTransaction<'_>,
        request: &OrderRequest,
        seller_card: CardId,
        quantity: u32,
    ) -> Result<Placement, OrderError> {
        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = tx.find_order(request.card, key) {
                return replay(existing, request).map(Placement::Replayed);
            }
        }

        if tx.listing().card != seller_card {
            return Err(OrderError::store_unavailable(format!(
                "payout card of listing {} changed during commit",
                request.listing
            )));
        }

        let unit_price = tx.listing().price;
        let total = order_total(unit_price, quantity, request.card)?;
        let buyer_account = tx.card(request.card)?.owner;
        let seller_account = tx.card(seller_card)?.owner;

        tx.debit(request.card, total)?;
        tx.decrement_stock(quantity)?;
        tx.credit(seller_card, total)?;

        let order = OrderRecord {
            id: tx.next_order_id(),
            buyer_card: request.card,
            buyer_account,
            listing: request.listing,
            seller_card,
            seller_account,
            quantity,
            unit_price,
            total,
            status: OrderStatus::Placed,
            idempotency_key: request.idempotency_key.clone(),
            created_at: self.clock.now(),
        };
        tx.append_order(order.clone());
        Ok(Placement::Committed(order))
    }
}

/// How a successful `place_order` was satisfied
enum Placement {
    Committed(OrderRecord),
    Replayed(OrderRecord),
}

/// Accept a stored order as the answer to a retry, if it is the same purchase
fn replay(existing: OrderRecord, request: &OrderRequest) -> Result<OrderRecord, OrderError> {
    let same_purchase = existing.listing == request.listing
        && i64::from(existing.quantity) == request.quantity;
    if !same_purchase {
        return Err(OrderError::invalid_argument(
            "idempotency_key",
            format!("key already used for order {}", existing.id),
        ));
    }
    Ok(existing)
}

fn validate_quantity(quantity: i64) -> Result<u32, OrderError> {
    if quantity <= 0 {
        return Err(OrderError::invalid_argument(
            "quantity",
            "quantity must be a positive integer",
        ));
    }
    u32::try_from(quantity)
        .map_err(|_| OrderError::invalid_argument("quantity", "quantity is too large"))
}

fn order_total(price: Decimal, quantity: u32, card: CardId) -> Result<Decimal, OrderError> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| OrderError::arithmetic_overflow("order total", card))
}
