//! Inventory
//!
//! Stores every listing and owns the stock mutation primitives. Like the card
//! ledger, each listing sits behind its own row lock, so a conditional stock
//! decrement checks status and stock and applies the change in one step.

use crate::core::store::lock_row;
use crate::types::{CardId, Listing, ListingId, ListingSnapshot, ListingStatus, NewListing, OrderError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Thread-safe table of listings
#[derive(Debug)]
pub struct Inventory {
    /// Listing rows by id
    listings: DashMap<ListingId, Arc<Mutex<Listing>>>,

    /// Next id handed out by `create`
    next_id: AtomicU32,
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            listings: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Create an active listing paid out to `card`
    ///
    /// The caller is responsible for checking that `card` exists and belongs
    /// to the seller.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the name is empty, the initial stock is below one
    /// or the price is negative.
    pub fn create(
        &self,
        card: CardId,
        new: NewListing,
        created_at: DateTime<Utc>,
    ) -> Result<Listing, OrderError> {
        if new.name.trim().is_empty() {
            return Err(OrderError::invalid_argument("name", "listing name is required"));
        }
        if new.stock < 1 {
            return Err(OrderError::invalid_argument(
                "quantity",
                "initial stock must be at least one",
            ));
        }
        let stock = u32::try_from(new.stock)
            .map_err(|_| OrderError::invalid_argument("quantity", "initial stock is too large"))?;
        if new.price < Decimal::ZERO {
            return Err(OrderError::invalid_argument("price", "price must not be negative"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listing = Listing {
            id,
            card,
            name: new.name,
            description: new.description,
            category: new.category,
            stock,
            price: new.price,
            status: ListingStatus::Active,
            created_at,
        };
        self.listings
            .insert(id, Arc::new(Mutex::new(listing.clone())));
        Ok(listing)
    }

    /// Insert a listing with an explicit id, e.g. when loading a seed file
    ///
    /// Unlike `create`, a restored listing may have zero stock or be removed.
    pub fn restore(&self, listing: Listing) -> Result<(), OrderError> {
        if listing.price < Decimal::ZERO {
            return Err(OrderError::invalid_argument(
                "price",
                format!("listing {} has a negative price", listing.id),
            ));
        }
        if self.listings.contains_key(&listing.id) {
            return Err(OrderError::invalid_argument(
                "listing",
                format!("listing {} already exists", listing.id),
            ));
        }

        self.next_id
            .fetch_max(listing.id.saturating_add(1), Ordering::Relaxed);
        self.listings
            .insert(listing.id, Arc::new(Mutex::new(listing)));
        Ok(())
    }

    pub(crate) fn row(&self, listing: ListingId) -> Option<Arc<Mutex<Listing>>> {
        self.listings
            .get(&listing)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn existing_row(&self, listing: ListingId) -> Result<Arc<Mutex<Listing>>, OrderError> {
        self.row(listing)
            .ok_or_else(|| OrderError::listing_not_found(listing))
    }

    /// Copy of a listing row
    pub fn get(&self, listing: ListingId) -> Result<Listing, OrderError> {
        let row = self.existing_row(listing)?;
        let guard = lock_row(&row, "listing", listing);
        Ok(guard.clone())
    }

    /// Read-only snapshot used for order validation
    pub fn lookup(&self, listing: ListingId) -> Result<ListingSnapshot, OrderError> {
        let row = self.existing_row(listing)?;
        let guard = lock_row(&row, "listing", listing);
        Ok(guard.snapshot())
    }

    /// Decrease stock by `quantity`, only if the listing is active and the
    /// stock stays non-negative
    ///
    /// # Returns
    ///
    /// The remaining stock.
    ///
    /// # Errors
    ///
    /// - `ListingNotFound` for an unknown listing
    /// - `InvalidArgument` for a zero quantity
    /// - `ListingUnavailable` if the listing is removed (no mutation)
    /// - `InsufficientStock` if stock would go below zero (no mutation)
    pub fn decrement_stock(&self, listing: ListingId, quantity: u32) -> Result<u32, OrderError> {
        let row = self.existing_row(listing)?;
        let mut guard = lock_row(&row, "listing", listing);
        let current = guard.stock;
        guard.stock = decremented(&guard, current, quantity)?;
        Ok(guard.stock)
    }

    /// Replace the stock of a listing
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `quantity` is negative or does not fit.
    pub fn set_stock(&self, listing: ListingId, quantity: i64) -> Result<u32, OrderError> {
        let quantity = u32::try_from(quantity)
            .map_err(|_| OrderError::invalid_argument("quantity", "stock must be between 0 and 4294967295"))?;
        let row = self.existing_row(listing)?;
        let mut guard = lock_row(&row, "listing", listing);
        guard.stock = quantity;
        Ok(quantity)
    }

    /// Change the lifecycle status of a listing
    pub fn set_status(&self, listing: ListingId, status: ListingStatus) -> Result<(), OrderError> {
        let row = self.existing_row(listing)?;
        let mut guard = lock_row(&row, "listing", listing);
        guard.status = status;
        Ok(())
    }

    /// Copies of every listing, sorted by id
    pub fn all(&self) -> Result<Vec<Listing>, OrderError> {
        let rows: Vec<(ListingId, Arc<Mutex<Listing>>)> = self
            .listings
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut listings = rows
            .iter()
            .map(|(id, row)| lock_row(row, "listing", id).clone())
            .collect::<Vec<_>>();
        listings.sort_by_key(|listing| listing.id);
        Ok(listings)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

/// Stock after taking `quantity` from `listing`, or the reason it is refused
///
/// `stock` is passed separately so store transactions can check against their
/// staged value.
pub(crate) fn decremented(listing: &Listing, stock: u32, quantity: u32) -> Result<u32, OrderError> {
    if quantity == 0 {
        return Err(OrderError::invalid_argument("quantity", "quantity must be positive"));
    }
    if listing.status != ListingStatus::Active {
        return Err(OrderError::listing_unavailable(listing.id));
    }
    stock
        .checked_sub(quantity)
        .ok_or_else(|| OrderError::insufficient_stock(listing.id, stock, quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Barrier;
    use std::thread;

    fn new_listing(stock: i64, price: Decimal) -> NewListing {
        NewListing {
            name: "Teapot".to_string(),
            description: "Cast iron".to_string(),
            category: "kitchen".to_string(),
            stock,
            price,
        }
    }

    #[test]
    fn test_create_starts_active() {
        let inventory = Inventory::new();

        let listing = inventory
            .create(4, new_listing(10, Decimal::new(20, 0)), Utc::now())
            .unwrap();

        assert_eq!(listing.id, 1);
        assert_eq!(listing.card, 4);
        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(inventory.lookup(1).unwrap().stock, 10);
    }

    #[rstest]
    #[case::zero_stock(new_listing(0, Decimal::ONE), "quantity")]
    #[case::negative_stock(new_listing(-3, Decimal::ONE), "quantity")]
    #[case::negative_price(new_listing(1, Decimal::new(-1, 0)), "price")]
    #[case::blank_name(NewListing { name: "  ".to_string(), ..new_listing(1, Decimal::ONE) }, "name")]
    fn test_create_rejects_invalid_input(#[case] new: NewListing, #[case] field: &str) {
        let inventory = Inventory::new();

        match inventory.create(1, new, Utc::now()) {
            Err(OrderError::InvalidArgument { field: actual, .. }) => assert_eq!(actual, field),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_lookup_unknown_listing() {
        let inventory = Inventory::new();
        assert_eq!(inventory.lookup(7), Err(OrderError::listing_not_found(7)));
    }

    #[test]
    fn test_decrement_stock_reduces_stock() {
        let inventory = Inventory::new();
        let listing = inventory
            .create(1, new_listing(10, Decimal::ONE), Utc::now())
            .unwrap();

        assert_eq!(inventory.decrement_stock(listing.id, 3).unwrap(), 7);
        assert_eq!(inventory.decrement_stock(listing.id, 7).unwrap(), 0);
    }

    #[test]
    fn test_decrement_stock_beyond_stock_leaves_row() {
        let inventory = Inventory::new();
        let listing = inventory
            .create(1, new_listing(10, Decimal::ONE), Utc::now())
            .unwrap();

        let result = inventory.decrement_stock(listing.id, 11);

        assert_eq!(result, Err(OrderError::insufficient_stock(listing.id, 10, 11)));
        assert_eq!(inventory.get(listing.id).unwrap().stock, 10);
    }

    #[test]
    fn test_decrement_stock_on_removed_listing() {
        let inventory = Inventory::new();
        let listing = inventory
            .create(1, new_listing(10, Decimal::ONE), Utc::now())
            .unwrap();
        inventory
            .set_status(listing.id, ListingStatus::Removed)
            .unwrap();

        let result = inventory.decrement_stock(listing.id, 1);

        assert_eq!(result, Err(OrderError::listing_unavailable(listing.id)));
        assert_eq!(inventory.get(listing.id).unwrap().stock, 10);
    }

    #[test]
    fn test_decrement_zero_is_invalid() {
        let inventory = Inventory::new();
        let listing = inventory
            .create(1, new_listing(10, Decimal::ONE), Utc::now())
            .unwrap();

        assert!(matches!(
            inventory.decrement_stock(listing.id, 0),
            Err(OrderError::InvalidArgument { .. })
        ));
    }

    #[rstest]
    #[case::zero(0, Ok(0))]
    #[case::positive(25, Ok(25))]
    #[case::negative(-1, Err(()))]
    #[case::too_large(i64::from(u32::MAX) + 1, Err(()))]
    fn test_set_stock(#[case] quantity: i64, #[case] expected: Result<u32, ()>) {
        let inventory = Inventory::new();
        let listing = inventory
            .create(1, new_listing(10, Decimal::ONE), Utc::now())
            .unwrap();

        let result = inventory.set_stock(listing.id, quantity).map_err(|_| ());

        assert_eq!(result, expected);
        if expected.is_err() {
            assert_eq!(inventory.get(listing.id).unwrap().stock, 10);
        }
    }

    #[test]
    fn test_restore_keeps_removed_status_and_advances_sequence() {
        let inventory = Inventory::new();
        let mut listing = inventory
            .create(1, new_listing(1, Decimal::ONE), Utc::now())
            .unwrap();
        listing.id = 20;
        listing.stock = 0;
        listing.status = ListingStatus::Removed;

        inventory.restore(listing).unwrap();
        let next = inventory
            .create(1, new_listing(1, Decimal::ONE), Utc::now())
            .unwrap();

        assert_eq!(inventory.lookup(20).unwrap().status, ListingStatus::Removed);
        assert_eq!(next.id, 21);
    }

    // Two buyers racing for the last unit: exactly one wins
    #[test]
    fn test_concurrent_decrements_on_last_unit() {
        let inventory = Arc::new(Inventory::new());
        let listing = inventory
            .create(1, new_listing(1, Decimal::ONE), Utc::now())
            .unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let inventory = Arc::clone(&inventory);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    inventory.decrement_stock(listing.id, 1)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|result| matches!(result, Err(OrderError::InsufficientStock { .. }))));
        assert_eq!(inventory.get(listing.id).unwrap().stock, 0);
    }
}
