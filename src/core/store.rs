//! Transactional market store
//!
//! `MarketStore` owns the three tables (cards, listings, orders) and provides
//! the only way to mutate more than one row as a single unit.
//!
//! # Transactions
//!
//! [`MarketStore::transaction`] locks every row the unit touches, runs the
//! caller's closure against staged copies, and either writes all staged values
//! back before releasing the locks (commit) or discards them (rollback).
//!
//! ```text
//! transaction(cards, listing, f)
//!     ├── lock card rows in ascending id order (deduplicated)
//!     ├── lock the listing row
//!     ├── f(&mut StoreTransaction)   debit / decrement / credit / append, staged
//!     └── Ok  -> write staged rows + insert orders, then unlock
//!         Err -> drop staged values, then unlock
//! ```
//!
//! Every multi-row transaction acquires its locks in the same global order
//! (cards by id, then the listing), and every other operation holds at most one
//! row lock at a time, so transactions cannot deadlock.

use crate::core::card_ledger::{credited, debited, CardLedger};
use crate::core::inventory::{decremented, Inventory};
use crate::core::order_ledger::OrderLedger;
use crate::types::{Card, CardId, Listing, ListingId, OrderError, OrderId, OrderRecord};
use rust_decimal::Decimal;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Lock a single row
///
/// A row is only written after every check has passed, so a panic while the
/// lock was held never leaves it half-updated. Poison is cleared and the row
/// stays usable.
pub(crate) fn lock_row<'a, T>(row: &'a Mutex<T>, table: &str, id: impl Display) -> MutexGuard<'a, T> {
    row.lock().unwrap_or_else(|poisoned| {
        warn!(table, id = %id, "recovering row lock poisoned by a panicked holder");
        row.clear_poison();
        poisoned.into_inner()
    })
}

/// The marketplace's single consistency domain
#[derive(Debug, Default)]
pub struct MarketStore {
    cards: CardLedger,
    inventory: Inventory,
    orders: OrderLedger,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cards(&self) -> &CardLedger {
        &self.cards
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn orders(&self) -> &OrderLedger {
        &self.orders
    }

    /// Run `f` as one all-or-nothing unit over the given card rows and listing row
    ///
    /// Nothing `f` stages is visible to any other caller until `f` returns
    /// `Ok`; at that point all of it becomes visible before any row is
    /// unlocked. If `f` returns `Err`, every staged change is discarded and the
    /// error is returned unchanged.
    ///
    /// # Errors
    ///
    /// - `CardNotFound` / `ListingNotFound` if a row does not exist
    /// - whatever `f` returns
    pub fn transaction<T, F>(
        &self,
        cards: &[CardId],
        listing: ListingId,
        f: F,
    ) -> Result<T, OrderError>
    where
        F: FnOnce(&mut StoreTransaction<'_>) -> Result<T, OrderError>,
    {
        let mut ids = cards.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let card_rows = ids
            .iter()
            .map(|&id| {
                self.cards
                    .row(id)
                    .map(|row| (id, row))
                    .ok_or_else(|| OrderError::card_not_found(id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let listing_row = self
            .inventory
            .row(listing)
            .ok_or_else(|| OrderError::listing_not_found(listing))?;

        let mut tx = StoreTransaction::begin(&card_rows, listing, &listing_row, &self.orders);
        let value = f(&mut tx)?;
        tx.commit();
        Ok(value)
    }
}

/// Locked card row with its staged balance
#[derive(Debug)]
struct StagedCard<'a> {
    row: MutexGuard<'a, Card>,
    balance: Decimal,
}

/// Open unit of work over locked rows
///
/// Reads return committed row values; `balance` and `stock` return the staged
/// values including this transaction's own changes.
#[derive(Debug)]
pub struct StoreTransaction<'a> {
    cards: Vec<StagedCard<'a>>,
    listing: MutexGuard<'a, Listing>,
    stock: u32,
    orders: &'a OrderLedger,
    staged_orders: Vec<OrderRecord>,
}

impl<'a> StoreTransaction<'a> {
    fn begin(
        card_rows: &'a [(CardId, Arc<Mutex<Card>>)],
        listing_id: ListingId,
        listing_row: &'a Mutex<Listing>,
        orders: &'a OrderLedger,
    ) -> Self {
        let cards = card_rows
            .iter()
            .map(|(id, row)| {
                let row = lock_row(&**row, "card", id);
                StagedCard {
                    balance: row.balance,
                    row,
                }
            })
            .collect();
        let listing = lock_row(listing_row, "listing", listing_id);
        let stock = listing.stock;

        Self {
            cards,
            listing,
            stock,
            orders,
            staged_orders: Vec::new(),
        }
    }

    fn staged(&self, card: CardId) -> Result<&StagedCard<'a>, OrderError> {
        self.cards
            .iter()
            .find(|staged| staged.row.id == card)
            .ok_or_else(|| {
                OrderError::store_unavailable(format!("card {} is not part of this transaction", card))
            })
    }

    fn staged_mut(&mut self, card: CardId) -> Result<&mut StagedCard<'a>, OrderError> {
        self.cards
            .iter_mut()
            .find(|staged| staged.row.id == card)
            .ok_or_else(|| {
                OrderError::store_unavailable(format!("card {} is not part of this transaction", card))
            })
    }

    /// Committed view of a locked card
    pub fn card(&self, card: CardId) -> Result<&Card, OrderError> {
        self.staged(card).map(|staged| &*staged.row)
    }

    /// Staged balance of a locked card
    pub fn balance(&self, card: CardId) -> Result<Decimal, OrderError> {
        self.staged(card).map(|staged| staged.balance)
    }

    /// Committed view of the locked listing
    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    /// Staged stock of the locked listing
    pub fn stock(&self) -> u32 {
        self.stock
    }

    /// Stage a conditional debit
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if the staged balance cannot cover `amount`.
    pub fn debit(&mut self, card: CardId, amount: Decimal) -> Result<(), OrderError> {
        let staged = self.staged_mut(card)?;
        staged.balance = debited(card, staged.balance, amount)?;
        Ok(())
    }

    /// Stage a credit
    pub fn credit(&mut self, card: CardId, amount: Decimal) -> Result<(), OrderError> {
        let staged = self.staged_mut(card)?;
        staged.balance = credited(card, staged.balance, amount)?;
        Ok(())
    }

    /// Stage a conditional stock decrement on the locked listing
    ///
    /// # Errors
    ///
    /// `ListingUnavailable` if the listing is removed, `InsufficientStock` if
    /// the staged stock is below `quantity`.
    pub fn decrement_stock(&mut self, quantity: u32) -> Result<(), OrderError> {
        self.stock = decremented(&self.listing, self.stock, quantity)?;
        Ok(())
    }

    /// Order previously committed, or staged here, under an idempotency key
    pub fn find_order(&self, buyer_card: CardId, key: &str) -> Option<OrderRecord> {
        self.staged_orders
            .iter()
            .find(|order| {
                order.buyer_card == buyer_card && order.idempotency_key.as_deref() == Some(key)
            })
            .cloned()
            .or_else(|| self.orders.find_by_key(buyer_card, key))
    }

    /// Draw the next order identity from the ledger sequence
    pub fn next_order_id(&mut self) -> OrderId {
        self.orders.next_id()
    }

    /// Stage an order for insertion at commit
    pub fn append_order(&mut self, record: OrderRecord) {
        self.staged_orders.push(record);
    }

    /// Write every staged value into the locked rows, then release them
    fn commit(self) {
        let StoreTransaction {
            mut cards,
            mut listing,
            stock,
            orders,
            staged_orders,
        } = self;

        for staged in &mut cards {
            staged.row.balance = staged.balance;
        }
        listing.stock = stock;
        for record in staged_orders {
            orders.insert(record);
        }
    }
}
