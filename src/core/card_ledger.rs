//! Card ledger
//!
//! Stores every funding instrument and owns the balance mutation primitives.
//! Each card lives behind its own row lock so that a conditional debit is a
//! single atomic step: the balance is checked and changed under the same
//! lock, never read by one caller and written back by another.

use crate::core::store::lock_row;
use crate::types::card::{is_valid_card_code, is_valid_card_number};
use crate::types::{AccountId, Card, CardId, OrderError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Thread-safe table of cards
///
/// The outer `DashMap` only indexes rows; balances are read and written
/// through the per-row `Mutex`, which is also what store transactions lock.
#[derive(Debug)]
pub struct CardLedger {
    /// Card rows by id
    cards: DashMap<CardId, Arc<Mutex<Card>>>,

    /// Card numbers already registered, for uniqueness
    numbers: DashMap<String, CardId>,

    /// Next id handed out by `open`
    next_id: AtomicU32,
}

impl CardLedger {
    pub fn new() -> Self {
        Self {
            cards: DashMap::new(),
            numbers: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Open a new card for `owner` with a zero balance
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the number is not 12 digits, the code is
    /// not 4 characters, or the number is already registered.
    pub fn open(
        &self,
        owner: AccountId,
        number: &str,
        code: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Card, OrderError> {
        if !is_valid_card_number(number) {
            return Err(OrderError::invalid_argument(
                "number",
                "card number must be exactly 12 digits",
            ));
        }
        if !is_valid_card_code(code) {
            return Err(OrderError::invalid_argument(
                "code",
                "verification code must be exactly 4 characters",
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let claimed = *self
            .numbers
            .entry(number.to_string())
            .or_insert_with(|| id);
        if claimed != id {
            return Err(OrderError::invalid_argument(
                "number",
                "card number is already registered",
            ));
        }

        let card = Card::new(id, owner, number, code, created_at);
        self.cards.insert(id, Arc::new(Mutex::new(card.clone())));
        Ok(card)
    }

    /// Insert a card with an explicit id, e.g. when loading a seed file
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a duplicate id or number, a malformed
    /// number or code, or a negative balance.
    pub fn restore(&self, card: Card) -> Result<(), OrderError> {
        if card.balance < Decimal::ZERO {
            return Err(OrderError::invalid_argument(
                "balance",
                format!("card {} has a negative balance", card.id),
            ));
        }
        if !is_valid_card_number(&card.number) || !is_valid_card_code(&card.code) {
            return Err(OrderError::invalid_argument(
                "card",
                format!("card {} has a malformed number or code", card.id),
            ));
        }
        if self.cards.contains_key(&card.id) {
            return Err(OrderError::invalid_argument(
                "card",
                format!("card {} already exists", card.id),
            ));
        }

        let claimed = *self
            .numbers
            .entry(card.number.clone())
            .or_insert_with(|| card.id);
        if claimed != card.id {
            return Err(OrderError::invalid_argument(
                "number",
                "card number is already registered",
            ));
        }

        self.next_id
            .fetch_max(card.id.saturating_add(1), Ordering::Relaxed);
        self.cards.insert(card.id, Arc::new(Mutex::new(card)));
        Ok(())
    }

    /// Row handle for a card, used by store transactions
    ///
    /// The map reference is released before returning, so callers may lock
    /// the row without holding any shard lock.
    pub(crate) fn row(&self, card: CardId) -> Option<Arc<Mutex<Card>>> {
        self.cards.get(&card).map(|entry| Arc::clone(entry.value()))
    }

    fn existing_row(&self, card: CardId) -> Result<Arc<Mutex<Card>>, OrderError> {
        self.row(card)
            .ok_or_else(|| OrderError::card_not_found(card))
    }

    /// Copy of a card row
    pub fn get(&self, card: CardId) -> Result<Card, OrderError> {
        let row = self.existing_row(card)?;
        let guard = lock_row(&row, "card", card);
        Ok(guard.clone())
    }

    /// Account that owns a card
    pub fn lookup_owner(&self, card: CardId) -> Result<AccountId, OrderError> {
        let row = self.existing_row(card)?;
        let guard = lock_row(&row, "card", card);
        Ok(guard.owner)
    }

    /// Stored verification code of a card
    pub fn lookup_secret(&self, card: CardId) -> Result<String, OrderError> {
        let row = self.existing_row(card)?;
        let guard = lock_row(&row, "card", card);
        Ok(guard.code.clone())
    }

    /// Current balance of a card
    pub fn balance(&self, card: CardId) -> Result<Decimal, OrderError> {
        let row = self.existing_row(card)?;
        let guard = lock_row(&row, "card", card);
        Ok(guard.balance)
    }

    /// Decrease a card's balance by `amount`, only if it stays non-negative
    ///
    /// The check runs against the balance as left by every debit that
    /// committed before this one acquired the row.
    ///
    /// # Returns
    ///
    /// The new balance.
    ///
    /// # Errors
    ///
    /// - `CardNotFound` for an unknown card
    /// - `InvalidArgument` for a negative amount
    /// - `InsufficientFunds` if the balance would go below zero (no mutation)
    pub fn debit(&self, card: CardId, amount: Decimal) -> Result<Decimal, OrderError> {
        let row = self.existing_row(card)?;
        let mut guard = lock_row(&row, "card", card);
        guard.balance = debited(card, guard.balance, amount)?;
        Ok(guard.balance)
    }

    /// Increase a card's balance by `amount`
    ///
    /// # Returns
    ///
    /// The new balance.
    pub fn credit(&self, card: CardId, amount: Decimal) -> Result<Decimal, OrderError> {
        let row = self.existing_row(card)?;
        let mut guard = lock_row(&row, "card", card);
        guard.balance = credited(card, guard.balance, amount)?;
        Ok(guard.balance)
    }

    /// All cards owned by an account, sorted by id
    pub fn cards_of(&self, owner: AccountId) -> Result<Vec<Card>, OrderError> {
        let mut cards = self.all()?;
        cards.retain(|card| card.owner == owner);
        Ok(cards)
    }

    /// Copies of every card, sorted by id
    pub fn all(&self) -> Result<Vec<Card>, OrderError> {
        let rows: Vec<(CardId, Arc<Mutex<Card>>)> = self
            .cards
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut cards = rows
            .iter()
            .map(|(id, row)| lock_row(row, "card", id).clone())
            .collect::<Vec<_>>();
        cards.sort_by_key(|card| card.id);
        Ok(cards)
    }

    /// Number of cards in the ledger
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for CardLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Balance after debiting `amount`, or the reason the debit is refused
pub(crate) fn debited(card: CardId, balance: Decimal, amount: Decimal) -> Result<Decimal, OrderError> {
    if amount < Decimal::ZERO {
        return Err(OrderError::invalid_argument(
            "amount",
            "debit amount must not be negative",
        ));
    }
    if balance < amount {
        return Err(OrderError::insufficient_funds(card, balance, amount));
    }
    balance
        .checked_sub(amount)
        .ok_or_else(|| OrderError::arithmetic_overflow("debit", card))
}

/// Balance after crediting `amount`
pub(crate) fn credited(card: CardId, balance: Decimal, amount: Decimal) -> Result<Decimal, OrderError> {
    if amount < Decimal::ZERO {
        return Err(OrderError::invalid_argument(
            "amount",
            "credit amount must not be negative",
        ));
    }
    balance
        .checked_add(amount)
        .ok_or_else(|| OrderError::arithmetic_overflow("credit", card))
}
