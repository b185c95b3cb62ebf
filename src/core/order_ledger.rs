//! Order ledger
//!
//! Append-only table of committed orders. Orders are never updated or deleted
//! by the engine; the only writes are inserts made by a committing store
//! transaction.

use crate::types::{AccountId, CardId, OrderError, OrderId, OrderRecord};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe, append-only order storage
///
/// Orders are indexed by id and, when the buyer supplied one, by
/// `(buyer card, idempotency key)` so retries can find the original order.
#[derive(Debug)]
pub struct OrderLedger {
    /// Committed orders by id
    orders: DashMap<OrderId, OrderRecord>,

    /// Idempotency index
    keys: DashMap<(CardId, String), OrderId>,

    /// Order id sequence
    next_id: AtomicU64,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            keys: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Draw the next order identity
    ///
    /// Ids drawn by a transaction that later aborts are not reused.
    pub fn next_id(&self) -> OrderId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Insert a committed order
    ///
    /// Only called while the rows the order touched are still locked.
    pub(crate) fn insert(&self, record: OrderRecord) {
        if let Some(key) = &record.idempotency_key {
            self.keys
                .insert((record.buyer_card, key.clone()), record.id);
        }
        self.orders.insert(record.id, record);
    }

    /// Append an externally produced order, e.g. when replaying an order log
    ///
    /// Appending the same record twice is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if a different order already uses the id or the
    /// buyer's idempotency key.
    pub fn append(&self, record: OrderRecord) -> Result<(), OrderError> {
        if let Some(existing) = self.orders.get(&record.id) {
            if *existing == record {
                return Ok(());
            }
            return Err(OrderError::invalid_argument(
                "order",
                format!("order {} already exists", record.id),
            ));
        }
        if let Some(key) = &record.idempotency_key {
            if self
                .keys
                .contains_key(&(record.buyer_card, key.clone()))
            {
                return Err(OrderError::invalid_argument(
                    "idempotency_key",
                    format!("key {} is already used by card {}", key, record.buyer_card),
                ));
            }
        }

        self.next_id
            .fetch_max(record.id.saturating_add(1), Ordering::Relaxed);
        self.insert(record);
        Ok(())
    }

    pub fn get(&self, id: OrderId) -> Option<OrderRecord> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    /// Order placed by `buyer_card` under `key`
    pub fn find_by_key(&self, buyer_card: CardId, key: &str) -> Option<OrderRecord> {
        let id = *self.keys.get(&(buyer_card, key.to_string()))?;
        self.get(id)
    }

    /// Orders paid for by any card of `account`, oldest first
    pub fn list_by_buyer(&self, account: AccountId) -> Vec<OrderRecord> {
        self.collect(|order| order.buyer_account == account)
    }

    /// Orders paid out to any card of `account`, oldest first
    pub fn list_by_seller_account(&self, account: AccountId) -> Vec<OrderRecord> {
        self.collect(|order| order.seller_account == account)
    }

    /// Every order, oldest first
    pub fn all(&self) -> Vec<OrderRecord> {
        self.collect(|_| true)
    }

    fn collect(&self, filter: impl Fn(&OrderRecord) -> bool) -> Vec<OrderRecord> {
        let mut orders: Vec<OrderRecord> = self
            .orders
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.id);
        orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Default for OrderLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn record(id: OrderId, buyer_account: AccountId, seller_account: AccountId, key: Option<&str>) -> OrderRecord {
        OrderRecord {
            id,
            buyer_card: buyer_account * 10,
            buyer_account,
            listing: 1,
            seller_card: seller_account * 10,
            seller_account,
            quantity: 2,
            unit_price: Decimal::new(5, 0),
            total: Decimal::new(10, 0),
            status: OrderStatus::Placed,
            idempotency_key: key.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let ledger = OrderLedger::new();
        let first = ledger.next_id();
        let second = ledger.next_id();
        assert!(second > first);
    }

    #[test]
    fn test_insert_and_get() {
        let ledger = OrderLedger::new();
        let order = record(1, 1, 2, None);

        ledger.insert(order.clone());

        assert_eq!(ledger.get(1), Some(order));
        assert_eq!(ledger.get(2), None);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_find_by_key_is_scoped_to_buyer_card() {
        let ledger = OrderLedger::new();
        ledger.insert(record(1, 1, 2, Some("k1")));

        assert_eq!(ledger.find_by_key(10, "k1").map(|order| order.id), Some(1));
        assert!(ledger.find_by_key(20, "k1").is_none());
        assert!(ledger.find_by_key(10, "k2").is_none());
    }

    #[test]
    fn test_append_is_idempotent_for_identical_records() {
        let ledger = OrderLedger::new();
        let order = record(5, 1, 2, Some("k1"));

        ledger.append(order.clone()).unwrap();
        ledger.append(order).unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.next_id(), 6);
    }

    #[test]
    fn test_append_rejects_conflicting_records() {
        let ledger = OrderLedger::new();
        ledger.append(record(1, 1, 2, Some("k1"))).unwrap();

        let mut different = record(1, 1, 2, Some("k1"));
        different.quantity = 3;
        assert!(matches!(
            ledger.append(different),
            Err(OrderError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ledger.append(record(2, 1, 2, Some("k1"))),
            Err(OrderError::InvalidArgument { .. })
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_list_by_buyer_and_seller() {
        let ledger = OrderLedger::new();
        ledger.insert(record(3, 1, 2, None));
        ledger.insert(record(1, 1, 3, None));
        ledger.insert(record(2, 2, 1, None));

        let bought: Vec<_> = ledger.list_by_buyer(1).iter().map(|o| o.id).collect();
        let sold: Vec<_> = ledger.list_by_seller_account(1).iter().map(|o| o.id).collect();
        let all: Vec<_> = ledger.all().iter().map(|o| o.id).collect();

        assert_eq!(bought, vec![1, 3]);
        assert_eq!(sold, vec![2]);
        assert_eq!(all, vec![1, 2, 3]);
    }
}
