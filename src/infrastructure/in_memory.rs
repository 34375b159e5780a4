use crate::domain::booking::{LockId, LockState, OrderId, OrderStatus, PaymentOrder, SeatLock};
use crate::domain::event::{Event, EventId};
use crate::domain::ports::{EventStore, LockStore, OrderStore, Versioned};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory event store with optimistic concurrency.
///
/// Every record carries a version tag; `update` only persists when the
/// caller's expected version matches, so racing writers lose cleanly with
/// `ConcurrencyConflict` instead of clobbering each other's counters.
#[derive(Default, Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<EventId, Versioned<Event>>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, event: Event) -> Result<()> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(BookingError::Validation(format!(
                "event {} already exists",
                event.id
            )));
        }
        events.insert(
            event.id.clone(),
            Versioned {
                version: 0,
                value: event,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &EventId) -> Result<Option<Versioned<Event>>> {
        let events = self.events.read().await;
        Ok(events.get(id).cloned())
    }

    async fn update(&self, expected_version: u64, event: Event) -> Result<()> {
        let mut events = self.events.write().await;
        let current = events
            .get_mut(&event.id)
            .ok_or_else(|| BookingError::NotFound(format!("event {}", event.id)))?;
        if current.version != expected_version {
            return Err(BookingError::ConcurrencyConflict(format!(
                "event {}",
                event.id
            )));
        }
        current.version += 1;
        current.value = event;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Versioned<Event>>> {
        let events = self.events.read().await;
        let mut all: Vec<Versioned<Event>> = events.values().cloned().collect();
        all.sort_by(|a, b| a.value.id.0.cmp(&b.value.id.0));
        Ok(all)
    }
}

/// A thread-safe in-memory store for per-booking seat locks.
#[derive(Default, Clone)]
pub struct InMemoryLockStore {
    locks: Arc<RwLock<HashMap<LockId, SeatLock>>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn insert(&self, lock: SeatLock) -> Result<()> {
        let mut locks = self.locks.write().await;
        if locks.contains_key(&lock.id) {
            return Err(BookingError::Validation(format!(
                "lock {} already exists",
                lock.id
            )));
        }
        locks.insert(lock.id.clone(), lock);
        Ok(())
    }

    async fn get(&self, id: &LockId) -> Result<Option<SeatLock>> {
        let locks = self.locks.read().await;
        Ok(locks.get(id).cloned())
    }

    async fn compare_and_set_state(
        &self,
        id: &LockId,
        from: LockState,
        to: LockState,
    ) -> Result<bool> {
        let mut locks = self.locks.write().await;
        let lock = locks
            .get_mut(id)
            .ok_or_else(|| BookingError::NotFound(format!("lock {id}")))?;
        if lock.state != from {
            return Ok(false);
        }
        lock.state = to;
        Ok(true)
    }
}

/// A thread-safe in-memory store for payment orders.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, PaymentOrder>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: PaymentOrder) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(BookingError::Validation(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Option<PaymentOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.get(id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(id)
            .ok_or_else(|| BookingError::NotFound(format!("order {id}")))?;
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        order.updated_at = chrono::Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::{Quantity, RequesterId};
    use crate::domain::event::{CategoryId, SeatingCategory};
    use chrono::Utc;

    fn event() -> Event {
        Event::new(EventId::from("ev-1"), "Concert", Utc::now())
            .with_category(SeatingCategory::new(CategoryId::from("premium"), 10))
    }

    #[tokio::test]
    async fn test_event_store_versioning() {
        let store = InMemoryEventStore::new();
        store.insert(event()).await.unwrap();

        let first = store.get(&EventId::from("ev-1")).await.unwrap().unwrap();
        assert_eq!(first.version, 0);

        store.update(0, first.value.clone()).await.unwrap();
        let second = store.get(&EventId::from("ev-1")).await.unwrap().unwrap();
        assert_eq!(second.version, 1);
    }

    #[tokio::test]
    async fn test_event_store_rejects_stale_version() {
        let store = InMemoryEventStore::new();
        store.insert(event()).await.unwrap();

        let stale = store.get(&EventId::from("ev-1")).await.unwrap().unwrap();
        store.update(0, stale.value.clone()).await.unwrap();

        // The first read's version is now behind.
        let result = store.update(0, stale.value).await;
        assert!(matches!(result, Err(BookingError::ConcurrencyConflict(_))));
    }

    #[tokio::test]
    async fn test_event_store_rejects_duplicate_insert() {
        let store = InMemoryEventStore::new();
        store.insert(event()).await.unwrap();
        assert!(store.insert(event()).await.is_err());
    }

    #[tokio::test]
    async fn test_lock_store_compare_and_set() {
        let store = InMemoryLockStore::new();
        let lock = SeatLock::active(
            LockId::from("bk-1"),
            EventId::from("ev-1"),
            CategoryId::from("premium"),
            Quantity::new(2).unwrap(),
            RequesterId::from("user-1"),
        );
        store.insert(lock).await.unwrap();

        let won = store
            .compare_and_set_state(&LockId::from("bk-1"), LockState::Active, LockState::Confirmed)
            .await
            .unwrap();
        assert!(won);

        // Second transition from Active loses.
        let lost = store
            .compare_and_set_state(&LockId::from("bk-1"), LockState::Active, LockState::Released)
            .await
            .unwrap();
        assert!(!lost);

        let stored = store.get(&LockId::from("bk-1")).await.unwrap().unwrap();
        assert_eq!(stored.state, LockState::Confirmed);
    }

    #[tokio::test]
    async fn test_order_store_compare_and_set() {
        use crate::domain::booking::Amount;
        use rust_decimal_macros::dec;

        let store = InMemoryOrderStore::new();
        let order = PaymentOrder::pending(
            OrderId::from("ord-1"),
            "remote-1".to_string(),
            Amount::new(dec!(10.0)).unwrap(),
            "INR",
            LockId::from("bk-1"),
        );
        store.insert(order).await.unwrap();

        let won = store
            .compare_and_set_status(
                &OrderId::from("ord-1"),
                OrderStatus::Pending,
                OrderStatus::Captured,
            )
            .await
            .unwrap();
        assert!(won);

        let lost = store
            .compare_and_set_status(
                &OrderId::from("ord-1"),
                OrderStatus::Pending,
                OrderStatus::Failed,
            )
            .await
            .unwrap();
        assert!(!lost);
    }
}
