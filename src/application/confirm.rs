use crate::domain::booking::{LockId, LockState};
use crate::domain::event::Availability;
use crate::domain::ports::LockStoreRef;
use crate::error::{BookingError, Result};
use log::info;

use super::ledger::SeatLedger;

/// Converts a held lock into a permanent sale exactly once.
///
/// The lock record's `Active -> Confirmed` transition is the idempotence
/// guard: whichever of the two possible triggers (client confirmation call
/// or gateway webhook) wins the compare-and-set mutates the ledger, the
/// loser gets `NothingToConfirm` and the counters stay untouched.
#[derive(Clone)]
pub struct ConfirmationEngine {
    ledger: SeatLedger,
    locks: LockStoreRef,
}

impl ConfirmationEngine {
    pub fn new(ledger: SeatLedger, locks: LockStoreRef) -> Self {
        Self { ledger, locks }
    }

    /// Converts the lock's seats from locked to sold.
    ///
    /// There is no transition out of the confirmed state; refunds are
    /// layered on top and never touch the seat counters.
    pub async fn confirm(&self, lock_id: &LockId) -> Result<Availability> {
        let lock = self
            .locks
            .get(lock_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("lock {lock_id}")))?;

        let transitioned = self
            .locks
            .compare_and_set_state(lock_id, LockState::Active, LockState::Confirmed)
            .await?;
        if !transitioned {
            // Re-read: the snapshot above may predate a racing transition.
            let current = self.locks.get(lock_id).await?.unwrap_or(lock.clone());
            let state = match current.state {
                LockState::Confirmed => "already confirmed",
                LockState::Released => "already released",
                LockState::Active => "contended",
            };
            return Err(BookingError::NothingToConfirm(format!(
                "lock {lock_id} is {state}"
            )));
        }

        let quantity = lock.quantity;
        let availability = self
            .ledger
            .mutate_category(&lock.event_id, &lock.category_id, |category| {
                category.confirm(quantity)
            })
            .await?;
        info!(
            "✅ Lock {lock_id} confirmed: {quantity} seats sold on {}/{}",
            lock.event_id, lock.category_id
        );
        Ok(availability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::locks::{LockManager, LockRequest};
    use crate::domain::booking::{Quantity, RequesterId};
    use crate::domain::event::{CategoryId, Event, EventId, SeatingCategory};
    use crate::domain::ports::{EventStore, LockStoreRef};
    use crate::infrastructure::in_memory::{InMemoryEventStore, InMemoryLockStore};
    use chrono::Utc;
    use std::sync::Arc;

    async fn stack(total: u32) -> (LockManager, ConfirmationEngine, SeatLedger) {
        let events = Arc::new(InMemoryEventStore::new());
        let event = Event::new(EventId::from("ev-1"), "Concert", Utc::now())
            .with_category(SeatingCategory::new(CategoryId::from("premium"), total));
        events.insert(event).await.unwrap();
        let locks: LockStoreRef = Arc::new(InMemoryLockStore::new());
        let ledger = SeatLedger::new(events);
        (
            LockManager::new(ledger.clone(), locks.clone()),
            ConfirmationEngine::new(ledger.clone(), locks),
            ledger,
        )
    }

    fn request(lock_id: &str, quantity: u32) -> LockRequest {
        LockRequest {
            lock_id: LockId::from(lock_id),
            event_id: EventId::from("ev-1"),
            category_id: CategoryId::from("premium"),
            quantity: Quantity::new(quantity).unwrap(),
            requester: RequesterId::from("user-1"),
        }
    }

    #[tokio::test]
    async fn test_confirm_converts_lock_to_sale() {
        let (manager, engine, _) = stack(10).await;
        let grant = manager.acquire(request("bk-1", 3)).await.unwrap();
        let availability = engine.confirm(&grant.lock_id).await.unwrap();
        assert_eq!(availability.locked_seats, 0);
        assert_eq!(availability.seats_sold, 3);
        assert_eq!(availability.remaining, 7);
    }

    #[tokio::test]
    async fn test_second_confirm_is_rejected() {
        let (manager, engine, ledger) = stack(10).await;
        let grant = manager.acquire(request("bk-1", 3)).await.unwrap();
        engine.confirm(&grant.lock_id).await.unwrap();

        let result = engine.confirm(&grant.lock_id).await;
        assert!(matches!(result, Err(BookingError::NothingToConfirm(_))));

        // Exactly one seats_sold increment.
        let availability = ledger
            .availability(&EventId::from("ev-1"), &CategoryId::from("premium"))
            .await
            .unwrap();
        assert_eq!(availability.seats_sold, 3);
    }

    #[tokio::test]
    async fn test_confirm_released_lock_is_rejected() {
        let (manager, engine, _) = stack(10).await;
        let grant = manager.acquire(request("bk-1", 3)).await.unwrap();
        manager.release(&grant.lock_id).await.unwrap();
        let result = engine.confirm(&grant.lock_id).await;
        assert!(matches!(result, Err(BookingError::NothingToConfirm(_))));
    }

    #[tokio::test]
    async fn test_confirm_unknown_lock() {
        let (_, engine, _) = stack(10).await;
        let result = engine.confirm(&LockId::from("ghost")).await;
        assert!(matches!(result, Err(BookingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_confirm_one_lock_does_not_touch_another() {
        let (manager, engine, ledger) = stack(10).await;
        manager.acquire(request("bk-1", 3)).await.unwrap();
        let second = manager.acquire(request("bk-2", 2)).await.unwrap();

        engine.confirm(&second.lock_id).await.unwrap();
        let availability = ledger
            .availability(&EventId::from("ev-1"), &CategoryId::from("premium"))
            .await
            .unwrap();
        // bk-1's three seats stay locked.
        assert_eq!(availability.locked_seats, 3);
        assert_eq!(availability.seats_sold, 2);
    }
}
