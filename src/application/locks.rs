use crate::domain::booking::{LockId, LockState, Quantity, RequesterId, SeatLock};
use crate::domain::event::{Availability, CategoryId, EventId};
use crate::domain::ports::LockStoreRef;
use crate::error::{BookingError, Result};
use log::{debug, warn};

use super::ledger::SeatLedger;

/// Everything needed to place a hold for one booking attempt.
#[derive(Debug, Clone)]
pub struct LockRequest {
    /// Caller-supplied booking reference; one outstanding lock per attempt.
    pub lock_id: LockId,
    pub event_id: EventId,
    pub category_id: CategoryId,
    pub quantity: Quantity,
    pub requester: RequesterId,
}

/// A granted hold together with the counters it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LockGrant {
    pub lock_id: LockId,
    pub availability: Availability,
}

/// Grants and releases temporary holds on seats while payment is pending.
///
/// Each hold is backed by its own [`SeatLock`] record, so release and
/// confirmation always act on a specific booking attempt's claim rather
/// than on the shared counters alone.
#[derive(Clone)]
pub struct LockManager {
    ledger: SeatLedger,
    locks: LockStoreRef,
}

impl LockManager {
    pub fn new(ledger: SeatLedger, locks: LockStoreRef) -> Self {
        Self { ledger, locks }
    }

    /// Reserves `quantity` seats for the caller.
    ///
    /// On success the caller holds an exclusive claim on those seats until
    /// the lock is confirmed or released.
    pub async fn acquire(&self, request: LockRequest) -> Result<LockGrant> {
        let quantity = request.quantity;
        let availability = self
            .ledger
            .mutate_category(&request.event_id, &request.category_id, |category| {
                category.lock(quantity)
            })
            .await?;

        let lock = SeatLock::active(
            request.lock_id.clone(),
            request.event_id.clone(),
            request.category_id.clone(),
            request.quantity,
            request.requester,
        );
        if let Err(e) = self.locks.insert(lock).await {
            // Undo the counter bump so a rejected lock record cannot strand seats.
            warn!(
                "🎟️ Rolling back hold of {quantity} seats on {}/{}: {e}",
                request.event_id, request.category_id
            );
            self.ledger
                .mutate_category(&request.event_id, &request.category_id, |category| {
                    category.release(quantity);
                    Ok(())
                })
                .await?;
            return Err(e);
        }

        debug!(
            "🎟️ Lock {} holds {quantity} seats on {}/{}",
            request.lock_id, request.event_id, request.category_id
        );
        Ok(LockGrant {
            lock_id: request.lock_id,
            availability,
        })
    }

    /// Returns a held lock's seats to the pool.
    ///
    /// Safe to call more than once for the same lock: a repeat release is a
    /// no-op returning current availability, so a retried webhook or a late
    /// expiry sweep cannot release seats twice.
    pub async fn release(&self, lock_id: &LockId) -> Result<Availability> {
        let lock = self
            .locks
            .get(lock_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("lock {lock_id}")))?;

        let transitioned = self
            .locks
            .compare_and_set_state(lock_id, LockState::Active, LockState::Released)
            .await?;
        if !transitioned {
            // Re-read: the snapshot above may predate a racing transition.
            let current = self.locks.get(lock_id).await?.unwrap_or(lock.clone());
            return match current.state {
                LockState::Released => {
                    debug!("🎟️ Lock {lock_id} already released, ignoring repeat release");
                    self.ledger
                        .availability(&lock.event_id, &lock.category_id)
                        .await
                }
                _ => Err(BookingError::NothingToConfirm(format!(
                    "lock {lock_id} is already confirmed"
                ))),
            };
        }

        let quantity = lock.quantity;
        let availability = self
            .ledger
            .mutate_category(&lock.event_id, &lock.category_id, |category| {
                category.release(quantity);
                Ok(())
            })
            .await?;
        debug!(
            "🎟️ Lock {lock_id} released {quantity} seats on {}/{}",
            lock.event_id, lock.category_id
        );
        Ok(availability)
    }
}
