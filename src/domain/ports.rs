use super::booking::{Amount, LockId, LockState, OrderId, OrderStatus, PaymentOrder, SeatLock};
use super::event::{Event, EventId};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A record paired with the version tag its store read it at.
///
/// Passing the tag back to `EventStore::update` makes the read-modify-write
/// cycle an optimistic compare-and-swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists a brand-new event at version 0. Fails on duplicate id.
    async fn insert(&self, event: Event) -> Result<()>;

    async fn get(&self, id: &EventId) -> Result<Option<Versioned<Event>>>;

    /// Conditionally persists `event`, bumping the version, only if the
    /// stored version still equals `expected_version`. Fails with
    /// `ConcurrencyConflict` when a concurrent writer got there first.
    async fn update(&self, expected_version: u64, event: Event) -> Result<()>;

    async fn all(&self) -> Result<Vec<Versioned<Event>>>;
}

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Persists a new lock record. Fails on duplicate id.
    async fn insert(&self, lock: SeatLock) -> Result<()>;

    async fn get(&self, id: &LockId) -> Result<Option<SeatLock>>;

    /// Transitions the lock's state only if it currently equals `from`.
    /// Returns `false` (without modifying anything) when it does not.
    async fn compare_and_set_state(
        &self,
        id: &LockId,
        from: LockState,
        to: LockState,
    ) -> Result<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new payment order. Fails on duplicate id.
    async fn insert(&self, order: PaymentOrder) -> Result<()>;

    async fn get(&self, id: &OrderId) -> Result<Option<PaymentOrder>>;

    /// Transitions the order's status only if it currently equals `from`.
    /// Returns `false` (without modifying anything) when it does not.
    async fn compare_and_set_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool>;
}

/// An order as created on the remote gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub remote_id: String,
}

/// The payment gateway, consumed as an opaque capability.
///
/// The core never sees the gateway's signature algorithm; it only asks
/// whether a notification is authentic.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_remote_order(
        &self,
        amount: Amount,
        currency: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<RemoteOrder>;

    async fn verify_signature(
        &self,
        order_ref: &str,
        payment_ref: &str,
        signature: &str,
    ) -> Result<bool>;

    async fn refund(&self, remote_id: &str, amount: Amount) -> Result<()>;
}

pub type EventStoreRef = Arc<dyn EventStore>;
pub type LockStoreRef = Arc<dyn LockStore>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
