use boxoffice::application::confirm::ConfirmationEngine;
use boxoffice::application::coordinator::{CheckoutRequest, PaymentOrderCoordinator};
use boxoffice::application::ledger::SeatLedger;
use boxoffice::application::locks::{LockManager, LockRequest};
use boxoffice::domain::booking::{Amount, LockId, OrderId, Quantity, RequesterId};
use boxoffice::domain::event::{Availability, CategoryId, EventId};
use boxoffice::domain::ports::{LockStoreRef, PaymentGatewayRef};
use boxoffice::infrastructure::gateway::OfflineGateway;
use boxoffice::infrastructure::in_memory::{
    InMemoryEventStore, InMemoryLockStore, InMemoryOrderStore,
};
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const EVENT: &str = "ev-1";
pub const CATEGORY: &str = "premium";

pub struct TestCore {
    pub ledger: SeatLedger,
    pub locks: LockManager,
    pub confirmations: ConfirmationEngine,
    pub coordinator: PaymentOrderCoordinator,
}

impl TestCore {
    pub async fn availability(&self) -> Availability {
        self.ledger
            .availability(&EventId::from(EVENT), &CategoryId::from(CATEGORY))
            .await
            .unwrap()
    }
}

pub async fn core_with_event(total: u32) -> TestCore {
    core_with_gateway(total, OfflineGateway::new()).await
}

pub async fn core_with_gateway(total: u32, gateway: OfflineGateway) -> TestCore {
    let ledger = SeatLedger::new(Arc::new(InMemoryEventStore::new()));
    ledger
        .register_category(&EventId::from(EVENT), &CategoryId::from(CATEGORY), total)
        .await
        .unwrap();

    let locks: LockStoreRef = Arc::new(InMemoryLockStore::new());
    let lock_manager = LockManager::new(ledger.clone(), locks.clone());
    let confirmations = ConfirmationEngine::new(ledger.clone(), locks);
    let gateway: PaymentGatewayRef = Arc::new(gateway);
    let coordinator = PaymentOrderCoordinator::new(
        lock_manager.clone(),
        confirmations.clone(),
        Arc::new(InMemoryOrderStore::new()),
        gateway,
    );
    TestCore {
        ledger,
        locks: lock_manager,
        confirmations,
        coordinator,
    }
}

pub fn lock_request(booking: &str, quantity: u32) -> LockRequest {
    LockRequest {
        lock_id: LockId::from(booking),
        event_id: EventId::from(EVENT),
        category_id: CategoryId::from(CATEGORY),
        quantity: Quantity::new(quantity).unwrap(),
        requester: RequesterId::from("user-1"),
    }
}

pub fn checkout_request(booking: &str, quantity: u32) -> CheckoutRequest {
    CheckoutRequest {
        order_id: OrderId::from(booking),
        lock: lock_request(booking, quantity),
        amount: Amount::new(dec!(50.0)).unwrap(),
        currency: "INR".to_string(),
    }
}
