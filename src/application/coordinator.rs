use crate::domain::booking::{Amount, OrderId, OrderStatus, PaymentOrder};
use crate::domain::event::Availability;
use crate::domain::ports::{OrderStoreRef, PaymentGatewayRef};
use crate::error::{BookingError, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;

use super::confirm::ConfirmationEngine;
use super::locks::{LockManager, LockRequest};

/// A terminal outcome reported for a remote payment order.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Captured { payment_ref: String, signature: String },
    Failed,
    /// The payment window elapsed without a terminal gateway event; the
    /// expiry sweeper reports it through the same path as a failure.
    Expired,
}

/// What a reconciliation call actually did.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The ledger transition ran; counters reflect the outcome.
    Applied(Availability),
    /// The order was already terminal; the ledger was not touched.
    AlreadySettled { status: OrderStatus },
}

/// Everything needed to open a payment order for a new booking attempt.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub lock: LockRequest,
    pub amount: Amount,
    pub currency: String,
}

/// Gateway notification as delivered to the webhook receiver.
#[derive(Debug, Deserialize)]
pub struct WebhookNotice {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub order_id: String,
    #[serde(default)]
    pub payment_ref: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Ties a remote payment order's lifecycle to a specific seat lock.
///
/// The order's status field is the convergence point for the two
/// independent capture triggers (client confirmation call and gateway
/// webhook): entry into the confirmation engine is guarded by a
/// compare-and-set from `Pending`, so exactly one trigger drives the
/// ledger and the other observes an already-terminal order.
#[derive(Clone)]
pub struct PaymentOrderCoordinator {
    locks: LockManager,
    confirmations: ConfirmationEngine,
    orders: OrderStoreRef,
    gateway: PaymentGatewayRef,
}

impl PaymentOrderCoordinator {
    pub fn new(
        locks: LockManager,
        confirmations: ConfirmationEngine,
        orders: OrderStoreRef,
        gateway: PaymentGatewayRef,
    ) -> Self {
        Self {
            locks,
            confirmations,
            orders,
            gateway,
        }
    }

    /// Acquires a hold and opens a remote payment order against it.
    ///
    /// If the remote call fails, the just-acquired hold is released before
    /// the error surfaces so a gateway outage can never strand seats.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<PaymentOrder> {
        let grant = self.locks.acquire(request.lock.clone()).await?;

        let mut metadata = HashMap::new();
        metadata.insert("booking_ref".to_string(), grant.lock_id.to_string());
        metadata.insert("event_id".to_string(), request.lock.event_id.to_string());
        metadata.insert(
            "category_id".to_string(),
            request.lock.category_id.to_string(),
        );

        let remote = match self
            .gateway
            .create_remote_order(request.amount, &request.currency, &metadata)
            .await
        {
            Ok(remote) => remote,
            Err(e) => {
                warn!(
                    "💳 Remote order creation failed for booking {}, releasing hold: {e}",
                    grant.lock_id
                );
                // Surface the gateway error even if the release itself fails;
                // the expiry sweep will reclaim the hold.
                if let Err(release_err) = self.locks.release(&grant.lock_id).await {
                    warn!(
                        "💳 Could not release hold {} after gateway failure: {release_err}",
                        grant.lock_id
                    );
                }
                return Err(BookingError::UpstreamPayment(format!(
                    "remote order creation failed: {e}"
                )));
            }
        };

        let order = PaymentOrder::pending(
            request.order_id,
            remote.remote_id,
            request.amount,
            request.currency,
            grant.lock_id.clone(),
        );
        if let Err(e) = self.orders.insert(order.clone()).await {
            warn!(
                "💳 Could not persist order {} for booking {}, releasing hold: {e}",
                order.id, grant.lock_id
            );
            if let Err(release_err) = self.locks.release(&grant.lock_id).await {
                warn!(
                    "💳 Could not release hold {} after persistence failure: {release_err}",
                    grant.lock_id
                );
            }
            return Err(e);
        }

        info!(
            "💳 Order {} ({} {}) opened against booking {}",
            order.id, order.amount, order.currency, order.lock_id
        );
        Ok(order)
    }

    /// Applies a terminal payment outcome to the ledger.
    ///
    /// Safe to invoke twice for the same outcome: the repeat observes the
    /// order already terminal and skips the ledger entirely.
    pub async fn reconcile(
        &self,
        order_id: &OrderId,
        outcome: PaymentOutcome,
    ) -> Result<Reconciliation> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("order {order_id}")))?;

        match outcome {
            PaymentOutcome::Captured {
                payment_ref,
                signature,
            } => {
                let authentic = self
                    .gateway
                    .verify_signature(&order.remote_id, &payment_ref, &signature)
                    .await?;
                if !authentic {
                    warn!(
                        "💳 Signature check failed for order {order_id}, treating capture as failure"
                    );
                    self.settle_failure(&order).await?;
                    return Err(BookingError::UpstreamPayment(format!(
                        "signature verification failed for order {order_id}"
                    )));
                }

                let won = self
                    .orders
                    .compare_and_set_status(order_id, OrderStatus::Pending, OrderStatus::Captured)
                    .await?;
                if !won {
                    return self.already_settled(order_id, &order).await;
                }
                let availability = self.confirmations.confirm(&order.lock_id).await?;
                info!("💳 Order {order_id} captured and reconciled");
                Ok(Reconciliation::Applied(availability))
            }
            PaymentOutcome::Failed | PaymentOutcome::Expired => {
                let won = self
                    .orders
                    .compare_and_set_status(order_id, OrderStatus::Pending, OrderStatus::Failed)
                    .await?;
                if !won {
                    return self.already_settled(order_id, &order).await;
                }
                let availability = self.locks.release(&order.lock_id).await?;
                info!("💳 Order {order_id} closed without capture, hold released");
                Ok(Reconciliation::Applied(availability))
            }
        }
    }

    /// Decodes a gateway webhook body and dispatches it to [`Self::reconcile`].
    ///
    /// Unknown event kinds are skipped; the gateway's retry behaviour is
    /// relied upon for delivery of anything that errors here.
    pub async fn handle_webhook(&self, body: &str) -> Result<Option<Reconciliation>> {
        let notice: WebhookNotice = serde_json::from_str(body)
            .map_err(|e| BookingError::Validation(format!("malformed webhook payload: {e}")))?;
        let order_id = OrderId(notice.payload.order_id.clone());
        let outcome = match notice.event.as_str() {
            "payment.captured" => {
                let payment_ref = notice.payload.payment_ref.ok_or_else(|| {
                    BookingError::Validation("captured webhook without payment_ref".to_string())
                })?;
                let signature = notice.payload.signature.ok_or_else(|| {
                    BookingError::Validation("captured webhook without signature".to_string())
                })?;
                PaymentOutcome::Captured {
                    payment_ref,
                    signature,
                }
            }
            "payment.failed" => PaymentOutcome::Failed,
            other => {
                warn!("💳 Ignoring webhook with unknown event kind '{other}'");
                return Ok(None);
            }
        };
        self.reconcile(&order_id, outcome).await.map(Some)
    }

    /// Refunds a captured order on the gateway.
    ///
    /// The seat ledger is untouched: there is no transition out of the
    /// sold state, refunds are purely a payment-side concern.
    pub async fn refund(&self, order_id: &OrderId) -> Result<PaymentOrder> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("order {order_id}")))?;
        if order.status != OrderStatus::Captured {
            return Err(BookingError::Validation(format!(
                "order {order_id} is {}, only captured orders can be refunded",
                order.status
            )));
        }

        self.gateway
            .refund(&order.remote_id, order.amount)
            .await
            .map_err(|e| BookingError::UpstreamPayment(format!("refund failed: {e}")))?;

        let won = self
            .orders
            .compare_and_set_status(order_id, OrderStatus::Captured, OrderStatus::Refunded)
            .await?;
        if !won {
            debug!("💳 Order {order_id} already refunded");
        }
        let refreshed = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("order {order_id}")))?;
        info!("💳 Order {order_id} refunded");
        Ok(refreshed)
    }

    async fn settle_failure(&self, order: &PaymentOrder) -> Result<()> {
        let won = self
            .orders
            .compare_and_set_status(&order.id, OrderStatus::Pending, OrderStatus::Failed)
            .await?;
        if won {
            self.locks.release(&order.lock_id).await?;
        }
        Ok(())
    }

    async fn already_settled(
        &self,
        order_id: &OrderId,
        stale: &PaymentOrder,
    ) -> Result<Reconciliation> {
        let status = match self.orders.get(order_id).await? {
            Some(current) => current.status,
            None => stale.status,
        };
        debug!("💳 Order {order_id} already {status}, skipping ledger");
        Ok(Reconciliation::AlreadySettled { status })
    }
}
