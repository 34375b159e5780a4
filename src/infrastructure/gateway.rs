use crate::domain::booking::Amount;
use crate::domain::ports::{PaymentGateway, RemoteOrder};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A gateway stand-in for local replay and tests.
///
/// Issues deterministic remote order ids and treats any non-empty
/// signature as authentic. `rejecting()` builds a variant whose remote
/// order creation always fails, for exercising the auto-release path.
#[derive(Default)]
pub struct OfflineGateway {
    counter: AtomicU64,
    reject_orders: bool,
}

impl OfflineGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose `create_remote_order` always fails.
    pub fn rejecting() -> Self {
        Self {
            counter: AtomicU64::new(0),
            reject_orders: true,
        }
    }
}

#[async_trait]
impl PaymentGateway for OfflineGateway {
    async fn create_remote_order(
        &self,
        _amount: Amount,
        _currency: &str,
        _metadata: &HashMap<String, String>,
    ) -> Result<RemoteOrder> {
        if self.reject_orders {
            return Err(BookingError::UpstreamPayment(
                "gateway declined order creation".to_string(),
            ));
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(RemoteOrder {
            remote_id: format!("remote-{n}"),
        })
    }

    async fn verify_signature(
        &self,
        _order_ref: &str,
        _payment_ref: &str,
        signature: &str,
    ) -> Result<bool> {
        Ok(!signature.is_empty())
    }

    async fn refund(&self, _remote_id: &str, _amount: Amount) -> Result<()> {
        Ok(())
    }
}
