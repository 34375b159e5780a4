use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::{CategoryId, EventId};

/// A positive number of seats.
///
/// Wrapper around `u32` so a zero or missing quantity is rejected before
/// it ever reaches the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(BookingError::Validation(
                "quantity must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Quantity {
    type Error = BookingError;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A positive monetary amount charged for a booking.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(BookingError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = BookingError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(pub String);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for RequesterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    /// Counted in the category's `locked_seats`.
    Active,
    /// Converted to `seats_sold`; terminal.
    Confirmed,
    /// Seats returned to the pool; terminal.
    Released,
}

/// A temporary claim on seats for one booking attempt.
///
/// Confirm and release operate against this record rather than against the
/// shared counters alone, so one booking's confirmation can never consume
/// seats held by a different concurrent booking in the same category.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SeatLock {
    pub id: LockId,
    pub event_id: EventId,
    pub category_id: CategoryId,
    pub quantity: Quantity,
    pub requester: RequesterId,
    pub state: LockState,
    pub created_at: DateTime<Utc>,
}

impl SeatLock {
    pub fn active(
        id: LockId,
        event_id: EventId,
        category_id: CategoryId,
        quantity: Quantity,
        requester: RequesterId,
    ) -> Self {
        Self {
            id,
            event_id,
            category_id,
            quantity,
            requester,
            state: LockState::Active,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Captured,
    Failed,
    Refunded,
}

impl OrderStatus {
    /// Terminal statuses are set exactly once and never revisited.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Captured => "captured",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

/// The local record of a remote payment order, tied to the lock it secures.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentOrder {
    pub id: OrderId,
    /// The gateway's identifier for this order.
    pub remote_id: String,
    pub amount: Amount,
    pub currency: String,
    pub status: OrderStatus,
    pub lock_id: LockId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentOrder {
    pub fn pending(
        id: OrderId,
        remote_id: String,
        amount: Amount,
        currency: impl Into<String>,
        lock_id: LockId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            remote_id,
            amount,
            currency: currency.into(),
            status: OrderStatus::Pending,
            lock_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quantity_validation() {
        assert!(Quantity::new(1).is_ok());
        assert!(matches!(
            Quantity::new(0),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(10.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_order_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Captured.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
    }

    #[test]
    fn test_new_lock_is_active() {
        let lock = SeatLock::active(
            LockId::from("bk-1"),
            EventId::from("ev-1"),
            CategoryId::from("premium"),
            Quantity::new(2).unwrap(),
            RequesterId::from("user-1"),
        );
        assert_eq!(lock.state, LockState::Active);
    }
}
