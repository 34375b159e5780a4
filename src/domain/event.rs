use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::booking::Quantity;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Open,
    SoldOut,
    Inactive,
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::SoldOut => "sold_out",
            Self::Inactive => "inactive",
        };
        write!(f, "{s}")
    }
}

/// A point-in-time view of one seating category's counters.
///
/// `remaining` and `status` are derived, never persisted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Availability {
    pub event_id: EventId,
    pub category_id: CategoryId,
    pub total_seats: u32,
    pub locked_seats: u32,
    pub seats_sold: u32,
    pub remaining: u32,
    pub status: CategoryStatus,
}

/// A named class of seats within an event with its own capacity pool.
///
/// Counters are mutated exclusively through the lock manager and the
/// confirmation engine; after every mutation the core invariant
/// `seats_sold + locked_seats <= total_seats` holds.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SeatingCategory {
    /// Identifier of the seat class, e.g. "premium".
    pub id: CategoryId,
    /// Capacity, fixed at creation.
    pub total_seats: u32,
    /// Seats currently reserved pending payment.
    pub locked_seats: u32,
    /// Seats permanently confirmed.
    pub seats_sold: u32,
    /// Whether the category currently accepts bookings.
    pub is_active: bool,
}

impl SeatingCategory {
    pub fn new(id: CategoryId, total_seats: u32) -> Self {
        Self {
            id,
            total_seats,
            locked_seats: 0,
            seats_sold: 0,
            is_active: true,
        }
    }

    /// Seats neither sold nor locked.
    pub fn remaining(&self) -> u32 {
        self.total_seats - self.seats_sold - self.locked_seats
    }

    pub fn status(&self) -> CategoryStatus {
        if !self.is_active {
            CategoryStatus::Inactive
        } else if self.remaining() == 0 {
            CategoryStatus::SoldOut
        } else {
            CategoryStatus::Open
        }
    }

    pub fn snapshot(&self, event_id: &EventId) -> Availability {
        Availability {
            event_id: event_id.clone(),
            category_id: self.id.clone(),
            total_seats: self.total_seats,
            locked_seats: self.locked_seats,
            seats_sold: self.seats_sold,
            remaining: self.remaining(),
            status: self.status(),
        }
    }

    /// Reserves `quantity` seats pending payment.
    pub fn lock(&mut self, quantity: Quantity) -> Result<()> {
        if !self.is_active {
            return Err(BookingError::Validation(format!(
                "category {} is not accepting bookings",
                self.id
            )));
        }
        let requested = quantity.value();
        let remaining = self.remaining();
        if remaining < requested {
            return Err(BookingError::InsufficientInventory {
                requested,
                remaining,
            });
        }
        self.locked_seats += requested;
        debug_assert!(self.seats_sold + self.locked_seats <= self.total_seats);
        Ok(())
    }

    /// Converts `quantity` locked seats into sold seats.
    pub fn confirm(&mut self, quantity: Quantity) -> Result<()> {
        let requested = quantity.value();
        if self.locked_seats < requested {
            return Err(BookingError::NothingToConfirm(format!(
                "category {} has {} locked seats, {} requested",
                self.id, self.locked_seats, requested
            )));
        }
        self.locked_seats -= requested;
        self.seats_sold += requested;
        debug_assert!(self.seats_sold + self.locked_seats <= self.total_seats);
        Ok(())
    }

    /// Returns `quantity` locked seats to the pool, clamping at zero so a
    /// duplicate or late release can never drive the counter negative.
    pub fn release(&mut self, quantity: Quantity) {
        self.locked_seats = self.locked_seats.saturating_sub(quantity.value());
        debug_assert!(self.seats_sold + self.locked_seats <= self.total_seats);
    }

    /// Stops accepting bookings without touching existing sales.
    pub fn archive(&mut self) {
        self.is_active = false;
    }
}

/// An event with its embedded seating categories.
///
/// The event record is the single source of truth for seat counts; all
/// counter mutations are read-modify-write cycles against it so the
/// invariant stays enforceable within one atomic update.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub categories: Vec<SeatingCategory>,
}

impl Event {
    pub fn new(id: EventId, name: impl Into<String>, starts_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            starts_at,
            categories: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: SeatingCategory) -> Self {
        self.categories.push(category);
        self
    }

    pub fn category(&self, id: &CategoryId) -> Option<&SeatingCategory> {
        self.categories.iter().find(|c| &c.id == id)
    }

    pub fn category_mut(&mut self, id: &CategoryId) -> Option<&mut SeatingCategory> {
        self.categories.iter_mut().find(|c| &c.id == id)
    }
}
