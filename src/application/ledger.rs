use crate::domain::event::{Availability, CategoryId, EventId, SeatingCategory};
use crate::domain::ports::EventStoreRef;
use crate::error::{BookingError, Result};
use log::debug;

/// How many times a lost optimistic-concurrency race is retried against
/// fresh state before the conflict is surfaced to the caller.
const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Authoritative view over per-category seat counters.
///
/// All counter mutations go through [`SeatLedger::mutate_category`], a
/// load/apply/conditionally-persist cycle retried on version conflicts so
/// that two writers racing for the same category can never interleave in a
/// way that violates `seats_sold + locked_seats <= total_seats`.
#[derive(Clone)]
pub struct SeatLedger {
    events: EventStoreRef,
}

impl SeatLedger {
    pub fn new(events: EventStoreRef) -> Self {
        Self { events }
    }

    /// Current counters for one category. No side effects.
    pub async fn availability(
        &self,
        event_id: &EventId,
        category_id: &CategoryId,
    ) -> Result<Availability> {
        let versioned = self
            .events
            .get(event_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("event {event_id}")))?;
        let category = versioned.value.category(category_id).ok_or_else(|| {
            BookingError::NotFound(format!("category {category_id} in event {event_id}"))
        })?;
        Ok(category.snapshot(event_id))
    }

    /// Snapshots for every category of every known event.
    pub async fn all_availability(&self) -> Result<Vec<Availability>> {
        let events = self.events.all().await?;
        let mut snapshots = Vec::new();
        for versioned in events {
            let event = versioned.value;
            for category in &event.categories {
                snapshots.push(category.snapshot(&event.id));
            }
        }
        Ok(snapshots)
    }

    /// Registers a category, creating the event record on first use.
    ///
    /// Capacity is fixed here; it is never changed afterwards.
    pub async fn register_category(
        &self,
        event_id: &EventId,
        category_id: &CategoryId,
        total_seats: u32,
    ) -> Result<Availability> {
        use crate::domain::event::Event;
        use chrono::Utc;

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            match self.events.get(event_id).await? {
                None => {
                    let category = SeatingCategory::new(category_id.clone(), total_seats);
                    let snapshot = category.snapshot(event_id);
                    let event = Event::new(event_id.clone(), event_id.0.clone(), Utc::now())
                        .with_category(category);
                    match self.events.insert(event).await {
                        Ok(()) => return Ok(snapshot),
                        // Another writer created the event first; retry as an update.
                        Err(BookingError::Validation(_)) if attempt < MAX_UPDATE_ATTEMPTS => {}
                        Err(e) => return Err(e),
                    }
                }
                Some(versioned) => {
                    let mut event = versioned.value;
                    if event.category(category_id).is_some() {
                        return Err(BookingError::Validation(format!(
                            "category {category_id} already exists in event {event_id}"
                        )));
                    }
                    let category = SeatingCategory::new(category_id.clone(), total_seats);
                    let snapshot = category.snapshot(event_id);
                    event.categories.push(category);
                    match self.events.update(versioned.version, event).await {
                        Ok(()) => return Ok(snapshot),
                        Err(e) if e.is_retryable() && attempt < MAX_UPDATE_ATTEMPTS => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Err(BookingError::ConcurrencyConflict(format!(
            "{event_id}/{category_id}"
        )))
    }

    /// Stops a category from accepting bookings. Sales and outstanding
    /// locks are untouched; categories with sales are archived, never
    /// deleted.
    pub async fn archive_category(
        &self,
        event_id: &EventId,
        category_id: &CategoryId,
    ) -> Result<Availability> {
        self.mutate_category(event_id, category_id, |category| {
            category.archive();
            Ok(())
        })
        .await
    }

    /// Applies `apply` to one category as a single atomic unit with respect
    /// to other concurrent mutations of the same category.
    ///
    /// Errors from `apply` abort the cycle without persisting anything.
    pub(crate) async fn mutate_category<F>(
        &self,
        event_id: &EventId,
        category_id: &CategoryId,
        apply: F,
    ) -> Result<Availability>
    where
        F: Fn(&mut SeatingCategory) -> Result<()> + Send + Sync,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let versioned = self
                .events
                .get(event_id)
                .await?
                .ok_or_else(|| BookingError::NotFound(format!("event {event_id}")))?;
            let mut event = versioned.value;
            let category = event.category_mut(category_id).ok_or_else(|| {
                BookingError::NotFound(format!("category {category_id} in event {event_id}"))
            })?;
            apply(category)?;
            let snapshot = category.snapshot(event_id);
            match self.events.update(versioned.version, event).await {
                Ok(()) => return Ok(snapshot),
                Err(e) if e.is_retryable() && attempt < MAX_UPDATE_ATTEMPTS => {
                    debug!(
                        "📒 Lost update race on {event_id}/{category_id} (attempt {attempt}), retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(BookingError::ConcurrencyConflict(format!(
            "{event_id}/{category_id}"
        )))
    }
}
