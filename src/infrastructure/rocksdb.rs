use crate::domain::booking::{LockId, LockState, OrderId, OrderStatus, PaymentOrder, SeatLock};
use crate::domain::event::{Event, EventId};
use crate::domain::ports::{EventStore, LockStore, OrderStore, Versioned};
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for event records (with their embedded categories).
pub const CF_EVENTS: &str = "events";
/// Column Family for per-booking seat locks.
pub const CF_LOCKS: &str = "locks";
/// Column Family for payment orders.
pub const CF_ORDERS: &str = "orders";

/// A persistent store backed by RocksDB.
///
/// Serves all three ports from one database with a column family per
/// record type, values JSON-encoded. RocksDB has no native compare-and-swap,
/// so every read-check-write cycle runs under a process-wide write mutex;
/// versions tags on event records still catch stale writers that read
/// before the mutex was taken.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_guard: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = vec![
            ColumnFamilyDescriptor::new(CF_EVENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_LOCKS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ORDERS, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&opts, path, cfs).map_err(BookingError::internal)?;
        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            BookingError::internal(std::io::Error::other(format!(
                "column family {name} not found"
            )))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        let bytes = self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(BookingError::internal)?;
        match bytes {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(BookingError::internal)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value).map_err(BookingError::internal)?;
        self.db
            .put_cf(cf, key.as_bytes(), bytes)
            .map_err(BookingError::internal)?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for RocksDbStore {
    async fn insert(&self, event: Event) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        if self
            .read::<Versioned<Event>>(CF_EVENTS, &event.id.0)?
            .is_some()
        {
            return Err(BookingError::Validation(format!(
                "event {} already exists",
                event.id
            )));
        }
        let key = event.id.0.clone();
        self.write(
            CF_EVENTS,
            &key,
            &Versioned {
                version: 0,
                value: event,
            },
        )
    }

    async fn get(&self, id: &EventId) -> Result<Option<Versioned<Event>>> {
        self.read(CF_EVENTS, &id.0)
    }

    async fn update(&self, expected_version: u64, event: Event) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let current: Versioned<Event> = self
            .read(CF_EVENTS, &event.id.0)?
            .ok_or_else(|| BookingError::NotFound(format!("event {}", event.id)))?;
        if current.version != expected_version {
            return Err(BookingError::ConcurrencyConflict(format!(
                "event {}",
                event.id
            )));
        }
        let key = event.id.0.clone();
        self.write(
            CF_EVENTS,
            &key,
            &Versioned {
                version: expected_version + 1,
                value: event,
            },
        )
    }

    async fn all(&self) -> Result<Vec<Versioned<Event>>> {
        let cf = self.cf(CF_EVENTS)?;
        let mut events = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_, bytes) = item.map_err(BookingError::internal)?;
            let event: Versioned<Event> =
                serde_json::from_slice(&bytes).map_err(BookingError::internal)?;
            events.push(event);
        }
        events.sort_by(|a, b| a.value.id.0.cmp(&b.value.id.0));
        Ok(events)
    }
}

#[async_trait]
impl LockStore for RocksDbStore {
    async fn insert(&self, lock: SeatLock) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        if self.read::<SeatLock>(CF_LOCKS, &lock.id.0)?.is_some() {
            return Err(BookingError::Validation(format!(
                "lock {} already exists",
                lock.id
            )));
        }
        let key = lock.id.0.clone();
        self.write(CF_LOCKS, &key, &lock)
    }

    async fn get(&self, id: &LockId) -> Result<Option<SeatLock>> {
        self.read(CF_LOCKS, &id.0)
    }

    async fn compare_and_set_state(
        &self,
        id: &LockId,
        from: LockState,
        to: LockState,
    ) -> Result<bool> {
        let _guard = self.write_guard.lock().await;
        let mut lock: SeatLock = self
            .read(CF_LOCKS, &id.0)?
            .ok_or_else(|| BookingError::NotFound(format!("lock {id}")))?;
        if lock.state != from {
            return Ok(false);
        }
        lock.state = to;
        self.write(CF_LOCKS, &id.0, &lock)?;
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for RocksDbStore {
    async fn insert(&self, order: PaymentOrder) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        if self.read::<PaymentOrder>(CF_ORDERS, &order.id.0)?.is_some() {
            return Err(BookingError::Validation(format!(
                "order {} already exists",
                order.id
            )));
        }
        let key = order.id.0.clone();
        self.write(CF_ORDERS, &key, &order)
    }

    async fn get(&self, id: &OrderId) -> Result<Option<PaymentOrder>> {
        self.read(CF_ORDERS, &id.0)
    }

    async fn compare_and_set_status(
        &self,
        id: &OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let _guard = self.write_guard.lock().await;
        let mut order: PaymentOrder = self
            .read(CF_ORDERS, &id.0)?
            .ok_or_else(|| BookingError::NotFound(format!("order {id}")))?;
        if order.status != from {
            return Ok(false);
        }
        order.status = to;
        order.updated_at = chrono::Utc::now();
        self.write(CF_ORDERS, &id.0, &order)?;
        Ok(true)
    }
}
