use boxoffice::application::confirm::ConfirmationEngine;
use boxoffice::application::coordinator::{CheckoutRequest, PaymentOrderCoordinator, PaymentOutcome};
use boxoffice::application::ledger::SeatLedger;
use boxoffice::application::locks::{LockManager, LockRequest};
use boxoffice::domain::booking::{Amount, LockId, OrderId, Quantity, RequesterId};
use boxoffice::domain::event::{CategoryId, EventId};
use boxoffice::domain::ports::{EventStoreRef, LockStoreRef, OrderStoreRef};
use boxoffice::error::BookingError;
use boxoffice::infrastructure::gateway::OfflineGateway;
use boxoffice::infrastructure::in_memory::{
    InMemoryEventStore, InMemoryLockStore, InMemoryOrderStore,
};
use boxoffice::interfaces::csv::command_reader::{BookingCommand, CommandKind, CommandReader};
use boxoffice::interfaces::csv::snapshot_writer::SnapshotWriter;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input booking commands CSV file
    input: PathBuf,

    /// Currency for payment orders
    #[arg(long, default_value = "INR")]
    currency: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

struct Core {
    ledger: SeatLedger,
    locks: LockManager,
    coordinator: PaymentOrderCoordinator,
    currency: String,
}

fn build_core(
    events: EventStoreRef,
    locks: LockStoreRef,
    orders: OrderStoreRef,
    currency: String,
) -> Core {
    let ledger = SeatLedger::new(events);
    let lock_manager = LockManager::new(ledger.clone(), locks.clone());
    let confirmations = ConfirmationEngine::new(ledger.clone(), locks);
    let coordinator = PaymentOrderCoordinator::new(
        lock_manager.clone(),
        confirmations,
        orders,
        Arc::new(OfflineGateway::new()),
    );
    Core {
        ledger,
        locks: lock_manager,
        coordinator,
        currency,
    }
}

fn require(field: Option<String>, name: &str) -> boxoffice::error::Result<String> {
    field
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BookingError::Validation(format!("missing required field '{name}'")))
}

fn require_qty(field: Option<u32>) -> boxoffice::error::Result<Quantity> {
    let value = field.ok_or_else(|| {
        BookingError::Validation("missing required field 'qty'".to_string())
    })?;
    Quantity::new(value)
}

async fn apply(core: &Core, command: BookingCommand) -> boxoffice::error::Result<()> {
    match command.op {
        CommandKind::Create => {
            let event = EventId(require(command.event, "event")?);
            let category = CategoryId(require(command.category, "category")?);
            let total = require_qty(command.qty)?;
            core.ledger
                .register_category(&event, &category, total.value())
                .await?;
        }
        CommandKind::Archive => {
            let event = EventId(require(command.event, "event")?);
            let category = CategoryId(require(command.category, "category")?);
            core.ledger.archive_category(&event, &category).await?;
        }
        CommandKind::Book => {
            let booking = require(command.booking, "booking")?;
            let amount = command.amount.ok_or_else(|| {
                BookingError::Validation("missing required field 'amount'".to_string())
            })?;
            let request = CheckoutRequest {
                order_id: OrderId(booking.clone()),
                lock: LockRequest {
                    lock_id: LockId(booking),
                    event_id: EventId(require(command.event, "event")?),
                    category_id: CategoryId(require(command.category, "category")?),
                    quantity: require_qty(command.qty)?,
                    requester: RequesterId::from("cli"),
                },
                amount: Amount::new(amount)?,
                currency: core.currency.clone(),
            };
            core.coordinator.checkout(request).await?;
        }
        CommandKind::Capture => {
            let booking = require(command.booking, "booking")?;
            let outcome = PaymentOutcome::Captured {
                payment_ref: format!("pay-{booking}"),
                signature: format!("sig-{booking}"),
            };
            core.coordinator
                .reconcile(&OrderId(booking), outcome)
                .await?;
        }
        CommandKind::Fail => {
            let booking = require(command.booking, "booking")?;
            core.coordinator
                .reconcile(&OrderId(booking), PaymentOutcome::Failed)
                .await?;
        }
        CommandKind::Expire => {
            let booking = require(command.booking, "booking")?;
            core.coordinator
                .reconcile(&OrderId(booking), PaymentOutcome::Expired)
                .await?;
        }
        CommandKind::Cancel => {
            let booking = require(command.booking, "booking")?;
            core.locks.release(&LockId(booking)).await?;
        }
        CommandKind::Refund => {
            let booking = require(command.booking, "booking")?;
            core.coordinator.refund(&OrderId(booking)).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    #[cfg(feature = "storage-rocksdb")]
    let core = if let Some(db_path) = cli.db_path {
        use boxoffice::infrastructure::rocksdb::RocksDbStore;
        let store = RocksDbStore::open(db_path).into_diagnostic()?;
        build_core(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            cli.currency.clone(),
        )
    } else {
        build_core(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryLockStore::new()),
            Arc::new(InMemoryOrderStore::new()),
            cli.currency.clone(),
        )
    };

    #[cfg(not(feature = "storage-rocksdb"))]
    let core = build_core(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(InMemoryLockStore::new()),
        Arc::new(InMemoryOrderStore::new()),
        cli.currency.clone(),
    );

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = apply(&core, command).await {
                    eprintln!("Error processing command: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {e}");
            }
        }
    }

    let snapshots = core.ledger.all_availability().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = SnapshotWriter::new(stdout.lock());
    writer.write_snapshots(snapshots).into_diagnostic()?;

    Ok(())
}
