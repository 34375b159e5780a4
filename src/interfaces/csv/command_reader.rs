use crate::error::{BookingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Register a category with `qty` total seats.
    Create,
    /// Archive a category so it stops accepting bookings.
    Archive,
    /// Acquire a hold and open a payment order against it.
    Book,
    /// Gateway reported the payment captured.
    Capture,
    /// Gateway reported the payment failed.
    Fail,
    /// The payment window elapsed (expiry sweep).
    Expire,
    /// Client cancelled before paying.
    Cancel,
    /// Refund a captured order.
    Refund,
}

/// One row of a booking replay file.
///
/// Columns: `op, event, category, booking, qty, amount`. Which fields are
/// required depends on the op; unused columns are left empty.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct BookingCommand {
    pub op: CommandKind,
    pub event: Option<String>,
    pub category: Option<String>,
    pub booking: Option<String>,
    pub qty: Option<u32>,
    pub amount: Option<Decimal>,
}

/// Reads booking commands from a CSV source.
///
/// Wraps `csv::Reader` and provides an iterator over `Result<BookingCommand>`,
/// trimming whitespace and tolerating short rows.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes commands, so
    /// large replay files stream without loading fully into memory.
    pub fn commands(self) -> impl Iterator<Item = Result<BookingCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BookingError::from))
    }
}
