use thiserror::Error;

pub type Result<T> = std::result::Result<T, BookingError>;

/// Errors surfaced by the booking core.
///
/// Ledger-mutation errors are returned synchronously to the caller with
/// enough context to decide between retry and abort.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not enough seats: requested {requested}, {remaining} remaining")]
    InsufficientInventory { requested: u32, remaining: u32 },
    #[error("Nothing to confirm: {0}")]
    NothingToConfirm(String),
    #[error("Payment provider error: {0}")]
    UpstreamPayment(String),
    #[error("Concurrent update conflict on {0}")]
    ConcurrencyConflict(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(Box::new(err))
    }

    /// Whether retrying the same call against fresh state can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}
