use crate::db::repository::RepoError;
use shared::models::BookingStatus;
use thiserror::Error;

/// Waitlist transition errors
///
/// Validation and consistency violations are reported before any
/// mutation; callers retry consistency errors with fresh state.
#[derive(Debug, Error)]
pub enum WaitlistError {
    #[error("Booking not found: {0}")]
    BookingNotFound(i64),

    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Table is not available: {0}")]
    TableUnavailable(String),

    #[error("Table seats {capacity}, party is {party_size}")]
    CapacityExceeded { capacity: i64, party_size: i64 },

    #[error("A table is required to seat this party")]
    TableRequired,

    #[error("Booking {0} was modified concurrently, reload and retry")]
    StaleStatus(i64),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result type for waitlist operations
pub type WaitlistResult<T> = Result<T, WaitlistError>;
