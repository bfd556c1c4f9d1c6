//! Repository Module
//!
//! Function-style CRUD operations over the SQLite pool. Status-changing
//! writes are atomic update-if-status-equals guards; the caller decides
//! what a `false` (no row matched) means.

pub mod booking;
pub mod dining_table;
pub mod duration_profile;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
