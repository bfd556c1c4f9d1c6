//! Data models
//!
//! Shared between the waitlist edge server and frontends (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), all timestamps are
//! Unix millis UTC.

pub mod booking;
pub mod dining_table;
pub mod duration_profile;

// Re-exports
pub use booking::*;
pub use dining_table::*;
pub use duration_profile::*;
