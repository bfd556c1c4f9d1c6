//! Dining Table Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Table status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    Cleaning,
    Unavailable,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "AVAILABLE"),
            Self::Occupied => write!(f, "OCCUPIED"),
            Self::Reserved => write!(f, "RESERVED"),
            Self::Cleaning => write!(f, "CLEANING"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

/// Dining table entity (桌台)
///
/// `current_booking_id` is a back-reference, not an ownership edge:
/// it is non-null iff status is OCCUPIED or RESERVED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiningTable {
    pub id: i64,
    pub name: String,
    pub capacity: i64,
    pub status: TableStatus,
    pub current_booking_id: Option<i64>,
    /// When the current party was seated (Unix millis)
    pub seated_at: Option<i64>,
    pub is_active: bool,
}

impl DiningTable {
    /// Whether a party of `party_size` physically fits at this table.
    pub fn fits(&self, party_size: i64) -> bool {
        self.capacity >= party_size
    }
}

/// Create dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableCreate {
    pub name: String,
    pub capacity: Option<i64>,
}

/// Update dining table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiningTableUpdate {
    pub name: Option<String>,
    pub capacity: Option<i64>,
    pub is_active: Option<bool>,
}
