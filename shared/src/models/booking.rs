//! Booking Model (候位记录)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Booking lifecycle status
///
/// The status enum is the single transition gate; every mutation goes
/// through the waitlist manager's transition functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum BookingStatus {
    #[default]
    Waiting,
    Notified,
    Confirmed,
    Seated,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Terminal states cannot be transitioned out of.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// States that count toward the waiting queue simulation.
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Waiting | Self::Notified | Self::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Notified => write!(f, "NOTIFIED"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Seated => write!(f, "SEATED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

/// Who triggered a cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CancelActor {
    Guest,
    Staff,
    System,
}

impl fmt::Display for CancelActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => write!(f, "GUEST"),
            Self::Staff => write!(f, "STAFF"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

/// Walk-in booking record
///
/// Created on guest check-in; mutated exclusively through the waitlist
/// manager; retired soft via status, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: i64,
    pub guest_name: String,
    pub phone_number: String,
    pub party_size: i64,
    pub status: BookingStatus,
    /// Wait estimate quoted at check-in (minutes)
    pub quoted_wait_minutes: i64,
    /// Estimated seating time computed at check-in (Unix millis)
    pub estimated_seating_time: Option<i64>,
    /// Bound table, set at notify (pre-assignment) or seat time
    pub table_id: Option<i64>,
    pub notification_sent_at: Option<i64>,
    pub confirmation_received_at: Option<i64>,
    pub seated_at: Option<i64>,
    /// Predicted end of occupancy, stamped at seat time (Unix millis)
    pub expected_end_time: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<CancelActor>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Check-in payload — creates a WAITING booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreate {
    pub guest_name: String,
    pub phone_number: String,
    pub party_size: i64,
}
