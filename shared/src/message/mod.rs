//! Waitlist domain event definitions
//!
//! These types are shared between the waitlist edge server and push
//! clients. The core only guarantees *when* an event is emitted; the
//! transport (SSE/WebSocket relay) is a separate layer that subscribes
//! to the server's broadcast channel.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, DiningTable, TableStatus};
use crate::util::now_millis;

/// Per-party-size wait estimate entry for `wait_time_update` payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitTimeEntry {
    pub party_size: i64,
    /// Internal point estimate (minutes)
    pub minutes: i64,
    /// Guest-facing display bracket (minutes)
    pub range_low: i64,
    pub range_high: i64,
}

/// Typed event payloads
///
/// Serialized as `{"type": "...", "payload": {...}}` inside the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WaitlistEventKind {
    /// A guest checked in and joined the queue
    NewBooking { booking: Booking },
    /// A booking moved to a new lifecycle status
    BookingStatusChange {
        booking_id: i64,
        status: BookingStatus,
        booking: Booking,
    },
    /// A table moved to a new status
    TableStatusChange {
        table_id: i64,
        status: TableStatus,
        table: DiningTable,
    },
    /// Recomputed wait estimates for display boards
    WaitTimeUpdate { estimates: Vec<WaitTimeEntry> },
    /// An outbound guest message was sent (or attempted)
    NewMessage {
        booking_id: Option<i64>,
        phone_number: String,
        body: String,
    },
}

impl fmt::Display for WaitlistEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewBooking { .. } => write!(f, "new_booking"),
            Self::BookingStatusChange { .. } => write!(f, "booking_status_change"),
            Self::TableStatusChange { .. } => write!(f, "table_status_change"),
            Self::WaitTimeUpdate { .. } => write!(f, "wait_time_update"),
            Self::NewMessage { .. } => write!(f, "new_message"),
        }
    }
}

/// Domain event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEvent {
    pub event_id: Uuid,
    pub restaurant_id: String,
    /// Emission time (Unix millis)
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: WaitlistEventKind,
}

impl WaitlistEvent {
    pub fn new(restaurant_id: impl Into<String>, kind: WaitlistEventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            restaurant_id: restaurant_id.into(),
            timestamp: now_millis(),
            kind,
        }
    }

    /// 新候位事件
    pub fn new_booking(restaurant_id: &str, booking: &Booking) -> Self {
        Self::new(
            restaurant_id,
            WaitlistEventKind::NewBooking {
                booking: booking.clone(),
            },
        )
    }

    /// 候位状态变更事件
    pub fn booking_changed(restaurant_id: &str, booking: &Booking) -> Self {
        Self::new(
            restaurant_id,
            WaitlistEventKind::BookingStatusChange {
                booking_id: booking.id,
                status: booking.status,
                booking: booking.clone(),
            },
        )
    }

    /// 桌台状态变更事件
    pub fn table_changed(restaurant_id: &str, table: &DiningTable) -> Self {
        Self::new(
            restaurant_id,
            WaitlistEventKind::TableStatusChange {
                table_id: table.id,
                status: table.status,
                table: table.clone(),
            },
        )
    }

    pub fn wait_times(restaurant_id: &str, estimates: Vec<WaitTimeEntry>) -> Self {
        Self::new(restaurant_id, WaitlistEventKind::WaitTimeUpdate { estimates })
    }

    pub fn guest_message(
        restaurant_id: &str,
        booking_id: Option<i64>,
        phone_number: &str,
        body: &str,
    ) -> Self {
        Self::new(
            restaurant_id,
            WaitlistEventKind::NewMessage {
                booking_id,
                phone_number: phone_number.to_string(),
                body: body.to_string(),
            },
        )
    }
}
