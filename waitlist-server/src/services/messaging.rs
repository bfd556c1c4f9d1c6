//! Messaging Gateway
//!
//! Seam to the external SMS transport. The waitlist core treats sends as
//! fire-and-forget: a failed send is logged and surfaced as a warning,
//! never as a transition failure. Caller-level retry lives outside.

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Gateway send failure
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Receipt for an accepted outbound message
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: String,
}

/// Outbound guest messaging seam
///
/// Implementations must not retry internally; the core logs failures and
/// moves on.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send(&self, phone_number: &str, body: &str) -> Result<SendReceipt, GatewayError>;
}

/// Default gateway: logs the message instead of delivering it.
///
/// Used when no real transport is wired up (development, demos).
pub struct ConsoleGateway;

#[async_trait]
impl MessagingGateway for ConsoleGateway {
    async fn send(&self, phone_number: &str, body: &str) -> Result<SendReceipt, GatewayError> {
        tracing::info!(phone = %phone_number, body = %body, "SMS (console gateway)");
        Ok(SendReceipt {
            message_id: Uuid::new_v4().to_string(),
        })
    }
}

/// Recorded outbound message (test gateway)
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub phone_number: String,
    pub body: String,
}

/// In-process gateway that records every send, for tests.
#[derive(Default)]
pub struct MemoryGateway {
    sent: Mutex<Vec<SentMessage>>,
    fail: Mutex<bool>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (delivery-failure paths)
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock() = failing;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl MessagingGateway for MemoryGateway {
    async fn send(&self, phone_number: &str, body: &str) -> Result<SendReceipt, GatewayError> {
        if *self.fail.lock() {
            return Err(GatewayError::Transport("memory gateway set to fail".into()));
        }
        self.sent.lock().push(SentMessage {
            phone_number: phone_number.to_string(),
            body: body.to_string(),
        });
        Ok(SendReceipt {
            message_id: Uuid::new_v4().to_string(),
        })
    }
}
