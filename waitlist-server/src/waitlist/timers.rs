//! Notification timer pairs
//!
//! Each NOTIFIED booking owns exactly two scheduled tasks: a follow-up
//! reminder and an automatic cancellation. The registry is a keyed map
//! with an explicit lifecycle — insert on arm, remove on disarm/fire,
//! drained on shutdown — never a fire-and-forget callback.
//!
//! Cancel-wins contract: once [`NotificationTimers::disarm`] returns, the
//! token is cancelled, so a pending sleep can no longer win its select
//! (the cancellation branch is biased first). A body that already passed
//! the sleep re-checks booking status under the manager's transition
//! lock before producing any side effect.

use std::sync::Weak;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::manager::WaitlistManager;

/// The two cancellable tasks tied to one NOTIFIED booking
struct TimerPair {
    token: CancellationToken,
    follow_up: JoinHandle<()>,
    auto_cancel: JoinHandle<()>,
}

/// Keyed registry of per-booking timer pairs
#[derive(Default)]
pub struct NotificationTimers {
    entries: DashMap<i64, TimerPair>,
}

impl NotificationTimers {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Arm the follow-up/auto-cancel pair for a booking.
    ///
    /// Idempotent-by-replacement: an existing pair is cancelled before
    /// the new one is installed, so a booking never has two live pairs.
    pub fn arm(
        &self,
        booking_id: i64,
        manager: Weak<WaitlistManager>,
        follow_up_delay: Duration,
        grace_period: Duration,
    ) {
        if self.disarm(booking_id) {
            tracing::debug!(booking_id, "Replacing existing timer pair");
        }

        let token = CancellationToken::new();

        let follow_token = token.clone();
        let follow_manager = manager.clone();
        let follow_up = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = follow_token.cancelled() => {}
                _ = tokio::time::sleep(follow_up_delay) => {
                    let Some(manager) = follow_manager.upgrade() else { return };
                    if let Err(e) = manager.follow_up_fired(booking_id).await {
                        tracing::error!(booking_id, error = %e, "Follow-up timer body failed");
                    }
                }
            }
        });

        let cancel_token = token.clone();
        let auto_cancel = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {}
                _ = tokio::time::sleep(grace_period) => {
                    let Some(manager) = manager.upgrade() else { return };
                    if let Err(e) = manager.auto_cancel_fired(booking_id).await {
                        tracing::error!(booking_id, error = %e, "Auto-cancel timer body failed");
                    }
                }
            }
        });

        self.entries.insert(
            booking_id,
            TimerPair {
                token,
                follow_up,
                auto_cancel,
            },
        );
        tracing::debug!(booking_id, "Armed follow-up and auto-cancel timers");
    }

    /// Cancel both tasks of a booking's pair.
    ///
    /// Returns whether a pair was registered. The token is cancelled
    /// before this returns; running bodies are defused by their status
    /// re-check rather than aborted (a body may be the caller).
    pub fn disarm(&self, booking_id: i64) -> bool {
        match self.entries.remove(&booking_id) {
            Some((_, pair)) => {
                pair.token.cancel();
                tracing::debug!(booking_id, "Disarmed timer pair");
                true
            }
            None => false,
        }
    }

    /// Number of bookings with live timer pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cancel every registered pair and wait for the tasks to settle.
    ///
    /// Called once on shutdown; no timer side effect may run after this
    /// returns.
    pub async fn drain(&self) {
        if self.entries.is_empty() {
            return;
        }

        let ids: Vec<i64> = self.entries.iter().map(|e| *e.key()).collect();
        let count = ids.len();

        for id in ids {
            if let Some((_, pair)) = self.entries.remove(&id) {
                pair.token.cancel();
                let _ = pair.follow_up.await;
                let _ = pair.auto_cancel.await;
            }
        }

        tracing::info!(count, "Drained notification timers");
    }
}
