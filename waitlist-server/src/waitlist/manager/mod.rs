//! WaitlistManager - the booking state machine
//!
//! Single mutation choke point for Booking and Table records. Every
//! lifecycle transition validates its preconditions, applies the guarded
//! repository write, and only then produces outward effects (events,
//! guest messages, timer arm/disarm).
//!
//! # Transition Flow
//!
//! ```text
//! check_in / notify / seat / cancel / complete / guest reply
//!     ├─ 1. Acquire the venue transition lock
//!     ├─ 2. Load fresh state, validate preconditions (typed errors)
//!     ├─ 3. Guarded repository write (WHERE status = expected)
//!     ├─ 4. Arm/disarm notification timers
//!     ├─ 5. Release the lock
//!     ├─ 6. Emit domain events
//!     └─ 7. Best-effort guest message (never blocks the transition)
//! ```
//!
//! Concurrent transitions on the same booking serialize on the lock;
//! whoever loses re-validates against a terminal/changed status and gets
//! a typed stale-state error instead of a double apply.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::{Mutex, broadcast};

use shared::message::{WaitTimeEntry, WaitlistEvent};
use shared::models::{
    Booking, BookingCreate, BookingStatus, CancelActor, DiningTable, PartyDurationProfile,
    TableStatus,
};
use shared::util::now_millis;

use crate::core::Config;
use crate::db::repository::{booking, dining_table, duration_profile};
use crate::services::{MessagingGateway, templates};
use crate::waitlist::estimator::{self, WaitEstimate};
use crate::waitlist::timeline;
use crate::waitlist::timers::NotificationTimers;
use crate::waitlist::{WaitlistError, WaitlistResult};

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;

const MIN_MS: i64 = 60_000;

/// Waitlist state machine
///
/// Owns the transition lock, the notification timer registry and the
/// domain event channel. Constructed once per venue.
pub struct WaitlistManager {
    pool: SqlitePool,
    config: Config,
    gateway: Arc<dyn MessagingGateway>,
    timers: NotificationTimers,
    event_tx: broadcast::Sender<WaitlistEvent>,
    /// 单店事务锁：所有 Booking/Table 变更在此串行化
    transition_lock: Mutex<()>,
}

impl std::fmt::Debug for WaitlistManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitlistManager")
            .field("restaurant_id", &self.config.restaurant_id)
            .field("armed_timers", &self.timers.len())
            .finish()
    }
}

impl WaitlistManager {
    /// Create a new manager for one venue
    pub fn new(pool: SqlitePool, config: Config, gateway: Arc<dyn MessagingGateway>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            pool,
            config,
            gateway,
            timers: NotificationTimers::new(),
            event_tx,
            transition_lock: Mutex::new(()),
        })
    }

    /// Subscribe to domain events (push layer seam)
    pub fn subscribe(&self) -> broadcast::Receiver<WaitlistEvent> {
        self.event_tx.subscribe()
    }

    /// Number of bookings with live timer pairs (introspection/tests)
    pub fn armed_timer_count(&self) -> usize {
        self.timers.len()
    }

    /// 排空定时器，进程关闭前调用
    pub async fn shutdown(&self) {
        self.timers.drain().await;
        tracing::info!("Waitlist manager shut down");
    }

    // ========== Queries ==========

    /// The current queue, oldest first
    pub async fn queue(&self) -> WaitlistResult<Vec<Booking>> {
        Ok(booking::find_queue(&self.pool).await?)
    }

    /// Estimate the wait for a party size against fresh state.
    ///
    /// Profile-store failures degrade to the fixed default duration; the
    /// estimate itself never fails for "no compatible table" (fixed
    /// fallback minutes instead).
    pub async fn estimate_wait(&self, party_size: i64) -> WaitlistResult<WaitEstimate> {
        let (slots, _) = self.simulated_timeline().await?;
        Ok(estimator::estimate_wait(
            &slots,
            party_size,
            self.config.no_table_fallback_min,
            now_millis(),
        ))
    }

    /// Recompute estimates for every party size up to the largest active
    /// table and broadcast a `wait_time_update` event.
    pub async fn broadcast_wait_times(&self) -> WaitlistResult<()> {
        let (slots, tables) = self.simulated_timeline().await?;
        let now = now_millis();

        let max_capacity = tables
            .iter()
            .filter(|t| t.status != TableStatus::Unavailable)
            .map(|t| t.capacity)
            .max()
            .unwrap_or(0);

        let estimates: Vec<WaitTimeEntry> = (1..=max_capacity)
            .map(|size| {
                estimator::estimate_wait(&slots, size, self.config.no_table_fallback_min, now)
                    .entry()
            })
            .collect();

        self.emit(WaitlistEvent::wait_times(
            &self.config.restaurant_id,
            estimates,
        ));
        Ok(())
    }

    /// Fresh tables/profiles/queue → post-simulation timeline.
    async fn simulated_timeline(&self) -> WaitlistResult<(Vec<timeline::TableSlot>, Vec<DiningTable>)> {
        let tables = dining_table::find_all_active(&self.pool).await?;
        let profiles = self.load_profiles().await;
        let queue = booking::find_queue(&self.pool).await?;

        let now = now_millis();
        let mut slots = timeline::build_timeline(&tables, &profiles, &self.config, now);
        timeline::simulate_queue(&mut slots, &queue, &profiles, &self.config, now);
        Ok((slots, tables))
    }

    /// Profile reads degrade to the empty set; estimation never breaks
    /// on a profile-store hiccup.
    async fn load_profiles(&self) -> Vec<PartyDurationProfile> {
        match duration_profile::find_all(&self.pool).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!(error = %e, "Profile lookup failed, using default durations");
                Vec::new()
            }
        }
    }

    // ========== Transitions ==========

    /// Guest check-in: create a WAITING booking with the current quote.
    pub async fn check_in(&self, data: BookingCreate) -> WaitlistResult<Booking> {
        if data.party_size < 1 {
            return Err(WaitlistError::Validation(format!(
                "Invalid party size: {}",
                data.party_size
            )));
        }

        let estimate = self.estimate_wait(data.party_size).await?;

        let created = {
            let _guard = self.transition_lock.lock().await;
            booking::create(
                &self.pool,
                &data,
                estimate.minutes,
                Some(now_millis() + estimate.minutes * MIN_MS),
            )
            .await?
        };

        self.emit(WaitlistEvent::new_booking(
            &self.config.restaurant_id,
            &created,
        ));
        if let Err(e) = self.broadcast_wait_times().await {
            tracing::warn!(error = %e, "Wait-time broadcast after check-in failed");
        }

        let body = templates::check_in(
            &created.guest_name,
            created.party_size,
            &self.config.restaurant_name,
            estimate.range_low,
            estimate.range_high,
        );
        self.send_guest_message(Some(created.id), &created.phone_number, &body)
            .await;

        Ok(created)
    }

    /// Staff announce a table: WAITING -> NOTIFIED, optionally
    /// pre-assigning an AVAILABLE table (moved to RESERVED).
    ///
    /// Arms the follow-up/auto-cancel timer pair.
    pub async fn notify(
        self: &Arc<Self>,
        booking_id: i64,
        table_id: Option<i64>,
    ) -> WaitlistResult<Booking> {
        let (notified, reserved_table) = {
            let _guard = self.transition_lock.lock().await;

            let current = self.load_booking(booking_id).await?;
            if current.status != BookingStatus::Waiting {
                return Err(WaitlistError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Notified,
                });
            }

            // Reserve the pre-assigned table first; a booking must never
            // point at a table that was not actually taken for it.
            let mut reserved: Option<DiningTable> = None;
            if let Some(tid) = table_id {
                let table = self.load_table(tid).await?;
                if table.status != TableStatus::Available {
                    return Err(WaitlistError::TableUnavailable(format!(
                        "Table {} is {}",
                        table.name, table.status
                    )));
                }
                let flipped = dining_table::update_status_if(
                    &self.pool,
                    tid,
                    TableStatus::Available,
                    TableStatus::Reserved,
                    Some(booking_id),
                    None,
                )
                .await?;
                if !flipped {
                    return Err(WaitlistError::TableUnavailable(format!(
                        "Table {} was taken concurrently",
                        table.name
                    )));
                }
                reserved = dining_table::find_by_id(&self.pool, tid).await?;
            }

            let now = now_millis();
            let updated = booking::mark_notified(&self.pool, booking_id, table_id, now).await?;
            if !updated {
                // Undo the reservation before reporting the lost race.
                if let Some(tid) = table_id {
                    let _ = dining_table::update_status_if(
                        &self.pool,
                        tid,
                        TableStatus::Reserved,
                        TableStatus::Available,
                        None,
                        None,
                    )
                    .await;
                }
                return Err(WaitlistError::StaleStatus(booking_id));
            }

            let notified = self.load_booking(booking_id).await?;

            // Arm under the lock so a racing cancel cannot observe
            // NOTIFIED without timers.
            self.timers.arm(
                booking_id,
                Arc::downgrade(self),
                Duration::from_millis(self.config.follow_up_delay_ms),
                Duration::from_millis(self.config.grace_period_ms),
            );

            (notified, reserved)
        };

        self.emit(WaitlistEvent::booking_changed(
            &self.config.restaurant_id,
            &notified,
        ));
        if let Some(table) = &reserved_table {
            self.emit(WaitlistEvent::table_changed(
                &self.config.restaurant_id,
                table,
            ));
        }

        let body = templates::table_ready(
            &notified.guest_name,
            &self.config.restaurant_name,
            self.config.grace_period_min(),
        );
        self.send_guest_message(Some(notified.id), &notified.phone_number, &body)
            .await;

        Ok(notified)
    }

    /// NOTIFIED -> CONFIRMED (guest affirmative reply or staff action)
    pub async fn confirm(&self, booking_id: i64) -> WaitlistResult<Booking> {
        let confirmed = {
            let _guard = self.transition_lock.lock().await;

            let current = self.load_booking(booking_id).await?;
            if current.status != BookingStatus::Notified {
                return Err(WaitlistError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Confirmed,
                });
            }

            let updated = booking::mark_confirmed(&self.pool, booking_id, now_millis()).await?;
            if !updated {
                return Err(WaitlistError::StaleStatus(booking_id));
            }

            self.timers.disarm(booking_id);
            self.load_booking(booking_id).await?
        };

        self.emit(WaitlistEvent::booking_changed(
            &self.config.restaurant_id,
            &confirmed,
        ));
        Ok(confirmed)
    }

    /// Seat a party: WAITING/NOTIFIED/CONFIRMED -> SEATED.
    ///
    /// The target table must be AVAILABLE (or RESERVED for this same
    /// booking) and large enough; violations are typed errors and leave
    /// every record untouched.
    pub async fn seat(&self, booking_id: i64, table_id: Option<i64>) -> WaitlistResult<Booking> {
        let (seated, table) = {
            let _guard = self.transition_lock.lock().await;

            let current = self.load_booking(booking_id).await?;
            if !current.status.is_queued() {
                return Err(WaitlistError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Seated,
                });
            }

            let tid = table_id
                .or(current.table_id)
                .ok_or(WaitlistError::TableRequired)?;
            let table = self.load_table(tid).await?;

            if !table.fits(current.party_size) {
                return Err(WaitlistError::CapacityExceeded {
                    capacity: table.capacity,
                    party_size: current.party_size,
                });
            }
            let reserved_for_this = table.status == TableStatus::Reserved
                && table.current_booking_id == Some(booking_id);
            if table.status != TableStatus::Available && !reserved_for_this {
                return Err(WaitlistError::TableUnavailable(format!(
                    "Table {} is {}",
                    table.name, table.status
                )));
            }

            let now = now_millis();
            let profiles = self.load_profiles().await;
            let predicted_min = timeline::predict_duration_min(
                &profiles,
                current.party_size,
                self.config.default_dining_min,
            );
            let expected_end = now + predicted_min * MIN_MS;

            // Table first: if the booking guard then loses, the flip is
            // reverted and nothing stays half-applied.
            let flipped = dining_table::update_status_if(
                &self.pool,
                tid,
                table.status,
                TableStatus::Occupied,
                Some(booking_id),
                Some(now),
            )
            .await?;
            if !flipped {
                return Err(WaitlistError::TableUnavailable(format!(
                    "Table {} was taken concurrently",
                    table.name
                )));
            }

            let updated = booking::mark_seated(&self.pool, booking_id, tid, now, expected_end)
                .await?;
            if !updated {
                dining_table::set_status(
                    &self.pool,
                    tid,
                    table.status,
                    table.current_booking_id,
                    table.seated_at,
                )
                .await?;
                return Err(WaitlistError::StaleStatus(booking_id));
            }

            self.timers.disarm(booking_id);

            let seated = self.load_booking(booking_id).await?;
            let table = self.load_table(tid).await?;
            (seated, table)
        };

        self.emit(WaitlistEvent::booking_changed(
            &self.config.restaurant_id,
            &seated,
        ));
        self.emit(WaitlistEvent::table_changed(
            &self.config.restaurant_id,
            &table,
        ));

        if let Err(e) = self.broadcast_wait_times().await {
            tracing::warn!(error = %e, "Wait-time broadcast after seating failed");
        }

        Ok(seated)
    }

    /// Cancel a booking from any non-terminal status.
    ///
    /// Releases a bound table back to AVAILABLE, disarms timers, sends
    /// the cancellation notice.
    pub async fn cancel(
        &self,
        booking_id: i64,
        reason: &str,
        by: CancelActor,
    ) -> WaitlistResult<Booking> {
        let (cancelled, released) = {
            let _guard = self.transition_lock.lock().await;

            let current = self.load_booking(booking_id).await?;
            if current.status.is_terminal() {
                return Err(WaitlistError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Cancelled,
                });
            }

            self.cancel_locked(&current, reason, by).await?
        };

        self.finish_cancel(&cancelled, released.as_ref()).await;
        Ok(cancelled)
    }

    /// Core cancel mutation; the transition lock must be held.
    async fn cancel_locked(
        &self,
        current: &Booking,
        reason: &str,
        by: CancelActor,
    ) -> WaitlistResult<(Booking, Option<DiningTable>)> {
        let updated =
            booking::mark_cancelled(&self.pool, current.id, now_millis(), reason, by).await?;
        if !updated {
            return Err(WaitlistError::StaleStatus(current.id));
        }
        tracing::info!(booking_id = current.id, by = %by, reason, "Booking cancelled");

        // Release the bound table if it still points back at this booking.
        let mut released: Option<DiningTable> = None;
        if let Some(tid) = current.table_id
            && let Some(table) = dining_table::find_by_id(&self.pool, tid).await?
            && table.current_booking_id == Some(current.id)
        {
            dining_table::set_status(&self.pool, tid, TableStatus::Available, None, None).await?;
            released = dining_table::find_by_id(&self.pool, tid).await?;
        }

        self.timers.disarm(current.id);

        let cancelled = self.load_booking(current.id).await?;
        Ok((cancelled, released))
    }

    /// Post-cancel effects: events and the guest notice.
    async fn finish_cancel(&self, cancelled: &Booking, released: Option<&DiningTable>) {
        self.emit(WaitlistEvent::booking_changed(
            &self.config.restaurant_id,
            cancelled,
        ));
        if let Some(table) = released {
            self.emit(WaitlistEvent::table_changed(
                &self.config.restaurant_id,
                table,
            ));
        }

        let body = templates::cancelled(&cancelled.guest_name, &self.config.restaurant_name);
        self.send_guest_message(Some(cancelled.id), &cancelled.phone_number, &body)
            .await;
    }

    /// SEATED -> COMPLETED. The table goes to CLEANING and auto-releases
    /// to AVAILABLE after the configured hold.
    pub async fn complete(&self, booking_id: i64) -> WaitlistResult<Booking> {
        let (completed, cleaning) = {
            let _guard = self.transition_lock.lock().await;

            let current = self.load_booking(booking_id).await?;
            if current.status != BookingStatus::Seated {
                return Err(WaitlistError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Completed,
                });
            }

            let updated = booking::mark_completed(&self.pool, booking_id, now_millis()).await?;
            if !updated {
                return Err(WaitlistError::StaleStatus(booking_id));
            }

            let mut cleaning: Option<DiningTable> = None;
            if let Some(tid) = current.table_id
                && let Some(table) = dining_table::find_by_id(&self.pool, tid).await?
                && table.current_booking_id == Some(booking_id)
            {
                dining_table::set_status(&self.pool, tid, TableStatus::Cleaning, None, None)
                    .await?;
                cleaning = dining_table::find_by_id(&self.pool, tid).await?;
            }

            (self.load_booking(booking_id).await?, cleaning)
        };

        self.emit(WaitlistEvent::booking_changed(
            &self.config.restaurant_id,
            &completed,
        ));
        if let Some(table) = &cleaning {
            self.emit(WaitlistEvent::table_changed(
                &self.config.restaurant_id,
                table,
            ));
            self.schedule_table_release(table.id);
        }

        if let Err(e) = self.broadcast_wait_times().await {
            tracing::warn!(error = %e, "Wait-time broadcast after completion failed");
        }

        Ok(completed)
    }

    /// Inbound guest reply, resolved to the most recent NOTIFIED booking
    /// for the phone number.
    ///
    /// Y/YES confirms, N/NO cancels, anything else re-prompts without a
    /// state change. Returns the transitioned booking, or `None` when
    /// nothing changed.
    pub async fn handle_guest_reply(
        &self,
        phone_number: &str,
        text: &str,
    ) -> WaitlistResult<Option<Booking>> {
        let Some(target) = booking::find_latest_notified_by_phone(&self.pool, phone_number).await?
        else {
            tracing::debug!(phone = %phone_number, "Reply without a notified booking, ignoring");
            return Ok(None);
        };

        match text.trim().to_uppercase().as_str() {
            "Y" | "YES" => self.confirm(target.id).await.map(Some),
            "N" | "NO" => self
                .cancel(target.id, "Guest declined the table", CancelActor::Guest)
                .await
                .map(Some),
            _ => {
                let body = templates::reprompt(&self.config.restaurant_name);
                self.send_guest_message(Some(target.id), phone_number, &body)
                    .await;
                Ok(None)
            }
        }
    }

    // ========== Timer bodies ==========

    /// Follow-up timer body: remind the guest, only if still NOTIFIED.
    ///
    /// Never changes booking status.
    pub(crate) async fn follow_up_fired(&self, booking_id: i64) -> WaitlistResult<()> {
        let reminder_target = {
            let _guard = self.transition_lock.lock().await;
            match booking::find_by_id(&self.pool, booking_id).await? {
                Some(b) if b.status == BookingStatus::Notified => Some(b),
                _ => {
                    tracing::debug!(booking_id, "Follow-up fired after transition, skipping");
                    None
                }
            }
        };

        if let Some(target) = reminder_target {
            let body = templates::reminder(&target.guest_name, &self.config.restaurant_name);
            self.send_guest_message(Some(target.id), &target.phone_number, &body)
                .await;
        }
        Ok(())
    }

    /// Auto-cancel timer body: the full cancel transition, only if still
    /// NOTIFIED at fire time (cancel-wins against any concurrent
    /// transition).
    pub(crate) async fn auto_cancel_fired(&self, booking_id: i64) -> WaitlistResult<()> {
        let outcome = {
            let _guard = self.transition_lock.lock().await;

            let current = match booking::find_by_id(&self.pool, booking_id).await? {
                Some(b) => b,
                None => {
                    self.timers.disarm(booking_id);
                    return Ok(());
                }
            };
            if current.status != BookingStatus::Notified {
                tracing::debug!(booking_id, status = %current.status, "Auto-cancel lost the race, skipping");
                self.timers.disarm(booking_id);
                return Ok(());
            }

            match self
                .cancel_locked(
                    &current,
                    "No response within the grace period",
                    CancelActor::System,
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    // A failed body must still drop the pair from the registry.
                    self.timers.disarm(booking_id);
                    return Err(e);
                }
            }
        };

        self.finish_cancel(&outcome.0, outcome.1.as_ref()).await;
        Ok(())
    }

    // ========== Internals ==========

    fn emit(&self, event: WaitlistEvent) {
        // No subscribers is fine; the push layer may not be attached.
        let _ = self.event_tx.send(event);
    }

    /// Best-effort guest message: logged on failure, never an error.
    async fn send_guest_message(&self, booking_id: Option<i64>, phone_number: &str, body: &str) {
        match self.gateway.send(phone_number, body).await {
            Ok(receipt) => {
                tracing::debug!(
                    booking_id,
                    message_id = %receipt.message_id,
                    "Guest message sent"
                );
                self.emit(WaitlistEvent::guest_message(
                    &self.config.restaurant_id,
                    booking_id,
                    phone_number,
                    body,
                ));
            }
            Err(e) => {
                tracing::warn!(booking_id, error = %e, "Guest message delivery failed");
            }
        }
    }

    /// Table-scoped delayed release: CLEANING -> AVAILABLE after the
    /// configured hold. Deliberately has no cancellation path; the
    /// status guard makes a late fire a no-op instead of a clobber.
    fn schedule_table_release(&self, table_id: i64) {
        let pool = self.pool.clone();
        let event_tx = self.event_tx.clone();
        let restaurant_id = self.config.restaurant_id.clone();
        let delay = Duration::from_millis(self.config.table_release_delay_ms);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match dining_table::update_status_if(
                &pool,
                table_id,
                TableStatus::Cleaning,
                TableStatus::Available,
                None,
                None,
            )
            .await
            {
                Ok(true) => {
                    tracing::debug!(table_id, "Table released after cleaning");
                    if let Ok(Some(table)) = dining_table::find_by_id(&pool, table_id).await {
                        let _ = event_tx.send(WaitlistEvent::table_changed(&restaurant_id, &table));
                    }
                }
                Ok(false) => {
                    tracing::debug!(table_id, "Table no longer cleaning, release skipped");
                }
                Err(e) => {
                    tracing::error!(table_id, error = %e, "Table release failed");
                }
            }
        });
    }

    /// Re-arm a booking's timer pair with the configured delays (tests
    /// exercise idempotent-by-replacement arming through this).
    #[cfg(test)]
    pub(crate) fn rearm_timers(self: &Arc<Self>, booking_id: i64) {
        self.timers.arm(
            booking_id,
            Arc::downgrade(self),
            Duration::from_millis(self.config.follow_up_delay_ms),
            Duration::from_millis(self.config.grace_period_ms),
        );
    }

    async fn load_booking(&self, booking_id: i64) -> WaitlistResult<Booking> {
        booking::find_by_id(&self.pool, booking_id)
            .await?
            .ok_or(WaitlistError::BookingNotFound(booking_id))
    }

    async fn load_table(&self, table_id: i64) -> WaitlistResult<DiningTable> {
        dining_table::find_by_id(&self.pool, table_id)
            .await?
            .ok_or(WaitlistError::TableNotFound(table_id))
    }
}
