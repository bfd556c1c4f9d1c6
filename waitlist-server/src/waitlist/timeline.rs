//! Table availability timeline and queue simulation
//!
//! Pure functions over snapshots: given tables, duration profiles and the
//! waiting queue, compute when each table frees up after every queued
//! party has been virtually seated. Callers re-fetch state before every
//! run; nothing here is cached.

use shared::models::{Booking, DiningTable, PartyDurationProfile, TableStatus};

use crate::core::Config;

const MIN_MS: i64 = 60_000;

/// One table's projected "free at" point on the timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSlot {
    pub table_id: i64,
    pub capacity: i64,
    /// Projected free time (Unix millis)
    pub free_at: i64,
}

/// Predicted dining duration in minutes for a party size.
///
/// Fallback chain: exact size match → smallest configured size that still
/// fits the party → `default_min` when no profile covers it (including an
/// entirely empty store).
pub fn predict_duration_min(
    profiles: &[PartyDurationProfile],
    party_size: i64,
    default_min: i64,
) -> i64 {
    if let Some(exact) = profiles.iter().find(|p| p.party_size == party_size) {
        return exact.avg_duration;
    }
    profiles
        .iter()
        .filter(|p| p.party_size >= party_size)
        .min_by_key(|p| p.party_size)
        .map(|p| p.avg_duration)
        .unwrap_or(default_min)
}

/// Build the per-table free-at timeline from current occupancy.
///
/// `tables` must be the active set; UNAVAILABLE tables never enter the
/// timeline. The occupied-table prediction is keyed by the table's
/// capacity, not the seated party's size (occupant size is not tracked on
/// the table).
pub fn build_timeline(
    tables: &[DiningTable],
    profiles: &[PartyDurationProfile],
    config: &Config,
    now: i64,
) -> Vec<TableSlot> {
    let buffer_ms = config.turnaround_buffer_min * MIN_MS;

    let mut slots: Vec<TableSlot> = tables
        .iter()
        .filter(|t| t.is_active && t.status != TableStatus::Unavailable)
        .map(|table| {
            let free_at = match table.status {
                TableStatus::Available => now + buffer_ms,
                TableStatus::Occupied => {
                    let predicted_ms =
                        predict_duration_min(profiles, table.capacity, config.default_dining_min)
                            * MIN_MS;
                    let elapsed_ms = table.seated_at.map(|s| (now - s).max(0)).unwrap_or(0);
                    now + (predicted_ms - elapsed_ms).max(0) + buffer_ms
                }
                // 清洁/预留: 固定短默认值，反映不确定性而非计算估计
                TableStatus::Cleaning | TableStatus::Reserved => {
                    now + config.pending_state_min * MIN_MS + buffer_ms
                }
                TableStatus::Unavailable => unreachable!("filtered above"),
            };
            TableSlot {
                table_id: table.id,
                capacity: table.capacity,
                free_at,
            }
        })
        .collect();

    // Deterministic iteration order for the simulator's tie-breaks.
    slots.sort_by_key(|s| s.table_id);
    slots
}

/// Replay the queue against the timeline, first-come-first-served.
///
/// Ordering is the explicit `created_at` sort key, oldest first — never
/// the insertion order of any collection. Each booking virtually takes
/// the capacity-compatible table that frees up earliest (ties broken by
/// slot iteration order); bookings no table can ever fit are skipped and
/// cannot block the parties behind them.
pub fn simulate_queue(
    slots: &mut [TableSlot],
    queue: &[Booking],
    profiles: &[PartyDurationProfile],
    config: &Config,
    now: i64,
) {
    let buffer_ms = config.turnaround_buffer_min * MIN_MS;

    let mut ordered: Vec<&Booking> = queue.iter().filter(|b| b.status.is_queued()).collect();
    ordered.sort_by_key(|b| b.created_at);

    for booking in ordered {
        let candidate = slots
            .iter_mut()
            .filter(|s| s.capacity >= booking.party_size)
            .min_by_key(|s| s.free_at);

        match candidate {
            Some(slot) => {
                let predicted_ms = predict_duration_min(
                    profiles,
                    booking.party_size,
                    config.default_dining_min,
                ) * MIN_MS;
                slot.free_at = slot.free_at.max(now) + predicted_ms + buffer_ms;
            }
            None => {
                // Phantom booking: nothing seats this party, skip it.
                tracing::debug!(
                    booking_id = booking.id,
                    party_size = booking.party_size,
                    "No capacity-compatible table, skipping booking in simulation"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{BookingStatus, CancelActor};
    use shared::util::now_millis;

    fn test_config() -> Config {
        let mut config = Config::from_env();
        config.turnaround_buffer_min = 5;
        config.pending_state_min = 10;
        config.default_dining_min = 90;
        config.no_table_fallback_min = 60;
        config
    }

    fn table(id: i64, capacity: i64, status: TableStatus, seated_at: Option<i64>) -> DiningTable {
        DiningTable {
            id,
            name: format!("T{id}"),
            capacity,
            status,
            current_booking_id: None,
            seated_at,
            is_active: true,
        }
    }

    fn profile(party_size: i64, avg: i64) -> PartyDurationProfile {
        PartyDurationProfile {
            id: party_size,
            party_size,
            min_duration: avg - 20,
            max_duration: avg + 30,
            avg_duration: avg,
        }
    }

    fn queued(id: i64, party_size: i64, created_at: i64) -> Booking {
        Booking {
            id,
            guest_name: format!("guest-{id}"),
            phone_number: format!("+3460000{id:04}"),
            party_size,
            status: BookingStatus::Waiting,
            quoted_wait_minutes: 0,
            estimated_seating_time: None,
            table_id: None,
            notification_sent_at: None,
            confirmation_received_at: None,
            seated_at: None,
            expected_end_time: None,
            completed_at: None,
            cancelled_at: None,
            cancel_reason: None,
            cancelled_by: None::<CancelActor>,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_duration_lookup_exact_match() {
        let profiles = vec![profile(2, 60), profile(4, 90)];
        assert_eq!(predict_duration_min(&profiles, 4, 90), 90);
        assert_eq!(predict_duration_min(&profiles, 2, 90), 60);
    }

    #[test]
    fn test_duration_lookup_next_size_up() {
        let profiles = vec![profile(2, 60), profile(6, 120)];
        // No profile for 3 → smallest configured size that fits (6)
        assert_eq!(predict_duration_min(&profiles, 3, 90), 120);
    }

    #[test]
    fn test_duration_lookup_hard_default() {
        // Bigger than anything configured, and the empty store
        let profiles = vec![profile(2, 60)];
        assert_eq!(predict_duration_min(&profiles, 8, 90), 90);
        assert_eq!(predict_duration_min(&[], 2, 90), 90);
    }

    #[test]
    fn test_available_table_frees_after_buffer() {
        let now = now_millis();
        let config = test_config();
        let tables = vec![table(1, 4, TableStatus::Available, None)];

        let slots = build_timeline(&tables, &[], &config, now);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].free_at, now + 5 * MIN_MS);
    }

    #[test]
    fn test_occupied_table_uses_remaining_duration() {
        let now = now_millis();
        let config = test_config();
        // Seated 80 minutes ago, capacity-4 profile says 90 → 10 remaining + 5 buffer
        let tables = vec![table(
            1,
            4,
            TableStatus::Occupied,
            Some(now - 80 * MIN_MS),
        )];
        let profiles = vec![profile(4, 90)];

        let slots = build_timeline(&tables, &profiles, &config, now);
        assert_eq!(slots[0].free_at, now + 15 * MIN_MS);
    }

    #[test]
    fn test_overstayed_occupancy_floors_at_zero() {
        let now = now_millis();
        let config = test_config();
        // Seated 3 hours ago with a 90-minute profile: only the buffer remains
        let tables = vec![table(
            1,
            4,
            TableStatus::Occupied,
            Some(now - 180 * MIN_MS),
        )];
        let profiles = vec![profile(4, 90)];

        let slots = build_timeline(&tables, &profiles, &config, now);
        assert_eq!(slots[0].free_at, now + 5 * MIN_MS);
    }

    #[test]
    fn test_cleaning_and_reserved_use_fixed_default() {
        let now = now_millis();
        let config = test_config();
        let tables = vec![
            table(1, 4, TableStatus::Cleaning, None),
            table(2, 4, TableStatus::Reserved, None),
        ];

        let slots = build_timeline(&tables, &[], &config, now);
        assert_eq!(slots[0].free_at, now + 15 * MIN_MS);
        assert_eq!(slots[1].free_at, now + 15 * MIN_MS);
    }

    #[test]
    fn test_unavailable_tables_never_enter_timeline() {
        let now = now_millis();
        let config = test_config();
        let tables = vec![
            table(1, 4, TableStatus::Unavailable, None),
            table(2, 2, TableStatus::Available, None),
        ];

        let slots = build_timeline(&tables, &[], &config, now);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].table_id, 2);
    }

    #[test]
    fn test_simulation_is_fcfs_by_created_at() {
        let now = now_millis();
        let config = test_config();
        let tables = vec![table(1, 4, TableStatus::Available, None)];
        let profiles = vec![profile(2, 60), profile(4, 60)];

        // Passed newest-first on purpose: the sort key must win.
        let queue = vec![queued(2, 2, now - 100), queued(1, 2, now - 200)];

        let mut slots = build_timeline(&tables, &profiles, &config, now);
        simulate_queue(&mut slots, &queue, &profiles, &config, now);

        // Two parties of 60 min each + buffers stacked on the single table:
        // (now+5) + 60+5 + 60+5
        assert_eq!(slots[0].free_at, now + 135 * MIN_MS);
    }

    #[test]
    fn test_simulation_picks_earliest_free_table() {
        let now = now_millis();
        let config = test_config();
        let tables = vec![
            table(1, 4, TableStatus::Occupied, Some(now - 10 * MIN_MS)),
            table(2, 4, TableStatus::Available, None),
        ];
        let profiles = vec![profile(2, 60), profile(4, 90)];

        let queue = vec![queued(1, 2, now - 100)];
        let mut slots = build_timeline(&tables, &profiles, &config, now);
        simulate_queue(&mut slots, &queue, &profiles, &config, now);

        // The available table (frees at now+5) takes the party, the
        // occupied one is untouched.
        assert_eq!(slots[0].free_at, now + 85 * MIN_MS);
        assert_eq!(slots[1].free_at, now + 70 * MIN_MS);
    }

    #[test]
    fn test_phantom_booking_is_skipped() {
        let now = now_millis();
        let config = test_config();
        let tables = vec![table(1, 2, TableStatus::Available, None)];
        let profiles = vec![profile(2, 60)];

        // Party of 10 fits nowhere; the party of 2 behind it must not wait
        let queue = vec![queued(1, 10, now - 200), queued(2, 2, now - 100)];
        let mut slots = build_timeline(&tables, &profiles, &config, now);
        simulate_queue(&mut slots, &queue, &profiles, &config, now);

        // Only the fitting party advanced the table
        assert_eq!(slots[0].free_at, now + 70 * MIN_MS);
    }
}
