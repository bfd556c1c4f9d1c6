//! Wait time estimation
//!
//! Answers "how long until a party of size N is seated" against the
//! post-simulation timeline, plus the softer guest-facing bracket shown
//! on displays. Pure with respect to its snapshot inputs; callers
//! re-fetch state before every call.

use serde::{Deserialize, Serialize};

use super::timeline::TableSlot;
use shared::message::WaitTimeEntry;

const MIN_MS: i64 = 60_000;

/// Spread of the guest-facing display bracket (minutes)
const RANGE_SPREAD_MIN: i64 = 5;

/// A wait estimate for one party size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitEstimate {
    pub party_size: i64,
    /// Internal point estimate (minutes, never negative)
    pub minutes: i64,
    /// Guest-facing bracket, decoupled from the exact internal estimate
    pub range_low: i64,
    pub range_high: i64,
    /// True when no capacity-compatible table exists and the fixed
    /// fallback was quoted instead
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WaitEstimate {
    pub fn entry(&self) -> WaitTimeEntry {
        WaitTimeEntry {
            party_size: self.party_size,
            minutes: self.minutes,
            range_low: self.range_low,
            range_high: self.range_high,
        }
    }
}

/// Guest-facing display bracket: `[max(5, est−5), est+5]`
fn display_range(minutes: i64) -> (i64, i64) {
    (
        (minutes - RANGE_SPREAD_MIN).max(RANGE_SPREAD_MIN),
        minutes + RANGE_SPREAD_MIN,
    )
}

/// Estimate the wait for a party of `party_size` from the
/// post-simulation timeline.
///
/// No compatible table at all degrades to `fallback_min` with an
/// explanatory message — the guest-facing display never breaks.
pub fn estimate_wait(
    slots: &[TableSlot],
    party_size: i64,
    fallback_min: i64,
    now: i64,
) -> WaitEstimate {
    let earliest = slots
        .iter()
        .filter(|s| s.capacity >= party_size)
        .map(|s| s.free_at)
        .min();

    match earliest {
        Some(free_at) => {
            let remaining_ms = (free_at - now).max(0);
            let minutes = (remaining_ms + MIN_MS - 1) / MIN_MS;
            let (range_low, range_high) = display_range(minutes);
            WaitEstimate {
                party_size,
                minutes,
                range_low,
                range_high,
                fallback: false,
                message: None,
            }
        }
        None => {
            let (range_low, range_high) = display_range(fallback_min);
            WaitEstimate {
                party_size,
                minutes: fallback_min,
                range_low,
                range_high,
                fallback: true,
                message: Some(format!(
                    "No table currently seats a party of {party_size}; quoting the standard wait"
                )),
            }
        }
    }
}
