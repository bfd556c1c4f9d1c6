//! Party Duration Profile Model

use serde::{Deserialize, Serialize};

/// Expected dining duration for a party size (minutes)
///
/// Read-only to the waitlist core; configured by staff. The store is
/// allowed to be empty — lookups fall back per the timeline rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PartyDurationProfile {
    pub id: i64,
    pub party_size: i64,
    /// Minimum observed duration (minutes)
    pub min_duration: i64,
    /// Maximum observed duration (minutes)
    pub max_duration: i64,
    /// Average duration used for prediction (minutes)
    pub avg_duration: i64,
}
