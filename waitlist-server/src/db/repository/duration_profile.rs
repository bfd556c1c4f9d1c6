//! Party Duration Profile Repository
//!
//! Profiles are configured externally; this core only reads them. The
//! store may legitimately be empty — the timeline falls back to a fixed
//! default duration.

use super::RepoResult;
use shared::models::PartyDurationProfile;
use sqlx::SqlitePool;

/// All profiles, size-ordered (the lookup fallback scans upward)
pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<PartyDurationProfile>> {
    let profiles = sqlx::query_as::<_, PartyDurationProfile>(
        "SELECT id, party_size, min_duration, max_duration, avg_duration
         FROM party_duration_profile
         ORDER BY party_size ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(profiles)
}
