//! Booking Repository
//!
//! Every status-changing write carries a `WHERE status = ?` (or status
//! set) guard so concurrent transitions cannot both apply. A `false`
//! return means the booking was no longer in the expected status; the
//! manager maps that to a stale-status error.

use super::{RepoError, RepoResult};
use shared::models::{Booking, BookingCreate, BookingStatus, CancelActor};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const COLUMNS: &str = "id, guest_name, phone_number, party_size, status, quoted_wait_minutes, \
     estimated_seating_time, table_id, notification_sent_at, confirmation_received_at, \
     seated_at, expected_end_time, completed_at, cancelled_at, cancel_reason, cancelled_by, \
     created_at, updated_at";

/// Create a WAITING booking at check-in time
pub async fn create(
    pool: &SqlitePool,
    data: &BookingCreate,
    quoted_wait_minutes: i64,
    estimated_seating_time: Option<i64>,
) -> RepoResult<Booking> {
    if data.party_size < 1 {
        return Err(RepoError::Validation(format!(
            "Invalid party size: {}",
            data.party_size
        )));
    }

    let id = snowflake_id();
    let now = now_millis();
    sqlx::query(
        "INSERT INTO booking
            (id, guest_name, phone_number, party_size, status, quoted_wait_minutes,
             estimated_seating_time, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.guest_name)
    .bind(&data.phone_number)
    .bind(data.party_size)
    .bind(BookingStatus::Waiting)
    .bind(quoted_wait_minutes)
    .bind(estimated_seating_time)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create booking".into()))
}

/// Find booking by id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Booking>> {
    let booking =
        sqlx::query_as::<_, Booking>(&format!("SELECT {COLUMNS} FROM booking WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(booking)
}

/// The current queue: WAITING/NOTIFIED/CONFIRMED bookings, oldest first.
///
/// FCFS is an explicit sort key (`created_at`), never insertion order.
pub async fn find_queue(pool: &SqlitePool) -> RepoResult<Vec<Booking>> {
    let bookings = sqlx::query_as::<_, Booking>(&format!(
        "SELECT {COLUMNS} FROM booking
         WHERE status IN (?, ?, ?)
         ORDER BY created_at ASC"
    ))
    .bind(BookingStatus::Waiting)
    .bind(BookingStatus::Notified)
    .bind(BookingStatus::Confirmed)
    .fetch_all(pool)
    .await?;
    Ok(bookings)
}

/// Resolve an inbound guest reply: the most recently notified booking
/// for this phone number.
pub async fn find_latest_notified_by_phone(
    pool: &SqlitePool,
    phone_number: &str,
) -> RepoResult<Option<Booking>> {
    let booking = sqlx::query_as::<_, Booking>(&format!(
        "SELECT {COLUMNS} FROM booking
         WHERE phone_number = ? AND status = ?
         ORDER BY notification_sent_at DESC
         LIMIT 1"
    ))
    .bind(phone_number)
    .bind(BookingStatus::Notified)
    .fetch_optional(pool)
    .await?;
    Ok(booking)
}

/// WAITING -> NOTIFIED, optionally binding a pre-assigned table
pub async fn mark_notified(
    pool: &SqlitePool,
    id: i64,
    table_id: Option<i64>,
    at: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking
         SET status = ?, table_id = COALESCE(?, table_id), notification_sent_at = ?, updated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(BookingStatus::Notified)
    .bind(table_id)
    .bind(at)
    .bind(at)
    .bind(id)
    .bind(BookingStatus::Waiting)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// NOTIFIED -> CONFIRMED
pub async fn mark_confirmed(pool: &SqlitePool, id: i64, at: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking
         SET status = ?, confirmation_received_at = ?, updated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(BookingStatus::Confirmed)
    .bind(at)
    .bind(at)
    .bind(id)
    .bind(BookingStatus::Notified)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// WAITING/NOTIFIED/CONFIRMED -> SEATED
pub async fn mark_seated(
    pool: &SqlitePool,
    id: i64,
    table_id: i64,
    at: i64,
    expected_end_time: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking
         SET status = ?, table_id = ?, seated_at = ?, expected_end_time = ?, updated_at = ?
         WHERE id = ? AND status IN (?, ?, ?)",
    )
    .bind(BookingStatus::Seated)
    .bind(table_id)
    .bind(at)
    .bind(expected_end_time)
    .bind(at)
    .bind(id)
    .bind(BookingStatus::Waiting)
    .bind(BookingStatus::Notified)
    .bind(BookingStatus::Confirmed)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// SEATED -> COMPLETED
pub async fn mark_completed(pool: &SqlitePool, id: i64, at: i64) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking
         SET status = ?, completed_at = ?, updated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(BookingStatus::Completed)
    .bind(at)
    .bind(at)
    .bind(id)
    .bind(BookingStatus::Seated)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Any non-terminal status -> CANCELLED
pub async fn mark_cancelled(
    pool: &SqlitePool,
    id: i64,
    at: i64,
    reason: &str,
    by: CancelActor,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE booking
         SET status = ?, cancelled_at = ?, cancel_reason = ?, cancelled_by = ?, updated_at = ?
         WHERE id = ? AND status IN (?, ?, ?, ?)",
    )
    .bind(BookingStatus::Cancelled)
    .bind(at)
    .bind(reason)
    .bind(by)
    .bind(at)
    .bind(id)
    .bind(BookingStatus::Waiting)
    .bind(BookingStatus::Notified)
    .bind(BookingStatus::Confirmed)
    .bind(BookingStatus::Seated)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    pub(crate) async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE booking (
                id INTEGER PRIMARY KEY,
                guest_name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                party_size INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'WAITING',
                quoted_wait_minutes INTEGER NOT NULL DEFAULT 0,
                estimated_seating_time INTEGER,
                table_id INTEGER,
                notification_sent_at INTEGER,
                confirmation_received_at INTEGER,
                seated_at INTEGER,
                expected_end_time INTEGER,
                completed_at INTEGER,
                cancelled_at INTEGER,
                cancel_reason TEXT,
                cancelled_by TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    fn walk_in(name: &str, phone: &str, size: i64) -> BookingCreate {
        BookingCreate {
            guest_name: name.into(),
            phone_number: phone.into(),
            party_size: size,
        }
    }

    #[tokio::test]
    async fn test_create_starts_waiting() {
        let pool = test_pool().await;
        let booking = create(&pool, &walk_in("Ana", "+34600000001", 2), 15, Some(1_000))
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Waiting);
        assert_eq!(booking.quoted_wait_minutes, 15);
        assert_eq!(booking.estimated_seating_time, Some(1_000));
        assert!(booking.table_id.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_zero_party() {
        let pool = test_pool().await;
        let result = create(&pool, &walk_in("Ana", "+34600000001", 0), 0, None).await;
        assert!(matches!(result, Err(RepoError::Validation(_))));
    }

    #[tokio::test]
    async fn test_queue_is_fcfs_by_created_at() {
        let pool = test_pool().await;
        let first = create(&pool, &walk_in("Ana", "1", 2), 0, None).await.unwrap();
        let second = create(&pool, &walk_in("Ben", "2", 4), 0, None).await.unwrap();

        // Force a deterministic creation order regardless of snowflake ids
        sqlx::query("UPDATE booking SET created_at = 100 WHERE id = ?")
            .bind(first.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE booking SET created_at = 200 WHERE id = ?")
            .bind(second.id)
            .execute(&pool)
            .await
            .unwrap();

        let queue = find_queue(&pool).await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, first.id);
        assert_eq!(queue[1].id, second.id);
    }

    #[tokio::test]
    async fn test_transition_guards_are_atomic() {
        let pool = test_pool().await;
        let booking = create(&pool, &walk_in("Ana", "1", 2), 0, None).await.unwrap();
        let now = now_millis();

        assert!(mark_notified(&pool, booking.id, None, now).await.unwrap());
        // Second notify must observe the stale status
        assert!(!mark_notified(&pool, booking.id, None, now).await.unwrap());

        assert!(mark_confirmed(&pool, booking.id, now).await.unwrap());
        assert!(mark_seated(&pool, booking.id, 7, now, now + 1).await.unwrap());
        // Cancel after seating is allowed (non-terminal), completing after
        // cancelling is not.
        assert!(
            mark_cancelled(&pool, booking.id, now, "walked out", CancelActor::Staff)
                .await
                .unwrap()
        );
        assert!(!mark_completed(&pool, booking.id, now).await.unwrap());

        let final_state = find_by_id(&pool, booking.id).await.unwrap().unwrap();
        assert_eq!(final_state.status, BookingStatus::Cancelled);
        assert_eq!(final_state.cancelled_by, Some(CancelActor::Staff));
    }

    #[tokio::test]
    async fn test_reply_resolves_to_latest_notified() {
        let pool = test_pool().await;
        let older = create(&pool, &walk_in("Ana", "+34600000001", 2), 0, None)
            .await
            .unwrap();
        let newer = create(&pool, &walk_in("Ana", "+34600000001", 2), 0, None)
            .await
            .unwrap();

        mark_notified(&pool, older.id, None, 1_000).await.unwrap();
        mark_notified(&pool, newer.id, None, 2_000).await.unwrap();

        let resolved = find_latest_notified_by_phone(&pool, "+34600000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, newer.id);

        // Once the newer one confirms, the older notified booking resolves
        mark_confirmed(&pool, newer.id, 3_000).await.unwrap();
        let resolved = find_latest_notified_by_phone(&pool, "+34600000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, older.id);
    }
}
