//! Dining Table Repository

use super::{RepoError, RepoResult};
use shared::models::{DiningTable, DiningTableCreate, DiningTableUpdate, TableStatus};
use shared::util::snowflake_id;
use sqlx::SqlitePool;

const COLUMNS: &str = "id, name, capacity, status, current_booking_id, seated_at, is_active";

/// Find all active dining tables, id-ordered (the simulator relies on a
/// deterministic iteration order, not collection insertion order)
pub async fn find_all_active(pool: &SqlitePool) -> RepoResult<Vec<DiningTable>> {
    let tables = sqlx::query_as::<_, DiningTable>(&format!(
        "SELECT {COLUMNS} FROM dining_table WHERE is_active = 1 ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(tables)
}

/// Find table by id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<DiningTable>> {
    let table = sqlx::query_as::<_, DiningTable>(&format!(
        "SELECT {COLUMNS} FROM dining_table WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(table)
}

/// Create a new dining table
pub async fn create(pool: &SqlitePool, data: DiningTableCreate) -> RepoResult<DiningTable> {
    let capacity = data.capacity.unwrap_or(4);
    if capacity < 1 {
        return Err(RepoError::Validation(format!(
            "Invalid capacity: {capacity}"
        )));
    }

    // Check duplicate name
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM dining_table WHERE name = ?")
        .bind(&data.name)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Table '{}' already exists",
            data.name
        )));
    }

    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO dining_table (id, name, capacity, status, is_active) VALUES (?, ?, ?, ?, 1)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(capacity)
    .bind(TableStatus::Available)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create dining table".into()))
}

/// Update a dining table's configuration
pub async fn update(pool: &SqlitePool, id: i64, data: DiningTableUpdate) -> RepoResult<DiningTable> {
    let rows = sqlx::query(
        "UPDATE dining_table SET
            name = COALESCE(?1, name),
            capacity = COALESCE(?2, capacity),
            is_active = COALESCE(?3, is_active)
         WHERE id = ?4",
    )
    .bind(data.name)
    .bind(data.capacity)
    .bind(data.is_active)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Dining table {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Dining table {id} not found")))
}

/// Unconditionally set a table's occupancy state.
///
/// Only the waitlist manager calls this, under its transition lock.
pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: TableStatus,
    current_booking_id: Option<i64>,
    seated_at: Option<i64>,
) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE dining_table SET status = ?, current_booking_id = ?, seated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(current_booking_id)
    .bind(seated_at)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Dining table {id} not found")));
    }
    Ok(())
}

/// Atomic status flip: only applies when the current status matches.
///
/// Returns `false` when the table exists but was not in `expected` status
/// anymore (somebody else won the race).
pub async fn update_status_if(
    pool: &SqlitePool,
    id: i64,
    expected: TableStatus,
    status: TableStatus,
    current_booking_id: Option<i64>,
    seated_at: Option<i64>,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE dining_table SET status = ?, current_booking_id = ?, seated_at = ?
         WHERE id = ? AND status = ?",
    )
    .bind(status)
    .bind(current_booking_id)
    .bind(seated_at)
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}
