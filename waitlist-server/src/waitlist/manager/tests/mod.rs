//! WaitlistManager test harness
//!
//! In-memory SQLite with the full waitlist schema, a recording
//! MemoryGateway and millisecond-scale timer delays so timer behavior is
//! observable without real waiting.


use std::sync::Arc;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use shared::models::{BookingCreate, TableStatus};
use shared::util::now_millis;

use crate::core::Config;
use crate::db::repository::dining_table;
use crate::services::{MemoryGateway, MessagingGateway};
use crate::waitlist::WaitlistManager;

pub(crate) struct TestEnv {
    pub manager: Arc<WaitlistManager>,
    pub pool: SqlitePool,
    pub gateway: Arc<MemoryGateway>,
}

/// Create an in-memory SQLite pool with the waitlist schema.
///
/// Single connection: every `sqlite::memory:` connection is its own
/// database, and timer tasks here query concurrently with the test body.
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query(
        "CREATE TABLE dining_table (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            capacity INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'AVAILABLE',
            current_booking_id INTEGER,
            seated_at INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
    )
    .execute(&pool)
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

    sqlx::query(
        "CREATE TABLE party_duration_profile (
            id INTEGER PRIMARY KEY,
            party_size INTEGER NOT NULL UNIQUE,
            min_duration INTEGER NOT NULL,
            max_duration INTEGER NOT NULL,
            avg_duration INTEGER NOT NULL
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

/// Test config: estimator defaults, timers shrunk to tens of millis.
pub(crate) fn test_config() -> Config {
    let mut config = Config::with_overrides("Perch", ":memory:");
    config.restaurant_id = "rest-test".into();
    config.turnaround_buffer_min = 5;
    config.pending_state_min = 10;
    config.default_dining_min = 90;
    config.no_table_fallback_min = 60;
    config.follow_up_delay_ms = 50;
    config.grace_period_ms = 150;
    config.table_release_delay_ms = 50;
    config
}

pub(crate) async fn test_env() -> TestEnv {
    test_env_with_config(test_config()).await
}

pub(crate) async fn test_env_with_config(config: Config) -> TestEnv {
    let pool = test_pool().await;
    let gateway = Arc::new(MemoryGateway::new());
    let manager = WaitlistManager::new(
        pool.clone(),
        config,
        gateway.clone() as Arc<dyn MessagingGateway>,
    );
    TestEnv {
        manager,
        pool,
        gateway,
    }
}

/// Seed an AVAILABLE table, returning its id
pub(crate) async fn seed_table(pool: &SqlitePool, name: &str, capacity: i64) -> i64 {
    let table = dining_table::create(
        pool,
        shared::models::DiningTableCreate {
            name: name.into(),
            capacity: Some(capacity),
        },
    )
    .await
    .unwrap();
    table.id
}

/// Seed a table already in a given occupancy state
pub(crate) async fn seed_table_with_status(
    pool: &SqlitePool,
    name: &str,
    capacity: i64,
    status: TableStatus,
    current_booking_id: Option<i64>,
    seated_at: Option<i64>,
) -> i64 {
    let id = seed_table(pool, name, capacity).await;
    dining_table::set_status(pool, id, status, current_booking_id, seated_at)
        .await
        .unwrap();
    id
}

/// Seed a duration profile
pub(crate) async fn seed_profile(pool: &SqlitePool, party_size: i64, avg: i64) {
    sqlx::query(
        "INSERT INTO party_duration_profile (party_size, min_duration, max_duration, avg_duration)
         VALUES (?, ?, ?, ?)",
    )
    .bind(party_size)
    .bind(avg - 20)
    .bind(avg + 30)
    .bind(avg)
    .execute(pool)
    .await
    .unwrap();
}

pub(crate) fn walk_in(name: &str, phone: &str, party_size: i64) -> BookingCreate {
    BookingCreate {
        guest_name: name.into(),
        phone_number: phone.into(),
        party_size,
    }
}

/// Millis helper for seeding past seated_at values
pub(crate) fn minutes_ago(min: i64) -> i64 {
    now_millis() - min * 60_000
}

/// Count recorded gateway sends whose body contains `needle`
pub(crate) fn sent_containing(gateway: &MemoryGateway, needle: &str) -> usize {
    gateway
        .sent()
        .iter()
        .filter(|m| m.body.contains(needle))
        .count()
}
