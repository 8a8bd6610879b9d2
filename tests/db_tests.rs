//! Database and schema tests
//!
//! Tests SQLite migrations, entity storage, and schema constraints

use chrono::{NaiveDate, Utc};
use coworking_booking_api::infrastructure::entities::{Booking, BookingStatus, MessageKind};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Setup test database with migrations
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}

async fn insert_location(pool: &SqlitePool) -> Uuid {
    let location_id = Uuid::new_v4();
    sqlx::query("INSERT INTO locations (id, name, address, created_at) VALUES (?, ?, ?, ?)")
        .bind(location_id)
        .bind("Harbour House")
        .bind("1 Dock Street")
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    location_id
}

#[tokio::test]
async fn test_database_migrations_work() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
    let tables: Vec<&str> = tables.iter().map(|(name,)| name.as_str()).collect();

    for table in [
        "bookings",
        "conversations",
        "email_outbox",
        "email_templates",
        "locations",
        "messages",
        "notifications",
        "users",
    ] {
        assert!(tables.contains(&table), "missing table {table}");
    }
}

#[tokio::test]
async fn test_default_email_templates_are_seeded() {
    let pool = setup_test_db().await;

    let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM email_templates ORDER BY name")
        .fetch_all(&pool)
        .await
        .unwrap();
    let names: Vec<String> = names.into_iter().map(|(name,)| name).collect();

    assert_eq!(
        names,
        [
            "booking-approved",
            "booking-cancelled",
            "booking-received",
            "booking-rejected",
            "reset-password",
            "welcome",
        ]
    );
}

#[tokio::test]
async fn test_booking_round_trips_through_entity() {
    let pool = setup_test_db().await;
    let location_id = insert_location(&pool).await;

    let start = NaiveDate::from_ymd_opt(2026, 10, 21)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let booking_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO bookings (id, location_id, user_email, start_time, end_time, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(booking_id)
    .bind(location_id)
    .bind("alice@example.com")
    .bind(start)
    .bind(start + chrono::Duration::minutes(90))
    .bind(BookingStatus::Approved)
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    let status: (String,) = sqlx::query_as("SELECT status FROM bookings WHERE id = ?")
        .bind(booking_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status.0, "approved");

    let booking: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
        .bind(booking_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(booking.start_time, start);
    assert_eq!(booking.status, BookingStatus::Approved);
    assert_eq!(booking.department, "");
}

#[tokio::test]
async fn test_location_cascade_deletes_bookings() {
    let pool = setup_test_db().await;
    let location_id = insert_location(&pool).await;

    sqlx::query(
        "INSERT INTO bookings (id, location_id, user_email, start_time, end_time, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4())
    .bind(location_id)
    .bind("alice@example.com")
    .bind("2026-10-21T09:00:00")
    .bind("2026-10-21T10:00:00")
    .bind(Utc::now())
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(location_id)
        .execute(&pool)
        .await
        .unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE location_id = ?")
        .bind(location_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn test_user_email_is_unique() {
    let pool = setup_test_db().await;

    let insert = |id: Uuid| {
        sqlx::query("INSERT INTO users (id, name, email, joined_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind("Alice")
            .bind("alice@example.com")
            .bind(Utc::now())
    };

    insert(Uuid::new_v4()).execute(&pool).await.unwrap();
    let error = insert(Uuid::new_v4()).execute(&pool).await.unwrap_err();

    match error {
        sqlx::Error::Database(e) => assert!(e.is_unique_violation()),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_conversation_cascade_delete() {
    let pool = setup_test_db().await;

    let conversation_id = Uuid::new_v4();

    sqlx::query("INSERT INTO conversations (id, user_email, created_at) VALUES (?, ?, ?)")
        .bind(conversation_id)
        .bind("alice@example.com")
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    for kind in [MessageKind::User, MessageKind::Admin] {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_email, kind, created_at, text)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind("alice@example.com")
        .bind(kind as u8)
        .bind(Utc::now())
        .bind(format!("Test {kind:?}"))
        .execute(&pool)
        .await
        .unwrap();
    }

    sqlx::query("DELETE FROM conversations WHERE id = ?")
        .bind(conversation_id)
        .execute(&pool)
        .await
        .unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
        .bind(conversation_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(count.0, 0);
}
