#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use gymlog::db::{create_memory_pool, DbPool};
use gymlog::migrations::run_migrations_for_tests;
use gymlog::models::{Exercise, NewSet};
use gymlog::repositories::ExerciseRepository;

pub fn setup_test_db() -> DbPool {
    let pool = create_memory_pool().expect("Failed to create test database");
    run_migrations_for_tests(&pool).expect("Failed to run migrations");
    pool
}

pub async fn create_test_exercise(pool: &DbPool, user_id: &str, name: &str) -> Exercise {
    let repo = ExerciseRepository::new(pool.clone());
    repo.create(user_id, name, None).await.unwrap()
}

pub async fn create_test_exercise_with_muscles(
    pool: &DbPool,
    user_id: &str,
    name: &str,
    muscles: &[(&str, f64)],
) -> Exercise {
    let repo = ExerciseRepository::new(pool.clone());
    let muscles: HashMap<String, f64> = muscles
        .iter()
        .map(|(m, c)| (m.to_string(), *c))
        .collect();
    repo.create(user_id, name, Some(muscles)).await.unwrap()
}

pub fn set(reps: i32, weight: f64) -> NewSet {
    NewSet {
        reps,
        weight: Some(weight),
        rest_seconds: None,
    }
}

/// Insert a record row directly with a chosen creation time, for tests that
/// need history at specific dates.
pub fn insert_record_at(pool: &DbPool, exercise_id: &str, created_at: DateTime<Utc>) -> String {
    let id = uuid_like(exercise_id, created_at);
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO exercise_records (id, exercise_id, notes, created_at) VALUES (?, ?, NULL, ?)",
        rusqlite::params![id, exercise_id, created_at],
    )
    .unwrap();
    id
}

/// Insert a set row directly with a chosen creation time.
pub fn insert_set_at(pool: &DbPool, record_id: &str, created_at: DateTime<Utc>) -> String {
    let id = uuid_like(record_id, created_at);
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO exercise_set_records
         (id, exercise_record_id, set_number, reps, weight, rest_seconds, created_at)
         VALUES (?, ?, 1, 5, 100, NULL, ?)",
        rusqlite::params![id, record_id, created_at],
    )
    .unwrap();
    id
}

fn uuid_like(seed: &str, created_at: DateTime<Utc>) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!(
        "{}-{}-{}",
        seed,
        created_at.timestamp_millis(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}
