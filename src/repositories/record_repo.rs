use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{ExerciseRecord, FromSqliteRow, NewSet, RecordWithSets, SetRecord};
use crate::recall::{RecordQuery, RecordedExercise};

/// Exercise records, their sets, and the read-side queries the recall loop
/// and the dashboard aggregates are built on.
#[derive(Clone)]
pub struct RecordRepository {
    pool: DbPool,
}

impl RecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_record(
        &self,
        exercise_id: &str,
        notes: Option<&str>,
    ) -> Result<ExerciseRecord> {
        let record = ExerciseRecord {
            id: Uuid::new_v4().to_string(),
            exercise_id: exercise_id.to_string(),
            notes: notes.map(|s| s.to_string()),
            created_at: Utc::now(),
        };
        let record_clone = record.clone();

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO exercise_records (id, exercise_id, notes, created_at)
                 VALUES (?, ?, ?, ?)",
                rusqlite::params![
                    record_clone.id,
                    record_clone.exercise_id,
                    record_clone.notes,
                    record_clone.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(record)
    }

    /// Persist a batch of sets under a record. Set numbers continue from the
    /// sets already on the record, so two submissions in one session keep a
    /// single 1-based ordering.
    pub async fn add_sets(&self, record_id: &str, sets: &[NewSet]) -> Result<Vec<SetRecord>> {
        if sets.is_empty() {
            return Err(AppError::Validation(
                "at least one set is required".to_string(),
            ));
        }
        for set in sets {
            if set.reps < 1 {
                return Err(AppError::Validation(format!(
                    "reps must be positive, got {}",
                    set.reps
                )));
            }
            if set.weight.is_some_and(|w| w < 0.0) {
                return Err(AppError::Validation(
                    "weight must be non-negative".to_string(),
                ));
            }
        }

        let pool = self.pool.clone();
        let record_id = record_id.to_string();
        let sets = sets.to_vec();
        tokio::task::spawn_blocking(move || -> Result<Vec<SetRecord>> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            let existing: i32 = tx.query_row(
                "SELECT COUNT(*) FROM exercise_set_records WHERE exercise_record_id = ?",
                [&record_id],
                |row| row.get(0),
            )?;

            let now = Utc::now();
            let mut persisted = Vec::with_capacity(sets.len());
            for (i, set) in sets.iter().enumerate() {
                let set_record = SetRecord {
                    id: Uuid::new_v4().to_string(),
                    exercise_record_id: record_id.clone(),
                    set_number: existing + i as i32 + 1,
                    reps: set.reps,
                    weight: set.weight,
                    rest_seconds: set.rest_seconds,
                    created_at: now,
                };
                tx.execute(
                    "INSERT INTO exercise_set_records
                     (id, exercise_record_id, set_number, reps, weight, rest_seconds, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        set_record.id,
                        set_record.exercise_record_id,
                        set_record.set_number,
                        set_record.reps,
                        set_record.weight,
                        set_record.rest_seconds,
                        set_record.created_at
                    ],
                )?;
                persisted.push(set_record);
            }

            tx.commit()?;
            Ok(persisted)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn sets_for_record(&self, record_id: &str) -> Result<Vec<SetRecord>> {
        let pool = self.pool.clone();
        let record_id = record_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM exercise_set_records
                 WHERE exercise_record_id = ? ORDER BY set_number",
            )?;
            let sets = stmt
                .query_map([&record_id], SetRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(sets)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Most recent record for an exercise with its sets, for autofilling the
    /// recording form.
    pub async fn latest_record_with_sets(
        &self,
        exercise_id: &str,
    ) -> Result<Option<RecordWithSets>> {
        let pool = self.pool.clone();
        let exercise_id = exercise_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM exercise_records
                 WHERE exercise_id = ? ORDER BY created_at DESC LIMIT 1",
            )?;
            let record = stmt
                .query_row([&exercise_id], ExerciseRecord::from_row)
                .optional()?;

            let Some(record) = record else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT * FROM exercise_set_records
                 WHERE exercise_record_id = ? ORDER BY set_number",
            )?;
            let sets = stmt
                .query_map([&record.id], SetRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Some(RecordWithSets { record, sets }))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Full history for an exercise, oldest first. A failed set fetch for
    /// one record degrades to an empty set list instead of losing the page.
    pub async fn history(&self, exercise_id: &str) -> Result<Vec<RecordWithSets>> {
        let pool = self.pool.clone();
        let exercise_id = exercise_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM exercise_records
                 WHERE exercise_id = ? ORDER BY created_at",
            )?;
            let records = stmt
                .query_map([&exercise_id], ExerciseRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut stmt = conn.prepare(
                "SELECT * FROM exercise_set_records
                 WHERE exercise_record_id = ? ORDER BY set_number",
            )?;
            let mut history = Vec::with_capacity(records.len());
            for record in records {
                let sets = stmt
                    .query_map([&record.id], SetRecord::from_row)
                    .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                    .unwrap_or_else(|e| {
                        tracing::warn!(record_id = %record.id, error = %e, "failed to load sets for record");
                        Vec::new()
                    });
                history.push(RecordWithSets { record, sets });
            }

            Ok(history)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Creation instants of every record the user owns (activity map input).
    pub async fn record_timestamps(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT er.created_at FROM exercise_records er
                 JOIN exercises e ON e.id = er.exercise_id
                 WHERE e.user_id = ? ORDER BY er.created_at",
            )?;
            let timestamps = stmt
                .query_map([&user_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(timestamps)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// `muscles_worked` maps of every set record in the range (weekly-sets
    /// input). Rows with malformed JSON are logged and skipped.
    pub async fn set_muscle_maps_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HashMap<String, f64>>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT e.muscles_worked FROM exercise_set_records s
                 JOIN exercise_records er ON er.id = s.exercise_record_id
                 JOIN exercises e ON e.id = er.exercise_id
                 WHERE e.user_id = ?1
                   AND datetime(s.created_at) >= datetime(?2)
                   AND datetime(s.created_at) <= datetime(?3)",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, start, end], |row| {
                    row.get::<_, Option<String>>(0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut maps = Vec::new();
            for json in rows.into_iter().flatten() {
                match serde_json::from_str(&json) {
                    Ok(map) => maps.push(map),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping malformed muscles_worked value")
                    }
                }
            }
            Ok(maps)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Lifetime total of reps times weight across all of a user's sets.
    pub async fn total_weight(&self, user_id: &str) -> Result<f64> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let total = conn.query_row(
                "SELECT COALESCE(SUM(s.reps * COALESCE(s.weight, 0)), 0)
                 FROM exercise_set_records s
                 JOIN exercise_records er ON er.id = s.exercise_record_id
                 JOIN exercises e ON e.id = er.exercise_id
                 WHERE e.user_id = ?",
                [&user_id],
                |row| row.get(0),
            )?;
            Ok(total)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl RecordQuery for RecordRepository {
    async fn exercises_recorded_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RecordedExercise>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT er.exercise_id, e.name FROM exercise_records er
                 JOIN exercises e ON e.id = er.exercise_id
                 WHERE e.user_id = ?1
                   AND datetime(er.created_at) >= datetime(?2)
                   AND datetime(er.created_at) <= datetime(?3)
                 ORDER BY er.created_at",
            )?;
            let exercises = stmt
                .query_map(rusqlite::params![user_id, start, end], |row| {
                    Ok(RecordedExercise {
                        exercise_id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(exercises)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
