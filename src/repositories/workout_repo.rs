use async_trait::async_trait;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{FromSqliteRow, NewWorkout, Workout, WorkoutSetLink};
use crate::session::WorkoutWriter;

/// Workout rows and the workout-to-set linking table. This repository is
/// the storage-backed implementation of the session's write collaborator.
#[derive(Clone)]
pub struct WorkoutRepository {
    pool: DbPool,
}

impl WorkoutRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_workout(&self, user_id: &str, new: NewWorkout) -> Result<Workout> {
        if new.end_time < new.start_time {
            return Err(AppError::Validation(
                "workout end time precedes its start time".to_string(),
            ));
        }

        let workout = Workout {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            rating: new.rating,
            notes: new.notes,
            start_time: new.start_time,
            end_time: new.end_time,
            created_at: chrono::Utc::now(),
        };
        let workout_clone = workout.clone();

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO workouts (id, user_id, rating, notes, start_time, end_time, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    workout_clone.id,
                    workout_clone.user_id,
                    workout_clone.rating,
                    workout_clone.notes,
                    workout_clone.start_time,
                    workout_clone.end_time,
                    workout_clone.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(workout)
    }

    /// Write the whole link batch in one transaction, all-or-nothing.
    pub async fn link_sets(&self, links: &[WorkoutSetLink]) -> Result<()> {
        if links.is_empty() {
            return Err(AppError::Validation(
                "link batch must not be empty".to_string(),
            ));
        }

        let pool = self.pool.clone();
        let links = links.to_vec();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            for link in &links {
                tx.execute(
                    "INSERT INTO workout_exercise_records (id, workout_id, exercise_set_record_id)
                     VALUES (?, ?, ?)",
                    rusqlite::params![
                        Uuid::new_v4().to_string(),
                        link.workout_id,
                        link.set_record_id
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_by_id(&self, id: &str, user_id: &str) -> Result<Option<Workout>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM workouts WHERE id = ? AND user_id = ?")?;
            let result = stmt
                .query_row(rusqlite::params![id, user_id], Workout::from_row)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Workout>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt =
                conn.prepare("SELECT * FROM workouts WHERE user_id = ? ORDER BY start_time DESC")?;
            let workouts = stmt
                .query_map([&user_id], Workout::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(workouts)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Set-record ids linked to a workout, for the summary view.
    pub async fn linked_set_ids(&self, workout_id: &str) -> Result<Vec<String>> {
        let pool = self.pool.clone();
        let workout_id = workout_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT exercise_set_record_id FROM workout_exercise_records
                 WHERE workout_id = ?",
            )?;
            let ids = stmt
                .query_map([&workout_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl WorkoutWriter for WorkoutRepository {
    async fn create_workout(&self, user_id: &str, workout: NewWorkout) -> Result<String> {
        let workout = WorkoutRepository::create_workout(self, user_id, workout).await?;
        Ok(workout.id)
    }

    async fn link_sets(&self, links: Vec<WorkoutSetLink>) -> Result<()> {
        WorkoutRepository::link_sets(self, &links).await
    }
}
