use rusqlite::OptionalExtension;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{Exercise, FromSqliteRow};

/// Exercise catalog: names are unique per user, case-insensitively, and
/// deleting an exercise takes its records and set rows with it.
#[derive(Clone)]
pub struct ExerciseRepository {
    pool: DbPool,
}

impl ExerciseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        muscles_worked: Option<HashMap<String, f64>>,
    ) -> Result<Exercise> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation(
                "exercise name must not be empty".to_string(),
            ));
        }

        let exercise = Exercise {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            muscles_worked,
            created_at: chrono::Utc::now(),
        };
        let exercise_clone = exercise.clone();

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;

            let taken: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM exercises WHERE user_id = ? AND name = ? COLLATE NOCASE",
                rusqlite::params![exercise_clone.user_id, exercise_clone.name],
                |row| row.get(0),
            )?;
            if taken {
                return Err(AppError::Validation(format!(
                    "exercise name '{}' is already in use",
                    exercise_clone.name
                )));
            }

            let muscles_json = exercise_clone
                .muscles_worked
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            conn.execute(
                "INSERT INTO exercises (id, user_id, name, muscles_worked, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                rusqlite::params![
                    exercise_clone.id,
                    exercise_clone.user_id,
                    exercise_clone.name,
                    muscles_json,
                    exercise_clone.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(exercise)
    }

    pub async fn rename(&self, id: &str, user_id: &str, new_name: &str) -> Result<Exercise> {
        let new_name = new_name.trim().to_string();
        if new_name.is_empty() {
            return Err(AppError::Validation(
                "exercise name must not be empty".to_string(),
            ));
        }

        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<Exercise> {
            let conn = pool.get()?;

            let taken: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM exercises
                 WHERE user_id = ? AND name = ? COLLATE NOCASE AND id <> ?",
                rusqlite::params![user_id, new_name, id],
                |row| row.get(0),
            )?;
            if taken {
                return Err(AppError::Validation(format!(
                    "exercise name '{}' is already in use",
                    new_name
                )));
            }

            let updated = conn.execute(
                "UPDATE exercises SET name = ? WHERE id = ? AND user_id = ?",
                rusqlite::params![new_name, id, user_id],
            )?;
            if updated == 0 {
                return Err(AppError::NotFound(format!("exercise {}", id)));
            }

            let mut stmt = conn.prepare("SELECT * FROM exercises WHERE id = ?")?;
            let exercise = stmt.query_row([&id], Exercise::from_row)?;
            Ok(exercise)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Delete an exercise and everything hanging off it, in one transaction.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<()> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM exercise_set_records WHERE exercise_record_id IN
                 (SELECT id FROM exercise_records WHERE exercise_id = ?)",
                [&id],
            )?;
            tx.execute("DELETE FROM exercise_records WHERE exercise_id = ?", [&id])?;
            let deleted = tx.execute(
                "DELETE FROM exercises WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            if deleted == 0 {
                return Err(AppError::NotFound(format!("exercise {}", id)));
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_by_id(&self, id: &str, user_id: &str) -> Result<Option<Exercise>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM exercises WHERE id = ? AND user_id = ?")?;
            let result = stmt
                .query_row(rusqlite::params![id, user_id], Exercise::from_row)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Exercise>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn
                .prepare("SELECT * FROM exercises WHERE user_id = ? ORDER BY name COLLATE NOCASE")?;
            let exercises = stmt
                .query_map([&user_id], Exercise::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(exercises)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
