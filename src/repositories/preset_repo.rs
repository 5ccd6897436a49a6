use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{FromSqliteRow, PresetExercise, WorkoutPreset};

/// Saved workout presets: a named, ordered list of exercises the user can
/// start a session from.
#[derive(Clone)]
pub struct PresetRepository {
    pool: DbPool,
}

impl PresetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the preset row and its ordered member rows in one transaction.
    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        exercise_ids: &[String],
    ) -> Result<WorkoutPreset> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation(
                "preset name must not be empty".to_string(),
            ));
        }
        if exercise_ids.is_empty() {
            return Err(AppError::Validation(
                "a preset needs at least one exercise".to_string(),
            ));
        }

        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let description = description.map(|s| s.to_string());
        let exercise_ids = exercise_ids.to_vec();
        tokio::task::spawn_blocking(move || -> Result<WorkoutPreset> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            let preset_id = Uuid::new_v4().to_string();
            let created_at = chrono::Utc::now();
            tx.execute(
                "INSERT INTO workout_presets (id, user_id, name, description, starred, created_at)
                 VALUES (?, ?, ?, ?, 0, ?)",
                rusqlite::params![preset_id, user_id, name, description, created_at],
            )?;

            for (i, exercise_id) in exercise_ids.iter().enumerate() {
                tx.execute(
                    "INSERT INTO workout_preset_exercises (id, preset_id, exercise_id, position)
                     VALUES (?, ?, ?, ?)",
                    rusqlite::params![
                        Uuid::new_v4().to_string(),
                        preset_id,
                        exercise_id,
                        i as i32 + 1
                    ],
                )?;
            }

            let exercises = member_exercises(&tx, &preset_id)?;
            tx.commit()?;

            Ok(WorkoutPreset {
                id: preset_id,
                user_id,
                name,
                description,
                starred: false,
                created_at,
                exercises,
            })
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Presets with their member exercises, starred first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<WorkoutPreset>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM workout_presets
                 WHERE user_id = ? ORDER BY starred DESC, name COLLATE NOCASE",
            )?;
            let mut presets = stmt
                .query_map([&user_id], WorkoutPreset::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            for preset in &mut presets {
                preset.exercises = member_exercises(&conn, &preset.id)?;
            }
            Ok(presets)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn set_starred(&self, id: &str, user_id: &str, starred: bool) -> Result<()> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            let updated = conn.execute(
                "UPDATE workout_presets SET starred = ? WHERE id = ? AND user_id = ?",
                rusqlite::params![starred, id, user_id],
            )?;
            if updated == 0 {
                return Err(AppError::NotFound(format!("preset {}", id)));
            }
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> Result<()> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM workout_preset_exercises WHERE preset_id = ?",
                [&id],
            )?;
            let deleted = tx.execute(
                "DELETE FROM workout_presets WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            if deleted == 0 {
                return Err(AppError::NotFound(format!("preset {}", id)));
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

fn member_exercises(conn: &rusqlite::Connection, preset_id: &str) -> Result<Vec<PresetExercise>> {
    let mut stmt = conn.prepare(
        "SELECT pe.exercise_id, e.name, pe.position
         FROM workout_preset_exercises pe
         JOIN exercises e ON e.id = pe.exercise_id
         WHERE pe.preset_id = ? ORDER BY pe.position",
    )?;
    let exercises = stmt
        .query_map([preset_id], PresetExercise::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(exercises)
}
