use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use super::FromSqliteRow;

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutPreset {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    /// Member exercises in preset order. Empty until the list query fills it.
    pub exercises: Vec<PresetExercise>,
}

impl FromSqliteRow for WorkoutPreset {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            starred: row.get("starred")?,
            created_at: row.get("created_at")?,
            exercises: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PresetExercise {
    pub exercise_id: String,
    pub name: String,
    pub position: i32,
}

impl FromSqliteRow for PresetExercise {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            exercise_id: row.get("exercise_id")?,
            name: row.get("name")?,
            position: row.get("position")?,
        })
    }
}
