use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

/// A persisted occurrence of performing an exercise at one timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: String,
    pub exercise_id: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for ExerciseRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            exercise_id: row.get("exercise_id")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// One persisted set within a record. `set_number` is 1-based position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRecord {
    pub id: String,
    pub exercise_record_id: String,
    pub set_number: i32,
    pub reps: i32,
    pub weight: Option<f64>,
    pub rest_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for SetRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            exercise_record_id: row.get("exercise_record_id")?,
            set_number: row.get("set_number")?,
            reps: row.get("reps")?,
            weight: row.get("weight")?,
            rest_seconds: row.get("rest_seconds")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A set as entered, before it has an identity of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSet {
    pub reps: i32,
    pub weight: Option<f64>,
    pub rest_seconds: Option<i32>,
}

/// A record together with its ordered sets (history and "recent" views).
#[derive(Debug, Clone, Serialize)]
pub struct RecordWithSets {
    pub record: ExerciseRecord,
    pub sets: Vec<SetRecord>,
}
