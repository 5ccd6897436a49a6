use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub user_id: String,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for Workout {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            rating: row.get("rating")?,
            notes: row.get("notes")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Input for the create-workout call made at the end of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkout {
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// One row of the workout-to-set linking batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSetLink {
    pub workout_id: String,
    pub set_record_id: String,
}
