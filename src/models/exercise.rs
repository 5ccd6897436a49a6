use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::FromSqliteRow;

/// A user-owned catalog entry. `muscles_worked` maps a muscle name to the
/// set-count contribution one performed set adds to it (e.g. an incline
/// press might count 1.0 toward chest and 0.5 toward shoulders).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub muscles_worked: Option<HashMap<String, f64>>,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for Exercise {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let muscles_json: Option<String> = row.get("muscles_worked")?;
        let muscles_worked = match muscles_json {
            Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
            })?),
            None => None,
        };
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            muscles_worked,
            created_at: row.get("created_at")?,
        })
    }
}
