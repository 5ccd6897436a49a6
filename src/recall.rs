//! Weekly exercise recall.
//!
//! Walks backward one week at a time (up to [`MAX_LOOKBACK_WEEKS`]) and
//! returns the exercises logged on the most recent checkpoint day that has
//! any records. Each checkpoint is the single calendar day exactly
//! `7 * weeks_ago` days before `today`, matching the behavior users already
//! rely on ("what did I do last Friday"), not a rolling 7-day window.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

use crate::dates::{day_bounds, lookback_day};
use crate::error::Result;

pub const MAX_LOOKBACK_WEEKS: u32 = 52;

/// An exercise referenced by at least one record in the queried range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExercise {
    pub exercise_id: String,
    pub name: String,
}

/// Read-side collaborator: exercise records by creation-time range.
#[async_trait]
pub trait RecordQuery: Send + Sync {
    /// All `{exercise_id, name}` pairs of records created in the closed
    /// range `[start, end]`, one entry per record (duplicates allowed).
    async fn exercises_recorded_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RecordedExercise>>;
}

/// Result of a successful recall: the checkpoint that matched and its
/// de-duplicated exercises in first-seen order.
#[derive(Debug, Clone)]
pub struct WeeklyExercises {
    pub weeks_ago: u32,
    pub exercises: Vec<RecordedExercise>,
}

/// Find the most recent weekly checkpoint with logged exercise records.
///
/// Returns `None` when all checkpoints in the past year are empty, which is
/// a legitimate new-user outcome rather than an error. A failed query for
/// one checkpoint is logged and treated as empty so that an earlier week
/// with data can still be found.
pub async fn most_recent_logged_week(
    query: &dyn RecordQuery,
    user_id: &str,
    today: NaiveDate,
) -> Option<WeeklyExercises> {
    for weeks_ago in 1..=MAX_LOOKBACK_WEEKS {
        let (start, end) = day_bounds(lookback_day(today, weeks_ago));

        let records = match query.exercises_recorded_between(user_id, start, end).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(weeks_ago, error = %e, "recall query failed, skipping week");
                continue;
            }
        };

        if records.is_empty() {
            continue;
        }

        let mut seen = HashSet::new();
        let exercises: Vec<RecordedExercise> = records
            .into_iter()
            .filter(|r| seen.insert(r.exercise_id.clone()))
            .collect();

        tracing::debug!(weeks_ago, count = exercises.len(), "recall found records");
        return Some(WeeklyExercises {
            weeks_ago,
            exercises,
        });
    }

    tracing::debug!(user_id, "no exercise records in the trailing year");
    None
}
