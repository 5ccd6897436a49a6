//! Workout session state machine.
//!
//! A [`WorkoutSession`] tracks one in-progress workout: `start()` opens it,
//! `add_exercise()` accumulates performed sets, and `end()` runs the
//! two-phase remote save (create the workout row, then link the persisted
//! sets to it in one batch). `abort()` discards everything without a single
//! remote call. State is mirrored to a [`SessionStore`] after every mutation
//! so a restarted process resumes mid-session.
//!
//! The two phases of `end()` are not atomic. A create failure leaves the
//! session intact for retry; a link failure after a successful create resets
//! the session and surfaces [`SessionError::PartialLink`] so the caller can
//! tell the workout row exists without its exercises attached.

mod snapshot;

pub use snapshot::{FileSessionStore, MemorySessionStore, SessionSnapshot, SessionStore};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dates::format_hms;
use crate::error::{AppError, Result, SessionError};
use crate::models::{NewWorkout, WorkoutSetLink};

/// One performed set held in the session. `set_record_id` is filled in once
/// the recording flow has persisted the set; only persisted sets can be
/// linked at session end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSet {
    pub set_record_id: Option<String>,
    pub reps: i32,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExercise {
    pub exercise_id: String,
    pub sets: Vec<SessionSet>,
}

/// Write-side collaborator for the two-phase save.
#[async_trait]
pub trait WorkoutWriter: Send + Sync {
    /// Create the workout row and return its id.
    async fn create_workout(&self, user_id: &str, workout: NewWorkout) -> Result<String>;

    /// Link the given set records to their workout in one batch.
    async fn link_sets(&self, links: Vec<WorkoutSetLink>) -> Result<()>;
}

/// Outcome of a successful `end()`.
#[derive(Debug, Clone)]
pub struct EndReport {
    pub workout_id: String,
    pub linked_sets: usize,
    /// Sets that never received a persisted id and were left out of the
    /// link batch.
    pub skipped_sets: usize,
}

#[derive(Default)]
struct State {
    started: bool,
    start_time: Option<DateTime<Utc>>,
    exercises: Vec<SessionExercise>,
}

pub struct WorkoutSession {
    user_id: String,
    writer: Arc<dyn WorkoutWriter>,
    store: Arc<dyn SessionStore>,
    state: Mutex<State>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when an `end()` exits on any path.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WorkoutSession {
    /// Create a session manager, restoring a previously mirrored in-progress
    /// session from `store` if one exists.
    pub fn new(
        user_id: impl Into<String>,
        writer: Arc<dyn WorkoutWriter>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let mut state = State::default();
        if let Some(snapshot) = store.load() {
            if snapshot.started {
                tracing::info!("restoring in-progress workout session");
                state.started = true;
                state.start_time = snapshot.start_time;
                state.exercises = snapshot.exercises;
            }
        }
        Self {
            user_id: user_id.into(),
            writer,
            store,
            state: Mutex::new(state),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_idle(&self) -> std::result::Result<(), SessionError> {
        if self.in_flight.load(Ordering::Acquire) {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    fn mirror(&self, state: &State) {
        let snapshot = SessionSnapshot {
            started: state.started,
            start_time: state.start_time,
            exercises: state.exercises.clone(),
        };
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!(error = %e, "failed to mirror session snapshot");
        }
    }

    fn reset(&self) {
        let mut state = self.lock();
        state.started = false;
        state.start_time = None;
        state.exercises.clear();
        drop(state);
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear session snapshot");
        }
    }

    /// Begin a workout. Any leftover in-memory exercise list from a prior
    /// session is discarded.
    pub fn start(&self) -> std::result::Result<(), SessionError> {
        self.check_idle()?;
        let mut state = self.lock();
        state.started = true;
        state.start_time = Some(Utc::now());
        state.exercises.clear();
        self.mirror(&state);
        tracing::info!("workout session started");
        Ok(())
    }

    /// Record performed sets for an exercise. Sets for an exercise already
    /// in the session append to its existing entry; a new exercise goes to
    /// the end of the list.
    pub fn add_exercise(
        &self,
        exercise_id: &str,
        sets: Vec<SessionSet>,
    ) -> std::result::Result<(), SessionError> {
        self.check_idle()?;

        let mut state = self.lock();
        if !state.started {
            tracing::warn!(exercise_id, "add_exercise on inactive session ignored");
            return Err(SessionError::NotStarted);
        }

        if sets.is_empty() {
            return Err(SessionError::InvalidSets(
                "at least one set is required".to_string(),
            ));
        }
        for set in &sets {
            if set.reps <= 0 {
                return Err(SessionError::InvalidSets(format!(
                    "reps must be positive, got {}",
                    set.reps
                )));
            }
            if set.weight.is_some_and(|w| w < 0.0) {
                return Err(SessionError::InvalidSets(
                    "weight must be non-negative".to_string(),
                ));
            }
        }

        match state
            .exercises
            .iter_mut()
            .find(|e| e.exercise_id == exercise_id)
        {
            Some(entry) => entry.sets.extend(sets),
            None => state.exercises.push(SessionExercise {
                exercise_id: exercise_id.to_string(),
                sets,
            }),
        }
        self.mirror(&state);
        Ok(())
    }

    /// Finish the session: create the workout row, link its sets, reset.
    pub async fn end(
        &self,
        rating: i32,
        notes: Option<String>,
    ) -> std::result::Result<EndReport, SessionError> {
        self.end_inner(rating, notes, None).await
    }

    /// Like [`end`](Self::end), but each remote call is abandoned after
    /// `timeout` and surfaces as a timeout condition.
    pub async fn end_with_timeout(
        &self,
        rating: i32,
        notes: Option<String>,
        timeout: std::time::Duration,
    ) -> std::result::Result<EndReport, SessionError> {
        self.end_inner(rating, notes, Some(timeout)).await
    }

    async fn end_inner(
        &self,
        rating: i32,
        notes: Option<String>,
        timeout: Option<std::time::Duration>,
    ) -> std::result::Result<EndReport, SessionError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::Busy);
        }
        let _guard = FlightGuard(&self.in_flight);

        // The in-flight flag blocks every other mutation, so this snapshot
        // stays valid across the awaits below.
        let (start_time, exercises) = {
            let state = self.lock();
            match (state.started, state.start_time) {
                (true, Some(start_time)) => (start_time, state.exercises.clone()),
                _ => return Err(SessionError::NotActive),
            }
        };

        let workout = NewWorkout {
            rating: Some(rating),
            notes,
            start_time,
            end_time: Utc::now(),
        };
        let workout_id = with_timeout(timeout, self.writer.create_workout(&self.user_id, workout))
            .await
            .map_err(SessionError::CreateWorkout)?;

        let mut links = Vec::new();
        let mut skipped_sets = 0;
        for exercise in &exercises {
            for set in &exercise.sets {
                match &set.set_record_id {
                    Some(set_record_id) => links.push(WorkoutSetLink {
                        workout_id: workout_id.clone(),
                        set_record_id: set_record_id.clone(),
                    }),
                    None => {
                        skipped_sets += 1;
                        tracing::warn!(
                            exercise_id = %exercise.exercise_id,
                            "set has no persisted id, leaving it out of the link batch"
                        );
                    }
                }
            }
        }

        let linked_sets = links.len();
        if !links.is_empty() {
            if let Err(e) = with_timeout(timeout, self.writer.link_sets(links)).await {
                // The workout row exists without its sets. Reset anyway so
                // the session is not wedged, and report the partial state.
                tracing::error!(workout_id = %workout_id, error = %e, "link-sets failed after create");
                self.reset();
                return Err(SessionError::PartialLink {
                    workout_id,
                    source: e,
                });
            }
        }

        self.reset();
        tracing::info!(workout_id = %workout_id, linked_sets, skipped_sets, "workout session saved");
        Ok(EndReport {
            workout_id,
            linked_sets,
            skipped_sets,
        })
    }

    /// Discard the in-progress session. Never makes a remote call.
    pub fn abort(&self) -> std::result::Result<(), SessionError> {
        self.check_idle()?;
        self.reset();
        tracing::info!("workout session aborted");
        Ok(())
    }

    /// Time since `start()`, or `None` while idle.
    pub fn elapsed(&self) -> Option<Duration> {
        let state = self.lock();
        match (state.started, state.start_time) {
            (true, Some(start_time)) => Some(Utc::now() - start_time),
            _ => None,
        }
    }

    /// `elapsed()` formatted as `HH:MM:SS`; `00:00:00` while idle.
    pub fn elapsed_display(&self) -> String {
        self.elapsed()
            .map(format_hms)
            .unwrap_or_else(|| "00:00:00".to_string())
    }

    pub fn started(&self) -> bool {
        self.lock().started
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.lock().start_time
    }

    pub fn exercises(&self) -> Vec<SessionExercise> {
        self.lock().exercises.clone()
    }
}

async fn with_timeout<T, F>(timeout: Option<std::time::Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(limit)),
        },
        None => fut.await,
    }
}
