use std::time::Duration;
use thiserror::Error;

/// Storage and collaborator failures.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures of the workout session state machine.
///
/// `CreateWorkout` leaves the session untouched so the caller may retry;
/// `PartialLink` means the workout row exists but its sets were not linked,
/// and the session has already been reset.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No workout session has been started")]
    NotStarted,

    #[error("Workout session is not active")]
    NotActive,

    #[error("Invalid sets: {0}")]
    InvalidSets(String),

    #[error("Another session operation is in flight")]
    Busy,

    #[error("Failed to create workout record")]
    CreateWorkout(#[source] AppError),

    #[error("Workout {workout_id} was created but its sets were not linked")]
    PartialLink {
        workout_id: String,
        #[source]
        source: AppError,
    },
}

impl SessionError {
    /// Whether the underlying remote call timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SessionError::CreateWorkout(AppError::Timeout(_))
                | SessionError::PartialLink {
                    source: AppError::Timeout(_),
                    ..
                }
        )
    }
}
