use rusqlite::Row;

pub mod exercise;
pub mod preset;
pub mod record;
pub mod workout;

pub use exercise::Exercise;
pub use preset::{PresetExercise, WorkoutPreset};
pub use record::{ExerciseRecord, NewSet, RecordWithSets, SetRecord};
pub use workout::{NewWorkout, Workout, WorkoutSetLink};

pub trait FromSqliteRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}
