pub mod exercise_repo;
pub mod preset_repo;
pub mod record_repo;
pub mod workout_repo;

pub use exercise_repo::ExerciseRepository;
pub use preset_repo::PresetRepository;
pub use record_repo::RecordRepository;
pub use workout_repo::WorkoutRepository;
