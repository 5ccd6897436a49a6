//! Workout-tracking core library.
//!
//! The two centerpieces are the in-progress workout session state machine
//! ([`session::WorkoutSession`]) and the backward weekly exercise recall
//! ([`recall::most_recent_logged_week`]). Around them sits a SQLite-backed
//! storage layer (exercise catalog, set records, workouts, presets) that
//! implements the collaborator traits the core consumes, plus pure
//! aggregation helpers for dashboards.
//!
//! This crate has no UI or HTTP surface; it is meant to be embedded.

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod recall;
pub mod repositories;
pub mod session;
pub mod stats;

pub use error::{AppError, Result, SessionError};
