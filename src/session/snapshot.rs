//! Session snapshot persistence.
//!
//! The in-memory session mirrors itself to a [`SessionStore`] after every
//! mutation so an interrupted process can pick the workout back up. The
//! in-memory state stays authoritative; an unreadable snapshot loads as
//! `None` with a warning rather than failing construction.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

use super::SessionExercise;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub started: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub exercises: Vec<SessionExercise>,
}

pub trait SessionStore: Send + Sync {
    /// Previously saved snapshot, or `None` when absent or unreadable.
    fn load(&self) -> Option<SessionSnapshot>;
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON snapshot at a fixed path, written atomically via a temp file in the
/// same directory followed by a rename.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<SessionSnapshot> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no session snapshot");
            return None;
        }
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable session snapshot");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "corrupt session snapshot");
                None
            }
        }
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| AppError::Internal(e.to_string()))?;

        let temp =
            NamedTempFile::new_in(parent).map_err(|e| AppError::Internal(e.to_string()))?;
        let contents = serde_json::to_string(snapshot)?;
        temp.as_file()
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::Internal(e.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        temp.persist(&self.path)
            .map_err(|e| AppError::Internal(e.error.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(e.to_string())),
        }
    }
}

/// In-process store for tests and embedders without a filesystem.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<SessionSnapshot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<SessionSnapshot> {
        self.inner.lock().ok()?.clone()
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(snapshot.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = None;
        }
        Ok(())
    }
}
