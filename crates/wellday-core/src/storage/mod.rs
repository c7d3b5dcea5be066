//! Persistence collaborators for the habit engine.
//!
//! The engine only ever loads or saves the whole habit collection through
//! [`HabitStore`]. Three stores are provided:
//! - [`Database`]: SQLite key/value table holding the collection as JSON
//! - [`JsonFileStore`]: a single pretty-printed JSON file
//! - [`MemoryStore`]: in-process, for tests and previews

mod config;
pub mod database;
pub mod json_store;

pub use config::{Config, DefaultsConfig, RemindersConfig, StorageBackend, StorageConfig, SyncConfig};
pub use database::Database;
pub use json_store::JsonFileStore;

use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::habit::Habit;

/// Whole-collection persistence. There is no partial update API; every save
/// replaces what was stored before.
pub trait HabitStore {
    /// Read every habit, archived ones included.
    fn load_all(&self) -> Result<Vec<Habit>>;

    /// Replace the stored collection.
    fn save_all(&mut self, habits: &[Habit]) -> Result<()>;
}

impl<T: HabitStore + ?Sized> HabitStore for Box<T> {
    fn load_all(&self) -> Result<Vec<Habit>> {
        (**self).load_all()
    }

    fn save_all(&mut self, habits: &[Habit]) -> Result<()> {
        (**self).save_all(habits)
    }
}

/// Store that keeps the collection in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    habits: Vec<Habit>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_habits(habits: Vec<Habit>) -> Self {
        Self { habits, saves: 0 }
    }

    /// Number of completed `save_all` calls.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }
}

impl HabitStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Habit>> {
        Ok(self.habits.clone())
    }

    fn save_all(&mut self, habits: &[Habit]) -> Result<()> {
        self.habits = habits.to_vec();
        self.saves += 1;
        Ok(())
    }
}

/// Returns the data directory.
///
/// `WELLDAY_DATA_DIR` wins when set. Otherwise `~/.config/wellday`, or
/// `~/.config/wellday-dev` when `WELLDAY_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("WELLDAY_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("WELLDAY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("wellday-dev")
            } else {
                base_dir.join("wellday")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
