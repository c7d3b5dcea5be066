//! Habit collection stored as one JSON file.

use std::path::{Path, PathBuf};

use super::{data_dir, HabitStore};
use crate::error::Result;
use crate::habit::Habit;

const HABITS_FILE: &str = "habits.json";

/// JSON file store. A missing file reads as an empty collection.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `habits.json` in the data directory.
    pub fn open() -> Result<Self> {
        Ok(Self::new_with_path(data_dir()?.join(HABITS_FILE)))
    }

    pub fn new_with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HabitStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Habit>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save_all(&mut self, habits: &[Habit]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(habits)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}
