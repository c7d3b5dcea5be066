//! SQLite-based storage.
//!
//! Provides persistent storage for:
//! - The habit collection, as a JSON blob in a key-value table
//! - Mood log entries

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use super::{data_dir, HabitStore};
use crate::error::{DatabaseError, Result};
use crate::habit::Habit;
use crate::mood::{validate_score, MoodEntry};

const DEFAULT_HABITS_KEY: &str = "habits";

/// SQLite database for habits and mood entries.
pub struct Database {
    conn: Connection,
    habits_key: String,
}

impl Database {
    /// Open the database at `<data dir>/wellday.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("wellday.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn,
            habits_key: DEFAULT_HABITS_KEY.to_string(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Use a different kv key for the habit collection.
    pub fn with_habits_key(mut self, key: impl Into<String>) -> Self {
        self.habits_key = key.into();
        self
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS mood_entries (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    score     INTEGER NOT NULL,
                    note      TEXT,
                    logged_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_mood_entries_logged_at ON mood_entries(logged_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Record a mood entry and return its id.
    ///
    /// # Errors
    /// Returns a validation error for scores outside 1..=5, or a database
    /// error if the insert fails.
    pub fn log_mood(&self, score: u8, note: Option<&str>, logged_at: DateTime<Utc>) -> Result<i64> {
        let score = validate_score(score)?;
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        self.conn.execute(
            "INSERT INTO mood_entries (score, note, logged_at) VALUES (?1, ?2, ?3)",
            params![score, note, logged_at.to_rfc3339_opts(SecondsFormat::Millis, true)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Mood entries logged at or after `since`, newest first.
    pub fn mood_entries_since(&self, since: DateTime<Utc>) -> Result<Vec<MoodEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, score, note, logged_at
             FROM mood_entries
             WHERE logged_at >= ?1
             ORDER BY logged_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![since.to_rfc3339_opts(SecondsFormat::Millis, true)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, score, note, logged_at) = row?;
            let logged_at = DateTime::parse_from_rfc3339(&logged_at)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad logged_at '{logged_at}': {e}")))?
                .with_timezone(&Utc);
            entries.push(MoodEntry {
                id,
                score,
                note,
                logged_at,
            });
        }
        Ok(entries)
    }

    /// Mean score since `since`, or `None` when nothing was logged.
    pub fn average_mood_since(&self, since: DateTime<Utc>) -> Result<Option<f64>> {
        let avg = self.conn.query_row(
            "SELECT AVG(score) FROM mood_entries WHERE logged_at >= ?1",
            params![since.to_rfc3339_opts(SecondsFormat::Millis, true)],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(avg)
    }
}

impl HabitStore for Database {
    fn load_all(&self) -> Result<Vec<Habit>> {
        match self.kv_get(&self.habits_key)? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_all(&mut self, habits: &[Habit]) -> Result<()> {
        let blob = serde_json::to_string(habits)?;
        self.kv_set(&self.habits_key, &blob)?;
        Ok(())
    }
}
