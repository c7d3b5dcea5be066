//! # Wellday Core Library
//!
//! Business logic for the Wellday wellness dashboard: habit tracking with
//! day-indexed completion records, streaks and daily reconciliation. The
//! `wellday` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Habit**: per-habit state machine (toggle, increment, mark, unmark,
//!   external sync) over a completion record keyed by local midnight
//! - **Engine**: owns the collection, resolves ids and persists after each
//!   mutation through an injected store
//! - **Storage**: SQLite key/value and mood tables, JSON file store, TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`HabitEngine`]: collection owner and mutation entry point
//! - [`Habit`]: habit record and its operations
//! - [`HabitStore`]: whole-collection persistence trait
//! - [`Config`]: application configuration management

pub mod engine;
pub mod error;
pub mod habit;
pub mod mood;
pub mod signal;
pub mod storage;

pub use engine::{DaySummary, HabitEngine, SignalApplied};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use habit::{Habit, HabitSchedule, NewHabit, SyncOutcome, WeekCell};
pub use mood::MoodEntry;
pub use signal::ExternalSignal;
pub use storage::{Config, Database, HabitStore, JsonFileStore, MemoryStore, StorageBackend};
