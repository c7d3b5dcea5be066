//! Mood log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_MOOD: u8 = 1;
pub const MAX_MOOD: u8 = 5;

/// One logged mood, scored 1 (awful) to 5 (great).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: i64,
    pub score: u8,
    pub note: Option<String>,
    pub logged_at: DateTime<Utc>,
}

impl MoodEntry {
    pub fn label(&self) -> &'static str {
        mood_label(self.score)
    }
}

/// Reject scores outside 1..=5.
pub fn validate_score(score: u8) -> Result<u8, ValidationError> {
    if (MIN_MOOD..=MAX_MOOD).contains(&score) {
        Ok(score)
    } else {
        Err(ValidationError::invalid(
            "score",
            format!("{score} is outside {MIN_MOOD}..={MAX_MOOD}"),
        ))
    }
}

pub fn mood_label(score: u8) -> &'static str {
    match score {
        1 => "awful",
        2 => "low",
        3 => "okay",
        4 => "good",
        5 => "great",
        _ => "unknown",
    }
}
