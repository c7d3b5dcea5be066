//! Readings from external sources such as a step-count aggregator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used by signal producers.
pub const SIGNAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// A `(habit type, value, date)` reading reported by an outside source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSignal {
    pub habit_type: String,
    pub value: u32,
    /// Day the producer last updated `value`, as `YYYY-MM-DD`.
    pub date: String,
}

impl ExternalSignal {
    pub fn new(habit_type: impl Into<String>, value: u32, date: NaiveDate) -> Self {
        Self {
            habit_type: habit_type.into(),
            value,
            date: date.format(SIGNAL_DATE_FORMAT).to_string(),
        }
    }

    /// Parsed date, or `None` if the producer sent something unreadable.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), SIGNAL_DATE_FORMAT).ok()
    }

    pub fn matches_type(&self, habit_type: &str) -> bool {
        self.habit_type.trim().eq_ignore_ascii_case(habit_type.trim())
    }
}
