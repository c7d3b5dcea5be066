//! Schedule descriptors: "Daily", "Weekly", "Weekdays" or a day list.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// When a habit is due.
///
/// Serialized as its descriptor string, e.g. `"Weekdays"` or `"Mon,Wed,Fri"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HabitSchedule {
    #[default]
    Daily,
    /// Once a week, on the weekday the habit was created.
    Weekly,
    /// Monday through Friday.
    Weekdays,
    /// Explicit set of days, kept in Monday-first order without duplicates.
    Days(Vec<Weekday>),
}

impl HabitSchedule {
    /// Whether `day` is a due day. `anchor` is the weekday used by `Weekly`.
    pub fn includes(&self, day: Weekday, anchor: Weekday) -> bool {
        match self {
            HabitSchedule::Daily => true,
            HabitSchedule::Weekly => day == anchor,
            HabitSchedule::Weekdays => !matches!(day, Weekday::Sat | Weekday::Sun),
            HabitSchedule::Days(days) => days.contains(&day),
        }
    }
}

fn parse_day(token: &str) -> Option<Weekday> {
    let lower = token.trim().to_ascii_lowercase();
    let day = match lower.as_str() {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tues" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thur" | "thurs" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn day_abbrev(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

impl FromStr for HabitSchedule {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "daily" => return Ok(HabitSchedule::Daily),
            "weekly" => return Ok(HabitSchedule::Weekly),
            "weekdays" => return Ok(HabitSchedule::Weekdays),
            _ => {}
        }

        let mut days = Vec::new();
        for token in trimmed.split(',').filter(|t| !t.trim().is_empty()) {
            let day = parse_day(token)
                .ok_or_else(|| ValidationError::InvalidSchedule(s.to_string()))?;
            if !days.contains(&day) {
                days.push(day);
            }
        }
        if days.is_empty() {
            return Err(ValidationError::InvalidSchedule(s.to_string()));
        }
        days.sort_by_key(|d| d.num_days_from_monday());
        Ok(HabitSchedule::Days(days))
    }
}

impl fmt::Display for HabitSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HabitSchedule::Daily => f.write_str("Daily"),
            HabitSchedule::Weekly => f.write_str("Weekly"),
            HabitSchedule::Weekdays => f.write_str("Weekdays"),
            HabitSchedule::Days(days) => {
                let names: Vec<&str> = days.iter().map(|d| day_abbrev(*d)).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

impl TryFrom<String> for HabitSchedule {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HabitSchedule> for String {
    fn from(schedule: HabitSchedule) -> Self {
        schedule.to_string()
    }
}
