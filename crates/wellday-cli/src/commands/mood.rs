use chrono::{Duration, Utc};
use clap::Subcommand;
use serde::Serialize;
use wellday_core::{Database, MoodEntry};

#[derive(Subcommand)]
pub enum MoodAction {
    /// Log a mood from 1 (awful) to 5 (great)
    Log {
        score: u8,
        /// Free-text note
        #[arg(long)]
        note: Option<String>,
    },
    /// List recent mood entries
    List {
        /// How many days back to include
        #[arg(long, default_value = "7")]
        days: i64,
    },
}

#[derive(Serialize)]
struct MoodReport {
    days: i64,
    average: Option<f64>,
    entries: Vec<MoodEntry>,
}

pub fn run(action: MoodAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        MoodAction::Log { score, note } => {
            let id = db.log_mood(score, note.as_deref(), Utc::now())?;
            println!("{}", serde_json::json!({ "id": id, "score": score }));
        }
        MoodAction::List { days } => {
            let since = Utc::now() - Duration::days(days.clamp(0, 36_500));
            let report = MoodReport {
                days,
                average: db.average_mood_since(since)?,
                entries: db.mood_entries_since(since)?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
