//! Habit tracking commands for CLI.

use chrono::{Local, NaiveDate, Utc};
use clap::Subcommand;
use serde::Serialize;
use tracing::debug;
use wellday_core::signal::SIGNAL_DATE_FORMAT;
use wellday_core::{
    Config, Database, ExternalSignal, Habit, HabitEngine, HabitSchedule, HabitStore,
    JsonFileStore, NewHabit, StorageBackend,
};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Add {
        /// Habit type label (e.g. "Water", "Steps")
        habit_type: String,
        /// Daily target value
        #[arg(long)]
        target: Option<u32>,
        /// Unit label
        #[arg(long)]
        unit: Option<String>,
        /// Daily, Weekly, Weekdays or a day list like "Mon,Wed,Fri"
        #[arg(long)]
        schedule: Option<String>,
        /// Progress comes from an external signal (step sensor)
        #[arg(long)]
        external: bool,
        /// Reminder time as HH:MM
        #[arg(long)]
        remind: Option<String>,
    },
    /// List habits
    List {
        /// Include archived habits
        #[arg(long)]
        all: bool,
    },
    /// Show one habit with derived status
    Show {
        /// Habit ID
        id: String,
    },
    /// Toggle today's completion
    Toggle {
        /// Habit ID
        id: String,
    },
    /// Add one unit of progress toward today's target
    Increment {
        /// Habit ID
        id: String,
    },
    /// Mark today complete
    Complete {
        /// Habit ID
        id: String,
    },
    /// Remove today's completion
    Unmark {
        /// Habit ID
        id: String,
    },
    /// Archive (soft delete) a habit
    Archive {
        /// Habit ID
        id: String,
    },
    /// Show the Sunday-first week strip
    Week {
        /// Habit ID
        id: String,
    },
    /// Dashboard summary for today
    Summary,
    /// Apply an external reading to synced habits of a type
    Sync {
        /// Reported value
        value: u32,
        /// Habit type the reading belongs to (default: sync.step_habit_type)
        #[arg(long = "type")]
        habit_type: Option<String>,
        /// Date the source last updated, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Run daily rollover and self-heal over all habits
    Reconcile,
}

#[derive(Serialize)]
struct HabitStatus<'a> {
    #[serde(flatten)]
    habit: &'a Habit,
    completed_today: bool,
    longest_streak: u32,
    progress: f64,
}

fn status(habit: &Habit) -> HabitStatus<'_> {
    HabitStatus {
        habit,
        completed_today: habit.is_completed_today(&Local::now()),
        longest_streak: habit.longest_streak(),
        progress: habit.progress(),
    }
}

fn open_store(config: &Config) -> Result<Box<dyn HabitStore>, Box<dyn std::error::Error>> {
    debug!(backend = ?config.storage.backend, "opening habit store");
    let store: Box<dyn HabitStore> = match config.storage.backend {
        StorageBackend::Sqlite => {
            Box::new(Database::open()?.with_habits_key(config.storage.habits_key.clone()))
        }
        StorageBackend::Json => Box::new(JsonFileStore::open()?),
    };
    Ok(store)
}

fn parse_time(value: &str) -> Result<(u8, u8), Box<dyn std::error::Error>> {
    let (hour, minute) = value
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{value}', expected HH:MM"))?;
    Ok((hour.trim().parse()?, minute.trim().parse()?))
}

fn print_habit(habit: Option<Habit>, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let habit = habit.ok_or_else(|| format!("habit not found: {id}"))?;
    println!("{}", serde_json::to_string_pretty(&status(&habit))?);
    Ok(())
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let now = Local::now();
    let mut engine = HabitEngine::load(open_store(&config)?, &now);

    match action {
        HabitAction::Add {
            habit_type,
            target,
            unit,
            schedule,
            external,
            remind,
        } => {
            let schedule: HabitSchedule = schedule
                .as_deref()
                .unwrap_or(config.defaults.schedule.as_str())
                .parse()?;
            let reminder = match remind {
                Some(value) => Some(parse_time(&value)?),
                None if config.reminders.enabled => {
                    Some((config.reminders.default_hour, config.reminders.default_minute))
                }
                None => None,
            };
            let draft = NewHabit {
                habit_type,
                target_value: target.unwrap_or(config.defaults.target_value),
                unit: unit.unwrap_or_else(|| config.defaults.unit.clone()),
                schedule,
                externally_synced: external,
                reminder,
            };
            let habit = engine.add_habit(draft, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&status(&habit))?);
        }
        HabitAction::List { all } => {
            let habits: Vec<HabitStatus<'_>> = if all {
                engine.all().iter().map(status).collect()
            } else {
                engine.active().map(status).collect()
            };
            println!("{}", serde_json::to_string_pretty(&habits)?);
        }
        HabitAction::Show { id } => {
            print_habit(engine.get(&id).cloned(), &id)?;
        }
        HabitAction::Toggle { id } => {
            let habit = engine.toggle_completion(&id, &now)?;
            print_habit(habit, &id)?;
        }
        HabitAction::Increment { id } => {
            let habit = engine.increment_progress(&id, &now)?;
            print_habit(habit, &id)?;
        }
        HabitAction::Complete { id } => {
            let habit = engine.mark_complete(&id, &now)?;
            print_habit(habit, &id)?;
        }
        HabitAction::Unmark { id } => {
            let habit = engine.unmark(&id, &now)?;
            print_habit(habit, &id)?;
        }
        HabitAction::Archive { id } => {
            let habit = engine.archive(&id)?;
            print_habit(habit, &id)?;
        }
        HabitAction::Week { id } => {
            let habit = engine.get(&id).ok_or_else(|| format!("habit not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&habit.week_strip(&now))?);
        }
        HabitAction::Summary => {
            println!("{}", serde_json::to_string_pretty(&engine.summary(&now))?);
        }
        HabitAction::Sync {
            value,
            habit_type,
            date,
        } => {
            let date = date.unwrap_or_else(|| now.date_naive().format(SIGNAL_DATE_FORMAT).to_string());
            // apply_signal would treat a bad date as stale; fail instead
            NaiveDate::parse_from_str(&date, SIGNAL_DATE_FORMAT)
                .map_err(|e| format!("invalid date '{date}': {e}"))?;
            let signal = ExternalSignal {
                habit_type: habit_type.unwrap_or_else(|| config.sync.step_habit_type.clone()),
                value,
                date,
            };
            let applied = engine.apply_signal(&signal, &now)?;
            println!("{}", serde_json::to_string_pretty(&applied)?);
        }
        HabitAction::Reconcile => {
            let changed = engine.reconcile(&now)?;
            println!("{}", serde_json::json!({ "reconciled": changed }));
        }
    }
    Ok(())
}
