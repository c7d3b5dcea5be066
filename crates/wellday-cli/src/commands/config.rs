//! `wellday config`: read and edit `config.toml` in the data directory.
//!
//! Keys are dot paths into the four sections: `storage.backend`,
//! `storage.habits_key`, `defaults.target_value`, `defaults.unit`,
//! `defaults.schedule`, `reminders.enabled`, `reminders.default_hour`,
//! `reminders.default_minute` and `sync.step_habit_type`.

use clap::Subcommand;
use wellday_core::{Config, HabitSchedule};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value
    Get {
        /// Dot-separated key (e.g. "reminders.default_hour")
        key: String,
    },
    /// Change one value and save
    Set {
        /// Dot-separated key (e.g. "storage.backend")
        key: String,
        /// New value; parsed as the key's type
        value: String,
    },
    /// Print the whole config as JSON
    List,
    /// Print where the config file lives
    Path,
    /// Overwrite the config file with defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            // catch a bad default schedule now rather than at the next `habit add`
            config.defaults.schedule.parse::<HabitSchedule>()?;
            config.save()?;
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults at {}", Config::path()?.display());
        }
    }
    Ok(())
}
