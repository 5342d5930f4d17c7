//! Layered configuration: built-in defaults, an optional TOML file, then `CURBSIDE__` variables.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use chrono_tz::Tz;
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use curbside_core::scheduler::SchedulerSettings;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "CURBSIDE";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Config {
    pub(crate) server: ServerConfig,
    pub(crate) logging: LoggingConfig,
    pub(crate) calendar: CalendarConfig,
    pub(crate) reminders: RemindersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServerConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoggingConfig {
    pub(crate) level: String,
    pub(crate) format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CalendarConfig {
    /// JSON calendar replacing the bundled schedule.
    #[serde(default)]
    pub(crate) path: Option<PathBuf>,
    pub(crate) time_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RemindersConfig {
    pub(crate) max_weeks: u32,
    pub(crate) pending_cap: usize,
    pub(crate) low_water_mark: usize,
    pub(crate) refresh_after_days: i64,
    pub(crate) preferences_path: PathBuf,
}

impl Config {
    /// Load configuration.
    ///
    /// Priority, highest first: `CURBSIDE__SECTION__KEY` variables, the file at `config_path`
    /// (default `config/default.toml`, skipped when absent), built-in defaults.
    pub(crate) fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let path = config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
        Self::build(Some(Path::new(&path)), environment())
    }

    fn build(file: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("calendar.time_zone", "America/Los_Angeles")?
            .set_default("reminders.max_weeks", 52)?
            .set_default("reminders.pending_cap", 64)?
            .set_default("reminders.low_water_mark", 20)?
            .set_default("reminders.refresh_after_days", 30)?
            .set_default("reminders.preferences_path", "curbside-preferences.json")?;

        if let Some(path) = file.filter(|path| path.exists()) {
            builder = builder.add_source(File::from(path));
        }

        builder.add_source(environment).build()?.try_deserialize()
    }

    /// Reject settings the service cannot run with.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_owned());
        }
        self.time_zone()?;
        let reminders = &self.reminders;
        if usize::try_from(reminders.max_weeks).unwrap_or(usize::MAX) > reminders.pending_cap {
            return Err(format!(
                "reminders.max_weeks ({}) must not exceed reminders.pending_cap ({})",
                reminders.max_weeks, reminders.pending_cap
            ));
        }
        if reminders.low_water_mark > usize::try_from(reminders.max_weeks).unwrap_or(usize::MAX) {
            return Err(format!(
                "reminders.low_water_mark ({}) must not exceed reminders.max_weeks ({})",
                reminders.low_water_mark, reminders.max_weeks
            ));
        }
        if reminders.refresh_after_days <= 0 {
            return Err("reminders.refresh_after_days must be positive".to_owned());
        }
        Ok(())
    }

    pub(crate) fn time_zone(&self) -> Result<Tz, String> {
        self.calendar
            .time_zone
            .parse::<Tz>()
            .map_err(|err| format!("calendar.time_zone {:?}: {err}", self.calendar.time_zone))
    }

    pub(crate) fn scheduler_settings(&self) -> Result<SchedulerSettings, String> {
        Ok(SchedulerSettings {
            zone: self.time_zone()?,
            max_weeks: self.reminders.max_weeks,
            pending_cap: self.reminders.pending_cap,
            low_water_mark: self.reminders.low_water_mark,
            refresh_after: TimeDelta::days(self.reminders.refresh_after_days),
        })
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}
