//! Typed application settings stored in `config.toml`
//!
//! Every field has a serde default so a partial (or missing) file still
//! produces a complete [`AppSettings`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::schedule::ReminderPolicy;
use crate::tracing::TracingLevel;

/// Root settings document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Where the JSON stores live
    pub storage: StorageSettings,
    /// Reminder notification policy
    pub reminders: ReminderSettings,
    /// Weather endpoint and polling
    pub weather: WeatherSettings,
    /// Poll intervals for the polling services
    pub polling: PollingSettings,
    /// Network service options
    pub network: NetworkSettings,
    /// Calendar options
    pub calendar: CalendarSettings,
    /// Log output
    pub logging: LoggingSettings,
}

impl AppSettings {
    /// Checks value ranges that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.reminders.lead_minutes.is_empty() {
            return Err(invalid("reminders.lead_minutes", "at least one lead time is required"));
        }
        if self.polling.calendar_secs == 0 {
            return Err(invalid("polling.calendar_secs", "must be greater than zero"));
        }
        if self.polling.system_secs == 0 {
            return Err(invalid("polling.system_secs", "must be greater than zero"));
        }
        if self.weather.enabled && self.weather.poll_interval_secs == 0 {
            return Err(invalid("weather.poll_interval_secs", "must be greater than zero"));
        }
        for holiday in &self.calendar.holidays {
            if NaiveDate::from_ymd_opt(2024, holiday.month, holiday.day).is_none() {
                return Err(invalid(
                    "calendar.holidays",
                    &format!("{} has no valid date {}/{}", holiday.name, holiday.month, holiday.day),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Storage location for the reminder and to-do files
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding `reminders.json` and `todo.json`.
    /// `~` is expanded; `None` means `$XDG_DATA_HOME/deskbar`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl StorageSettings {
    /// File name of the reminders store
    pub const REMINDERS_FILE: &'static str = "reminders.json";
    /// File name of the to-do store
    pub const TODO_FILE: &'static str = "todo.json";

    /// Resolves the storage directory
    #[must_use]
    pub fn resolved_directory(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("deskbar"),
        }
    }

    /// Full path of the reminders store
    #[must_use]
    pub fn reminders_path(&self) -> PathBuf {
        self.resolved_directory().join(Self::REMINDERS_FILE)
    }

    /// Full path of the to-do store
    #[must_use]
    pub fn todo_path(&self) -> PathBuf {
        self.resolved_directory().join(Self::TODO_FILE)
    }
}

/// Reminder notification timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    /// Minutes before a timed reminder at which to notify
    pub lead_minutes: Vec<u32>,
    /// Delay of the acknowledgement for all-day reminders due today
    pub all_day_delay_secs: u64,
    /// Delay of the heads-up for reminders due tomorrow
    pub next_day_delay_secs: u64,
    /// Days after its date a reminder is kept
    pub retention_days: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            lead_minutes: vec![0, 5, 10, 30, 60],
            all_day_delay_secs: 30,
            next_day_delay_secs: 60,
            retention_days: 90,
        }
    }
}

impl ReminderSettings {
    /// Builds the scheduling policy
    #[must_use]
    pub fn policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            lead_times: self
                .lead_minutes
                .iter()
                .map(|m| Duration::from_secs(u64::from(*m) * 60))
                .collect(),
            all_day_delay: Duration::from_secs(self.all_day_delay_secs),
            next_day_delay: Duration::from_secs(self.next_day_delay_secs),
            retention: chrono::Duration::days(i64::from(self.retention_days)),
        }
    }
}

/// Weather endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    /// Whether the service polls at all
    pub enabled: bool,
    /// Full request URL (OpenWeatherMap "current weather" shape)
    pub url: String,
    /// Seconds between fetches
    pub poll_interval_secs: u64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            poll_interval_secs: 120,
            timeout_secs: 10,
        }
    }
}

/// Poll intervals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Date-rollover check interval in seconds
    pub calendar_secs: u64,
    /// CPU/memory poll interval in seconds
    pub system_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            calendar_secs: 60,
            system_secs: 1,
        }
    }
}

/// Network options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Preferred wifi interface when several exist
    pub default_wifi_interface: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            default_wifi_interface: "wlan0".to_string(),
        }
    }
}

/// Calendar options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Fixed-date holidays shown in the day view
    pub holidays: Vec<HolidayEntry>,
}

/// A holiday recurring on the same month/day every year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    /// Display name
    pub name: String,
    /// Month (1-12)
    pub month: u32,
    /// Day of month
    pub day: u32,
}

/// Logging options for the shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level name (`error`..`trace`)
    pub level: String,
    /// Optional log file; stderr when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingSettings {
    /// Parsed level, falling back to info
    #[must_use]
    pub fn tracing_level(&self) -> TracingLevel {
        self.level.parse().unwrap_or_default()
    }
}
