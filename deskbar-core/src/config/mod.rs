//! Configuration management for deskbar
//!
//! `ConfigManager` loads and saves `config.toml`; `settings` holds the typed
//! sections.

mod manager;
pub mod settings;

pub use manager::{CONFIG_FILE_NAME, ConfigManager};
pub use settings::{
    AppSettings, CalendarSettings, HolidayEntry, LoggingSettings, NetworkSettings,
    PollingSettings, ReminderSettings, StorageSettings, WeatherSettings,
};
