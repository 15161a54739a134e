//! Shared utility functions used across command modules.

use std::path::Path;
use std::rc::Rc;

use chrono::NaiveDate;
use deskbar_core::config::{AppSettings, ConfigManager};
use deskbar_core::services::{NotificationService, ReminderService, ToDoService};
use deskbar_core::{Clock, ManualTimerDriver, SystemClock};
use uuid::Uuid;

use crate::error::CliError;

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads settings from the optional custom config directory
pub fn load_settings(config_path: Option<&Path>) -> Result<AppSettings, CliError> {
    Ok(create_config_manager(config_path)?.load_settings()?)
}

/// Opens the reminder store
///
/// Timers armed here are never driven; the CLI only edits the store.
pub fn open_reminders(settings: &AppSettings) -> Result<Rc<ReminderService>, CliError> {
    let service = ReminderService::new(
        settings.storage.reminders_path(),
        settings.reminders.policy(),
        Rc::new(SystemClock),
        Rc::new(ManualTimerDriver::new()),
        Rc::new(NotificationService::new()),
    );
    if service.is_initialized() {
        Ok(service)
    } else {
        Err(CliError::StoreUnavailable("Reminder"))
    }
}

/// Opens the to-do store
pub fn open_todo(settings: &AppSettings) -> Result<ToDoService, CliError> {
    let service = ToDoService::new(settings.storage.todo_path());
    if service.is_initialized() {
        Ok(service)
    } else {
        Err(CliError::StoreUnavailable("To-do"))
    }
}

/// Parses `YYYY-MM-DD`, `today` or `tomorrow`
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let today = SystemClock.today();
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today
            .succ_opt()
            .ok_or_else(|| "date out of range".to_string()),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{other}' (expected YYYY-MM-DD): {e}")),
    }
}

/// Finds the id equal to `input` or the single id starting with it
///
/// Prefixes are matched against the hyphenated lowercase form.
pub fn resolve_id(
    entity: &'static str,
    ids: impl IntoIterator<Item = Uuid>,
    input: &str,
) -> Result<Uuid, CliError> {
    let needle = input.trim().to_lowercase();
    let ids: Vec<Uuid> = ids.into_iter().collect();

    if let Ok(uuid) = Uuid::parse_str(&needle)
        && ids.contains(&uuid)
    {
        return Ok(uuid);
    }

    let matches: Vec<Uuid> = if needle.is_empty() {
        Vec::new()
    } else {
        ids.into_iter()
            .filter(|id| id.to_string().starts_with(&needle))
            .collect()
    };

    match matches.as_slice() {
        [] => Err(CliError::NotFound {
            entity,
            id: input.to_string(),
        }),
        [id] => Ok(*id),
        _ => Err(CliError::Ambiguous {
            entity,
            prefix: input.to_string(),
            matches: matches.iter().map(Uuid::to_string).collect(),
        }),
    }
}

/// First eight characters of an id, as shown in tables
#[must_use]
pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}
