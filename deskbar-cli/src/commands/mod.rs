//! Command handler modules for the CLI.

mod completions;
mod reminder;
mod todo;
mod weather;

use std::path::Path;

use crate::cli::{Commands, ReminderCommands, TodoCommands};
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Reminder(command) => match command {
            ReminderCommands::Add {
                title,
                date,
                time,
                icon,
            } => reminder::cmd_add(config_path, title, date, time, icon),
            ReminderCommands::List { date, format } => reminder::cmd_list(config_path, date, format),
            ReminderCommands::Delete { id } => reminder::cmd_delete(config_path, &id),
            ReminderCommands::Sweep => reminder::cmd_sweep(config_path),
            ReminderCommands::Upcoming { format } => reminder::cmd_upcoming(config_path, format),
        },
        Commands::Todo(command) => match command {
            TodoCommands::Add { text } => todo::cmd_add(config_path, &text),
            TodoCommands::Child { parent, text } => todo::cmd_child(config_path, &parent, &text),
            TodoCommands::List { format } => todo::cmd_list(config_path, format),
            TodoCommands::Done { id, child } => {
                todo::cmd_set_completed(config_path, &id, child.as_deref(), true)
            }
            TodoCommands::Undone { id, child } => {
                todo::cmd_set_completed(config_path, &id, child.as_deref(), false)
            }
            TodoCommands::Delete { id, child } => todo::cmd_delete(config_path, &id, child.as_deref()),
        },
        Commands::Weather { format } => weather::cmd_weather(config_path, format),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}
