//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use deskbar_core::models::parse_time_of_day;

use crate::util::parse_date;

/// deskbar command-line interface for reminders and to-do lists
#[derive(Parser)]
#[command(name = "deskbar-cli")]
#[command(author, version, about = "deskbar command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true, env = "DESKBAR_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Manage reminders
    #[command(subcommand)]
    Reminder(ReminderCommands),

    /// Manage the to-do list
    #[command(subcommand)]
    Todo(TodoCommands),

    /// Fetch the weather once and print it
    #[command(about = "Fetch the configured weather endpoint once")]
    Weather {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Reminder subcommands
#[derive(Subcommand)]
pub enum ReminderCommands {
    /// Add a reminder
    #[command(about = "Add a reminder; without --time it is all-day")]
    Add {
        /// Reminder title
        #[arg(short, long)]
        title: String,

        /// Day of the reminder (YYYY-MM-DD, `today` or `tomorrow`)
        #[arg(short, long, value_parser = parse_date)]
        date: NaiveDate,

        /// Time of day (HH:MM)
        #[arg(short = 'T', long, value_parser = parse_time_of_day)]
        time: Option<NaiveTime>,

        /// Icon name shown with the reminder
        #[arg(short, long)]
        icon: Option<String>,
    },

    /// List reminders
    #[command(about = "List reminders ordered by date and time")]
    List {
        /// Only reminders on this day
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Delete a reminder
    #[command(about = "Delete a reminder by ID or unique ID prefix")]
    Delete {
        /// Reminder ID or unique prefix
        id: String,
    },

    /// Remove reminders past the retention period
    #[command(about = "Remove reminders older than the retention period")]
    Sweep,

    /// Show the notifications today's reminders will raise
    #[command(about = "Show notifications still due today and tomorrow's notices")]
    Upcoming {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },
}

/// To-do subcommands
#[derive(Subcommand)]
pub enum TodoCommands {
    /// Add a top-level item
    Add {
        /// Item text
        text: String,
    },

    /// Add a child item under a parent
    Child {
        /// Parent ID or unique prefix
        parent: String,

        /// Child text
        text: String,
    },

    /// List items with their children
    List {
        /// Output format
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Mark an item (or one of its children) completed
    Done {
        /// Parent ID or unique prefix
        id: String,

        /// Child ID or unique prefix
        #[arg(long)]
        child: Option<String>,
    },

    /// Mark an item (or one of its children) not completed
    Undone {
        /// Parent ID or unique prefix
        id: String,

        /// Child ID or unique prefix
        #[arg(long)]
        child: Option<String>,
    },

    /// Delete an item (or one of its children)
    Delete {
        /// Parent ID or unique prefix
        id: String,

        /// Child ID or unique prefix
        #[arg(long)]
        child: Option<String>,
    },
}

/// Output format for list commands
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Display as formatted table
    #[default]
    Table,
    /// Output as JSON
    Json,
}
