//! `deskbar-cli` - manage deskbar reminders and to-do lists from a terminal
//!
//! Reads and writes the same JSON stores as the shell, so changes show up in
//! the bar the next time it loads them.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use deskbar_core::tracing::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        TracingLevel::Error
    } else {
        TracingLevel::from_verbosity(cli.verbose)
    };
    if let Err(e) = init_tracing(&TracingConfig::new().with_level(level)) {
        eprintln!("Warning: {e}");
    }

    let result = commands::dispatch(cli.config.as_deref(), cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
