//! `deskbar` - status bar and control panel shell
//!
//! A GTK4/libadwaita bar with clock, weather, volume, network, system gauges,
//! notifications and a power menu, plus a control panel holding the calendar,
//! reminders and the to-do list. All state lives in `deskbar_core::Services`; the
//! widgets here only subscribe and re-read.
//!
//! # Widget lifetimes
//!
//! Service signal handlers capture widgets by weak reference (`downgrade()`)
//! so closing the window does not keep the widget tree alive through the
//! services.

#![allow(clippy::too_many_lines)] // GUI setup functions are inherently long
#![allow(clippy::type_complexity)] // GTK callback types are complex by design
#![allow(clippy::significant_drop_tightening)] // GTK widget drops are managed by GTK
#![allow(clippy::missing_errors_doc)] // Internal GUI functions don't need error docs
#![allow(clippy::missing_panics_doc)] // Internal GUI functions don't need panic docs

mod app;
pub mod async_utils;
mod bar;
mod calendar;
pub mod error;
mod network;
mod notifications;
mod osd;
mod power;
mod reminders;
mod sysinfo;
pub mod timers;
mod todo;
mod utils;
mod volume;
mod weather;

use deskbar_core::config::{AppSettings, ConfigManager};
use deskbar_core::tracing::{TracingConfig, TracingOutput, init_tracing};

use crate::error::AppResult;

/// Loads and validates `config.toml`; a missing file yields defaults
///
/// Any error is returned; `main` decides to carry on with defaults.
fn load_settings() -> AppResult<AppSettings> {
    let manager = ConfigManager::new()?;
    Ok(manager.load_settings()?)
}

/// `RUST_LOG` wins over the `[logging]` section
fn init_logging(settings: &AppSettings) {
    let mut config = TracingConfig::new().with_level(settings.logging.tracing_level());
    if let Some(file) = &settings.logging.file {
        let path = shellexpand::tilde(file).into_owned();
        config = config.with_output(TracingOutput::File(path.into()));
    }
    if let Ok(filter) = std::env::var("RUST_LOG") {
        config = config.with_filter(filter);
    }
    if let Err(e) = init_tracing(&config) {
        eprintln!("deskbar: {e}");
    }
}

fn main() -> gtk4::glib::ExitCode {
    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("deskbar: {e}; using default settings");
            AppSettings::default()
        }
    };
    init_logging(&settings);

    // Runtime creation failure at startup is unrecoverable
    let runtime = tokio::runtime::Runtime::new()
        .expect("tokio runtime required for helper processes and weather fetches");
    let _guard = runtime.enter();

    app::run(settings)
}
