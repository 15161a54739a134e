//! GTK4 application setup
//!
//! Builds the services once per process, creates the bar window, follows the
//! volume and network monitors and drives the polling services from GLib
//! timeouts.

use adw::prelude::*;
use gtk4::prelude::*;
use gtk4::{gio, glib};
use libadwaita as adw;
use std::rc::Rc;
use std::time::Duration;

use deskbar_core::config::AppSettings;
use deskbar_core::services::{ServiceDeps, Services};

use crate::async_utils::spawn_async;
use crate::bar::{BAR_HEIGHT, StatusBar};
use crate::error::AppError;
use crate::notifications::NotificationPopups;
use crate::osd::VolumeOsd;
use crate::timers::GlibTimerDriver;

/// Application ID for deskbar
pub const APP_ID: &str = "io.github.deskbar.Deskbar";

/// Pause before a monitor that exited is started again
const MONITOR_RESTART_DELAY: Duration = Duration::from_secs(5);

/// Creates and configures the GTK4 Application
#[must_use]
pub fn create_application(settings: AppSettings) -> adw::Application {
    let app = adw::Application::builder()
        .application_id(APP_ID)
        .flags(gio::ApplicationFlags::default())
        .build();

    let settings = Rc::new(settings);
    app.connect_activate(move |app| {
        build_ui(app, &settings);
    });

    app.set_accels_for_action("app.quit", &["<Control>q"]);

    app
}

/// Builds the bar when the application is activated
fn build_ui(app: &adw::Application, settings: &AppSettings) {
    // A second launch re-activates the running instance
    if let Some(window) = app.active_window() {
        window.present();
        return;
    }

    load_css_styles();

    let timers = Rc::new(GlibTimerDriver::new());
    let services = Rc::new(Services::new(settings, ServiceDeps::system(settings, timers)));
    for e in check_persistence(&services) {
        tracing::error!(%e, "Changes will not be saved this session");
    }

    let bar = StatusBar::new(&services);
    let window = adw::ApplicationWindow::builder()
        .application(app)
        .title("deskbar")
        .decorated(false)
        .resizable(false)
        .default_height(BAR_HEIGHT)
        .content(bar.widget())
        .css_classes(["deskbar"])
        .build();

    NotificationPopups::attach(app, &services.notifications);
    VolumeOsd::attach(app, &services.volume);

    setup_app_actions(app);
    initial_refresh(&services);
    start_monitors(&services);
    setup_polling(settings, &services);

    // The application owns the services for its whole lifetime
    let services_shutdown = Rc::clone(&services);
    app.connect_shutdown(move |_| {
        tracing::info!(
            notifications = services_shutdown.notifications.count(),
            "Shutting down"
        );
    });

    window.present();
}

/// Reminders and to-dos without a backing file still work in memory
///
/// Returns one error per store that could not be opened.
fn check_persistence(services: &Services) -> Vec<AppError> {
    let stores = [
        (services.reminders.is_initialized(), "reminder store", "reminders.json"),
        (services.todo.is_initialized(), "to-do store", "todo.json"),
    ];
    stores
        .into_iter()
        .filter(|(initialized, _, _)| !initialized)
        .map(|(_, component, file)| AppError::InitializationFailed {
            component,
            reason: format!("{file} could not be opened"),
        })
        .collect()
}

/// Loads the stylesheet shipped with the binary
fn load_css_styles() {
    let provider = gtk4::CssProvider::new();
    provider.load_from_string(include_str!("../assets/style.css"));

    match gtk4::gdk::Display::default() {
        Some(display) => gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => tracing::warn!("Failed to add CSS provider - no display available"),
    }
}

/// Sets up application-level actions
fn setup_app_actions(app: &adw::Application) {
    let quit_action = gio::SimpleAction::new("quit", None);
    let app_weak = app.downgrade();
    quit_action.connect_activate(move |_, _| {
        if let Some(app) = app_weak.upgrade() {
            app.quit();
        }
    });
    app.add_action(&quit_action);
}

/// First reads so the bar is not blank until the first tick
fn initial_refresh(services: &Services) {
    services.system.poll();
    refresh_weather(services);
}

/// Follows `pactl subscribe` and `nmcli monitor` for as long as the services
/// live; each watch does its own first read
fn start_monitors(services: &Rc<Services>) {
    let weak = Rc::downgrade(services);
    spawn_async(async move {
        while let Some(volume) = weak.upgrade().map(|s| Rc::clone(&s.volume)) {
            volume.watch().await;
            drop(volume);
            glib::timeout_future(MONITOR_RESTART_DELAY).await;
        }
    });

    let weak = Rc::downgrade(services);
    spawn_async(async move {
        while let Some(network) = weak.upgrade().map(|s| Rc::clone(&s.network)) {
            network.watch().await;
            drop(network);
            glib::timeout_future(MONITOR_RESTART_DELAY).await;
        }
    });
}

fn refresh_weather(services: &Services) {
    if !services.weather.is_configured() {
        return;
    }
    let weather = Rc::clone(&services.weather);
    spawn_async(async move {
        weather.refresh().await;
    });
}

/// Drives every polling service from the main loop
///
/// Each source stops once the services are gone.
fn setup_polling(settings: &AppSettings, services: &Rc<Services>) {
    let polling = &settings.polling;

    let weak = Rc::downgrade(services);
    glib::timeout_add_local(Duration::from_secs(polling.calendar_secs), move || {
        let Some(services) = weak.upgrade() else {
            return glib::ControlFlow::Break;
        };
        if services.calendar.poll_for_date_change() {
            tracing::info!(today = %services.calendar.today.get(), "Date changed");
        }
        glib::ControlFlow::Continue
    });

    let weak = Rc::downgrade(services);
    glib::timeout_add_local(Duration::from_secs(polling.system_secs), move || {
        let Some(services) = weak.upgrade() else {
            return glib::ControlFlow::Break;
        };
        services.system.poll();
        glib::ControlFlow::Continue
    });

    if services.weather.is_configured() {
        let weak = Rc::downgrade(services);
        let interval = Duration::from_secs(settings.weather.poll_interval_secs);
        glib::timeout_add_local(interval, move || {
            let Some(services) = weak.upgrade() else {
                return glib::ControlFlow::Break;
            };
            refresh_weather(&services);
            glib::ControlFlow::Continue
        });
    }
}

/// Runs the GTK4 application
///
/// Returns `glib::ExitCode::FAILURE` if libadwaita initialization fails,
/// otherwise the application's exit code.
pub fn run(settings: AppSettings) -> glib::ExitCode {
    if let Err(e) = adw::init() {
        tracing::error!(%e, "Failed to initialize libadwaita");
        return glib::ExitCode::FAILURE;
    }

    let app = create_application(settings);
    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskbar_core::ManualTimerDriver;

    #[test]
    fn test_every_unopenable_store_is_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        let not_a_dir = temp.path().join("plain-file");
        std::fs::write(&not_a_dir, "").unwrap();

        let mut settings = AppSettings::default();
        settings.storage.directory = Some(not_a_dir.join("data").to_string_lossy().into_owned());
        let timers = Rc::new(ManualTimerDriver::new());
        let services = Services::new(&settings, ServiceDeps::system(&settings, timers));

        let components: Vec<&str> = check_persistence(&services)
            .iter()
            .filter_map(|e| match e {
                AppError::InitializationFailed { component, .. } => Some(*component),
                AppError::Config(_) => None,
            })
            .collect();
        assert_eq!(components, vec!["reminder store", "to-do store"]);
    }
}
