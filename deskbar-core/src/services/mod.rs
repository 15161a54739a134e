//! Services backing the shell widgets
//!
//! Each service is built once by [`Services::new`] and shared as `Rc`. Views
//! subscribe to their signals and properties and re-read state on change.

mod calendar;
mod command;
mod feed;
mod network;
mod notification;
mod power;
mod reminder;
mod system;
mod todo;
mod volume;
mod weather;

use std::rc::{Rc, Weak};

pub use calendar::{CalendarService, month_name};
pub use command::{ACTIVATION_TIMEOUT, Invocation, QUERY_TIMEOUT};
pub use feed::{BURST_GAP, ChangeFeed, LineFeed};
pub use network::{
    AccessPoint, Connection, NetworkBackend, NetworkService, NetworkSnapshot, NmcliBackend,
    PrimaryConnectionType, open_wifi_invocation, parse_access_points, parse_added_uuid,
    parse_connections, parse_radio, parse_ssid_value, parse_wifi_devices,
    secured_wifi_add_invocation, split_terse, wifi_up_invocation,
};
pub use notification::NotificationService;
pub use power::PowerAction;
pub use reminder::ReminderService;
pub use system::{CpuSnapshot, MemorySnapshot, SystemInfoService, parse_cpu_snapshot, parse_meminfo};
pub use todo::ToDoService;
pub use volume::{
    PactlBackend, VolumeBackend, VolumeService, VolumeState, is_sink_event, parse_mute, parse_volume,
};
pub use weather::{HttpWeatherSource, WeatherReport, WeatherService, WeatherSource, classify_group};

use crate::clock::{Clock, SystemClock};
use crate::config::AppSettings;
use crate::timer::TimerDriver;

/// External facilities the services are built on
pub struct ServiceDeps {
    /// Wall clock
    pub clock: Rc<dyn Clock>,
    /// One-shot timers for reminders
    pub timers: Rc<dyn TimerDriver>,
    /// Sound server access
    pub volume_backend: Box<dyn VolumeBackend>,
    /// NetworkManager access
    pub network_backend: Box<dyn NetworkBackend>,
    /// Weather document source; `None` disables weather
    pub weather_source: Option<Box<dyn WeatherSource>>,
}

impl std::fmt::Debug for ServiceDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDeps")
            .field("weather_source", &self.weather_source.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceDeps {
    /// The real system facilities: local clock, `pactl`, `nmcli` and the
    /// configured weather endpoint
    #[must_use]
    pub fn system(settings: &AppSettings, timers: Rc<dyn TimerDriver>) -> Self {
        let weather_source: Option<Box<dyn WeatherSource>> = if settings.weather.enabled {
            match HttpWeatherSource::from_settings(&settings.weather) {
                Ok(source) => Some(Box::new(source)),
                Err(e) => {
                    tracing::warn!(%e, "Weather disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            clock: Rc::new(SystemClock),
            timers,
            volume_backend: Box::new(PactlBackend),
            network_backend: Box::new(NmcliBackend::new(&settings.network.default_wifi_interface)),
            weather_source,
        }
    }
}

/// Every service of the shell
#[derive(Debug)]
pub struct Services {
    /// In-process notifications
    pub notifications: Rc<NotificationService>,
    /// Reminders
    pub reminders: Rc<ReminderService>,
    /// To-do list
    pub todo: Rc<ToDoService>,
    /// Calendar state
    pub calendar: Rc<CalendarService>,
    /// Weather
    pub weather: Rc<WeatherService>,
    /// Volume
    pub volume: Rc<VolumeService>,
    /// Network
    pub network: Rc<NetworkService>,
    /// CPU and memory
    pub system: Rc<SystemInfoService>,
}

impl Services {
    /// Builds all services and connects day rollover to reminder rescheduling
    #[must_use]
    pub fn new(settings: &AppSettings, deps: ServiceDeps) -> Self {
        let notifications = Rc::new(NotificationService::new());
        let reminders = ReminderService::new(
            settings.storage.reminders_path(),
            settings.reminders.policy(),
            Rc::clone(&deps.clock),
            deps.timers,
            Rc::clone(&notifications),
        );
        let todo = Rc::new(ToDoService::new(settings.storage.todo_path()));
        let calendar = Rc::new(CalendarService::new(
            Rc::clone(&deps.clock),
            settings.calendar.holidays.clone(),
        ));
        let weather = Rc::new(WeatherService::new(deps.weather_source, deps.clock));
        let volume = Rc::new(VolumeService::new(deps.volume_backend));
        let network = Rc::new(NetworkService::new(deps.network_backend));
        let system = Rc::new(SystemInfoService::default());

        let weak: Weak<ReminderService> = Rc::downgrade(&reminders);
        calendar.day_changed.connect(move |today| {
            if let Some(reminders) = weak.upgrade() {
                reminders.on_day_changed(*today);
            }
        });

        Self {
            notifications,
            reminders,
            todo,
            calendar,
            weather,
            volume,
            network,
            system,
        }
    }
}
