//! `deskbar` Core Library
//!
//! GUI-free part of the deskbar desktop shell: data models, JSON stores,
//! the observable primitive, reminder scheduling and the services the bar
//! widgets bind to.
//!
//! # Crate Structure
//!
//! - [`models`] - Reminders, to-do items, notifications
//! - [`store`] - Whole-file JSON persistence with atomic replace
//! - [`observable`] - `Signal` and `Property` change notification
//! - [`schedule`] - Which notifications a reminder gets and when
//! - [`timer`] / [`clock`] - Injectable one-shot timers and wall clock
//! - [`services`] - Reminder, to-do, calendar, weather, volume, network,
//!   notification, system-info and power services
//! - [`config`] - `config.toml` settings
//! - [`tracing`] - Logging setup

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod observable;
pub mod schedule;
pub mod services;
pub mod store;
pub mod timer;
pub mod tracing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppSettings, ConfigManager};
pub use error::{
    BackendError, BackendResult, ConfigError, ConfigResult, DeskbarError, ServiceError,
    ServiceResult, StoreError, StoreResult, WeatherError, WeatherResult,
};
pub use models::{
    Notification, NotificationRequest, Reminder, ReminderEntry, ToDoItem, ToDoItemEntry,
    ToDoItemParent, ToDoParentEntry, Urgency,
};
pub use observable::{HandlerId, Property, Signal};
pub use schedule::{
    NotificationKind, PlannedNotification, ReminderPolicy, notification_for, notification_text,
    plan_notifications,
};
pub use services::{ServiceDeps, Services};
pub use store::{JsonStore, StoreMap};
pub use timer::{ManualTimerDriver, TimerCallback, TimerDriver, TimerHandle};
