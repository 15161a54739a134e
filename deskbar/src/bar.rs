//! The status bar
//!
//! Layout: `[weather] [cpu/ram] ... [clock -> control panel] ... [volume] [network] [notifications] [power]`

use gtk4::prelude::*;
use gtk4::{self, Align, Orientation, glib};
use std::time::Duration;

use deskbar_core::services::Services;

use crate::calendar::CalendarView;
use crate::network::NetworkIndicator;
use crate::notifications::NotificationIndicator;
use crate::power::PowerMenu;
use crate::reminders::ReminderList;
use crate::sysinfo::SystemGauges;
use crate::todo::ToDoView;
use crate::volume::VolumeIndicator;
use crate::weather::WeatherIndicator;

/// Height of the bar in pixels
pub const BAR_HEIGHT: i32 = 32;

/// Clock format shown in the bar
const CLOCK_FORMAT: &str = "%a %b %-d  %H:%M";

/// Root widget of the bar window
pub struct StatusBar {
    container: gtk4::CenterBox,
}

impl StatusBar {
    /// Builds every indicator and binds it to its service
    #[must_use]
    pub fn new(services: &Services) -> Self {
        let container = gtk4::CenterBox::builder()
            .orientation(Orientation::Horizontal)
            .height_request(BAR_HEIGHT)
            .css_classes(["status-bar"])
            .build();

        let start = section_box();
        start.append(WeatherIndicator::new(&services.weather).widget());
        start.append(SystemGauges::new(&services.system).widget());

        let end = section_box();
        end.append(VolumeIndicator::new(&services.volume).widget());
        end.append(NetworkIndicator::new(&services.network).widget());
        end.append(NotificationIndicator::new(&services.notifications).widget());
        end.append(PowerMenu::new().widget());

        container.set_start_widget(Some(&start));
        container.set_center_widget(Some(&clock_button(services)));
        container.set_end_widget(Some(&end));

        Self { container }
    }

    /// Widget to place in the window
    #[must_use]
    pub fn widget(&self) -> &gtk4::CenterBox {
        &self.container
    }
}

fn section_box() -> gtk4::Box {
    gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(8)
        .margin_start(6)
        .margin_end(6)
        .valign(Align::Center)
        .build()
}

/// Clock label that opens the control panel
fn clock_button(services: &Services) -> gtk4::MenuButton {
    let label = gtk4::Label::builder()
        .label(current_time_text())
        .css_classes(["clock"])
        .build();

    let label_weak = label.downgrade();
    glib::timeout_add_local(Duration::from_secs(1), move || {
        let Some(label) = label_weak.upgrade() else {
            return glib::ControlFlow::Break;
        };
        let text = current_time_text();
        if label.text() != text {
            label.set_text(&text);
        }
        glib::ControlFlow::Continue
    });

    gtk4::MenuButton::builder()
        .child(&label)
        .popover(&control_panel(services))
        .css_classes(["flat", "clock-button"])
        .build()
}

fn current_time_text() -> String {
    chrono::Local::now().format(CLOCK_FORMAT).to_string()
}

/// Calendar and day reminders on the left, to-do list on the right
fn control_panel(services: &Services) -> gtk4::Popover {
    let calendar_column = gtk4::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(12)
        .width_request(320)
        .build();
    calendar_column.append(CalendarView::new(&services.calendar, &services.reminders).widget());
    calendar_column.append(&gtk4::Separator::new(Orientation::Horizontal));
    calendar_column.append(ReminderList::new(&services.calendar, &services.reminders).widget());

    let todo_column = gtk4::Box::builder()
        .orientation(Orientation::Vertical)
        .width_request(300)
        .build();
    todo_column.append(ToDoView::new(&services.todo).widget());

    let content = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(18)
        .margin_top(12)
        .margin_bottom(12)
        .margin_start(12)
        .margin_end(12)
        .css_classes(["control-panel"])
        .build();
    content.append(&calendar_column);
    content.append(&gtk4::Separator::new(Orientation::Vertical));
    content.append(&todo_column);

    gtk4::Popover::builder().child(&content).build()
}
