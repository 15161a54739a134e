//! Month grid for the control panel

use chrono::{Datelike, NaiveDate};
use gtk4::prelude::*;
use gtk4::{self, Align, Orientation};
use std::rc::Rc;

use deskbar_core::services::{CalendarService, ReminderService};

use crate::utils::rebuild_when_idle;

/// Column headers, Sunday first like the grid
const WEEKDAY_LABELS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// CSS classes for one day cell
#[must_use]
pub fn day_css_classes(
    date: NaiveDate,
    selected: NaiveDate,
    today: NaiveDate,
    has_reminders: bool,
    is_holiday: bool,
) -> Vec<&'static str> {
    let mut classes = vec!["flat", "calendar-day"];
    if date.month() != selected.month() {
        classes.push("dim-label");
    }
    if date == today {
        classes.push("today");
    }
    if date == selected {
        classes.push("suggested-action");
    }
    if has_reminders {
        classes.push("has-reminders");
    }
    if is_holiday {
        classes.push("holiday");
    }
    classes
}

/// Month header with navigation above a Sunday-first day grid
pub struct CalendarView {
    container: gtk4::Box,
}

impl CalendarView {
    /// Creates the view bound to `calendar`; days with reminders are marked
    #[must_use]
    pub fn new(calendar: &Rc<CalendarService>, reminders: &Rc<ReminderService>) -> Self {
        let container = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(6)
            .css_classes(["calendar"])
            .build();

        let title = gtk4::Label::builder()
            .hexpand(true)
            .css_classes(["title-4"])
            .build();
        let header = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(2)
            .build();
        header.append(&nav_button(calendar, "go-first-symbolic", "Previous year", CalendarService::select_prev_year));
        header.append(&nav_button(calendar, "go-previous-symbolic", "Previous month", CalendarService::select_prev_month));
        header.append(&title);
        header.append(&nav_button(calendar, "go-next-symbolic", "Next month", CalendarService::select_next_month));
        header.append(&nav_button(calendar, "go-last-symbolic", "Next year", CalendarService::select_next_year));

        let today_button = gtk4::Button::builder()
            .label("Today")
            .halign(Align::End)
            .css_classes(["flat"])
            .build();
        let service = Rc::clone(calendar);
        today_button.connect_clicked(move |_| service.select_date(service.today.get()));

        let grid = gtk4::Grid::builder()
            .column_homogeneous(true)
            .row_spacing(2)
            .column_spacing(2)
            .build();

        container.append(&header);
        container.append(&grid);
        container.append(&today_button);

        let rebuild: Rc<dyn Fn()> = {
            let grid = grid.downgrade();
            let title = title.downgrade();
            let calendar = Rc::downgrade(calendar);
            let reminders = Rc::downgrade(reminders);
            Rc::new(move || {
                let (Some(grid), Some(title), Some(calendar), Some(reminders)) = (
                    grid.upgrade(),
                    title.upgrade(),
                    calendar.upgrade(),
                    reminders.upgrade(),
                ) else {
                    return;
                };
                rebuild_when_idle(move || {
                    let selected = calendar.selected_date.get();
                    title.set_text(&format!("{} {}", calendar.month_name(), selected.year()));
                    fill_grid(&grid, &calendar, &reminders);
                });
            })
        };
        rebuild();

        let r = Rc::clone(&rebuild);
        calendar.selected_date.connect_notify(move |_| r());
        let r = Rc::clone(&rebuild);
        calendar.today.connect_notify(move |_| r());
        reminders.changed.connect(move |()| rebuild());

        Self { container }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::Box {
        &self.container
    }
}

fn nav_button(
    calendar: &Rc<CalendarService>,
    icon_name: &str,
    tooltip: &str,
    action: fn(&CalendarService),
) -> gtk4::Button {
    let button = gtk4::Button::builder()
        .icon_name(icon_name)
        .tooltip_text(tooltip)
        .css_classes(["flat", "circular"])
        .build();
    let service = Rc::clone(calendar);
    button.connect_clicked(move |_| action(&service));
    button
}

fn fill_grid(grid: &gtk4::Grid, calendar: &Rc<CalendarService>, reminders: &Rc<ReminderService>) {
    while let Some(child) = grid.first_child() {
        grid.remove(&child);
    }

    for (column, name) in (0..).zip(WEEKDAY_LABELS) {
        let label = gtk4::Label::builder()
            .label(name)
            .css_classes(["caption", "dim-label"])
            .build();
        grid.attach(&label, column, 0, 1, 1);
    }

    let selected = calendar.selected_date.get();
    let today = calendar.today.get();
    for (index, date) in (0..).zip(calendar.month_calendar()) {
        let holidays = calendar.holidays_on(date);
        let has_reminders = !reminders.reminders_by_date(date).is_empty();
        let button = gtk4::Button::with_label(&date.day().to_string());
        for class in day_css_classes(date, selected, today, has_reminders, !holidays.is_empty()) {
            button.add_css_class(class);
        }
        if !holidays.is_empty() {
            button.set_tooltip_text(Some(&holidays.join("\n")));
        }
        let service = Rc::clone(calendar);
        button.connect_clicked(move |_| service.select_date(date));
        grid.attach(&button, index % 7, 1 + index / 7, 1, 1);
    }
}
