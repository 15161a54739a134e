//! Reminders for the selected day

use chrono::NaiveTime;
use gtk4::prelude::*;
use gtk4::{self, Orientation};
use std::rc::Rc;

use deskbar_core::Reminder;
use deskbar_core::models::parse_time_of_day;
use deskbar_core::services::{CalendarService, ReminderService};

use crate::utils::{clear_box, rebuild_when_idle};

/// Which entry of the add form was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The title is blank
    MissingTitle,
    /// The time is not `HH:MM`
    InvalidTime(String),
}

/// Validates the add form; a blank time makes an all-day reminder
pub fn parse_reminder_form(title: &str, time: &str) -> Result<(String, Option<NaiveTime>), FormError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(FormError::MissingTitle);
    }
    let time = time.trim();
    if time.is_empty() {
        return Ok((title.to_string(), None));
    }
    parse_time_of_day(time)
        .map(|t| (title.to_string(), Some(t)))
        .map_err(FormError::InvalidTime)
}

/// List of the selected day's reminders with an add form below
pub struct ReminderList {
    container: gtk4::Box,
}

impl ReminderList {
    /// Creates the list bound to the calendar selection
    #[must_use]
    pub fn new(calendar: &Rc<CalendarService>, reminders: &Rc<ReminderService>) -> Self {
        let heading = gtk4::Label::builder()
            .xalign(0.0)
            .css_classes(["heading"])
            .build();
        let list = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(4)
            .build();

        let title_entry = gtk4::Entry::builder()
            .placeholder_text("New reminder")
            .hexpand(true)
            .build();
        let time_entry = gtk4::Entry::builder()
            .placeholder_text("HH:MM")
            .width_chars(6)
            .max_length(8)
            .build();
        let add_button = gtk4::Button::builder()
            .icon_name("list-add-symbolic")
            .tooltip_text("Add reminder")
            .build();
        let form = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .css_classes(["linked"])
            .build();
        form.append(&title_entry);
        form.append(&time_entry);
        form.append(&add_button);

        let container = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(8)
            .css_classes(["reminders"])
            .build();
        container.append(&heading);
        container.append(&list);
        container.append(&form);

        let submit: Rc<dyn Fn()> = {
            let title_entry = title_entry.downgrade();
            let time_entry = time_entry.downgrade();
            let calendar = Rc::clone(calendar);
            let reminders = Rc::clone(reminders);
            Rc::new(move || {
                let (Some(title_entry), Some(time_entry)) = (title_entry.upgrade(), time_entry.upgrade())
                else {
                    return;
                };
                title_entry.remove_css_class("error");
                time_entry.remove_css_class("error");
                match parse_reminder_form(&title_entry.text(), &time_entry.text()) {
                    Ok((title, time)) => {
                        reminders.add_reminder(Reminder::new(title, calendar.selected_date.get(), time));
                        title_entry.set_text("");
                        time_entry.set_text("");
                    }
                    Err(FormError::MissingTitle) => title_entry.add_css_class("error"),
                    Err(FormError::InvalidTime(reason)) => {
                        tracing::debug!(%reason, "Rejected reminder time");
                        time_entry.add_css_class("error");
                    }
                }
            })
        };
        let s = Rc::clone(&submit);
        add_button.connect_clicked(move |_| s());
        let s = Rc::clone(&submit);
        title_entry.connect_activate(move |_| s());
        time_entry.connect_activate(move |_| submit());

        let rebuild: Rc<dyn Fn()> = {
            let heading = heading.downgrade();
            let list = list.downgrade();
            let calendar = Rc::downgrade(calendar);
            let reminders = Rc::downgrade(reminders);
            Rc::new(move || {
                let (Some(heading), Some(list), Some(calendar), Some(reminders)) = (
                    heading.upgrade(),
                    list.upgrade(),
                    calendar.upgrade(),
                    reminders.upgrade(),
                ) else {
                    return;
                };
                rebuild_when_idle(move || {
                    let date = calendar.selected_date.get();
                    heading.set_text(&date.format("%A, %B %-d").to_string());
                    fill_list(&list, &reminders, &reminders.reminders_by_date(date));
                });
            })
        };
        rebuild();
        let r = Rc::clone(&rebuild);
        calendar.selected_date.connect_notify(move |_| r());
        reminders.changed.connect(move |()| rebuild());

        Self { container }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::Box {
        &self.container
    }
}

fn fill_list(list: &gtk4::Box, service: &Rc<ReminderService>, reminders: &[Reminder]) {
    clear_box(list);
    if reminders.is_empty() {
        list.append(
            &gtk4::Label::builder()
                .label("No reminders")
                .xalign(0.0)
                .css_classes(["dim-label"])
                .build(),
        );
        return;
    }

    for reminder in reminders {
        let row = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .css_classes(["reminder-row"])
            .build();
        row.append(&gtk4::Image::from_icon_name(
            reminder.icon.as_deref().unwrap_or("alarm-symbolic"),
        ));
        row.append(
            &gtk4::Label::builder()
                .label(reminder.display_label())
                .hexpand(true)
                .xalign(0.0)
                .ellipsize(gtk4::pango::EllipsizeMode::End)
                .build(),
        );
        let delete = gtk4::Button::builder()
            .icon_name("user-trash-symbolic")
            .tooltip_text("Delete reminder")
            .css_classes(["flat"])
            .build();
        let service = Rc::clone(service);
        let id = reminder.id;
        delete.connect_clicked(move |_| {
            service.delete_reminder(id);
        });
        row.append(&delete);
        list.append(&row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_time_is_all_day() {
        assert_eq!(
            parse_reminder_form("  Dentist ", " "),
            Ok(("Dentist".to_string(), None))
        );
    }

    #[test]
    fn test_time_is_parsed() {
        let (_, time) = parse_reminder_form("Standup", "09:30").unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(9, 30, 0));
    }

    #[test]
    fn test_rejects_blank_title_and_bad_time() {
        assert_eq!(parse_reminder_form("   ", "09:30"), Err(FormError::MissingTitle));
        assert!(matches!(
            parse_reminder_form("Standup", "25:99"),
            Err(FormError::InvalidTime(_))
        ));
    }
}
