//! Property-based tests for change notification ordering
//!
//! A listener must always see the mutated state when it reads back during
//! the notification.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::NaiveDate;
use deskbar_core::services::{NotificationService, ReminderService, ToDoService};
use deskbar_core::{
    ManualClock, ManualTimerDriver, Property, Reminder, ReminderPolicy, ToDoItemParent,
};
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Each listener observes the value it was notified with via `get()`,
    /// and is notified exactly once per actual change
    #[test]
    fn prop_property_listener_sees_new_value(values in prop::collection::vec(0i32..5, 1..30)) {
        let prop = Rc::new(Property::new(0i32));
        let mismatches = Rc::new(Cell::new(0));
        let notified = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&prop);
        let (m, n) = (mismatches.clone(), notified.clone());
        prop.connect_notify(move |v| {
            n.set(n.get() + 1);
            if weak.upgrade().map(|p| p.get()) != Some(*v) {
                m.set(m.get() + 1);
            }
        });

        let mut expected_changes = 0;
        let mut current = 0;
        for v in values {
            if v != current {
                expected_changes += 1;
                current = v;
            }
            prop.set(v);
        }
        prop_assert_eq!(mismatches.get(), 0);
        prop_assert_eq!(notified.get(), expected_changes);
    }

    /// `changed` on the reminder service fires after the reminder is readable
    #[test]
    fn prop_reminder_changed_after_mutation(titles in prop::collection::vec("[a-z]{1,10}", 1..10)) {
        let temp = TempDir::new().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let service = ReminderService::new(
            temp.path().join("reminders.json"),
            ReminderPolicy::default(),
            Rc::new(ManualClock::new(day.and_hms_opt(9, 0, 0).unwrap())),
            Rc::new(ManualTimerDriver::new()),
            Rc::new(NotificationService::new()),
        );

        let seen_counts = Rc::new(RefCell::new(Vec::new()));
        let weak = Rc::downgrade(&service);
        let seen = seen_counts.clone();
        service.changed.connect(move |()| {
            if let Some(service) = weak.upgrade() {
                seen.borrow_mut().push(service.reminders().len());
            }
        });

        for (i, title) in titles.iter().enumerate() {
            service.add_reminder(Reminder::new(title.clone(), day, None));
            prop_assert_eq!(seen_counts.borrow().last().copied(), Some(i + 1));
        }
    }

    /// `changed` on the to-do service fires after the item is readable
    #[test]
    fn prop_todo_changed_after_mutation(texts in prop::collection::vec("[a-z]{1,10}", 1..10)) {
        let temp = TempDir::new().unwrap();
        let service = Rc::new(ToDoService::new(temp.path().join("todo.json")));
        let last_seen = Rc::new(RefCell::new(None));
        let weak = Rc::downgrade(&service);
        let seen = last_seen.clone();
        service.changed.connect(move |()| {
            if let Some(service) = weak.upgrade() {
                *seen.borrow_mut() = service.items().last().map(|i| i.text.clone());
            }
        });

        for text in &texts {
            service.add_item(&ToDoItemParent::new(text.clone()));
            prop_assert_eq!(last_seen.borrow().clone(), Some(text.clone()));
        }
    }
}
