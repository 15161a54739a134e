//! Property-based tests for reminder persistence
//!
//! Covers JSON round-trips through the store and the retention sweep.

use std::rc::Rc;

use chrono::{NaiveDate, NaiveTime};
use deskbar_core::services::{NotificationService, ReminderService};
use deskbar_core::{JsonStore, ManualClock, ManualTimerDriver, Reminder, ReminderEntry, ReminderPolicy};
use proptest::prelude::*;
use tempfile::TempDir;
use uuid::Uuid;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

/// Strategy for reminder titles, including non-ASCII text
fn arb_title() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 äöü\"'\\\\]{1,40}"
}

/// Strategy for a date within a year either side of today
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (-365i64..365).prop_map(|offset| today() + chrono::Duration::days(offset))
}

fn arb_reminder() -> impl Strategy<Value = Reminder> {
    (
        arb_title(),
        proptest::option::of("[a-z-]{1,20}"),
        arb_date(),
        proptest::option::of((0u32..24, 0u32..60)),
    )
        .prop_map(|(title, icon, date, time)| {
            let time = time.map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap());
            let mut reminder = Reminder::new(title, date, time);
            reminder.icon = icon;
            reminder
        })
}

fn open_service(temp: &TempDir) -> Rc<ReminderService> {
    ReminderService::new(
        temp.path().join("reminders.json"),
        ReminderPolicy::default(),
        Rc::new(ManualClock::new(today().and_hms_opt(8, 0, 0).unwrap())),
        Rc::new(ManualTimerDriver::new()),
        Rc::new(NotificationService::new()),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Entry form survives a JSON round-trip unchanged
    #[test]
    fn prop_entry_json_round_trip(reminder in arb_reminder()) {
        let json = serde_json::to_string(&reminder.to_entry()).unwrap();
        let entry: ReminderEntry = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(Reminder::from_entry(reminder.id, entry), reminder);
    }

    /// A batch of reminders written through the store reads back identically and in order
    #[test]
    fn prop_store_round_trip(reminders in prop::collection::vec(arb_reminder(), 0..20)) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reminders.json");
        let (store, mut map) = JsonStore::<ReminderEntry>::open(&path).unwrap();
        for reminder in &reminders {
            map.insert(reminder.id, reminder.to_entry());
        }
        store.save(&map).unwrap();

        let loaded = store.load().unwrap();
        let ids: Vec<Uuid> = loaded.keys().copied().collect();
        let expected: Vec<Uuid> = reminders.iter().map(|r| r.id).collect();
        prop_assert_eq!(ids, expected);
        for reminder in &reminders {
            let entry = loaded.get(&reminder.id).cloned().unwrap();
            prop_assert_eq!(&Reminder::from_entry(reminder.id, entry), reminder);
        }
    }

    /// The sweep removes exactly the reminders whose retention ended, and
    /// the removal is on disk
    #[test]
    fn prop_sweep_removes_exactly_expired(offsets in prop::collection::vec(-200i64..10, 1..25)) {
        let temp = TempDir::new().unwrap();
        let service = open_service(&temp);
        let mut reminders = Vec::new();
        for offset in &offsets {
            let reminder = Reminder::new("r", today() + chrono::Duration::days(*offset), None);
            service.add_reminder(reminder.clone());
            reminders.push(reminder);
        }

        let retention = chrono::Duration::days(90);
        let expired: Vec<Uuid> = reminders
            .iter()
            .filter(|r| r.date + retention <= today())
            .map(|r| r.id)
            .collect();

        prop_assert_eq!(service.sweep_expired(today()), expired.len());

        let reopened = open_service(&temp);
        for reminder in &reminders {
            let present = reopened.get(reminder.id).is_some();
            prop_assert_eq!(present, !expired.contains(&reminder.id));
        }
    }
}
