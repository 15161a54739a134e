//! Property-based tests for reminder timer arming
//!
//! Covers the all-day single timer, future-only lead times and timer
//! cancellation on delete.

use std::rc::Rc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use deskbar_core::services::{NotificationService, ReminderService};
use deskbar_core::{ManualClock, ManualTimerDriver, Reminder, ReminderPolicy, plan_notifications};
use proptest::prelude::*;
use tempfile::TempDir;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

/// Strategy for a wall-clock time of day with minute precision
fn arb_time_of_day() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
}

/// Strategy for a "now" on the test day, with seconds
fn arb_now() -> impl Strategy<Value = NaiveDateTime> {
    (0u32..24, 0u32..60, 0u32..60)
        .prop_map(|(h, m, s)| day().and_hms_opt(h, m, s).unwrap())
}

struct Harness {
    _temp: TempDir,
    timers: Rc<ManualTimerDriver>,
    notifications: Rc<NotificationService>,
    service: Rc<ReminderService>,
}

fn harness(now: NaiveDateTime) -> Harness {
    let temp = TempDir::new().unwrap();
    let timers = Rc::new(ManualTimerDriver::new());
    let notifications = Rc::new(NotificationService::new());
    let service = ReminderService::new(
        temp.path().join("reminders.json"),
        ReminderPolicy::default(),
        Rc::new(ManualClock::new(now)),
        timers.clone(),
        notifications.clone(),
    );
    Harness {
        _temp: temp,
        timers,
        notifications,
        service,
    }
}

fn expected_lead_count(target: NaiveDateTime, now: NaiveDateTime, policy: &ReminderPolicy) -> usize {
    policy
        .lead_times
        .iter()
        .filter(|lead| target - chrono::Duration::from_std(**lead).unwrap() > now)
        .count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An all-day reminder for today arms exactly one timer
    #[test]
    fn prop_all_day_today_arms_one_timer(now in arb_now()) {
        let h = harness(now);
        let reminder = Reminder::new("all day", day(), None);
        h.service.add_reminder(reminder.clone());

        prop_assert_eq!(h.service.pending_timer_count(reminder.id), 1);
        prop_assert_eq!(h.timers.pending_count(), 1);
    }

    /// A timed reminder for today arms one timer per lead time still ahead
    #[test]
    fn prop_timed_today_arms_future_leads(now in arb_now(), time in arb_time_of_day()) {
        let h = harness(now);
        let reminder = Reminder::new("timed", day(), Some(time));
        h.service.add_reminder(reminder.clone());

        let expected = expected_lead_count(day().and_time(time), now, h.service.policy());
        prop_assert_eq!(h.service.pending_timer_count(reminder.id), expected);
        prop_assert_eq!(h.timers.pending_count(), expected);
    }

    /// Every planned delay lands exactly on `target - lead`
    #[test]
    fn prop_plan_delays_match_fire_times(now in arb_now(), time in arb_time_of_day()) {
        let reminder = Reminder::new("timed", day(), Some(time));
        let policy = ReminderPolicy::default();
        for planned in plan_notifications(&reminder, now, &policy) {
            let deskbar_core::NotificationKind::Lead(lead) = planned.kind else {
                panic!("unexpected kind {:?}", planned.kind);
            };
            let fire_at = now + chrono::Duration::from_std(planned.delay).unwrap();
            let target = day().and_time(time);
            prop_assert_eq!(fire_at + chrono::Duration::from_std(lead).unwrap(), target);
            prop_assert!(planned.delay > Duration::ZERO);
        }
    }

    /// After deletion nothing fires and the entry is gone
    #[test]
    fn prop_delete_cancels_everything(now in arb_now(), time in proptest::option::of(arb_time_of_day())) {
        let h = harness(now);
        let reminder = Reminder::new("doomed", day(), time);
        h.service.add_reminder(reminder.clone());

        prop_assert!(h.service.delete_reminder(reminder.id));
        prop_assert_eq!(h.service.pending_timer_count(reminder.id), 0);
        prop_assert_eq!(h.timers.fire_all(), 0);
        prop_assert!(h.notifications.notifications().is_empty());
        prop_assert!(h.service.get(reminder.id).is_none());
    }

    /// Re-adding the same reminder never stacks timers
    #[test]
    fn prop_re_add_replaces_timers(now in arb_now(), time in arb_time_of_day(), repeats in 1usize..5) {
        let h = harness(now);
        let reminder = Reminder::new("again", day(), Some(time));
        for _ in 0..repeats {
            h.service.add_reminder(reminder.clone());
        }
        let expected = expected_lead_count(day().and_time(time), now, h.service.policy());
        prop_assert_eq!(h.timers.pending_count(), expected);
    }

    /// Firing every timer yields one notification per armed timer
    #[test]
    fn prop_each_timer_notifies_once(now in arb_now(), time in arb_time_of_day()) {
        let h = harness(now);
        let reminder = Reminder::new("ring", day(), Some(time));
        h.service.add_reminder(reminder.clone());
        let armed = h.timers.pending_count();

        prop_assert_eq!(h.timers.fire_all(), armed);
        prop_assert_eq!(h.notifications.count(), armed);
        prop_assert_eq!(h.service.pending_timer_count(reminder.id), 0);
    }
}
