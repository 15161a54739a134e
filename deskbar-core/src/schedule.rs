//! Reminder notification planning
//!
//! Pure functions that decide which one-shot notifications a reminder gets,
//! given the current time. [`crate::services::ReminderService`] arms timers
//! from the resulting plan.

use std::time::Duration;

use chrono::NaiveDateTime;

use crate::models::{NotificationRequest, Reminder, Urgency};

/// Timing rules for reminder notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// How long before a timed reminder to notify
    pub lead_times: Vec<Duration>,
    /// Delay of the single notification for all-day reminders due today
    pub all_day_delay: Duration,
    /// Delay of the heads-up for reminders due tomorrow
    pub next_day_delay: Duration,
    /// How long after its date a reminder is kept
    pub retention: chrono::Duration,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            lead_times: [0, 5, 10, 30, 60]
                .into_iter()
                .map(|m| Duration::from_secs(m * 60))
                .collect(),
            all_day_delay: Duration::from_secs(30),
            next_day_delay: Duration::from_secs(60),
            retention: chrono::Duration::days(90),
        }
    }
}

/// Why a notification fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// All-day reminder due today
    AllDay,
    /// Timed reminder, this long before the target
    Lead(Duration),
    /// Reminder due tomorrow
    DayBefore,
}

/// One notification to arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedNotification {
    /// Delay from `now`
    pub delay: Duration,
    /// Reason
    pub kind: NotificationKind,
}

/// Computes the notifications to arm for `reminder` at `now`.
///
/// Lead times whose fire time is not strictly in the future are dropped;
/// reminders more than one day ahead get nothing until the date rolls over.
#[must_use]
pub fn plan_notifications(
    reminder: &Reminder,
    now: NaiveDateTime,
    policy: &ReminderPolicy,
) -> Vec<PlannedNotification> {
    let today = now.date();
    let mut plan = Vec::new();

    if reminder.date == today {
        match reminder.target() {
            None => plan.push(PlannedNotification {
                delay: policy.all_day_delay,
                kind: NotificationKind::AllDay,
            }),
            Some(target) => {
                for lead in &policy.lead_times {
                    let Ok(lead_delta) = chrono::Duration::from_std(*lead) else {
                        continue;
                    };
                    let fire_at = target - lead_delta;
                    if fire_at <= now {
                        continue;
                    }
                    if let Ok(delay) = (fire_at - now).to_std() {
                        plan.push(PlannedNotification {
                            delay,
                            kind: NotificationKind::Lead(*lead),
                        });
                    }
                }
            }
        }
    } else if today.succ_opt() == Some(reminder.date) {
        plan.push(PlannedNotification {
            delay: policy.next_day_delay,
            kind: NotificationKind::DayBefore,
        });
    }

    plan
}

/// Summary and body of the notification for `kind`
#[must_use]
pub fn notification_text(reminder: &Reminder, kind: NotificationKind) -> (String, String) {
    let summary = match kind {
        NotificationKind::AllDay => "Today".to_string(),
        NotificationKind::DayBefore => "Tomorrow".to_string(),
        NotificationKind::Lead(lead) if lead.is_zero() => "Now".to_string(),
        NotificationKind::Lead(lead) => format!("Reminder in {}", format_lead(lead)),
    };
    (summary, reminder.display_label())
}

/// Builds the notification sent when a planned timer fires
#[must_use]
pub fn notification_for(reminder: &Reminder, kind: NotificationKind) -> NotificationRequest {
    let urgency = match kind {
        NotificationKind::DayBefore => Urgency::Low,
        NotificationKind::Lead(lead) if lead.is_zero() => Urgency::Critical,
        _ => Urgency::Normal,
    };
    let (summary, body) = notification_text(reminder, kind);
    let request = NotificationRequest::new(summary, body).with_urgency(urgency);
    match &reminder.icon {
        Some(icon) => request.with_icon(icon.clone()),
        None => request.with_icon("alarm-symbolic"),
    }
}

fn format_lead(lead: Duration) -> String {
    let minutes = lead.as_secs() / 60;
    match minutes {
        1 => "1 minute".to_string(),
        m if m % 60 == 0 && m >= 60 => {
            let hours = m / 60;
            if hours == 1 {
                "1 hour".to_string()
            } else {
                format!("{hours} hours")
            }
        }
        m => format!("{m} minutes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn timed(h: u32, m: u32) -> Reminder {
        Reminder::new("meeting", at(0, 0).date(), NaiveTime::from_hms_opt(h, m, 0))
    }

    #[test]
    fn test_all_day_today_fires_once_after_fixed_delay() {
        let reminder = Reminder::new("bins", at(0, 0).date(), None);
        let plan = plan_notifications(&reminder, at(15, 0), &ReminderPolicy::default());
        assert_eq!(
            plan,
            vec![PlannedNotification {
                delay: Duration::from_secs(30),
                kind: NotificationKind::AllDay,
            }]
        );
    }

    #[test]
    fn test_two_minutes_ahead_arms_only_zero_lead() {
        let plan = plan_notifications(&timed(12, 2), at(12, 0), &ReminderPolicy::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, NotificationKind::Lead(Duration::ZERO));
        assert_eq!(plan[0].delay, Duration::from_secs(120));
    }

    #[test]
    fn test_far_ahead_arms_every_lead() {
        let plan = plan_notifications(&timed(18, 0), at(9, 0), &ReminderPolicy::default());
        assert_eq!(plan.len(), 5);
        let delays: Vec<u64> = plan.iter().map(|p| p.delay.as_secs() / 60).collect();
        assert_eq!(delays, vec![540, 535, 530, 510, 480]);
    }

    #[test]
    fn test_lead_exactly_now_is_dropped() {
        // target - 10min == now: not strictly in the future
        let plan = plan_notifications(&timed(12, 10), at(12, 0), &ReminderPolicy::default());
        let kinds: Vec<_> = plan.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::Lead(Duration::ZERO),
                NotificationKind::Lead(Duration::from_secs(300)),
            ]
        );
    }

    #[test]
    fn test_past_reminder_today_arms_nothing() {
        let plan = plan_notifications(&timed(8, 0), at(12, 0), &ReminderPolicy::default());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_tomorrow_gets_single_heads_up() {
        let tomorrow = at(0, 0).date().succ_opt().unwrap();
        for time in [None, NaiveTime::from_hms_opt(9, 0, 0)] {
            let reminder = Reminder::new("x", tomorrow, time);
            let plan = plan_notifications(&reminder, at(20, 0), &ReminderPolicy::default());
            assert_eq!(plan.len(), 1);
            assert_eq!(plan[0].kind, NotificationKind::DayBefore);
            assert_eq!(plan[0].delay, Duration::from_secs(60));
        }
    }

    #[test]
    fn test_later_dates_and_past_dates_arm_nothing() {
        let policy = ReminderPolicy::default();
        let base = at(0, 0).date();
        for offset in [-3_i64, -1, 2, 30] {
            let date = base + chrono::Duration::days(offset);
            let reminder = Reminder::new("x", date, None);
            assert!(plan_notifications(&reminder, at(10, 0), &policy).is_empty());
        }
    }

    #[test]
    fn test_notification_text() {
        let reminder = timed(9, 0);
        let n = notification_for(&reminder, NotificationKind::Lead(Duration::from_secs(1800)));
        assert_eq!(n.summary, "Reminder in 30 minutes");
        assert_eq!(n.body, "meeting @ 09:00");

        let n = notification_for(&reminder, NotificationKind::Lead(Duration::from_secs(3600)));
        assert_eq!(n.summary, "Reminder in 1 hour");

        let n = notification_for(&reminder, NotificationKind::Lead(Duration::ZERO));
        assert_eq!(n.summary, "Now");
        assert_eq!(n.urgency, Urgency::Critical);
        assert_eq!(n.icon.as_deref(), Some("alarm-symbolic"));

        let (summary, body) = notification_text(&reminder, NotificationKind::DayBefore);
        assert_eq!(summary, "Tomorrow");
        assert_eq!(body, "meeting @ 09:00");
    }
}
