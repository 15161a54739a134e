//! Reminder persistence and notification scheduling
//!
//! Reminders live in a JSON store keyed by id. Every stored reminder due today
//! or tomorrow has one-shot timers armed from [`plan_notifications`]; the
//! handles are kept per id so updates, deletions and day rollovers can cancel
//! them before arming new ones.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Reminder, ReminderEntry};
use crate::observable::Signal;
use crate::schedule::{NotificationKind, ReminderPolicy, notification_for, plan_notifications};
use crate::services::NotificationService;
use crate::store::{JsonStore, StoreMap};
use crate::timer::{TimerDriver, TimerHandle};
use crate::tracing::{field_names, span_names};

const ENTITY: &str = "Reminder";

/// Owns the reminder store and the timers armed for it
pub struct ReminderService {
    store: Option<JsonStore<ReminderEntry>>,
    entries: RefCell<StoreMap<ReminderEntry>>,
    scheduled: RefCell<HashMap<Uuid, Vec<TimerHandle>>>,
    policy: ReminderPolicy,
    clock: Rc<dyn Clock>,
    timers: Rc<dyn TimerDriver>,
    notifications: Rc<NotificationService>,
    this: Weak<Self>,
    /// Fired after every change to the reminder set, before it is written
    pub changed: Signal<()>,
}

impl std::fmt::Debug for ReminderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderService")
            .field("initialized", &self.is_initialized())
            .field("reminders", &self.entries.borrow().len())
            .field("scheduled", &self.scheduled.borrow().len())
            .finish_non_exhaustive()
    }
}

impl ReminderService {
    /// Opens the store at `store_path`, drops expired reminders and arms timers
    /// for the rest.
    ///
    /// If the store cannot be opened the error is logged and the service runs
    /// uninitialized: it holds no reminders and skips every write.
    pub fn new(
        store_path: impl Into<PathBuf>,
        policy: ReminderPolicy,
        clock: Rc<dyn Clock>,
        timers: Rc<dyn TimerDriver>,
        notifications: Rc<NotificationService>,
    ) -> Rc<Self> {
        let path = store_path.into();
        let (store, entries) = match JsonStore::open(&path) {
            Ok((store, entries)) => {
                tracing::info!({ field_names::PATH } = %path.display(), count = entries.len(), "Loaded reminders");
                (Some(store), entries)
            }
            Err(e) => {
                tracing::error!(%e, "Could not initialize reminders store");
                (None, StoreMap::new())
            }
        };

        let service = Rc::new_cyclic(|this| Self {
            store,
            entries: RefCell::new(entries),
            scheduled: RefCell::new(HashMap::new()),
            policy,
            clock,
            timers,
            notifications,
            this: this.clone(),
            changed: Signal::new(),
        });
        if service.is_initialized() {
            service.on_day_changed(service.clock.today());
        }
        service
    }

    /// Whether the store was opened
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    /// Timing rules in effect
    #[must_use]
    pub const fn policy(&self) -> &ReminderPolicy {
        &self.policy
    }

    /// All reminders ordered by date, then time (all-day first)
    #[must_use]
    pub fn reminders(&self) -> Vec<Reminder> {
        let mut reminders: Vec<Reminder> = self
            .entries
            .borrow()
            .iter()
            .map(|(id, entry)| Reminder::from_entry(*id, entry.clone()))
            .collect();
        reminders.sort_by_key(|r| (r.date, r.time));
        reminders
    }

    /// Looks up a reminder by id
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Reminder> {
        self.entries
            .borrow()
            .get(&id)
            .map(|entry| Reminder::from_entry(id, entry.clone()))
    }

    /// Reminders on `date`, ordered by time
    #[must_use]
    pub fn reminders_by_date(&self, date: NaiveDate) -> Vec<Reminder> {
        self.reminders()
            .into_iter()
            .filter(|r| r.date == date)
            .collect()
    }

    /// Inserts a new reminder or replaces the one with the same id, re-arms
    /// its timers, then notifies and writes.
    pub fn add_reminder(&self, reminder: Reminder) {
        self.entries
            .borrow_mut()
            .insert(reminder.id, reminder.to_entry());
        self.cancel_timers(reminder.id);
        self.schedule_reminder(&reminder);
        self.commit_changes();
    }

    /// Applies `update` to an existing reminder and stores it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn update_reminder(
        &self,
        id: Uuid,
        update: impl FnOnce(&mut Reminder),
    ) -> ServiceResult<Reminder> {
        let mut reminder = self
            .get(id)
            .ok_or(ServiceError::NotFound { entity: ENTITY, id })?;
        update(&mut reminder);
        reminder.id = id;
        self.add_reminder(reminder.clone());
        Ok(reminder)
    }

    /// Cancels the reminder's timers and removes it.
    /// Returns `false` if no reminder has this id.
    pub fn delete_reminder(&self, id: Uuid) -> bool {
        self.cancel_timers(id);
        let removed = self.entries.borrow_mut().shift_remove(&id).is_some();
        if removed {
            self.commit_changes();
        }
        removed
    }

    /// Arms the notification timers for `reminder` relative to the clock's
    /// current time. Each timer fires one notification and forgets its handle.
    pub fn schedule_reminder(&self, reminder: &Reminder) {
        let _span = crate::trace_operation!(
            span_names::REMINDER_SCHEDULE,
            reminder_id = %reminder.id
        )
        .entered();

        let plan = plan_notifications(reminder, self.clock.now(), &self.policy);
        if plan.is_empty() {
            return;
        }

        let mut handles = Vec::with_capacity(plan.len());
        for planned in plan {
            // The handle is only known after scheduling, so the callback reads it back
            let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
            let callback = {
                let this = self.this.clone();
                let slot = Rc::clone(&slot);
                let id = reminder.id;
                let kind = planned.kind;
                Box::new(move || {
                    if let Some(service) = this.upgrade() {
                        let handle = *slot.borrow();
                        service.fire(id, kind, handle);
                    }
                })
            };
            let handle = self.timers.schedule_once(planned.delay, callback);
            *slot.borrow_mut() = Some(handle);
            handles.push(handle);
        }

        tracing::debug!(
            { field_names::REMINDER_ID } = %reminder.id,
            { field_names::TIMER_COUNT } = handles.len(),
            "Armed reminder timers"
        );
        self.scheduled
            .borrow_mut()
            .entry(reminder.id)
            .or_default()
            .extend(handles);
    }

    /// Handles a new calendar day: drops expired reminders, then re-arms
    /// timers for everything still stored.
    pub fn on_day_changed(&self, today: NaiveDate) {
        tracing::info!(%today, "Day changed, rescheduling reminders");
        self.sweep_expired(today);

        let ids: Vec<Uuid> = self.scheduled.borrow().keys().copied().collect();
        for id in ids {
            self.cancel_timers(id);
        }
        for reminder in self.reminders() {
            self.schedule_reminder(&reminder);
        }
    }

    /// Deletes every reminder whose retention period ended on or before
    /// `today`, writing the store once. Returns the number removed.
    pub fn sweep_expired(&self, today: NaiveDate) -> usize {
        let _span = crate::trace_operation!(span_names::REMINDER_SWEEP, %today).entered();
        let expired: Vec<Uuid> = self
            .reminders()
            .into_iter()
            .filter(|r| r.is_expired(today, self.policy.retention))
            .map(|r| r.id)
            .collect();
        if expired.is_empty() {
            return 0;
        }

        for id in &expired {
            self.cancel_timers(*id);
        }
        self.entries
            .borrow_mut()
            .retain(|id, _| !expired.contains(id));
        tracing::info!(count = expired.len(), "Removed expired reminders");
        self.commit_changes();
        expired.len()
    }

    /// Number of timers still armed for `id`
    #[must_use]
    pub fn pending_timer_count(&self, id: Uuid) -> usize {
        self.scheduled.borrow().get(&id).map_or(0, Vec::len)
    }

    fn fire(&self, id: Uuid, kind: NotificationKind, handle: Option<TimerHandle>) {
        if let Some(handle) = handle {
            let mut scheduled = self.scheduled.borrow_mut();
            if let Some(handles) = scheduled.get_mut(&id) {
                handles.retain(|h| *h != handle);
                if handles.is_empty() {
                    scheduled.remove(&id);
                }
            }
        }

        let Some(reminder) = self.get(id) else {
            tracing::warn!({ field_names::REMINDER_ID } = %id, "Timer fired for a missing reminder");
            return;
        };
        tracing::info!({ field_names::REMINDER_ID } = %id, ?kind, "Reminder due");
        self.notifications
            .send_internal_notification(notification_for(&reminder, kind));
    }

    fn cancel_timers(&self, id: Uuid) {
        let handles = self.scheduled.borrow_mut().remove(&id);
        for handle in handles.into_iter().flatten() {
            self.timers.cancel(handle);
        }
    }

    fn commit_changes(&self) {
        self.changed.emit(&());
        self.write_to_disk();
    }

    fn write_to_disk(&self) {
        let Some(store) = &self.store else {
            return;
        };
        // Clone so no borrow is held if a later listener touches the service
        let entries = self.entries.borrow().clone();
        if let Err(e) = store.save(&entries) {
            tracing::error!({ field_names::ERROR } = %e, "Failed to write reminders");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::ManualTimerDriver;
    use chrono::{NaiveDateTime, NaiveTime};
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        path: PathBuf,
        clock: Rc<ManualClock>,
        timers: Rc<ManualTimerDriver>,
        notifications: Rc<NotificationService>,
        service: Rc<ReminderService>,
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reminders.json");
        let clock = Rc::new(ManualClock::new(noon()));
        let timers = Rc::new(ManualTimerDriver::new());
        let notifications = Rc::new(NotificationService::new());
        let service = ReminderService::new(
            &path,
            ReminderPolicy::default(),
            clock.clone(),
            timers.clone(),
            notifications.clone(),
        );
        Fixture {
            _temp: temp,
            path,
            clock,
            timers,
            notifications,
            service,
        }
    }

    fn today() -> NaiveDate {
        noon().date()
    }

    #[test]
    fn test_new_creates_store() {
        let f = fixture();
        assert!(f.service.is_initialized());
        assert!(f.path.exists());
        assert!(f.service.reminders().is_empty());
    }

    #[test]
    fn test_uninitialized_when_store_unreadable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reminders.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let service = ReminderService::new(
            &path,
            ReminderPolicy::default(),
            Rc::new(ManualClock::new(noon())),
            Rc::new(ManualTimerDriver::new()),
            Rc::new(NotificationService::new()),
        );
        assert!(!service.is_initialized());
        service.add_reminder(Reminder::new("x", today(), None));
        // nothing written over the unreadable file
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2");
    }

    #[test]
    fn test_add_persists_and_emits_before_write() {
        let f = fixture();
        let emitted = Rc::new(Cell::new(0));
        let e = emitted.clone();
        f.service.changed.connect(move |()| e.set(e.get() + 1));

        let reminder = Reminder::new("Dentist", today(), NaiveTime::from_hms_opt(15, 0, 0));
        f.service.add_reminder(reminder.clone());
        assert_eq!(emitted.get(), 1);

        let content: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&f.path).unwrap()).unwrap();
        assert_eq!(content[reminder.id.to_string()]["title"], "Dentist");
        assert_eq!(content[reminder.id.to_string()]["time"], "15:00");
    }

    #[test]
    fn test_reload_preserves_reminders() {
        let f = fixture();
        let reminder = Reminder::new("Call mum", today(), None).with_icon("phone");
        f.service.add_reminder(reminder.clone());

        let reopened = ReminderService::new(
            &f.path,
            ReminderPolicy::default(),
            f.clock.clone(),
            Rc::new(ManualTimerDriver::new()),
            Rc::new(NotificationService::new()),
        );
        assert_eq!(reopened.get(reminder.id), Some(reminder));
    }

    #[test]
    fn test_timed_reminder_arms_future_leads_only() {
        let f = fixture();
        let reminder = Reminder::new("Meeting", today(), NaiveTime::from_hms_opt(12, 20, 0));
        f.service.add_reminder(reminder.clone());
        // 0, 5, 10 minute leads are ahead; 30 and 60 are past
        assert_eq!(f.service.pending_timer_count(reminder.id), 3);
        assert_eq!(f.timers.pending_count(), 3);
    }

    #[test]
    fn test_update_replaces_timers() {
        let f = fixture();
        let mut reminder = Reminder::new("Meeting", today(), NaiveTime::from_hms_opt(18, 0, 0));
        f.service.add_reminder(reminder.clone());
        assert_eq!(f.timers.pending_count(), 5);

        reminder.update(Some("Moved".to_string()), None, None, NaiveTime::from_hms_opt(12, 3, 0));
        f.service.add_reminder(reminder.clone());
        assert_eq!(f.service.pending_timer_count(reminder.id), 1);
        assert_eq!(f.timers.pending_count(), 1);
        assert_eq!(f.service.reminders().len(), 1);
    }

    #[test]
    fn test_update_reminder_by_id() {
        let f = fixture();
        let reminder = Reminder::new("Old", today(), None);
        f.service.add_reminder(reminder.clone());
        let updated = f
            .service
            .update_reminder(reminder.id, |r| r.title = "New".to_string())
            .unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(f.service.get(reminder.id).unwrap().title, "New");
        assert!(matches!(
            f.service.update_reminder(Uuid::new_v4(), |_| {}),
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_firing_sends_notification_and_drops_handle() {
        let f = fixture();
        let reminder = Reminder::new("Tea", today(), NaiveTime::from_hms_opt(12, 2, 0));
        f.service.add_reminder(reminder.clone());
        assert_eq!(f.service.pending_timer_count(reminder.id), 1);

        assert_eq!(f.timers.advance(Duration::from_secs(120)), 1);
        assert_eq!(f.service.pending_timer_count(reminder.id), 0);
        let sent = f.notifications.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "Tea @ 12:02");
    }

    #[test]
    fn test_delete_cancels_timers() {
        let f = fixture();
        let reminder = Reminder::new("Bins", today(), None);
        f.service.add_reminder(reminder.clone());
        assert_eq!(f.timers.pending_count(), 1);

        assert!(f.service.delete_reminder(reminder.id));
        assert!(!f.service.delete_reminder(reminder.id));
        assert_eq!(f.timers.pending_count(), 0);
        assert_eq!(f.timers.fire_all(), 0);
        assert!(f.notifications.notifications().is_empty());
    }

    #[test]
    fn test_reminders_sorted_and_filtered_by_date() {
        let f = fixture();
        let later = today().succ_opt().unwrap();
        f.service.add_reminder(Reminder::new("b", later, None));
        f.service.add_reminder(Reminder::new("c", today(), NaiveTime::from_hms_opt(9, 0, 0)));
        f.service.add_reminder(Reminder::new("a", today(), None));

        let titles: Vec<_> = f.service.reminders().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["a", "c", "b"]);
        assert_eq!(f.service.reminders_by_date(later).len(), 1);
    }

    #[test]
    fn test_sweep_boundary() {
        let f = fixture();
        let old = Reminder::new("old", today() - chrono::Duration::days(90), None);
        let recent = Reminder::new("recent", today() - chrono::Duration::days(89), None);
        f.service.add_reminder(old.clone());
        f.service.add_reminder(recent.clone());

        assert_eq!(f.service.sweep_expired(today()), 1);
        assert!(f.service.get(old.id).is_none());
        assert!(f.service.get(recent.id).is_some());
        assert_eq!(f.service.sweep_expired(today()), 0);
    }

    #[test]
    fn test_day_change_rearms_without_stacking() {
        let f = fixture();
        let tomorrow = today().succ_opt().unwrap();
        let reminder = Reminder::new("Trip", tomorrow, NaiveTime::from_hms_opt(9, 0, 0));
        f.service.add_reminder(reminder.clone());
        assert_eq!(f.service.pending_timer_count(reminder.id), 1);

        f.clock.set(tomorrow.and_hms_opt(0, 0, 5).unwrap());
        f.service.on_day_changed(tomorrow);
        f.service.on_day_changed(tomorrow);
        assert_eq!(f.service.pending_timer_count(reminder.id), 5);
        assert_eq!(f.timers.pending_count(), 5);
    }

    #[test]
    fn test_listeners_see_armed_timers() {
        let f = fixture();
        let reminder = Reminder::new("Call", today(), NaiveTime::from_hms_opt(15, 0, 0));
        let seen = Rc::new(Cell::new(usize::MAX));
        let service = Rc::downgrade(&f.service);
        let (s, id) = (Rc::clone(&seen), reminder.id);
        f.service.changed.connect(move |()| {
            if let Some(service) = service.upgrade() {
                s.set(service.pending_timer_count(id));
            }
        });

        f.service.add_reminder(reminder.clone());
        assert!(seen.get() > 0);
        assert_eq!(seen.get(), f.service.pending_timer_count(reminder.id));
    }

    #[test]
    fn test_failed_write_keeps_memory_state_and_timers() {
        let f = fixture();
        // A directory where the temp file goes makes every write fail
        std::fs::create_dir(f.path.with_file_name("reminders.json.tmp")).unwrap();

        let call = Reminder::new("Call", today(), NaiveTime::from_hms_opt(15, 0, 0));
        let trip = Reminder::new("Trip", today().succ_opt().unwrap(), None);
        f.service.add_reminder(call.clone());
        f.service.add_reminder(trip.clone());
        f.service
            .update_reminder(call.id, |r| r.title = "Call mom".to_string())
            .unwrap();
        assert!(f.service.delete_reminder(trip.id));

        assert_eq!(f.service.get(call.id).unwrap().title, "Call mom");
        assert!(f.service.get(trip.id).is_none());
        assert!(f.service.pending_timer_count(call.id) > 0);
        assert_eq!(f.timers.pending_count(), f.service.pending_timer_count(call.id));

        f.timers.fire_all();
        assert!(f.notifications.count() > 0);

        let (_, on_disk) = JsonStore::<ReminderEntry>::open(&f.path).unwrap();
        assert!(on_disk.is_empty());
    }
}
