//! In-process notification store
//!
//! Reminders and the shell post notifications here; popups and the
//! notification list in the control panel listen to the signals.

use std::cell::{Cell, RefCell};

use chrono::Local;
use indexmap::IndexMap;

use crate::models::{Notification, NotificationRequest};
use crate::observable::Signal;

/// Holds live notifications and announces arrivals and dismissals
#[derive(Debug, Default)]
pub struct NotificationService {
    next_id: Cell<u32>,
    notifications: RefCell<IndexMap<u32, Notification>>,
    /// Fired with the id of a newly stored notification
    pub notification_added: Signal<u32>,
    /// Fired with the id of a closed notification
    pub notification_closed: Signal<u32>,
}

impl NotificationService {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a notification and returns its id
    pub fn send_internal_notification(&self, request: NotificationRequest) -> u32 {
        let id = self.next_id.get().wrapping_add(1).max(1);
        self.next_id.set(id);

        let notification = Notification {
            id,
            app_name: request.app_name,
            summary: request.summary,
            body: request.body,
            icon: request.icon,
            urgency: request.urgency,
            timeout: request.timeout,
            created_at: Local::now(),
        };
        tracing::debug!(id, summary = %notification.summary, "Notification posted");
        self.notifications.borrow_mut().insert(id, notification);
        self.notification_added.emit(&id);
        id
    }

    /// Removes a notification. Returns `false` if it was not present.
    pub fn close(&self, id: u32) -> bool {
        let removed = self.notifications.borrow_mut().shift_remove(&id).is_some();
        if removed {
            self.notification_closed.emit(&id);
        }
        removed
    }

    /// Closes every notification
    pub fn clear(&self) {
        let ids: Vec<u32> = self.notifications.borrow().keys().copied().collect();
        for id in ids {
            self.close(id);
        }
    }

    /// All notifications, oldest first
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.borrow().values().cloned().collect()
    }

    /// Looks up a notification
    #[must_use]
    pub fn get(&self, id: u32) -> Option<Notification> {
        self.notifications.borrow().get(&id).cloned()
    }

    /// Number of live notifications
    #[must_use]
    pub fn count(&self) -> usize {
        self.notifications.borrow().len()
    }
}
