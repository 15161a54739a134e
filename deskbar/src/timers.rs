//! Reminder timers on the GLib main loop

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use deskbar_core::timer::{TimerCallback, TimerDriver, TimerHandle};
use gtk4::glib;

/// [`TimerDriver`] backed by `glib::timeout_add_local_once`
#[derive(Debug, Default)]
pub struct GlibTimerDriver {
    next_id: Cell<u64>,
    sources: Rc<RefCell<HashMap<u64, glib::SourceId>>>,
}

impl GlibTimerDriver {
    /// Creates a driver with no pending timers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerDriver for GlibTimerDriver {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);

        let sources = Rc::clone(&self.sources);
        let source = glib::timeout_add_local_once(delay, move || {
            // A fired source must not be removed again
            sources.borrow_mut().remove(&id);
            callback();
        });
        self.sources.borrow_mut().insert(id, source);
        TimerHandle::from_raw(id)
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let source = self.sources.borrow_mut().remove(&handle.as_raw());
        match source {
            Some(source) => {
                source.remove();
                true
            }
            None => false,
        }
    }
}
