//! One-shot timers behind a trait
//!
//! The shell arms timers on the GLib main loop; tests and the CLI use
//! [`ManualTimerDriver`], which keeps virtual time and only fires when
//! advanced.

use std::cell::{Cell, RefCell};
use std::time::Duration;

/// Opaque handle returned by [`TimerDriver::schedule_once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wraps a raw id (drivers only)
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// Callback type run when a timer fires
pub type TimerCallback = Box<dyn FnOnce()>;

/// Arms and cancels one-shot timers on the event loop
pub trait TimerDriver {
    /// Runs `callback` once after `delay`
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancels a pending timer. Returns `false` if it already fired or was
    /// cancelled.
    fn cancel(&self, handle: TimerHandle) -> bool;
}

struct PendingTimer {
    handle: TimerHandle,
    due: Duration,
    callback: TimerCallback,
}

/// Virtual-time timer driver
#[derive(Default)]
pub struct ManualTimerDriver {
    next_id: Cell<u64>,
    elapsed: Cell<Duration>,
    pending: RefCell<Vec<PendingTimer>>,
}

impl std::fmt::Debug for ManualTimerDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTimerDriver")
            .field("elapsed", &self.elapsed.get())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ManualTimerDriver {
    /// Creates a driver at virtual time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of armed timers
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Delays (relative to now) of armed timers, soonest first
    #[must_use]
    pub fn pending_delays(&self) -> Vec<Duration> {
        let elapsed = self.elapsed.get();
        let mut delays: Vec<Duration> = self
            .pending
            .borrow()
            .iter()
            .map(|t| t.due.saturating_sub(elapsed))
            .collect();
        delays.sort();
        delays
    }

    /// Whether `handle` is still armed
    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.borrow().iter().any(|t| t.handle == handle)
    }

    /// Advances virtual time, firing every timer that comes due in order.
    /// Returns the number of timers fired.
    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.elapsed.get() + delta;
        let mut fired = 0;
        // Callbacks may arm or cancel timers, so pop one at a time
        while let Some(timer) = self.pop_due(target) {
            self.elapsed.set(timer.due.max(self.elapsed.get()));
            (timer.callback)();
            fired += 1;
        }
        self.elapsed.set(target);
        fired
    }

    /// Fires everything currently armed regardless of delay
    pub fn fire_all(&self) -> usize {
        let latest = self
            .pending
            .borrow()
            .iter()
            .map(|t| t.due)
            .max()
            .unwrap_or_default();
        self.advance(latest.saturating_sub(self.elapsed.get()))
    }

    fn pop_due(&self, target: Duration) -> Option<PendingTimer> {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= target)
            .min_by_key(|(_, t)| (t.due, t.handle))
            .map(|(i, _)| i)?;
        Some(pending.remove(index))
    }
}

impl TimerDriver for ManualTimerDriver {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.pending.borrow_mut().push(PendingTimer {
            handle,
            due: self.elapsed.get() + delay,
            callback,
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        let mut pending = self.pending.borrow_mut();
        let before = pending.len();
        pending.retain(|t| t.handle != handle);
        pending.len() != before
    }
}
