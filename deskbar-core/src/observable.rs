//! Toolkit-independent change notification
//!
//! [`Signal`] is a list of listeners fired with an argument; [`Property`] is a
//! value paired with a signal that fires when the value changes. Both are
//! single-threaded and meant to live inside `Rc`-shared services.
//!
//! The stored value is always updated before listeners run, and no borrow is
//! held while they run, so a listener may read the property (or the owning
//! service) and even connect or disconnect handlers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifies a connected handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler<A> = Rc<dyn Fn(&A)>;

/// A set of listeners invoked with `&A`
pub struct Signal<A> {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(HandlerId, Handler<A>)>>,
}

impl<A> Default for Signal<A> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            handlers: RefCell::new(Vec::new()),
        }
    }
}

impl<A> std::fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl<A> Signal<A> {
    /// Creates a signal with no listeners
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener
    pub fn connect<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&A) + 'static,
    {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Removes a listener. Returns `false` for unknown ids.
    pub fn disconnect(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    /// Number of connected listeners
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Calls every listener in connection order
    pub fn emit(&self, arg: &A) {
        let snapshot: Vec<Handler<A>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in snapshot {
            handler(arg);
        }
    }
}

/// An observable value
pub struct Property<T> {
    value: RefCell<T>,
    notify: Signal<T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.value.borrow())
            .field("listeners", &self.notify.handler_count())
            .finish()
    }
}

impl<T: Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Property<T> {
    /// Creates a property holding `value`
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            notify: Signal::new(),
        }
    }

    /// Registers a change listener; it receives the new value
    pub fn connect_notify<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&T) + 'static,
    {
        self.notify.connect(handler)
    }

    /// Removes a change listener
    pub fn disconnect(&self, id: HandlerId) -> bool {
        self.notify.disconnect(id)
    }

    /// Borrows the value for the duration of `f`
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }
}

impl<T: Clone> Property<T> {
    /// Current value
    #[must_use]
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Stores `value` and notifies even if it is unchanged
    pub fn set_always(&self, value: T) {
        *self.value.borrow_mut() = value.clone();
        self.notify.emit(&value);
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Stores `value`, notifying only on an actual change.
    /// Returns whether listeners were notified.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notify.emit(&value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_runs_handlers_in_order() {
        let signal: Signal<u32> = Signal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = seen.clone();
            signal.connect(move |v| seen.borrow_mut().push(format!("{tag}{v}")));
        }
        signal.emit(&7);
        assert_eq!(*seen.borrow(), vec!["a7", "b7"]);
    }

    #[test]
    fn test_disconnect() {
        let signal: Signal<()> = Signal::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = signal.connect(move |()| c.set(c.get() + 1));
        signal.emit(&());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_handler_may_disconnect_itself_during_emit() {
        let signal: Rc<Signal<()>> = Rc::new(Signal::new());
        let id_cell: Rc<Cell<Option<HandlerId>>> = Rc::new(Cell::new(None));
        let sig = Rc::downgrade(&signal);
        let ids = id_cell.clone();
        let id = signal.connect(move |()| {
            if let (Some(sig), Some(id)) = (sig.upgrade(), ids.get()) {
                sig.disconnect(id);
            }
        });
        id_cell.set(Some(id));
        signal.emit(&());
        assert_eq!(signal.handler_count(), 0);
    }

    #[test]
    fn test_property_notifies_only_on_change() {
        let prop = Property::new(1.0_f64);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        prop.connect_notify(move |_| c.set(c.get() + 1));

        assert!(!prop.set(1.0));
        assert!(prop.set(0.5));
        assert_eq!(count.get(), 1);

        prop.set_always(0.5);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_listener_observes_new_value() {
        let prop = Rc::new(Property::new(String::from("old")));
        let observed = Rc::new(RefCell::new(String::new()));
        let weak = Rc::downgrade(&prop);
        let out = observed.clone();
        prop.connect_notify(move |_| {
            if let Some(p) = weak.upgrade() {
                *out.borrow_mut() = p.get();
            }
        });
        prop.set("new".to_string());
        assert_eq!(*observed.borrow(), "new");
    }
}
