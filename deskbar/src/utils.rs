//! Small widget helpers shared by the views

use gtk4::prelude::*;
use gtk4::glib;

/// Removes every child of `container`
pub fn clear_box(container: &gtk4::Box) {
    while let Some(child) = container.first_child() {
        container.remove(&child);
    }
}

/// Runs `rebuild` once the main loop is idle
///
/// Lists are often rebuilt from a click handler of one of their own rows;
/// the row must outlive the handler.
pub fn rebuild_when_idle<F>(rebuild: F)
where
    F: FnOnce() + 'static,
{
    glib::idle_add_local_once(rebuild);
}
