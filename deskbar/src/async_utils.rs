//! Async helpers for GUI code
//!
//! GTK runs a single-threaded main loop. Futures spawned here run on the
//! GLib main context, so they may hold `Rc` services and touch widgets.
//! The tokio runtime entered in `main` supplies the reactor `reqwest` needs.
//!
//! ```ignore
//! let weather = services.weather.clone();
//! spawn_async(async move { weather.refresh().await });
//! ```

use gtk4::glib;
use std::future::Future;

/// Spawns an async task on the GLib main context
pub fn spawn_async<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    let ctx = glib::MainContext::default();
    ctx.spawn_local(future);
}
