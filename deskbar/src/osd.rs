//! Volume on-screen display
//!
//! A small undecorated window that pops up on every volume or mute change
//! and hides itself once changes stop for [`OSD_TIMEOUT`].

use gtk4::prelude::*;
use gtk4::{self, Align, Orientation, glib};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use deskbar_core::services::VolumeService;

/// Time the OSD stays up after the last change
pub const OSD_TIMEOUT: Duration = Duration::from_secs(2);

/// Large icon for the OSD
#[must_use]
pub fn osd_icon_name(volume: f64, muted: bool) -> &'static str {
    if muted {
        "audio-volume-muted-symbolic"
    } else if volume >= 0.5 {
        "audio-volume-high-symbolic"
    } else if volume > 0.0 {
        "audio-volume-low-symbolic"
    } else {
        "audio-volume-off-symbolic"
    }
}

/// `MUTED` or the level as a whole percentage
#[must_use]
pub fn osd_percent_label(volume: f64, muted: bool) -> String {
    if muted {
        return "MUTED".to_string();
    }
    format!("{:.0}%", volume.max(0.0) * 100.0)
}

/// Owner of the OSD window
pub struct VolumeOsd;

impl VolumeOsd {
    /// Creates the hidden window and shows it on every change of `volume`
    ///
    /// Changes applied by the very first read are not shown.
    pub fn attach(app: &libadwaita::Application, volume: &Rc<VolumeService>) {
        let icon = gtk4::Image::builder().pixel_size(64).build();
        let label = gtk4::Label::builder().css_classes(["osd-percent"]).build();
        let content = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(20)
            .halign(Align::Center)
            .valign(Align::Center)
            .margin_top(24)
            .margin_bottom(24)
            .margin_start(32)
            .margin_end(32)
            .build();
        content.append(&icon);
        content.append(&label);

        let window = gtk4::Window::builder()
            .application(app)
            .title("deskbar volume")
            .decorated(false)
            .resizable(false)
            .focusable(false)
            .child(&content)
            .css_classes(["osd"])
            .build();

        let hide_source: Rc<RefCell<Option<glib::SourceId>>> = Rc::default();
        let window_weak = window.downgrade();
        let service = Rc::downgrade(volume);
        volume.changed.connect(move |()| {
            let (Some(window), Some(service)) = (window_weak.upgrade(), service.upgrade()) else {
                return;
            };
            if !service.is_ready() {
                return;
            }
            let (level, muted) = (service.volume.get(), service.is_muted.get());
            icon.set_icon_name(Some(osd_icon_name(level, muted)));
            label.set_text(&osd_percent_label(level, muted));
            window.present();

            if let Some(previous) = hide_source.borrow_mut().take() {
                previous.remove();
            }
            let source = Rc::clone(&hide_source);
            let window_weak = window.downgrade();
            let id = glib::timeout_add_local_once(OSD_TIMEOUT, move || {
                source.borrow_mut().take();
                if let Some(window) = window_weak.upgrade() {
                    window.set_visible(false);
                }
            });
            *hide_source.borrow_mut() = Some(id);
        });
    }
}
