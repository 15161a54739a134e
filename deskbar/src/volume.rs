//! Volume indicator with a slider popover

use gtk4::prelude::*;
use gtk4::{self, Orientation};
use std::cell::Cell;
use std::rc::Rc;

use deskbar_core::services::VolumeService;

use crate::async_utils::spawn_async;

/// Icon for a volume level
#[must_use]
pub fn volume_icon_name(volume: f64, muted: bool) -> &'static str {
    if muted || volume <= 0.0 {
        "audio-volume-muted-symbolic"
    } else if volume < 0.34 {
        "audio-volume-low-symbolic"
    } else if volume < 0.67 {
        "audio-volume-medium-symbolic"
    } else {
        "audio-volume-high-symbolic"
    }
}

/// Speaker icon; the popover holds a slider and a mute toggle
pub struct VolumeIndicator {
    button: gtk4::MenuButton,
}

impl VolumeIndicator {
    /// Creates the indicator bound to `volume`
    #[must_use]
    pub fn new(volume: &Rc<VolumeService>) -> Self {
        let scale = gtk4::Scale::with_range(Orientation::Horizontal, 0.0, 1.0, 0.01);
        scale.set_width_request(200);
        scale.set_draw_value(false);
        let mute = gtk4::ToggleButton::builder()
            .icon_name("audio-volume-muted-symbolic")
            .tooltip_text("Mute")
            .build();

        let content = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .margin_top(6)
            .margin_bottom(6)
            .margin_start(6)
            .margin_end(6)
            .build();
        content.append(&mute);
        content.append(&scale);

        let button = gtk4::MenuButton::builder()
            .icon_name(volume_icon_name(volume.volume.get(), volume.is_muted.get()))
            .popover(&gtk4::Popover::builder().child(&content).build())
            .css_classes(["flat", "volume"])
            .build();

        // Set while the widgets are being synced from the service
        let syncing = Rc::new(Cell::new(false));

        let service = Rc::clone(volume);
        let guard = Rc::clone(&syncing);
        scale.connect_value_changed(move |scale| {
            if !guard.get() {
                let (service, level) = (Rc::clone(&service), scale.value());
                spawn_async(async move { service.set_volume(level).await });
            }
        });

        let service = Rc::clone(volume);
        let guard = Rc::clone(&syncing);
        mute.connect_toggled(move |mute| {
            if !guard.get() && mute.is_active() != service.is_muted.get() {
                let (service, muted) = (Rc::clone(&service), mute.is_active());
                spawn_async(async move { service.set_muted(muted).await });
            }
        });

        let sync = {
            let button = button.downgrade();
            let scale = scale.downgrade();
            let mute = mute.downgrade();
            let service = Rc::downgrade(volume);
            move || {
                let (Some(button), Some(scale), Some(mute), Some(service)) = (
                    button.upgrade(),
                    scale.upgrade(),
                    mute.upgrade(),
                    service.upgrade(),
                ) else {
                    return;
                };
                let (level, muted) = (service.volume.get(), service.is_muted.get());
                syncing.set(true);
                scale.set_value(level);
                mute.set_active(muted);
                syncing.set(false);
                button.set_icon_name(volume_icon_name(level, muted));
                button.set_tooltip_text(Some(&format!("Volume {:.0}%", level * 100.0)));
            }
        };
        sync();
        volume.changed.connect(move |()| sync());

        Self { button }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::MenuButton {
        &self.button
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_follows_level_and_mute() {
        assert_eq!(volume_icon_name(0.5, true), "audio-volume-muted-symbolic");
        assert_eq!(volume_icon_name(0.0, false), "audio-volume-muted-symbolic");
        assert_eq!(volume_icon_name(0.2, false), "audio-volume-low-symbolic");
        assert_eq!(volume_icon_name(0.5, false), "audio-volume-medium-symbolic");
        assert_eq!(volume_icon_name(1.2, false), "audio-volume-high-symbolic");
    }
}
