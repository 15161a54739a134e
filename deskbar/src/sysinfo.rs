//! CPU and memory gauges

use gtk4::prelude::*;
use gtk4::{self, Orientation};
use std::rc::Rc;

use deskbar_core::Property;
use deskbar_core::services::SystemInfoService;

/// Two compact level bars: `[CPU ██░░ 45%] [RAM ██░░ 62%]`
pub struct SystemGauges {
    container: gtk4::Box,
}

impl SystemGauges {
    /// Creates the gauges bound to `system`
    #[must_use]
    pub fn new(system: &Rc<SystemInfoService>) -> Self {
        let container = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(10)
            .css_classes(["system-gauges"])
            .build();

        container.append(&gauge("CPU", "utilities-system-monitor-symbolic", &system.cpu_percent));
        container.append(&gauge("RAM", "drive-harddisk-symbolic", &system.memory_percent));

        Self { container }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::Box {
        &self.container
    }
}

/// One labelled level bar that follows `percent`
fn gauge(name: &str, icon_name: &str, percent: &Property<f64>) -> gtk4::Box {
    let section = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(4)
        .tooltip_text(name)
        .build();
    let icon = gtk4::Image::from_icon_name(icon_name);
    icon.set_pixel_size(14);
    let bar = gtk4::LevelBar::builder()
        .min_value(0.0)
        .max_value(100.0)
        .width_request(40)
        .valign(gtk4::Align::Center)
        .build();
    let label = gtk4::Label::builder()
        .width_chars(4)
        .css_classes(["caption", "numeric"])
        .build();
    section.append(&icon);
    section.append(&bar);
    section.append(&label);

    let apply = |bar: &gtk4::LevelBar, label: &gtk4::Label, value: f64| {
        let value = value.clamp(0.0, 100.0);
        bar.set_value(value);
        label.set_text(&format!("{value:.0}%"));
    };
    apply(&bar, &label, percent.get());

    let bar_weak = bar.downgrade();
    let label_weak = label.downgrade();
    percent.connect_notify(move |value| {
        if let (Some(bar), Some(label)) = (bar_weak.upgrade(), label_weak.upgrade()) {
            apply(&bar, &label, *value);
        }
    });

    section
}
