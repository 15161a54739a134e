//! Network indicator and connection menu

use gtk4::prelude::*;
use gtk4::{self, Align, Orientation};
use std::cell::Cell;
use std::rc::Rc;

use deskbar_core::services::{AccessPoint, Connection, NetworkService};

use crate::async_utils::spawn_async;
use crate::utils::{clear_box, rebuild_when_idle};

/// Signal strength icon for an access point
#[must_use]
pub fn signal_icon_name(signal: u8) -> &'static str {
    match signal {
        0..=19 => "network-wireless-signal-none-symbolic",
        20..=39 => "network-wireless-signal-weak-symbolic",
        40..=59 => "network-wireless-signal-ok-symbolic",
        60..=79 => "network-wireless-signal-good-symbolic",
        _ => "network-wireless-signal-excellent-symbolic",
    }
}

/// Primary connection icon; the popover lists profiles and access points
pub struct NetworkIndicator {
    button: gtk4::MenuButton,
}

impl NetworkIndicator {
    /// Creates the indicator bound to `network`
    #[must_use]
    pub fn new(network: &Rc<NetworkService>) -> Self {
        let wifi_switch = gtk4::Switch::builder().valign(Align::Center).build();
        let scan_button = gtk4::Button::builder()
            .icon_name("view-refresh-symbolic")
            .tooltip_text("Scan for networks")
            .css_classes(["flat"])
            .build();
        let wifi_row = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(6)
            .build();
        wifi_row.append(
            &gtk4::Label::builder()
                .label("Wi-Fi")
                .hexpand(true)
                .xalign(0.0)
                .css_classes(["heading"])
                .build(),
        );
        wifi_row.append(&scan_button);
        wifi_row.append(&wifi_switch);

        let connections_box = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(2)
            .build();
        let access_points_box = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(2)
            .build();
        let access_points_scroll = gtk4::ScrolledWindow::builder()
            .child(&access_points_box)
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .min_content_height(160)
            .max_content_height(320)
            .propagate_natural_height(true)
            .build();

        let content = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(8)
            .margin_top(8)
            .margin_bottom(8)
            .margin_start(8)
            .margin_end(8)
            .width_request(300)
            .build();
        content.append(
            &gtk4::Label::builder()
                .label("Connections")
                .xalign(0.0)
                .css_classes(["heading"])
                .build(),
        );
        content.append(&connections_box);
        content.append(&gtk4::Separator::new(Orientation::Horizontal));
        content.append(&wifi_row);
        content.append(&access_points_scroll);

        let button = gtk4::MenuButton::builder()
            .icon_name(network.primary_connection_type.get().icon_name())
            .popover(&gtk4::Popover::builder().child(&content).build())
            .css_classes(["flat", "network"])
            .build();

        let syncing = Rc::new(Cell::new(false));

        let service = Rc::clone(network);
        let guard = Rc::clone(&syncing);
        wifi_switch.connect_active_notify(move |switch| {
            if !guard.get() && switch.is_active() != service.wifi_enabled.get() {
                let service = Rc::clone(&service);
                spawn_async(async move { service.toggle_wireless().await });
            }
        });

        let service = Rc::clone(network);
        scan_button.connect_clicked(move |_| request_scan(&service));

        // Scan whenever the menu is opened
        if let Some(popover) = button.popover() {
            let service = Rc::clone(network);
            popover.connect_show(move |_| request_scan(&service));
        }

        let icon_button = button.downgrade();
        network.primary_connection_type.connect_notify(move |primary| {
            if let Some(button) = icon_button.upgrade() {
                button.set_icon_name(primary.icon_name());
            }
        });

        let sync_wifi = {
            let switch = wifi_switch.downgrade();
            let wifi_row = wifi_row.downgrade();
            let scroll = access_points_scroll.downgrade();
            let service = Rc::downgrade(network);
            move || {
                let (Some(switch), Some(wifi_row), Some(scroll), Some(service)) = (
                    switch.upgrade(),
                    wifi_row.upgrade(),
                    scroll.upgrade(),
                    service.upgrade(),
                ) else {
                    return;
                };
                let has_device = service.has_wifi_device();
                wifi_row.set_visible(has_device);
                scroll.set_visible(has_device && service.wifi_enabled.get());
                syncing.set(true);
                switch.set_active(service.wifi_enabled.get());
                syncing.set(false);
            }
        };
        sync_wifi();
        network.wifi_enabled.connect_notify(move |_| sync_wifi());

        let rebuild_connections = {
            let container = connections_box.downgrade();
            let service = Rc::downgrade(network);
            Rc::new(move || {
                if let (Some(container), Some(service)) = (container.upgrade(), service.upgrade()) {
                    defer_rebuild(container, service, fill_connections);
                }
            })
        };
        rebuild_connections();
        let r = Rc::clone(&rebuild_connections);
        network.connections.connect_notify(move |_| r());
        let r = Rc::clone(&rebuild_connections);
        network.active_connections.connect_notify(move |_| r());

        let rebuild_access_points = {
            let container = access_points_box.downgrade();
            let service = Rc::downgrade(network);
            Rc::new(move || {
                if let (Some(container), Some(service)) = (container.upgrade(), service.upgrade()) {
                    defer_rebuild(container, service, fill_access_points);
                }
            })
        };
        rebuild_access_points();
        let r = Rc::clone(&rebuild_access_points);
        network.access_points.connect_notify(move |_| r());
        let r = Rc::clone(&rebuild_access_points);
        network.connections.connect_notify(move |_| r());

        Self { button }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::MenuButton {
        &self.button
    }
}

fn request_scan(service: &Rc<NetworkService>) {
    let service = Rc::clone(service);
    spawn_async(async move { service.request_scan().await });
}

fn defer_rebuild(
    container: gtk4::Box,
    service: Rc<NetworkService>,
    fill: fn(&gtk4::Box, &Rc<NetworkService>),
) {
    rebuild_when_idle(move || {
        clear_box(&container);
        fill(&container, &service);
    });
}

fn fill_connections(container: &gtk4::Box, service: &Rc<NetworkService>) {
    let connections = service.connections.get();
    if connections.is_empty() {
        container.append(
            &gtk4::Label::builder()
                .label("No saved connections")
                .xalign(0.0)
                .css_classes(["dim-label"])
                .build(),
        );
        return;
    }
    for connection in connections {
        container.append(&connection_row(service, connection));
    }
}

fn connection_row(service: &Rc<NetworkService>, connection: Connection) -> gtk4::Box {
    let active = service.is_connection_active(&connection);
    let row = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .build();
    let icon_name = if connection.is_wireless() {
        "network-wireless-symbolic"
    } else if connection.is_ethernet() {
        "network-wired-symbolic"
    } else {
        "network-vpn-symbolic"
    };
    row.append(&gtk4::Image::from_icon_name(icon_name));
    row.append(&name_label(&connection.name, active));

    let toggle = gtk4::Button::builder()
        .label(if active { "Disconnect" } else { "Connect" })
        .css_classes(["flat"])
        .build();
    let s = Rc::clone(service);
    let c = connection.clone();
    toggle.connect_clicked(move |_| {
        let (s, c) = (Rc::clone(&s), c.clone());
        spawn_async(async move { s.toggle_connection_active(&c).await });
    });
    row.append(&toggle);

    let delete = gtk4::Button::builder()
        .icon_name("user-trash-symbolic")
        .tooltip_text("Forget")
        .css_classes(["flat"])
        .build();
    let s = Rc::clone(service);
    delete.connect_clicked(move |_| {
        let (s, connection) = (Rc::clone(&s), connection.clone());
        spawn_async(async move { s.delete_connection(&connection).await });
    });
    row.append(&delete);

    row
}

fn name_label(name: &str, active: bool) -> gtk4::Label {
    let label = gtk4::Label::builder()
        .label(name)
        .hexpand(true)
        .xalign(0.0)
        .ellipsize(gtk4::pango::EllipsizeMode::End)
        .build();
    if active {
        label.add_css_class("accent");
    }
    label
}

fn fill_access_points(container: &gtk4::Box, service: &Rc<NetworkService>) {
    let access_points = service.access_points.get();
    if access_points.is_empty() {
        container.append(
            &gtk4::Label::builder()
                .label("No networks found")
                .xalign(0.0)
                .css_classes(["dim-label"])
                .build(),
        );
        return;
    }
    for access_point in access_points {
        container.append(&access_point_row(service, access_point));
    }
}

fn access_point_row(service: &Rc<NetworkService>, access_point: AccessPoint) -> gtk4::Box {
    let row = gtk4::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(2)
        .build();
    let header = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .build();
    header.append(&gtk4::Image::from_icon_name(signal_icon_name(access_point.signal)));
    header.append(&name_label(&access_point.ssid, access_point.in_use));
    if access_point.secured {
        header.append(&gtk4::Image::from_icon_name("channel-secure-symbolic"));
    }
    row.append(&header);

    if access_point.in_use {
        return row;
    }

    // Saved profiles carry their own secret
    let password = (access_point.secured && !service.is_access_point_connected(&access_point.ssid))
        .then(|| {
            gtk4::PasswordEntry::builder()
                .placeholder_text("Password")
                .show_peek_icon(true)
                .build()
        });
    let connect = gtk4::Button::builder()
        .label("Connect")
        .css_classes(["flat"])
        .halign(Align::End)
        .build();

    let s = Rc::clone(service);
    let entry = password.clone();
    connect.connect_clicked(move |_| {
        let secret = entry
            .as_ref()
            .map(|e| e.text().to_string())
            .filter(|p| !p.is_empty());
        let (s, access_point) = (Rc::clone(&s), access_point.clone());
        spawn_async(async move {
            s.connect_to_access_point(&access_point, secret.as_deref()).await;
        });
    });

    let actions = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .build();
    if let Some(entry) = &password {
        entry.set_hexpand(true);
        actions.append(entry);
    }
    actions.append(&connect);
    row.append(&actions);

    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_icon_buckets() {
        assert_eq!(signal_icon_name(0), "network-wireless-signal-none-symbolic");
        assert_eq!(signal_icon_name(45), "network-wireless-signal-ok-symbolic");
        assert_eq!(signal_icon_name(100), "network-wireless-signal-excellent-symbolic");
    }
}
