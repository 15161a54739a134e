//! Notification list and transient popups

use gtk4::prelude::*;
use gtk4::{self, Align, Orientation, glib};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use deskbar_core::services::NotificationService;
use deskbar_core::{Notification, Urgency};

use crate::utils::{clear_box, rebuild_when_idle};

/// How long a popup stays up when the notification sets no timeout
const DEFAULT_POPUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Popup lifetime; critical notifications stay until dismissed
#[must_use]
pub fn popup_timeout(notification: &Notification) -> Option<Duration> {
    match notification.urgency {
        Urgency::Critical => None,
        _ => Some(notification.timeout.unwrap_or(DEFAULT_POPUP_TIMEOUT)),
    }
}

/// Bell icon with a count; the popover lists every notification
pub struct NotificationIndicator {
    button: gtk4::MenuButton,
}

impl NotificationIndicator {
    /// Creates the indicator bound to `notifications`
    #[must_use]
    pub fn new(notifications: &Rc<NotificationService>) -> Self {
        let count_label = gtk4::Label::builder()
            .css_classes(["caption", "notification-count"])
            .visible(false)
            .build();
        let face = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(2)
            .build();
        face.append(&gtk4::Image::from_icon_name("preferences-system-notifications-symbolic"));
        face.append(&count_label);

        let list = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(6)
            .build();
        let scroll = gtk4::ScrolledWindow::builder()
            .child(&list)
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .max_content_height(400)
            .propagate_natural_height(true)
            .build();
        let clear = gtk4::Button::builder()
            .label("Clear")
            .css_classes(["flat"])
            .build();
        let header = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .build();
        header.append(
            &gtk4::Label::builder()
                .label("Notifications")
                .hexpand(true)
                .xalign(0.0)
                .css_classes(["heading"])
                .build(),
        );
        header.append(&clear);

        let content = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(8)
            .margin_top(8)
            .margin_bottom(8)
            .margin_start(8)
            .margin_end(8)
            .width_request(320)
            .build();
        content.append(&header);
        content.append(&scroll);

        let service = Rc::clone(notifications);
        clear.connect_clicked(move |_| service.clear());

        let button = gtk4::MenuButton::builder()
            .child(&face)
            .popover(&gtk4::Popover::builder().child(&content).build())
            .css_classes(["flat", "notifications"])
            .build();

        let sync: Rc<dyn Fn()> = {
            let count_label = count_label.downgrade();
            let list = list.downgrade();
            let service = Rc::downgrade(notifications);
            Rc::new(move || {
                let (Some(count_label), Some(list), Some(service)) =
                    (count_label.upgrade(), list.upgrade(), service.upgrade())
                else {
                    return;
                };
                let count = service.count();
                count_label.set_visible(count > 0);
                count_label.set_text(&count.to_string());
                rebuild_when_idle(move || fill_list(&list, &service));
            })
        };
        sync();
        let s = Rc::clone(&sync);
        notifications.notification_added.connect(move |_| s());
        notifications.notification_closed.connect(move |_| sync());

        Self { button }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::MenuButton {
        &self.button
    }
}

fn fill_list(list: &gtk4::Box, service: &Rc<NotificationService>) {
    clear_box(list);
    let notifications = service.notifications();
    if notifications.is_empty() {
        list.append(
            &gtk4::Label::builder()
                .label("No notifications")
                .css_classes(["dim-label"])
                .build(),
        );
        return;
    }
    // Newest first
    for notification in notifications.iter().rev() {
        list.append(&notification_card(service, notification, || {}));
    }
}

/// Summary, body and a dismiss button
fn notification_card(
    service: &Rc<NotificationService>,
    notification: &Notification,
    on_dismiss: impl Fn() + 'static,
) -> gtk4::Box {
    let card = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(8)
        .css_classes(["card", "notification", notification.urgency.css_class()])
        .build();
    let icon = gtk4::Image::from_icon_name(notification.icon.as_deref().unwrap_or("dialog-information-symbolic"));
    icon.set_pixel_size(32);
    icon.set_valign(Align::Start);
    card.append(&icon);

    let text = gtk4::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(2)
        .hexpand(true)
        .build();
    text.append(
        &gtk4::Label::builder()
            .label(notification.summary.as_str())
            .xalign(0.0)
            .wrap(true)
            .css_classes(["heading"])
            .build(),
    );
    if !notification.body.is_empty() {
        text.append(
            &gtk4::Label::builder()
                .label(notification.body.as_str())
                .xalign(0.0)
                .wrap(true)
                .build(),
        );
    }
    text.append(
        &gtk4::Label::builder()
            .label(notification.created_at.format("%H:%M").to_string())
            .xalign(0.0)
            .css_classes(["caption", "dim-label"])
            .build(),
    );
    card.append(&text);

    let dismiss = gtk4::Button::builder()
        .icon_name("window-close-symbolic")
        .valign(Align::Start)
        .css_classes(["flat", "circular"])
        .build();
    let service = Rc::clone(service);
    let id = notification.id;
    dismiss.connect_clicked(move |_| {
        service.close(id);
        on_dismiss();
    });
    card.append(&dismiss);

    card
}

/// Shows each new notification in its own small window
pub struct NotificationPopups;

impl NotificationPopups {
    /// Subscribes to `notifications` for the lifetime of the application
    pub fn attach(app: &libadwaita::Application, notifications: &Rc<NotificationService>) {
        let windows: Rc<RefCell<HashMap<u32, gtk4::Window>>> = Rc::default();

        let app_weak = app.downgrade();
        let service_weak = Rc::downgrade(notifications);
        let open = Rc::clone(&windows);
        notifications.notification_added.connect(move |id| {
            let (Some(app), Some(service)) = (app_weak.upgrade(), service_weak.upgrade()) else {
                return;
            };
            let Some(notification) = service.get(*id) else {
                return;
            };
            let window = Self::show(&app, &service, &notification);

            let map = Rc::downgrade(&open);
            let closed_id = *id;
            window.connect_close_request(move |_| {
                if let Some(map) = map.upgrade() {
                    map.borrow_mut().remove(&closed_id);
                }
                glib::Propagation::Proceed
            });
            open.borrow_mut().insert(*id, window);
        });

        notifications.notification_closed.connect(move |id| {
            let window = windows.borrow_mut().remove(id);
            if let Some(window) = window {
                window.close();
            }
        });
    }

    fn show(
        app: &libadwaita::Application,
        service: &Rc<NotificationService>,
        notification: &Notification,
    ) -> gtk4::Window {
        let window = gtk4::Window::builder()
            .application(app)
            .title(notification.summary.as_str())
            .decorated(false)
            .resizable(false)
            .default_width(360)
            .css_classes(["notification-popup"])
            .build();

        let window_weak = window.downgrade();
        let card = notification_card(service, notification, move || {
            if let Some(window) = window_weak.upgrade() {
                window.close();
            }
        });
        card.set_margin_top(8);
        card.set_margin_bottom(8);
        card.set_margin_start(8);
        card.set_margin_end(8);
        window.set_child(Some(&card));

        if let Some(timeout) = popup_timeout(notification) {
            let window_weak = window.downgrade();
            glib::timeout_add_local_once(timeout, move || {
                if let Some(window) = window_weak.upgrade() {
                    window.close();
                }
            });
        }

        window.present();
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskbar_core::NotificationRequest;

    fn sample(urgency: Urgency, timeout: Option<Duration>) -> Notification {
        let service = NotificationService::new();
        let mut request = NotificationRequest::new("Now", "Standup @ 09:30");
        request.urgency = urgency;
        request.timeout = timeout;
        let id = service.send_internal_notification(request);
        service.get(id).unwrap()
    }

    #[test]
    fn test_popup_timeout_defaults_and_critical_stays() {
        assert_eq!(popup_timeout(&sample(Urgency::Normal, None)), Some(DEFAULT_POPUP_TIMEOUT));
        assert_eq!(
            popup_timeout(&sample(Urgency::Low, Some(Duration::from_secs(2)))),
            Some(Duration::from_secs(2))
        );
        assert_eq!(popup_timeout(&sample(Urgency::Critical, None)), None);
    }
}
