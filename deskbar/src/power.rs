//! Power menu

use adw::prelude::*;
use gtk4::prelude::*;
use gtk4::{self, Orientation};
use libadwaita as adw;

use deskbar_core::services::PowerAction;

use crate::async_utils::spawn_async;

/// Response id of the confirming button
const CONFIRM_RESPONSE: &str = "yes";

/// Shutdown icon; the popover lists the power actions
pub struct PowerMenu {
    button: gtk4::MenuButton,
}

impl PowerMenu {
    /// Creates the menu
    #[must_use]
    pub fn new() -> Self {
        let content = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(2)
            .margin_top(6)
            .margin_bottom(6)
            .margin_start(6)
            .margin_end(6)
            .build();
        let popover = gtk4::Popover::builder().child(&content).build();

        let button = gtk4::MenuButton::builder()
            .icon_name("system-shutdown-symbolic")
            .tooltip_text("Power")
            .popover(&popover)
            .css_classes(["flat", "power"])
            .build();

        for action in PowerAction::ALL {
            let row = gtk4::Box::builder()
                .orientation(Orientation::Horizontal)
                .spacing(8)
                .build();
            row.append(&gtk4::Image::from_icon_name(action.icon_name()));
            row.append(&gtk4::Label::new(Some(action.label())));
            let item = gtk4::Button::builder()
                .child(&row)
                .css_classes(["flat"])
                .build();

            let button_weak = button.downgrade();
            item.connect_clicked(move |_| {
                let Some(button) = button_weak.upgrade() else {
                    return;
                };
                button.popdown();
                request(action, button.upcast_ref());
            });
            content.append(&item);
        }

        Self { button }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::MenuButton {
        &self.button
    }
}

impl Default for PowerMenu {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `action`, asking first when it has a confirmation prompt
fn request(action: PowerAction, parent: &gtk4::Widget) {
    let Some(question) = action.confirmation() else {
        run(action);
        return;
    };

    let alert = adw::AlertDialog::builder()
        .heading(action.label())
        .body(question)
        .build();
    alert.add_response("no", "No");
    alert.add_response(CONFIRM_RESPONSE, "Yes");
    alert.set_response_appearance(CONFIRM_RESPONSE, adw::ResponseAppearance::Destructive);
    alert.set_default_response(Some("no"));
    alert.set_close_response("no");
    alert.connect_response(None, move |_, response| {
        if response == CONFIRM_RESPONSE {
            run(action);
        }
    });
    alert.present(Some(parent));
}

fn run(action: PowerAction) {
    spawn_async(async move {
        if let Err(e) = action.run().await {
            tracing::error!(%e, %action, "Power action failed");
        }
    });
}
