//! To-do list for the control panel

use gtk4::prelude::*;
use gtk4::{self, Orientation};
use std::rc::Rc;
use uuid::Uuid;

use deskbar_core::error::ServiceResult;
use deskbar_core::services::ToDoService;
use deskbar_core::{ToDoItem, ToDoItemParent};

use crate::utils::{clear_box, rebuild_when_idle};

/// `done/total` for items with children
#[must_use]
pub fn progress_text(item: &ToDoItemParent) -> Option<String> {
    (!item.children.is_empty())
        .then(|| format!("{}/{}", item.completed_children(), item.children.len()))
}

/// Add entry above the two-level list
pub struct ToDoView {
    container: gtk4::Box,
}

impl ToDoView {
    /// Creates the view bound to `todo`
    #[must_use]
    pub fn new(todo: &Rc<ToDoService>) -> Self {
        let entry = gtk4::Entry::builder()
            .placeholder_text("New to-do")
            .hexpand(true)
            .build();
        let add_button = gtk4::Button::builder()
            .icon_name("list-add-symbolic")
            .tooltip_text("Add to-do")
            .build();
        let form = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .css_classes(["linked"])
            .build();
        form.append(&entry);
        form.append(&add_button);

        let list = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(4)
            .build();
        let scroll = gtk4::ScrolledWindow::builder()
            .child(&list)
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .min_content_height(240)
            .vexpand(true)
            .build();

        let container = gtk4::Box::builder()
            .orientation(Orientation::Vertical)
            .spacing(8)
            .css_classes(["todo"])
            .build();
        container.append(
            &gtk4::Label::builder()
                .label("To-do")
                .xalign(0.0)
                .css_classes(["heading"])
                .build(),
        );
        container.append(&form);
        container.append(&scroll);

        let submit: Rc<dyn Fn()> = {
            let entry = entry.downgrade();
            let todo = Rc::clone(todo);
            Rc::new(move || {
                let Some(entry) = entry.upgrade() else {
                    return;
                };
                let text = entry.text();
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                todo.add_item(&ToDoItemParent::new(text));
                entry.set_text("");
            })
        };
        let s = Rc::clone(&submit);
        add_button.connect_clicked(move |_| s());
        entry.connect_activate(move |_| submit());

        let rebuild = {
            let list = list.downgrade();
            let todo = Rc::downgrade(todo);
            move || {
                let (Some(list), Some(todo)) = (list.upgrade(), todo.upgrade()) else {
                    return;
                };
                rebuild_when_idle(move || fill_list(&list, &todo));
            }
        };
        rebuild();
        todo.changed.connect(move |()| rebuild());

        Self { container }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::Box {
        &self.container
    }
}

fn log_failure(result: ServiceResult<()>) {
    if let Err(e) = result {
        tracing::warn!(%e, "To-do update failed");
    }
}

fn fill_list(list: &gtk4::Box, todo: &Rc<ToDoService>) {
    clear_box(list);
    let items = todo.items();
    if items.is_empty() {
        list.append(
            &gtk4::Label::builder()
                .label("Nothing to do")
                .xalign(0.0)
                .css_classes(["dim-label"])
                .build(),
        );
        return;
    }
    for item in &items {
        list.append(&parent_row(todo, item));
    }
}

fn parent_row(todo: &Rc<ToDoService>, item: &ToDoItemParent) -> gtk4::Box {
    let parent_id = item.id;
    let block = gtk4::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(2)
        .css_classes(["todo-item"])
        .build();

    let row = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .build();
    let check = gtk4::CheckButton::builder()
        .label(item.text.as_str())
        .active(item.completed)
        .hexpand(true)
        .build();
    let service = Rc::clone(todo);
    check.connect_toggled(move |check| {
        log_failure(if check.is_active() {
            service.mark_item_completed(parent_id)
        } else {
            service.mark_item_not_completed(parent_id)
        });
    });
    row.append(&check);

    if let Some(progress) = progress_text(item) {
        row.append(
            &gtk4::Label::builder()
                .label(progress)
                .css_classes(["caption", "dim-label", "numeric"])
                .build(),
        );
    }

    let child_entry = gtk4::Entry::builder()
        .placeholder_text("Add step")
        .margin_start(24)
        .visible(false)
        .build();
    let add_child = gtk4::Button::builder()
        .icon_name("list-add-symbolic")
        .tooltip_text("Add step")
        .css_classes(["flat"])
        .build();
    let entry_weak = child_entry.downgrade();
    add_child.connect_clicked(move |_| {
        if let Some(entry) = entry_weak.upgrade() {
            entry.set_visible(!entry.is_visible());
            entry.grab_focus();
        }
    });
    row.append(&add_child);

    let delete = gtk4::Button::builder()
        .icon_name("user-trash-symbolic")
        .tooltip_text("Delete")
        .css_classes(["flat"])
        .build();
    let service = Rc::clone(todo);
    delete.connect_clicked(move |_| log_failure(service.delete_item(parent_id)));
    row.append(&delete);
    block.append(&row);

    for child in item.children.values() {
        block.append(&child_row(todo, parent_id, child));
    }

    let service = Rc::clone(todo);
    child_entry.connect_activate(move |entry| {
        let text = entry.text();
        let text = text.trim();
        if !text.is_empty() {
            log_failure(service.add_child(parent_id, &ToDoItem::new(text)));
        }
    });
    block.append(&child_entry);

    block
}

fn child_row(todo: &Rc<ToDoService>, parent_id: Uuid, child: &ToDoItem) -> gtk4::Box {
    let child_id = child.id;
    let row = gtk4::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .margin_start(24)
        .css_classes(["todo-child"])
        .build();
    let check = gtk4::CheckButton::builder()
        .label(child.text.as_str())
        .active(child.completed)
        .hexpand(true)
        .build();
    let service = Rc::clone(todo);
    check.connect_toggled(move |check| {
        log_failure(if check.is_active() {
            service.mark_child_completed(parent_id, child_id)
        } else {
            service.mark_child_not_completed(parent_id, child_id)
        });
    });
    row.append(&check);

    let delete = gtk4::Button::builder()
        .icon_name("edit-delete-symbolic")
        .tooltip_text("Delete step")
        .css_classes(["flat"])
        .build();
    let service = Rc::clone(todo);
    delete.connect_clicked(move |_| log_failure(service.delete_child(parent_id, child_id)));
    row.append(&delete);

    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_only_with_children() {
        let mut item = ToDoItemParent::new("groceries");
        assert_eq!(progress_text(&item), None);

        let mut milk = ToDoItem::new("milk");
        milk.completed = true;
        item = item.with_children([milk, ToDoItem::new("bread")]);
        assert_eq!(progress_text(&item).as_deref(), Some("1/2"));
    }
}
