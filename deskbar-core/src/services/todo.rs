//! Two-level to-do list persistence
//!
//! Every mutation updates the in-memory map, emits `changed` and rewrites the
//! store file. Unknown ids are rejected without touching anything.

use std::cell::RefCell;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{ToDoItem, ToDoItemParent, ToDoParentEntry};
use crate::observable::Signal;
use crate::store::{JsonStore, StoreMap};
use crate::tracing::field_names;

const ITEM: &str = "To-do item";
const CHILD: &str = "To-do child";

/// Owns the to-do store
#[derive(Debug)]
pub struct ToDoService {
    store: Option<JsonStore<ToDoParentEntry>>,
    items: RefCell<StoreMap<ToDoParentEntry>>,
    /// Fired after every change, before the file is rewritten
    pub changed: Signal<()>,
}

impl ToDoService {
    /// Opens the store at `store_path`.
    ///
    /// On failure the error is logged and the service runs uninitialized
    /// with an empty list and no writes.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        let path = store_path.into();
        let (store, items) = match JsonStore::open(&path) {
            Ok((store, items)) => {
                tracing::info!({ field_names::PATH } = %path.display(), count = items.len(), "Loaded to-do list");
                (Some(store), items)
            }
            Err(e) => {
                tracing::error!(%e, "Could not initialize to-do store");
                (None, StoreMap::new())
            }
        };
        Self {
            store,
            items: RefCell::new(items),
            changed: Signal::new(),
        }
    }

    /// Whether the store was opened
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    /// Top-level items in insertion order
    #[must_use]
    pub fn items(&self) -> Vec<ToDoItemParent> {
        self.items
            .borrow()
            .iter()
            .map(|(id, entry)| ToDoItemParent::from_entry(*id, entry.clone()))
            .collect()
    }

    /// Looks up a top-level item
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<ToDoItemParent> {
        self.items
            .borrow()
            .get(&id)
            .map(|entry| ToDoItemParent::from_entry(id, entry.clone()))
    }

    /// Inserts or replaces a top-level item, children included
    pub fn add_item(&self, item: &ToDoItemParent) {
        self.items.borrow_mut().insert(item.id, item.to_entry());
        tracing::debug!({ field_names::ITEM_ID } = %item.id, "Added to-do item");
        self.commit_changes();
    }

    /// Removes a top-level item and its children
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn delete_item(&self, id: Uuid) -> ServiceResult<()> {
        if self.items.borrow_mut().shift_remove(&id).is_none() {
            return Err(ServiceError::NotFound { entity: ITEM, id });
        }
        self.commit_changes();
        Ok(())
    }

    /// Replaces an item's text
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn rename_item(&self, id: Uuid, text: impl Into<String>) -> ServiceResult<()> {
        let text = text.into();
        self.with_parent(id, |entry| {
            entry.text = text;
            Ok(())
        })
    }

    /// Appends a child to `parent_id`
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the parent does not exist.
    pub fn add_child(&self, parent_id: Uuid, child: &ToDoItem) -> ServiceResult<()> {
        self.with_parent(parent_id, |entry| {
            entry.children.insert(child.id, child.to_entry());
            Ok(())
        })
    }

    /// Removes a child
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the parent or child does not exist.
    pub fn delete_child(&self, parent_id: Uuid, child_id: Uuid) -> ServiceResult<()> {
        self.with_parent(parent_id, |entry| {
            entry
                .children
                .shift_remove(&child_id)
                .map(|_| ())
                .ok_or(ServiceError::NotFound {
                    entity: CHILD,
                    id: child_id,
                })
        })
    }

    /// Completes an item and all of its current children
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn mark_item_completed(&self, id: Uuid) -> ServiceResult<()> {
        self.with_parent(id, |entry| {
            entry.complete();
            Ok(())
        })
    }

    /// Clears an item's completion flag; children are left as they are
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown ids.
    pub fn mark_item_not_completed(&self, id: Uuid) -> ServiceResult<()> {
        self.with_parent(id, |entry| {
            entry.completed = false;
            Ok(())
        })
    }

    /// Completes one child
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the parent or child does not exist.
    pub fn mark_child_completed(&self, parent_id: Uuid, child_id: Uuid) -> ServiceResult<()> {
        self.set_child(parent_id, child_id, true)
    }

    /// Clears one child's flag, which also clears the parent's
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the parent or child does not exist.
    pub fn mark_child_not_completed(&self, parent_id: Uuid, child_id: Uuid) -> ServiceResult<()> {
        self.set_child(parent_id, child_id, false)
    }

    fn set_child(&self, parent_id: Uuid, child_id: Uuid, completed: bool) -> ServiceResult<()> {
        self.with_parent(parent_id, |entry| {
            if entry.set_child_completed(child_id, completed) {
                Ok(())
            } else {
                Err(ServiceError::NotFound {
                    entity: CHILD,
                    id: child_id,
                })
            }
        })
    }

    /// Runs `f` on a parent entry and commits if it succeeds
    fn with_parent(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ToDoParentEntry) -> ServiceResult<()>,
    ) -> ServiceResult<()> {
        {
            let mut items = self.items.borrow_mut();
            let entry = items
                .get_mut(&id)
                .ok_or(ServiceError::NotFound { entity: ITEM, id })?;
            // Work on a copy so a failed child lookup leaves the entry untouched
            let mut updated = entry.clone();
            f(&mut updated)?;
            *entry = updated;
        }
        self.commit_changes();
        Ok(())
    }

    fn commit_changes(&self) {
        self.changed.emit(&());
        self.write_to_disk();
    }

    fn write_to_disk(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let items = self.items.borrow().clone();
        if let Err(e) = store.save(&items) {
            tracing::error!({ field_names::ERROR } = %e, "Failed to write to-do list");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn service() -> (TempDir, PathBuf, ToDoService) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("todo.json");
        let service = ToDoService::new(&path);
        (temp, path, service)
    }

    fn parent_with_children(n: usize) -> (ToDoItemParent, Vec<Uuid>) {
        let children: Vec<ToDoItem> = (0..n).map(|i| ToDoItem::new(format!("child {i}"))).collect();
        let ids = children.iter().map(|c| c.id).collect();
        (ToDoItemParent::new("parent").with_children(children), ids)
    }

    #[test]
    fn test_add_and_reload() {
        let (_temp, path, service) = service();
        let (parent, child_ids) = parent_with_children(2);
        service.add_item(&parent);

        let reopened = ToDoService::new(&path);
        let item = reopened.get(parent.id).unwrap();
        assert_eq!(item.text, "parent");
        assert_eq!(item.children.keys().copied().collect::<Vec<_>>(), child_ids);
    }

    #[test]
    fn test_completing_parent_completes_children() {
        let (_temp, _path, service) = service();
        let (parent, child_ids) = parent_with_children(3);
        service.add_item(&parent);

        service.mark_item_completed(parent.id).unwrap();
        let item = service.get(parent.id).unwrap();
        assert!(item.completed);
        assert_eq!(item.completed_children(), 3);

        service.mark_child_not_completed(parent.id, child_ids[1]).unwrap();
        let item = service.get(parent.id).unwrap();
        assert!(!item.completed);
        assert_eq!(item.completed_children(), 2);
    }

    #[test]
    fn test_uncompleting_parent_keeps_children() {
        let (_temp, _path, service) = service();
        let (parent, _) = parent_with_children(2);
        service.add_item(&parent);
        service.mark_item_completed(parent.id).unwrap();
        service.mark_item_not_completed(parent.id).unwrap();
        let item = service.get(parent.id).unwrap();
        assert!(!item.completed);
        assert_eq!(item.completed_children(), 2);
    }

    #[test]
    fn test_unknown_ids_change_nothing() {
        let (_temp, path, service) = service();
        let (parent, _) = parent_with_children(1);
        service.add_item(&parent);
        let before = std::fs::read_to_string(&path).unwrap();

        let emitted = Rc::new(Cell::new(0));
        let e = emitted.clone();
        service.changed.connect(move |()| e.set(e.get() + 1));

        assert!(service.mark_item_completed(Uuid::new_v4()).is_err());
        assert!(service.mark_child_completed(parent.id, Uuid::new_v4()).is_err());
        assert!(service.delete_child(parent.id, Uuid::new_v4()).is_err());
        assert!(service.delete_item(Uuid::new_v4()).is_err());

        assert_eq!(emitted.get(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_children_and_rename() {
        let (_temp, _path, service) = service();
        let parent = ToDoItemParent::new("shopping");
        service.add_item(&parent);

        let milk = ToDoItem::new("milk");
        service.add_child(parent.id, &milk).unwrap();
        service.add_child(parent.id, &ToDoItem::new("eggs")).unwrap();
        service.rename_item(parent.id, "groceries").unwrap();
        service.mark_child_completed(parent.id, milk.id).unwrap();

        let item = service.get(parent.id).unwrap();
        assert_eq!(item.text, "groceries");
        assert_eq!(item.children.len(), 2);
        assert!(item.children[&milk.id].completed);

        service.delete_child(parent.id, milk.id).unwrap();
        assert_eq!(service.get(parent.id).unwrap().children.len(), 1);

        service.delete_item(parent.id).unwrap();
        assert!(service.items().is_empty());
    }

    #[test]
    fn test_order_is_insertion_order() {
        let (_temp, path, service) = service();
        let names = ["c", "a", "b"];
        for name in names {
            service.add_item(&ToDoItemParent::new(name));
        }
        let reopened = ToDoService::new(&path);
        let texts: Vec<_> = reopened.items().into_iter().map(|i| i.text).collect();
        assert_eq!(texts, names);
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let (_temp, path, service) = service();
        std::fs::create_dir(path.with_file_name("todo.json.tmp")).unwrap();
        let changes = Rc::new(Cell::new(0));
        let c = Rc::clone(&changes);
        service.changed.connect(move |()| c.set(c.get() + 1));

        let (parent, child_ids) = parent_with_children(2);
        service.add_item(&parent);
        service.rename_item(parent.id, "groceries").unwrap();
        service.mark_child_completed(parent.id, child_ids[0]).unwrap();
        service.delete_child(parent.id, child_ids[1]).unwrap();

        assert!(service.is_initialized());
        assert_eq!(changes.get(), 4);
        let item = service.get(parent.id).unwrap();
        assert_eq!(item.text, "groceries");
        assert_eq!(item.children.len(), 1);
        assert_eq!(item.completed_children(), 1);
        assert!(ToDoService::new(&path).items().is_empty());
    }
}
