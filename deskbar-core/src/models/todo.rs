//! Two-level to-do list model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A leaf to-do item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToDoItem {
    /// Unique identifier within its parent
    pub id: Uuid,
    /// Item text
    pub text: String,
    /// Completion flag
    pub completed: bool,
}

/// A top-level to-do item owning child items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToDoItemParent {
    /// Unique identifier, also the store key
    pub id: Uuid,
    /// Item text
    pub text: String,
    /// Completion flag
    pub completed: bool,
    /// Children in insertion order
    pub children: IndexMap<Uuid, ToDoItem>,
}

/// Stored form of a child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDoItemEntry {
    /// Text
    pub text: String,
    /// Completion flag
    #[serde(default)]
    pub completed: bool,
}

/// Stored form of a parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDoParentEntry {
    /// Text
    pub text: String,
    /// Completion flag
    #[serde(default)]
    pub completed: bool,
    /// Children keyed by id
    #[serde(default)]
    pub children: IndexMap<Uuid, ToDoItemEntry>,
}

impl ToDoItem {
    /// New incomplete item with a fresh id
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            completed: false,
        }
    }

    /// Rebuilds from key and entry
    #[must_use]
    pub fn from_entry(id: Uuid, entry: ToDoItemEntry) -> Self {
        Self {
            id,
            text: entry.text,
            completed: entry.completed,
        }
    }

    /// Stored representation
    #[must_use]
    pub fn to_entry(&self) -> ToDoItemEntry {
        ToDoItemEntry {
            text: self.text.clone(),
            completed: self.completed,
        }
    }
}

impl ToDoItemParent {
    /// New incomplete parent without children
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            completed: false,
            children: IndexMap::new(),
        }
    }

    /// Adds children, keeping their order
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = ToDoItem>) -> Self {
        for child in children {
            self.children.insert(child.id, child);
        }
        self
    }

    /// Rebuilds from key and entry
    #[must_use]
    pub fn from_entry(id: Uuid, entry: ToDoParentEntry) -> Self {
        Self {
            id,
            text: entry.text,
            completed: entry.completed,
            children: entry
                .children
                .into_iter()
                .map(|(cid, child)| (cid, ToDoItem::from_entry(cid, child)))
                .collect(),
        }
    }

    /// Stored representation
    #[must_use]
    pub fn to_entry(&self) -> ToDoParentEntry {
        ToDoParentEntry {
            text: self.text.clone(),
            completed: self.completed,
            children: self
                .children
                .iter()
                .map(|(id, child)| (*id, child.to_entry()))
                .collect(),
        }
    }

    /// Number of completed children
    #[must_use]
    pub fn completed_children(&self) -> usize {
        self.children.values().filter(|c| c.completed).count()
    }
}

impl ToDoParentEntry {
    /// Marks the parent and every current child complete
    pub fn complete(&mut self) {
        self.completed = true;
        for child in self.children.values_mut() {
            child.completed = true;
        }
    }

    /// Sets a child's flag; un-completing a child also un-completes the parent.
    /// Returns `false` if the child does not exist.
    pub fn set_child_completed(&mut self, child_id: Uuid, completed: bool) -> bool {
        let Some(child) = self.children.get_mut(&child_id) else {
            return false;
        };
        child.completed = completed;
        if !completed && self.completed {
            self.completed = false;
        }
        true
    }
}
