//! Property-based tests for the to-do list
//!
//! Covers completion cascades and persistence round-trips.

use deskbar_core::services::ToDoService;
use deskbar_core::{ToDoItem, ToDoItemParent};
use proptest::prelude::*;
use tempfile::TempDir;

/// Strategy for item text
fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.!?]{1,30}"
}

/// Strategy for a parent with up to eight children in random states
fn arb_parent() -> impl Strategy<Value = ToDoItemParent> {
    (
        arb_text(),
        any::<bool>(),
        prop::collection::vec((arb_text(), any::<bool>()), 0..8),
    )
        .prop_map(|(text, completed, children)| {
            let mut parent = ToDoItemParent::new(text).with_children(children.into_iter().map(
                |(text, completed)| {
                    let mut child = ToDoItem::new(text);
                    child.completed = completed;
                    child
                },
            ));
            parent.completed = completed;
            parent
        })
}

fn open(temp: &TempDir) -> ToDoService {
    ToDoService::new(temp.path().join("todo.json"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Completing a parent completes it and every child it has
    #[test]
    fn prop_complete_parent_cascades(parent in arb_parent()) {
        let temp = TempDir::new().unwrap();
        let service = open(&temp);
        service.add_item(&parent);
        service.mark_item_completed(parent.id).unwrap();

        let item = service.get(parent.id).unwrap();
        prop_assert!(item.completed);
        prop_assert!(item.children.values().all(|c| c.completed));
        prop_assert_eq!(item.children.len(), parent.children.len());
    }

    /// Un-completing any child of a completed parent un-completes the parent
    #[test]
    fn prop_uncomplete_child_uncompletes_parent(parent in arb_parent(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!parent.children.is_empty());
        let temp = TempDir::new().unwrap();
        let service = open(&temp);
        service.add_item(&parent);
        service.mark_item_completed(parent.id).unwrap();

        let child_id = *parent.children.keys().nth(pick.index(parent.children.len())).unwrap();
        service.mark_child_not_completed(parent.id, child_id).unwrap();

        let item = service.get(parent.id).unwrap();
        prop_assert!(!item.completed);
        prop_assert!(!item.children[&child_id].completed);
        prop_assert_eq!(item.completed_children(), parent.children.len() - 1);
    }

    /// Items and children read back from disk equal what was stored, in order
    #[test]
    fn prop_store_round_trip(parents in prop::collection::vec(arb_parent(), 0..10)) {
        let temp = TempDir::new().unwrap();
        {
            let service = open(&temp);
            for parent in &parents {
                service.add_item(parent);
            }
        }
        let reopened = open(&temp);
        prop_assert_eq!(reopened.items(), parents);
    }
}
