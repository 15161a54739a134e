//! To-do commands.

use std::fmt::Write as _;
use std::path::Path;

use deskbar_core::services::ToDoService;
use deskbar_core::{ToDoItem, ToDoItemParent};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{load_settings, open_todo, resolve_id, short_id};

/// Item as printed by `list --format json`
#[derive(Debug, Serialize)]
pub struct ItemOutput {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ItemOutput>,
}

impl From<&ToDoItemParent> for ItemOutput {
    fn from(item: &ToDoItemParent) -> Self {
        Self {
            id: item.id.to_string(),
            text: item.text.clone(),
            completed: item.completed,
            children: item.children.values().map(Into::into).collect(),
        }
    }
}

impl From<&ToDoItem> for ItemOutput {
    fn from(item: &ToDoItem) -> Self {
        Self {
            id: item.id.to_string(),
            text: item.text.clone(),
            completed: item.completed,
            children: Vec::new(),
        }
    }
}

fn open(config_path: Option<&Path>) -> Result<ToDoService, CliError> {
    open_todo(&load_settings(config_path)?)
}

fn resolve_parent(todo: &ToDoService, input: &str) -> Result<Uuid, CliError> {
    resolve_id("To-do item", todo.items().into_iter().map(|i| i.id), input)
}

fn resolve_child(todo: &ToDoService, parent_id: Uuid, input: &str) -> Result<Uuid, CliError> {
    let children = todo
        .get(parent_id)
        .map(|item| item.children.keys().copied().collect::<Vec<_>>())
        .unwrap_or_default();
    resolve_id("To-do child", children, input)
}

/// Add item command handler
pub fn cmd_add(config_path: Option<&Path>, text: &str) -> Result<(), CliError> {
    let todo = open(config_path)?;
    let item = ToDoItemParent::new(text);
    todo.add_item(&item);
    println!("Added to-do {}", item.id);
    Ok(())
}

/// Add child command handler
pub fn cmd_child(config_path: Option<&Path>, parent: &str, text: &str) -> Result<(), CliError> {
    let todo = open(config_path)?;
    let parent_id = resolve_parent(&todo, parent)?;
    let child = ToDoItem::new(text);
    todo.add_child(parent_id, &child)?;
    println!("Added step {} to {parent_id}", child.id);
    Ok(())
}

/// List command handler
pub fn cmd_list(config_path: Option<&Path>, format: OutputFormat) -> Result<(), CliError> {
    let todo = open(config_path)?;
    let items = todo.items();
    match format {
        OutputFormat::Table => println!("{}", format_tree(&items)),
        OutputFormat::Json => {
            let output: Vec<ItemOutput> = items.iter().map(Into::into).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Items as an indented checklist
#[must_use]
pub fn format_tree(items: &[ToDoItemParent]) -> String {
    if items.is_empty() {
        return "Nothing to do.".to_string();
    }
    let mark = |done: bool| if done { 'x' } else { ' ' };

    let mut output = String::new();
    for item in items {
        let _ = write!(output, "[{}] {}  {}", mark(item.completed), short_id(item.id), item.text);
        if !item.children.is_empty() {
            let _ = write!(output, " ({}/{})", item.completed_children(), item.children.len());
        }
        output.push('\n');
        for child in item.children.values() {
            let _ = writeln!(
                output,
                "    [{}] {}  {}",
                mark(child.completed),
                short_id(child.id),
                child.text
            );
        }
    }
    output.trim_end().to_string()
}

/// Done / undone command handler
pub fn cmd_set_completed(
    config_path: Option<&Path>,
    id: &str,
    child: Option<&str>,
    completed: bool,
) -> Result<(), CliError> {
    let todo = open(config_path)?;
    let parent_id = resolve_parent(&todo, id)?;
    match child {
        Some(child) => {
            let child_id = resolve_child(&todo, parent_id, child)?;
            if completed {
                todo.mark_child_completed(parent_id, child_id)?;
            } else {
                todo.mark_child_not_completed(parent_id, child_id)?;
            }
        }
        None if completed => todo.mark_item_completed(parent_id)?,
        None => todo.mark_item_not_completed(parent_id)?,
    }
    println!("Marked {}", if completed { "done" } else { "not done" });
    Ok(())
}

/// Delete command handler
pub fn cmd_delete(config_path: Option<&Path>, id: &str, child: Option<&str>) -> Result<(), CliError> {
    let todo = open(config_path)?;
    let parent_id = resolve_parent(&todo, id)?;
    match child {
        Some(child) => {
            let child_id = resolve_child(&todo, parent_id, child)?;
            todo.delete_child(parent_id, child_id)?;
            println!("Deleted step {child_id}");
        }
        None => {
            todo.delete_item(parent_id)?;
            println!("Deleted to-do {parent_id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_shows_progress_and_children() {
        let mut milk = ToDoItem::new("milk");
        milk.completed = true;
        let item = ToDoItemParent::new("groceries").with_children([milk, ToDoItem::new("bread")]);
        let tree = format_tree(&[item]);
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[ ] ") && lines[0].ends_with("groceries (1/2)"));
        assert!(lines[1].starts_with("    [x] ") && lines[1].ends_with("milk"));
        assert!(lines[2].starts_with("    [ ] ") && lines[2].ends_with("bread"));
    }

    #[test]
    fn test_empty_list_message() {
        assert_eq!(format_tree(&[]), "Nothing to do.");
    }
}
