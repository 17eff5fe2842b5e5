//! Task list domain model.
//!
//! # Responsibility
//! - Own the ordered checklist items of one list.
//! - Provide the list mutations the inspector performs.
//!
//! # Invariants
//! - Item order is user-controlled and preserved by every operation.
//! - `editing` is session state and never serialized.
//! - Index arguments out of range are caller bugs and panic.

use crate::model::descriptor::ReferenceDescriptor;
use serde::{Deserialize, Serialize};

/// Name given to newly created lists.
pub const DEFAULT_LIST_NAME: &str = "To Do";

/// One checklist entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub completed: bool,
    /// Free-form text; may contain literal newlines.
    pub text: String,
    /// Optional link to a host object.
    pub reference: Option<ReferenceDescriptor>,
    /// Whether the text field currently has focus. Not persisted.
    #[serde(skip)]
    pub editing: bool,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn new_completed(text: impl Into<String>) -> Self {
        Self {
            completed: true,
            ..Self::new(text)
        }
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }
}

/// Named, ordered list of checklist items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub name: String,
    pub items: Vec<ChecklistItem>,
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_NAME)
    }
}

impl TaskList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends an empty item and returns its index.
    pub fn add(&mut self) -> usize {
        self.push(ChecklistItem::default())
    }

    /// Appends `item` and returns its index.
    pub fn push(&mut self, item: ChecklistItem) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    /// Removes and returns the item at `index`.
    ///
    /// # Panics
    /// Panics when `index >= len()`.
    pub fn remove_at(&mut self, index: usize) -> ChecklistItem {
        assert!(
            index < self.items.len(),
            "remove_at index {index} out of range for list of {} items",
            self.items.len()
        );
        self.items.remove(index)
    }

    /// Moves one item to `to`, shifting the items in between.
    ///
    /// # Panics
    /// Panics when either index is out of range.
    pub fn move_item(&mut self, from: usize, to: usize) {
        let len = self.items.len();
        assert!(
            from < len && to < len,
            "move_item indices {from} -> {to} out of range for list of {len} items"
        );
        let item = self.items.remove(from);
        self.items.insert(to, item);
    }

    /// Drops every completed item and returns how many were removed.
    pub fn remove_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.completed);
        before - self.items.len()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.completed).count()
    }

    pub fn get(&self, index: usize) -> Option<&ChecklistItem> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ChecklistItem> {
        self.items.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter()
    }
}
