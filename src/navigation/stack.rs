//! Navigation (breadcrumb) stack.
//!
//! Shape: zero or more concept items, then at most one subtopic item, then at
//! most one card item. Re-entering a kind replaces the existing item of that
//! kind; nothing is ever appended out of order.

use serde::{Deserialize, Serialize};

use crate::error::NavFault;

/// Kind of breadcrumb entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavKind {
    Concept,
    Subtopic,
    Card,
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub id: String,
    pub kind: NavKind,
    pub name: String,
}

impl NavItem {
    pub fn concept(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NavKind::Concept,
            name: name.into(),
        }
    }

    /// Subtopic item; its id is concept-qualified (`concept.subtopic`).
    pub fn subtopic(concept_id: &str, subtopic_id: &str, name: impl Into<String>) -> Self {
        Self {
            id: subtopic_item_id(concept_id, subtopic_id),
            kind: NavKind::Subtopic,
            name: name.into(),
        }
    }

    pub fn card(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NavKind::Card,
            name: name.into(),
        }
    }
}

/// `concept.subtopic` id used for subtopic breadcrumbs and drill requests.
pub fn subtopic_item_id(concept_id: &str, subtopic_id: &str) -> String {
    format!("{}.{}", concept_id, subtopic_id)
}

/// Split a subtopic item id back into (concept, subtopic).
pub fn split_subtopic_item_id(id: &str) -> Option<(&str, &str)> {
    id.split_once('.')
}

/// Ordered breadcrumb trail with validated transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationStack {
    items: Vec<NavItem>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Push a concept, dropping any subtopic/card tail first.
    ///
    /// A concept already on the stack is not duplicated: the stack is cut back
    /// to that concept instead.
    pub fn push_concept(&mut self, item: NavItem) {
        debug_assert_eq!(item.kind, NavKind::Concept);
        self.items.retain(|i| i.kind == NavKind::Concept);
        if let Some(pos) = self.items.iter().position(|i| i.id == item.id) {
            self.items.truncate(pos);
        }
        self.items.push(item);
    }

    /// Replace the subtopic (and any card) after the concept prefix.
    pub fn set_subtopic(&mut self, item: NavItem) -> Result<(), NavFault> {
        debug_assert_eq!(item.kind, NavKind::Subtopic);
        let prefix = self.concept_prefix_len();
        if prefix == 0 {
            return Err(NavFault::MissingConcept);
        }
        self.items.truncate(prefix);
        self.items.push(item);
        Ok(())
    }

    /// Replace the card item; requires a subtopic.
    pub fn set_card(&mut self, item: NavItem) -> Result<(), NavFault> {
        debug_assert_eq!(item.kind, NavKind::Card);
        let Some(pos) = self.items.iter().position(|i| i.kind == NavKind::Subtopic) else {
            return Err(NavFault::MissingSubtopic);
        };
        self.items.truncate(pos + 1);
        self.items.push(item);
        Ok(())
    }

    /// Keep items `0..=index` and return the new trailing item.
    pub fn truncate_to(&mut self, index: usize) -> Result<&NavItem, NavFault> {
        if index >= self.items.len() {
            return Err(NavFault::BreadcrumbOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.items.truncate(index + 1);
        Ok(&self.items[index])
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, index: usize) -> Option<&NavItem> {
        self.items.get(index)
    }

    pub fn peek(&self) -> Option<&NavItem> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NavItem> {
        self.items.iter()
    }

    /// Number of leading concept items.
    pub fn concept_prefix_len(&self) -> usize {
        self.items
            .iter()
            .take_while(|i| i.kind == NavKind::Concept)
            .count()
    }

    pub fn concepts(&self) -> impl Iterator<Item = &NavItem> {
        self.items.iter().filter(|i| i.kind == NavKind::Concept)
    }

    /// Deepest concept on the stack (the current subtree root).
    pub fn current_concept(&self) -> Option<&NavItem> {
        self.concepts().last()
    }

    pub fn subtopic(&self) -> Option<&NavItem> {
        self.items.iter().find(|i| i.kind == NavKind::Subtopic)
    }

    pub fn card(&self) -> Option<&NavItem> {
        self.items.iter().find(|i| i.kind == NavKind::Card)
    }

    /// Display names, bottom to top.
    pub fn breadcrumbs(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }
}
