//! Scope keys for the manual layout cache.
//!
//! A scope key names the subgraph the user is looking at. Two navigation
//! states that show the same subgraph derive the same key; different
//! subgraphs derive different keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::stack::{NavKind, NavigationStack};
use crate::graph::ViewMode;

const FULL_KEY: &str = "full";
const TREE_PREFIX: &str = "tree:";
const SUBTOPIC_PREFIX: &str = "subtopic:";
const ROOT: &str = "root";
const PATH_SEPARATOR: &str = ">";

/// Layout cache bucket key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// Key of the full graph, independent of stack contents.
    pub fn full() -> Self {
        ScopeKey(FULL_KEY.to_string())
    }

    /// Derive the key for a view mode and navigation stack.
    ///
    /// Pure: the same inputs always give the same key.
    pub fn derive(mode: ViewMode, stack: &NavigationStack) -> Self {
        match mode.effective() {
            ViewMode::Full => Self::full(),
            ViewMode::PrerequisiteTree => {
                let path = concept_path(stack);
                ScopeKey(format!("{}{}", TREE_PREFIX, path.as_deref().unwrap_or(ROOT)))
            }
            _ => {
                let tail = stack
                    .subtopic()
                    .map(|item| item.id.clone())
                    .or_else(|| concept_path(stack))
                    .unwrap_or_else(|| ROOT.to_string());
                ScopeKey(format!("{}{}", SUBTOPIC_PREFIX, tail))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeKey {
    fn from(raw: &str) -> Self {
        ScopeKey(raw.to_string())
    }
}

impl From<String> for ScopeKey {
    fn from(raw: String) -> Self {
        ScopeKey(raw)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn concept_path(stack: &NavigationStack) -> Option<String> {
    let ids: Vec<&str> = stack
        .iter()
        .filter(|i| i.kind == NavKind::Concept)
        .map(|i| i.id.as_str())
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids.join(PATH_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::stack::NavItem;

    fn tree(ids: &[&str]) -> NavigationStack {
        let mut stack = NavigationStack::new();
        for id in ids {
            stack.push_concept(NavItem::concept(*id, *id));
        }
        stack
    }

    #[test]
    fn full_key_ignores_stack() {
        assert_eq!(ScopeKey::derive(ViewMode::Full, &tree(&[])).as_str(), "full");
        assert_eq!(ScopeKey::derive(ViewMode::Full, &tree(&["A", "B"])).as_str(), "full");
    }

    #[test]
    fn tree_key_is_concept_path() {
        assert_eq!(
            ScopeKey::derive(ViewMode::PrerequisiteTree, &tree(&["NB", "PROB"])).as_str(),
            "tree:NB>PROB"
        );
        assert_eq!(
            ScopeKey::derive(ViewMode::PrerequisiteTree, &tree(&[])).as_str(),
            "tree:root"
        );
    }

    #[test]
    fn card_mode_shares_subtopic_key() {
        let mut stack = tree(&["NB"]);
        stack.set_subtopic(NavItem::subtopic("NB", "priors", "Priors")).unwrap();
        let subtopic = ScopeKey::derive(ViewMode::Subtopic, &stack);

        stack.set_card(NavItem::card("nb-1C-01", "nb-1C-01")).unwrap();
        let card = ScopeKey::derive(ViewMode::Card, &stack);

        assert_eq!(subtopic, card);
        assert_eq!(subtopic.as_str(), "subtopic:NB.priors");
    }

    #[test]
    fn subtopic_key_falls_back_to_path() {
        assert_eq!(
            ScopeKey::derive(ViewMode::Subtopic, &tree(&["A", "B"])).as_str(),
            "subtopic:A>B"
        );
        assert_eq!(
            ScopeKey::derive(ViewMode::Subtopic, &tree(&[])).as_str(),
            "subtopic:root"
        );
    }

    #[test]
    fn different_trees_differ() {
        let a = ScopeKey::derive(ViewMode::PrerequisiteTree, &tree(&["A"]));
        let b = ScopeKey::derive(ViewMode::PrerequisiteTree, &tree(&["A", "B"]));
        assert_ne!(a, b);
        assert_ne!(a, ScopeKey::derive(ViewMode::Subtopic, &tree(&["A"])));
    }

    #[test]
    fn serializes_as_plain_string() {
        let key = ScopeKey::from("tree:A");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"tree:A\"");
    }
}
