//! Error types for the navigation and layout engine
//!
//! Every error here is recoverable. Fetch errors are shown inline next to the
//! affected panel, navigation faults reject a transition without touching
//! state, and storage errors never leave the persistence store.

use thiserror::Error;

/// Failure reported by a [`GraphDataProvider`](crate::provider::GraphDataProvider).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Node {0} not found")]
    NodeNotFound(String),

    #[error("Subtopic '{subtopic}' not found under concept {concept}")]
    SubtopicNotFound { concept: String, subtopic: String },

    #[error("Graph data unavailable: {0}")]
    Unavailable(String),
}

/// Structural problems in a [`KnowledgeGraph`](crate::graph::KnowledgeGraph).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Edge {from} -> {to} references a missing node")]
    DanglingEdge { from: String, to: String },
}

/// Navigation fault - a rejected transition.
///
/// A fault never mutates the navigation state; the caller can keep going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavFault {
    #[error("Node {0} is not part of the current graph")]
    UnknownNode(String),

    #[error("Breadcrumb index {index} out of range (stack depth {len})")]
    BreadcrumbOutOfRange { index: usize, len: usize },

    #[error("No selection: transition requires a selected concept")]
    NoSelection,

    #[error("Transition requires {expected} view, current view is {actual}")]
    WrongMode {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("A card can only follow a subtopic in the navigation stack")]
    MissingSubtopic,

    #[error("A subtopic can only follow a concept in the navigation stack")]
    MissingConcept,

    #[error("Nothing to drill in the current view")]
    NothingToDrill,
}

impl NavFault {
    /// Faults caused by a stale or unexpected UI event rather than a bug.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            NavFault::UnknownNode(_) | NavFault::NoSelection | NavFault::NothingToDrill
        )
    }
}

/// Storage backend failure. Swallowed by the layout store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Mermaid graph source could not be turned into a graph.
#[derive(Error, Debug)]
pub enum MermaidError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No node definitions found in mermaid source")]
    NoNodes,
}

/// Graph or card source files could not be loaded.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Mermaid source error: {0}")]
    Mermaid(#[from] MermaidError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Card data error: {0}")]
    Cards(#[from] serde_json::Error),

    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}
