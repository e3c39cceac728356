//! Tagged data fetches.
//!
//! Every fetch carries the target it was issued for. The response comes back
//! with the same tag and is applied only if the state machine still wants that
//! target for the slot it fills; otherwise it is dropped as stale.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::graph::{Card, KnowledgeGraph, Subtopic, SubtreeCardDistribution};
use crate::provider::GraphDataProvider;

/// What a fetch was issued for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchTarget {
    FullGraph,
    Subtree { node_id: String },
    SubtopicCards { concept_id: String, subtopic_id: String },
    Subtopics { node_id: String },
    Distribution { node_id: String },
}

/// Piece of state a fetch fills. At most one target is wanted per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchSlot {
    /// The active graph (full graph, subtree or subtopic cards)
    Graph,
    /// Subtopic list of the selected concept
    Subtopics,
    /// Subtree card distribution of the selected concept
    Distribution,
}

impl FetchTarget {
    pub fn subtree(node_id: impl Into<String>) -> Self {
        FetchTarget::Subtree {
            node_id: node_id.into(),
        }
    }

    pub fn subtopic_cards(concept_id: impl Into<String>, subtopic_id: impl Into<String>) -> Self {
        FetchTarget::SubtopicCards {
            concept_id: concept_id.into(),
            subtopic_id: subtopic_id.into(),
        }
    }

    pub fn subtopics(node_id: impl Into<String>) -> Self {
        FetchTarget::Subtopics {
            node_id: node_id.into(),
        }
    }

    pub fn distribution(node_id: impl Into<String>) -> Self {
        FetchTarget::Distribution {
            node_id: node_id.into(),
        }
    }

    pub fn slot(&self) -> FetchSlot {
        match self {
            FetchTarget::FullGraph
            | FetchTarget::Subtree { .. }
            | FetchTarget::SubtopicCards { .. } => FetchSlot::Graph,
            FetchTarget::Subtopics { .. } => FetchSlot::Subtopics,
            FetchTarget::Distribution { .. } => FetchSlot::Distribution,
        }
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTarget::FullGraph => write!(f, "full graph"),
            FetchTarget::Subtree { node_id } => write!(f, "subtree {}", node_id),
            FetchTarget::SubtopicCards {
                concept_id,
                subtopic_id,
            } => write!(f, "cards {}.{}", concept_id, subtopic_id),
            FetchTarget::Subtopics { node_id } => write!(f, "subtopics {}", node_id),
            FetchTarget::Distribution { node_id } => write!(f, "distribution {}", node_id),
        }
    }
}

/// Result body of a fetch
#[derive(Debug, Clone)]
pub enum FetchPayload {
    Graph(Result<KnowledgeGraph, FetchError>),
    Cards(Result<Vec<Card>, FetchError>),
    Subtopics(Result<Vec<Subtopic>, FetchError>),
    Distribution(Result<SubtreeCardDistribution, FetchError>),
}

impl FetchPayload {
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchPayload::Graph(r) => r.as_ref().err(),
            FetchPayload::Cards(r) => r.as_ref().err(),
            FetchPayload::Subtopics(r) => r.as_ref().err(),
            FetchPayload::Distribution(r) => r.as_ref().err(),
        }
    }
}

/// A completed fetch, still tagged with the target it was issued for
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub target: FetchTarget,
    pub payload: FetchPayload,
}

impl FetchResponse {
    pub fn new(target: FetchTarget, payload: FetchPayload) -> Self {
        Self { target, payload }
    }

    /// Failed response for `target`, in the payload shape its slot expects.
    pub fn failed(target: FetchTarget, error: FetchError) -> Self {
        let payload = match &target {
            FetchTarget::FullGraph | FetchTarget::Subtree { .. } => FetchPayload::Graph(Err(error)),
            FetchTarget::SubtopicCards { .. } => FetchPayload::Cards(Err(error)),
            FetchTarget::Subtopics { .. } => FetchPayload::Subtopics(Err(error)),
            FetchTarget::Distribution { .. } => FetchPayload::Distribution(Err(error)),
        };
        Self { target, payload }
    }
}

/// Run one fetch against a provider and tag the result.
pub async fn execute(provider: &dyn GraphDataProvider, target: FetchTarget) -> FetchResponse {
    let payload = match &target {
        FetchTarget::FullGraph => FetchPayload::Graph(provider.full_graph().await),
        FetchTarget::Subtree { node_id } => FetchPayload::Graph(provider.subtree(node_id).await),
        FetchTarget::SubtopicCards {
            concept_id,
            subtopic_id,
        } => FetchPayload::Cards(provider.subtopic_cards(concept_id, subtopic_id).await),
        FetchTarget::Subtopics { node_id } => {
            FetchPayload::Subtopics(provider.subtopics(node_id).await)
        }
        FetchTarget::Distribution { node_id } => {
            FetchPayload::Distribution(provider.subtree_card_distribution(node_id).await)
        }
    };
    FetchResponse::new(target, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots() {
        assert_eq!(FetchTarget::FullGraph.slot(), FetchSlot::Graph);
        assert_eq!(FetchTarget::subtree("A").slot(), FetchSlot::Graph);
        assert_eq!(FetchTarget::subtopic_cards("A", "s").slot(), FetchSlot::Graph);
        assert_eq!(FetchTarget::subtopics("A").slot(), FetchSlot::Subtopics);
        assert_eq!(FetchTarget::distribution("A").slot(), FetchSlot::Distribution);
    }

    #[test]
    fn targets_compare_by_value() {
        assert_eq!(FetchTarget::subtree("A"), FetchTarget::subtree("A"));
        assert_ne!(FetchTarget::subtree("A"), FetchTarget::subtree("B"));
        assert_ne!(FetchTarget::subtree("A"), FetchTarget::subtopics("A"));
    }

    #[test]
    fn payload_error() {
        let payload = FetchPayload::Subtopics(Err(FetchError::NodeNotFound("X".into())));
        assert_eq!(payload.error(), Some(&FetchError::NodeNotFound("X".into())));
        assert!(FetchPayload::Cards(Ok(Vec::new())).error().is_none());
    }

    #[test]
    fn failed_response_matches_target_kind() {
        let err = FetchError::Unavailable("boom".into());
        let cards = FetchResponse::failed(FetchTarget::subtopic_cards("A", "s"), err.clone());
        assert!(matches!(cards.payload, FetchPayload::Cards(Err(_))));
        let graph = FetchResponse::failed(FetchTarget::subtree("A"), err.clone());
        assert!(matches!(graph.payload, FetchPayload::Graph(Err(_))));
        let dist = FetchResponse::failed(FetchTarget::distribution("A"), err.clone());
        assert_eq!(dist.payload.error(), Some(&err));
        assert_eq!(dist.target, FetchTarget::distribution("A"));
    }
}
