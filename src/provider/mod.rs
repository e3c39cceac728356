//! Graph data provider
//!
//! The engine reads all graph and card data through [`GraphDataProvider`].
//! Transport is the implementor's concern; [`InMemoryProvider`] serves a
//! parsed graph and a card list from memory.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::graph::{Card, KnowledgeGraph, Subtopic, SubtreeCardDistribution};

pub mod memory;

pub use memory::InMemoryProvider;

#[async_trait]
pub trait GraphDataProvider: Send + Sync {
    async fn full_graph(&self) -> Result<KnowledgeGraph, FetchError>;

    /// `node_id` plus its prerequisite ancestry.
    async fn subtree(&self, node_id: &str) -> Result<KnowledgeGraph, FetchError>;

    async fn subtopics(&self, node_id: &str) -> Result<Vec<Subtopic>, FetchError>;

    async fn subtopic_cards(
        &self,
        concept_id: &str,
        subtopic_id: &str,
    ) -> Result<Vec<Card>, FetchError>;

    async fn subtree_card_distribution(
        &self,
        node_id: &str,
    ) -> Result<SubtreeCardDistribution, FetchError>;
}
