//! In-memory graph data provider.
//!
//! Card counts are attached to graph nodes once at construction; every query
//! afterwards is a pure read.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use super::GraphDataProvider;
use crate::error::{FetchError, SourceError};
use crate::graph::{
    parse_mermaid_file, Card, KnowledgeGraph, Subtopic, SubtreeCardBreakdownItem,
    SubtreeCardDistribution,
};

#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    graph: KnowledgeGraph,
    cards: Vec<Card>,
}

impl InMemoryProvider {
    /// Serve `graph` and `cards`; node card counts are recomputed from `cards`.
    pub fn new(mut graph: KnowledgeGraph, cards: Vec<Card>) -> Self {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for card in &cards {
            if let Some(node) = card.concept_node.as_deref() {
                *counts.entry(node).or_insert(0) += 1;
            }
        }
        for node in &mut graph.nodes {
            node.card_count = counts.get(node.id.as_str()).copied().unwrap_or(0);
        }
        Self { graph, cards }
    }

    /// Load a mermaid graph and, optionally, a JSON array of cards.
    pub fn from_files(
        mermaid_path: impl AsRef<Path>,
        cards_path: Option<&Path>,
    ) -> Result<Self, SourceError> {
        let graph = parse_mermaid_file(mermaid_path)?;
        graph.validate()?;
        let cards: Vec<Card> = match cards_path {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => Vec::new(),
        };
        info!(
            "Loaded graph with {} nodes and {} cards",
            graph.nodes.len(),
            cards.len()
        );
        Ok(Self::new(graph, cards))
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    fn require_node(&self, node_id: &str) -> Result<(), FetchError> {
        if self.graph.has_node(node_id) {
            Ok(())
        } else {
            Err(FetchError::NodeNotFound(node_id.to_string()))
        }
    }

    /// `node_id` and every node with a path to it.
    fn ancestry(&self, node_id: &str) -> HashSet<&str> {
        let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.graph.edges {
            parents
                .entry(edge.target.as_str())
                .or_default()
                .push(edge.source.as_str());
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        if let Some(node) = self.graph.node(node_id) {
            seen.insert(node.id.as_str());
            queue.push_back(node.id.as_str());
        }
        while let Some(id) = queue.pop_front() {
            for parent in parents.get(id).into_iter().flatten() {
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
        seen
    }

    fn cards_of<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Card> + 'a {
        self.cards
            .iter()
            .filter(move |c| c.concept_node.as_deref() == Some(node_id))
    }
}

#[async_trait]
impl GraphDataProvider for InMemoryProvider {
    async fn full_graph(&self) -> Result<KnowledgeGraph, FetchError> {
        Ok(self.graph.clone())
    }

    async fn subtree(&self, node_id: &str) -> Result<KnowledgeGraph, FetchError> {
        self.require_node(node_id)?;
        let keep = self.ancestry(node_id);

        let mut subtree = KnowledgeGraph::new(
            self.graph
                .nodes
                .iter()
                .filter(|n| keep.contains(n.id.as_str()))
                .cloned()
                .collect(),
            self.graph
                .edges
                .iter()
                .filter(|e| keep.contains(e.source.as_str()) && keep.contains(e.target.as_str()))
                .cloned()
                .collect(),
        );
        subtree.layers = self.graph.layers.clone();
        debug!("Subtree of {}: {} nodes", node_id, subtree.nodes.len());
        Ok(subtree)
    }

    async fn subtopics(&self, node_id: &str) -> Result<Vec<Subtopic>, FetchError> {
        self.require_node(node_id)?;
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for card in self.cards_of(node_id) {
            if let Some(subtopic) = card.subtopic.as_deref().filter(|s| !s.is_empty()) {
                *counts.entry(subtopic).or_insert(0) += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(name, card_count)| Subtopic {
                id: name.to_string(),
                name: name.to_string(),
                card_count,
            })
            .collect())
    }

    async fn subtopic_cards(
        &self,
        concept_id: &str,
        subtopic_id: &str,
    ) -> Result<Vec<Card>, FetchError> {
        self.require_node(concept_id)?;
        let cards: Vec<Card> = self
            .cards_of(concept_id)
            .filter(|c| c.subtopic.as_deref() == Some(subtopic_id))
            .cloned()
            .collect();
        if cards.is_empty() {
            return Err(FetchError::SubtopicNotFound {
                concept: concept_id.to_string(),
                subtopic: subtopic_id.to_string(),
            });
        }
        Ok(cards)
    }

    async fn subtree_card_distribution(
        &self,
        node_id: &str,
    ) -> Result<SubtreeCardDistribution, FetchError> {
        self.require_node(node_id)?;
        let keep = self.ancestry(node_id);

        let mut breakdown: Vec<SubtreeCardBreakdownItem> = self
            .graph
            .nodes
            .iter()
            .filter(|n| keep.contains(n.id.as_str()) && n.card_count > 0)
            .map(|n| SubtreeCardBreakdownItem {
                concept: n.label.clone(),
                count: n.card_count,
                is_prerequisite: n.id != node_id,
            })
            .collect();
        // Root first, then by descending count
        breakdown.sort_by(|a, b| {
            a.is_prerequisite
                .cmp(&b.is_prerequisite)
                .then(b.count.cmp(&a.count))
        });

        Ok(SubtreeCardDistribution {
            node_id: node_id.to_string(),
            total: breakdown.iter().map(|b| b.count).sum(),
            breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode};

    fn provider() -> InMemoryProvider {
        let graph = KnowledgeGraph::new(
            vec![
                GraphNode::new("LINALG", "Linear Algebra"),
                GraphNode::new("PROB", "Probability"),
                GraphNode::new("NB", "Naive Bayes"),
                GraphNode::new("LOGREG", "Logistic Regression"),
                GraphNode::new("OTHER", "Unrelated"),
            ],
            vec![
                GraphEdge::new("PROB", "NB"),
                GraphEdge::new("LINALG", "LOGREG"),
                GraphEdge::new("PROB", "LOGREG"),
                GraphEdge::new("NB", "LOGREG"),
            ],
        );
        let card = |id: &str, node: &str, subtopic: &str| Card {
            concept_node: Some(node.into()),
            subtopic: Some(subtopic.into()),
            ..Card::new(id)
        };
        InMemoryProvider::new(
            graph,
            vec![
                card("nb-1", "NB", "priors"),
                card("nb-2", "NB", "priors"),
                card("nb-3", "NB", "likelihood"),
                card("prob-1", "PROB", "bayes rule"),
                card("lr-1", "LOGREG", "sigmoid"),
            ],
        )
    }

    #[tokio::test]
    async fn test_full_graph_card_counts() {
        let graph = provider().full_graph().await.unwrap();
        assert_eq!(graph.node("NB").unwrap().card_count, 3);
        assert_eq!(graph.node("LINALG").unwrap().card_count, 0);
    }

    #[tokio::test]
    async fn test_subtree_is_ancestry() {
        let subtree = provider().subtree("NB").await.unwrap();
        let ids: Vec<&str> = subtree.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["PROB", "NB"]);
        assert_eq!(subtree.edges.len(), 1);

        let subtree = provider().subtree("LOGREG").await.unwrap();
        assert_eq!(subtree.nodes.len(), 4);
        assert_eq!(subtree.edges.len(), 4);
        assert!(!subtree.has_node("OTHER"));
    }

    #[tokio::test]
    async fn test_unknown_node() {
        assert_eq!(
            provider().subtree("GHOST").await,
            Err(FetchError::NodeNotFound("GHOST".into()))
        );
    }

    #[tokio::test]
    async fn test_subtopics_sorted_with_counts() {
        let subtopics = provider().subtopics("NB").await.unwrap();
        let pairs: Vec<(&str, u32)> = subtopics
            .iter()
            .map(|s| (s.name.as_str(), s.card_count))
            .collect();
        assert_eq!(pairs, vec![("likelihood", 1), ("priors", 2)]);
    }

    #[tokio::test]
    async fn test_subtopic_cards() {
        let p = provider();
        assert_eq!(p.subtopic_cards("NB", "priors").await.unwrap().len(), 2);
        assert!(matches!(
            p.subtopic_cards("NB", "nope").await,
            Err(FetchError::SubtopicNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_distribution_root_first() {
        let dist = provider().subtree_card_distribution("LOGREG").await.unwrap();
        assert_eq!(dist.total, 5);
        let rows: Vec<(&str, u32, bool)> = dist
            .breakdown
            .iter()
            .map(|b| (b.concept.as_str(), b.count, b.is_prerequisite))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Logistic Regression", 1, false),
                ("Naive Bayes", 3, true),
                ("Probability", 1, true),
            ]
        );
    }
}
