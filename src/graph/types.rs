//! Graph data model
//!
//! These types mirror what the graph data provider serves: the concept graph,
//! card records, subtopic lists and subtree card breakdowns. The engine only
//! reads them; mastery and card counts arrive precomputed.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

// =============================================================================
// NODES AND EDGES
// =============================================================================

/// Visual style class of a node.
///
/// Anything that is not a layer header renders as a card; the full graph uses
/// layer style names ("foundation", "core", ...) which all map to `Card`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StyleClass {
    LayerHeader,
    #[default]
    #[serde(other)]
    Card,
}

/// A node in the concept graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Layer index (integer rank declared by the data source)
    #[serde(default)]
    pub layer: i32,
    #[serde(default)]
    pub layer_name: String,
    #[serde(default)]
    pub style_class: StyleClass,
    /// Mastery fraction in [0, 1], absent when no review data exists
    #[serde(default)]
    pub mastery: Option<f64>,
    #[serde(default)]
    pub card_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
}

impl GraphNode {
    /// Plain card-style node with no layer metadata.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            layer: 0,
            layer_name: String::new(),
            style_class: StyleClass::Card,
            mastery: None,
            card_count: 0,
            fill_color: None,
            stroke_color: None,
        }
    }

    pub fn with_layer(mut self, layer: i32, layer_name: impl Into<String>) -> Self {
        self.layer = layer;
        self.layer_name = layer_name.into();
        self
    }

    pub fn with_style(mut self, style_class: StyleClass) -> Self {
        self.style_class = style_class;
        self
    }

    pub fn is_layer_header(&self) -> bool {
        self.style_class == StyleClass::LayerHeader
    }

    pub fn mastery_band(&self) -> MasteryBand {
        MasteryBand::from_mastery(self.mastery)
    }
}

/// A directed edge; `relation` is informational only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default = "default_relation")]
    pub relation: String,
}

fn default_relation() -> String {
    "prerequisite".to_string()
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: default_relation(),
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }
}

/// Mastery bucket used for node borders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryBand {
    Strong,
    Developing,
    Weak,
    Unknown,
}

impl MasteryBand {
    pub fn from_mastery(mastery: Option<f64>) -> Self {
        match mastery {
            Some(m) if m >= 0.8 => MasteryBand::Strong,
            Some(m) if m >= 0.3 => MasteryBand::Developing,
            Some(_) => MasteryBand::Weak,
            None => MasteryBand::Unknown,
        }
    }
}

// =============================================================================
// KNOWLEDGE GRAPH
// =============================================================================

/// Node set + edge set + layer-name lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub layers: BTreeMap<i32, String>,
}

impl KnowledgeGraph {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self {
            nodes,
            edges,
            layers: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check id uniqueness and that every edge endpoint exists.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }
        for edge in &self.edges {
            if !seen.contains(edge.source.as_str()) || !seen.contains(edge.target.as_str()) {
                return Err(GraphError::DanglingEdge {
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Whether any edge points at `id`.
    pub fn has_incoming(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.target == id)
    }

    /// Incoming edge count per target id.
    pub fn incoming_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for edge in &self.edges {
            *counts.entry(edge.target.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn layer_name(&self, layer: i32) -> Option<&str> {
        self.layers.get(&layer).map(String::as_str)
    }
}

// =============================================================================
// CARDS AND SUBTOPICS
// =============================================================================

/// A flashcard record as served by the card store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Card {
    pub card_id: String,
    #[serde(default)]
    pub deck: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub fire_weight: f64,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub pillar: Option<String>,
    #[serde(default)]
    pub knowledge_layer: Option<String>,
    #[serde(default)]
    pub cognitive_layer: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub concept_node: Option<String>,
    #[serde(default)]
    pub subtopic: Option<String>,
}

/// Label used when a card carries no categorization at all.
pub const UNCATEGORIZED_LAYER: &str = "Uncategorized";

impl Card {
    pub fn new(card_id: impl Into<String>) -> Self {
        Self {
            card_id: card_id.into(),
            ..Self::default()
        }
    }

    /// Layer label derived from the card's categorization path.
    ///
    /// First present of pillar, cognitive layer, knowledge layer.
    pub fn layer_label(&self) -> &str {
        [&self.pillar, &self.cognitive_layer, &self.knowledge_layer]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or(UNCATEGORIZED_LAYER)
    }
}

/// A subtopic of a concept, with its card count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtopic {
    pub id: String,
    pub name: String,
    pub card_count: u32,
}

/// One row of a subtree card distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeCardBreakdownItem {
    pub concept: String,
    pub count: u32,
    pub is_prerequisite: bool,
}

/// Card counts across a concept's prerequisite subtree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubtreeCardDistribution {
    pub node_id: String,
    pub total: u32,
    pub breakdown: Vec<SubtreeCardBreakdownItem>,
}
