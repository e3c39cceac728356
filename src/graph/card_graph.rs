//! Ephemeral card graph for subtopic and card views
//!
//! Cards are grouped by the layer label of their categorization path. Each
//! layer becomes a header node, each card a node pointing at its header, so
//! the result is a flat DAG with fan-in at every header.

use std::collections::BTreeMap;

use super::types::{Card, GraphEdge, GraphNode, KnowledgeGraph, StyleClass};

/// Relation carried by card -> header edges.
pub const SUPPORTS_RELATION: &str = "supports";

/// Header node id for a layer label.
pub fn header_id(label: &str) -> String {
    format!("layer:{}", label)
}

/// Leading ASCII digits of a layer label, e.g. `3` for "3-Algorithm".
pub fn numeric_prefix(label: &str) -> Option<u32> {
    let digits: String = label
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Layers sort by numeric prefix (unnumbered last), then alphabetically.
fn layer_sort_key(label: &str) -> (u32, &str) {
    (numeric_prefix(label).unwrap_or(u32::MAX), label)
}

/// Build the card graph for one subtopic's cards.
pub fn synthesize_card_graph(cards: &[Card]) -> KnowledgeGraph {
    let mut by_layer: BTreeMap<&str, Vec<&Card>> = BTreeMap::new();
    for card in cards {
        by_layer.entry(card.layer_label()).or_default().push(card);
    }

    let mut layers: Vec<(&str, Vec<&Card>)> = by_layer.into_iter().collect();
    layers.sort_by(|a, b| layer_sort_key(a.0).cmp(&layer_sort_key(b.0)));

    let mut graph = KnowledgeGraph::default();
    for (rank, (label, members)) in layers.into_iter().enumerate() {
        let rank = rank as i32;
        let header = header_id(label);

        graph.nodes.push(GraphNode {
            card_count: members.len() as u32,
            ..GraphNode::new(header.clone(), label)
                .with_layer(rank, label)
                .with_style(StyleClass::LayerHeader)
        });
        for card in members {
            graph.nodes.push(
                GraphNode::new(card.card_id.clone(), card.card_id.clone()).with_layer(rank, label),
            );
            graph.edges.push(
                GraphEdge::new(card.card_id.clone(), header.clone())
                    .with_relation(SUPPORTS_RELATION),
            );
        }
        graph.layers.insert(rank, label.to_string());
    }

    graph
}
