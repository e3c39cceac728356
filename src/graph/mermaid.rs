//! Mermaid `graph TD` source parser
//!
//! Reads node definitions (`ID["label"]`), edges (`A --> B`) and class
//! assignments (`class A,B styleName`) and maps each style class onto a
//! fixed layer table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::types::{GraphEdge, GraphNode, KnowledgeGraph, StyleClass};
use crate::error::MermaidError;

/// Layer metadata keyed by mermaid class name
struct LayerInfo {
    class: &'static str,
    layer: i32,
    name: &'static str,
    fill: &'static str,
    stroke: &'static str,
}

const LAYER_TABLE: &[LayerInfo] = &[
    LayerInfo { class: "foundation", layer: 0, name: "Mathematical Foundations", fill: "#dbeafe", stroke: "#3b82f6" },
    LayerInfo { class: "core", layer: 1, name: "ML Core Primitives", fill: "#d1fae5", stroke: "#10b981" },
    LayerInfo { class: "supervised", layer: 2, name: "Supervised Models", fill: "#fef3c7", stroke: "#f59e0b" },
    LayerInfo { class: "stats", layer: 3, name: "Stats & Experimentation", fill: "#e0e7ff", stroke: "#6366f1" },
    LayerInfo { class: "causal", layer: 4, name: "Causal Inference", fill: "#fff7ed", stroke: "#ea580c" },
    LayerInfo { class: "marketing", layer: 5, name: "Marketing Science", fill: "#f3e8ff", stroke: "#9333ea" },
    LayerInfo { class: "systems", layer: 6, name: "Marketing Systems", fill: "#fee2e2", stroke: "#ef4444" },
    LayerInfo { class: "project", layer: 7, name: "Sports Lab Projects", fill: "#fef08a", stroke: "#ca8a04" },
];

const DEFAULT_CLASS: &str = "core";

fn layer_info(class: &str) -> &'static LayerInfo {
    LAYER_TABLE
        .iter()
        .find(|info| info.class == class)
        .or_else(|| LAYER_TABLE.iter().find(|info| info.class == DEFAULT_CLASS))
        .unwrap_or(&LAYER_TABLE[0])
}

struct Patterns {
    node: Regex,
    edge: Regex,
    class: Regex,
    emoji: Regex,
    whitespace: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        node: Regex::new(r#"(?m)^\s+(\w+)\["([^"]+)"\]"#).expect("valid node regex"),
        edge: Regex::new(r"(?m)^\s+(\w+)\s+-->\s+(\w+)").expect("valid edge regex"),
        class: Regex::new(r"(?m)^\s+class\s+([\w,]+)\s+(\w+)").expect("valid class regex"),
        emoji: Regex::new(r"[\x{1F300}-\x{1F9FF}]").expect("valid emoji regex"),
        whitespace: Regex::new(r"\s+").expect("valid whitespace regex"),
    })
}

fn clean_label(raw: &str) -> String {
    let p = patterns();
    let without_emoji = p.emoji.replace_all(raw, "");
    let spaced = without_emoji.replace("<br/>", " ").replace("<br>", " ");
    p.whitespace.replace_all(&spaced, " ").trim().to_string()
}

/// Parse mermaid source text into a knowledge graph.
pub fn parse_mermaid(text: &str) -> Result<KnowledgeGraph, MermaidError> {
    let p = patterns();

    // 1. Node definitions; a redefinition replaces the label but keeps the position
    let mut order: Vec<String> = Vec::new();
    let mut labels: HashMap<String, String> = HashMap::new();
    for caps in p.node.captures_iter(text) {
        let id = caps[1].to_string();
        if labels.insert(id.clone(), clean_label(&caps[2])).is_none() {
            order.push(id);
        }
    }
    if order.is_empty() {
        return Err(MermaidError::NoNodes);
    }

    // 2. Edges between defined nodes
    let edges: Vec<GraphEdge> = p
        .edge
        .captures_iter(text)
        .filter(|caps| labels.contains_key(&caps[1]) && labels.contains_key(&caps[2]))
        .map(|caps| GraphEdge::new(&caps[1], &caps[2]))
        .collect();

    // 3. Class assignments
    let mut classes: HashMap<String, String> = HashMap::new();
    for caps in p.class.captures_iter(text) {
        let style = caps[2].to_string();
        for id in caps[1].split(',').map(str::trim) {
            if labels.contains_key(id) {
                classes.insert(id.to_string(), style.clone());
            }
        }
    }

    // 4. Nodes
    let nodes: Vec<GraphNode> = order
        .into_iter()
        .map(|id| {
            let info = layer_info(classes.get(&id).map(String::as_str).unwrap_or(DEFAULT_CLASS));
            let label = labels.remove(&id).unwrap_or_default();
            GraphNode {
                fill_color: Some(info.fill.to_string()),
                stroke_color: Some(info.stroke.to_string()),
                ..GraphNode::new(id, label)
                    .with_layer(info.layer, info.name)
                    .with_style(StyleClass::Card)
            }
        })
        .collect();

    // 5. Layer names
    let mut graph = KnowledgeGraph::new(nodes, edges);
    graph.layers = LAYER_TABLE
        .iter()
        .map(|info| (info.layer, info.name.to_string()))
        .collect();

    debug!(
        "Parsed mermaid graph: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    Ok(graph)
}

pub fn parse_mermaid_file(path: impl AsRef<Path>) -> Result<KnowledgeGraph, MermaidError> {
    let text = std::fs::read_to_string(path)?;
    parse_mermaid(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"graph TD
    LINALG["📐 Linear Algebra"]
    PROB["Probability<br/>Theory"]
    NB["Naive   Bayes"]
    LOGREG["Logistic Regression"]

    LINALG --> LOGREG
    PROB --> NB
    PROB --> LOGREG
    NB --> GHOST

    class LINALG,PROB foundation
    class NB supervised
"#;

    #[test]
    fn test_parse_nodes_and_labels() {
        let graph = parse_mermaid(SAMPLE).unwrap();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["LINALG", "PROB", "NB", "LOGREG"]);

        assert_eq!(graph.node("LINALG").unwrap().label, "Linear Algebra");
        assert_eq!(graph.node("PROB").unwrap().label, "Probability Theory");
        assert_eq!(graph.node("NB").unwrap().label, "Naive Bayes");
    }

    #[test]
    fn test_parse_edges_skip_undefined() {
        let graph = parse_mermaid(SAMPLE).unwrap();
        assert_eq!(graph.edges.len(), 3);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_parse_classes_and_default_layer() {
        let graph = parse_mermaid(SAMPLE).unwrap();
        let prob = graph.node("PROB").unwrap();
        assert_eq!(prob.layer, 0);
        assert_eq!(prob.layer_name, "Mathematical Foundations");
        assert_eq!(prob.fill_color.as_deref(), Some("#dbeafe"));

        assert_eq!(graph.node("NB").unwrap().layer, 2);
        // No class assignment falls back to core
        assert_eq!(graph.node("LOGREG").unwrap().layer, 1);
        assert_eq!(graph.layer_name(7), Some("Sports Lab Projects"));
    }

    #[test]
    fn test_redefined_node_takes_last_label() {
        let text = "graph TD\n    A[\"First\"]\n    B[\"Other\"]\n    A[\"Second\"]\n";
        let graph = parse_mermaid(text).unwrap();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(graph.node("A").unwrap().label, "Second");
    }

    #[test]
    fn test_no_nodes_is_an_error() {
        assert!(matches!(
            parse_mermaid("graph TD\n"),
            Err(MermaidError::NoNodes)
        ));
    }
}
