//! Concept graph model, layout and edge routing
//!
//! This module owns everything that turns graph data into positioned,
//! render-ready nodes and edges. It performs no I/O beyond the optional
//! mermaid file reader.

pub mod card_graph;
pub mod edges;
pub mod layout;
pub mod mermaid;
pub mod types;

pub use card_graph::synthesize_card_graph;
pub use edges::{EdgeRole, EdgeRouter, JunctionNode, RoutedEdge, RoutedEdges};
pub use layout::{
    compute_ranks, LayoutEngine, LayoutMode, LayoutStrategy, ManualPosition, NodePlacement,
    ViewMode,
};
pub use mermaid::{parse_mermaid, parse_mermaid_file};
pub use types::*;
