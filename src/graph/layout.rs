//! Layout engine for the concept graph
//!
//! Computes x, y positions for graph nodes based on view mode.
//! The renderer receives pre-positioned nodes and just draws them.
//!
//! ## Strategies
//!
//! | View mode | Strategy |
//! |-----------|----------|
//! | `full`, `prerequisiteTree` | Layered: longest-path ranks, barycenter ordering, grid placement |
//! | `subtopic`, `card` | Stacked list: one column, headers above their cards |
//!
//! Manual positions for the active scope replace computed ones only in
//! [`LayoutMode::Arrange`]; every node still gets a computed fallback.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::types::{GraphNode, KnowledgeGraph};
use crate::config::LayoutConfig;

/// Which graph is shown and how it is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    /// The whole concept graph
    #[default]
    Full,
    /// A concept and its prerequisite ancestry
    PrerequisiteTree,
    /// Card grid of one subtopic
    Subtopic,
    /// A card selected inside the subtopic grid (same graph as `Subtopic`)
    Card,
}

impl ViewMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Some(ViewMode::Full),
            "prerequisitetree" | "prerequisite_tree" | "tree" => Some(ViewMode::PrerequisiteTree),
            "subtopic" => Some(ViewMode::Subtopic),
            "card" => Some(ViewMode::Card),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Full => "full",
            ViewMode::PrerequisiteTree => "prerequisiteTree",
            ViewMode::Subtopic => "subtopic",
            ViewMode::Card => "card",
        }
    }

    /// Card mode is a selection refinement of subtopic mode.
    pub fn effective(&self) -> Self {
        match self {
            ViewMode::Card => ViewMode::Subtopic,
            other => *other,
        }
    }

    pub fn strategy(&self) -> LayoutStrategy {
        match self.effective() {
            ViewMode::Full | ViewMode::PrerequisiteTree => LayoutStrategy::Layered,
            _ => LayoutStrategy::Stacked,
        }
    }
}

/// Whether stored manual positions are honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutMode {
    /// Computed layout only; stored positions are ignored
    #[default]
    Auto,
    /// Stored positions for the active scope win; drags are recorded
    Arrange,
}

impl LayoutMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(LayoutMode::Auto),
            "arrange" | "manual" => Some(LayoutMode::Arrange),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Auto => "auto",
            LayoutMode::Arrange => "arrange",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            LayoutMode::Auto => LayoutMode::Arrange,
            LayoutMode::Arrange => LayoutMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStrategy {
    Layered,
    Stacked,
}

/// A user-dragged position for one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualPosition {
    pub x: f32,
    pub y: f32,
}

impl ManualPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Computed (or overridden) box for one node; `x`, `y` is the top-left corner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePlacement {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NodePlacement {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Upper bound on barycenter sweeps; each sweep must strictly reduce crossings.
const MAX_ORDERING_SWEEPS: usize = 24;

/// Layout engine that computes node positions per view mode
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
    /// Sizes reported by the renderer, keyed by node id
    measured: HashMap<String, (f32, f32)>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            measured: HashMap::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Record a measured display size. Non-finite or non-positive sizes are ignored.
    pub fn set_measured_size(&mut self, id: impl Into<String>, width: f32, height: f32) {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            self.measured.insert(id.into(), (width, height));
        }
    }

    pub fn clear_measured_sizes(&mut self) {
        self.measured.clear();
    }

    /// Computed layout for `graph` in `mode`, ignoring manual positions.
    pub fn layout(&self, graph: &KnowledgeGraph, mode: ViewMode) -> Vec<NodePlacement> {
        match mode.strategy() {
            LayoutStrategy::Layered => self.layout_layered(graph),
            LayoutStrategy::Stacked => self.layout_stacked(graph),
        }
    }

    /// Computed layout with manual positions applied when arranging.
    ///
    /// In [`LayoutMode::Auto`] `overrides` is ignored entirely.
    pub fn layout_with_overrides(
        &self,
        graph: &KnowledgeGraph,
        mode: ViewMode,
        layout_mode: LayoutMode,
        overrides: Option<&BTreeMap<String, ManualPosition>>,
    ) -> Vec<NodePlacement> {
        let mut placements = self.layout(graph, mode);
        if layout_mode == LayoutMode::Arrange {
            if let Some(overrides) = overrides {
                for placement in &mut placements {
                    if let Some(pos) = overrides.get(&placement.id) {
                        placement.x = pos.x;
                        placement.y = pos.y;
                    }
                }
            }
        }
        placements
    }

    // =========================================================================
    // LAYERED LAYOUT (full / prerequisiteTree)
    // =========================================================================

    fn layout_layered(&self, graph: &KnowledgeGraph) -> Vec<NodePlacement> {
        let nodes = unique_nodes(graph);
        if nodes.is_empty() {
            return Vec::new();
        }

        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();
        let edges = resolve_edges(graph, &index);
        let ranks = assign_ranks(nodes.len(), &edges);

        let rank_count = ranks.iter().copied().max().unwrap_or(0) + 1;
        let mut order: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (idx, &rank) in ranks.iter().enumerate() {
            order[rank].push(idx);
        }
        minimise_crossings(&mut order, &edges, nodes.len());

        let cfg = &self.config;
        let row_width = |count: usize| {
            count as f32 * cfg.node_width + count.saturating_sub(1) as f32 * cfg.node_sep
        };
        let widest = order.iter().map(|row| row_width(row.len())).fold(0.0, f32::max);

        let mut placements: Vec<Option<NodePlacement>> = vec![None; nodes.len()];
        for (rank, row) in order.iter().enumerate() {
            // Center each rank under the widest one
            let start_x = cfg.margin + (widest - row_width(row.len())) / 2.0;
            let y = cfg.margin + rank as f32 * (cfg.node_height + cfg.rank_sep);
            for (slot, &idx) in row.iter().enumerate() {
                placements[idx] = Some(NodePlacement {
                    id: nodes[idx].id.clone(),
                    x: start_x + slot as f32 * (cfg.node_width + cfg.node_sep),
                    y,
                    width: cfg.node_width,
                    height: cfg.node_height,
                });
            }
        }

        // Keep the graph's insertion order in the output
        placements.into_iter().flatten().collect()
    }

    // =========================================================================
    // STACKED LIST LAYOUT (subtopic / card)
    // =========================================================================

    fn layout_stacked(&self, graph: &KnowledgeGraph) -> Vec<NodePlacement> {
        let mut nodes = unique_nodes(graph);
        // Sort by:
        // 1. Rank (layer index)
        // 2. Headers before cards
        // 3. Label alphabetically
        nodes.sort_by(|a, b| {
            a.layer
                .cmp(&b.layer)
                .then_with(|| b.is_layer_header().cmp(&a.is_layer_header()))
                .then_with(|| a.label.cmp(&b.label))
        });

        let cfg = &self.config;
        let mut cursor = cfg.margin;
        let mut previous_rank: Option<i32> = None;
        let mut placements = Vec::with_capacity(nodes.len());

        for node in nodes {
            if node.is_layer_header() && previous_rank.is_some_and(|r| r != node.layer) {
                cursor += cfg.rank_gap;
            }
            let (width, height) = self.stacked_size(node);
            placements.push(NodePlacement {
                id: node.id.clone(),
                x: cfg.margin,
                y: cursor,
                width,
                height,
            });
            cursor += height;
            previous_rank = Some(node.layer);
        }

        placements
    }

    /// Measured size if the renderer reported one, else the declared constants.
    fn stacked_size(&self, node: &GraphNode) -> (f32, f32) {
        if let Some(&size) = self.measured.get(&node.id) {
            return size;
        }
        let height = if node.is_layer_header() {
            self.config.header_height
        } else {
            self.config.card_height
        };
        (self.config.column_width, height)
    }
}

/// Longest-path rank per node id (sources first).
pub fn compute_ranks(graph: &KnowledgeGraph) -> HashMap<String, usize> {
    let nodes = unique_nodes(graph);
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let edges = resolve_edges(graph, &index);
    let ranks = assign_ranks(nodes.len(), &edges);
    nodes
        .iter()
        .zip(ranks)
        .map(|(n, r)| (n.id.clone(), r))
        .collect()
}

/// First occurrence of each node id, in insertion order.
fn unique_nodes(graph: &KnowledgeGraph) -> Vec<&GraphNode> {
    let mut seen = std::collections::HashSet::new();
    graph
        .nodes
        .iter()
        .filter(|n| seen.insert(n.id.as_str()))
        .collect()
}

/// Edges as index pairs; dangling edges and self-loops are dropped.
fn resolve_edges(graph: &KnowledgeGraph, index: &HashMap<&str, usize>) -> Vec<(usize, usize)> {
    graph
        .edges
        .iter()
        .filter_map(|e| {
            let from = *index.get(e.source.as_str())?;
            let to = *index.get(e.target.as_str())?;
            (from != to).then_some((from, to))
        })
        .collect()
}

/// Longest path from roots via Kahn's algorithm.
///
/// If the input has a cycle, the earliest unprocessed node is released and
/// edges back into already-ranked nodes are ignored.
fn assign_ranks(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut indegree = vec![0usize; node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        outgoing[from].push(to);
        indegree[to] += 1;
    }

    let mut rank = vec![0usize; node_count];
    let mut done = vec![false; node_count];
    let mut processed = 0;
    let mut queue: VecDeque<usize> = (0..node_count).filter(|&i| indegree[i] == 0).collect();

    while processed < node_count {
        while let Some(current) = queue.pop_front() {
            if done[current] {
                continue;
            }
            done[current] = true;
            processed += 1;
            for &next in &outgoing[current] {
                if done[next] {
                    continue; // back-edge
                }
                rank[next] = rank[next].max(rank[current] + 1);
                indegree[next] = indegree[next].saturating_sub(1);
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        if let Some(stuck) = (0..node_count).find(|&i| !done[i]) {
            queue.push_back(stuck);
        }
    }

    rank
}

/// Reorder nodes within each rank with barycenter sweeps (down then up),
/// keeping the best ordering seen. Ties keep their current relative order.
fn minimise_crossings(order: &mut [Vec<usize>], edges: &[(usize, usize)], node_count: usize) {
    if order.len() < 2 {
        return;
    }

    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        successors[from].push(to);
        predecessors[to].push(from);
    }

    let mut best = order.to_vec();
    let mut best_crossings = count_crossings(order, edges, node_count);

    for _ in 0..MAX_ORDERING_SWEEPS {
        if best_crossings == 0 {
            break;
        }
        for rank in 1..order.len() {
            let slots = slot_positions(order, node_count);
            sort_by_barycenter(&mut order[rank], &predecessors, &slots);
        }
        for rank in (0..order.len() - 1).rev() {
            let slots = slot_positions(order, node_count);
            sort_by_barycenter(&mut order[rank], &successors, &slots);
        }

        let crossings = count_crossings(order, edges, node_count);
        if crossings >= best_crossings {
            break;
        }
        best_crossings = crossings;
        best = order.to_vec();
    }

    order.clone_from_slice(&best);
}

fn slot_positions(order: &[Vec<usize>], node_count: usize) -> Vec<f32> {
    let mut slots = vec![0.0; node_count];
    for row in order {
        for (slot, &idx) in row.iter().enumerate() {
            slots[idx] = slot as f32;
        }
    }
    slots
}

fn sort_by_barycenter(row: &mut [usize], neighbours: &[Vec<usize>], slots: &[f32]) {
    let barycenter = |idx: usize| -> f32 {
        let adjacent = &neighbours[idx];
        if adjacent.is_empty() {
            // No anchor: stay where we are
            slots[idx]
        } else {
            adjacent.iter().map(|&n| slots[n]).sum::<f32>() / adjacent.len() as f32
        }
    };
    let mut keyed: Vec<(f32, usize)> = row.iter().map(|&idx| (barycenter(idx), idx)).collect();
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    for (slot, (_, idx)) in row.iter_mut().zip(keyed) {
        *slot = idx;
    }
}

/// Pairwise crossings between edges that connect the same pair of ranks.
fn count_crossings(order: &[Vec<usize>], edges: &[(usize, usize)], node_count: usize) -> usize {
    let mut rank_of = vec![0usize; node_count];
    let mut slot_of = vec![0usize; node_count];
    for (rank, row) in order.iter().enumerate() {
        for (slot, &idx) in row.iter().enumerate() {
            rank_of[idx] = rank;
            slot_of[idx] = slot;
        }
    }

    let mut bands: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
    for &(from, to) in edges {
        bands
            .entry((rank_of[from], rank_of[to]))
            .or_default()
            .push((slot_of[from], slot_of[to]));
    }

    let mut total = 0;
    for band in bands.values() {
        for i in 0..band.len() {
            for j in (i + 1)..band.len() {
                let (a0, a1) = band[i];
                let (b0, b1) = band[j];
                if (a0 < b0 && a1 > b1) || (a0 > b0 && a1 < b1) {
                    total += 1;
                }
            }
        }
    }
    total
}
