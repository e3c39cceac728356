//! Scene recomputation
//!
//! The one place where graph data becomes something drawable. It is called
//! after every transition, applied fetch and layout-cache mutation; there is no
//! implicit dependency tracking.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::{
    EdgeRouter, KnowledgeGraph, LayoutEngine, LayoutMode, ManualPosition, MasteryBand,
    RoutedEdge, ViewMode,
};
use crate::navigation::{NavigationStateMachine, ScopeKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneNodeKind {
    Card,
    LayerHeader,
    /// Invisible edge merge point
    Junction,
}

/// A positioned node ready to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub kind: SceneNodeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub clickable: bool,
    pub selected: bool,
    pub mastery: MasteryBand,
    pub card_count: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub layer_name: String,
    /// Position came from the manual layout cache
    pub pinned: bool,
}

/// Everything the renderer draws for one state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub mode: ViewMode,
    pub layout_mode: LayoutMode,
    pub scope: ScopeKey,
    pub breadcrumbs: Vec<String>,
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<RoutedEdge>,
    pub loading: bool,
}

impl Scene {
    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn junctions(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes
            .iter()
            .filter(|n| n.kind == SceneNodeKind::Junction)
    }
}

/// Inputs of one recompute step
pub struct RenderInput<'a> {
    pub engine: &'a LayoutEngine,
    pub graph: &'a KnowledgeGraph,
    pub mode: ViewMode,
    pub layout_mode: LayoutMode,
    pub scope: &'a ScopeKey,
    /// Manual positions stored for `scope`
    pub overrides: Option<&'a BTreeMap<String, ManualPosition>>,
    pub selection: Option<&'a str>,
    pub clickable: &'a HashSet<&'a str>,
    pub breadcrumbs: Vec<String>,
    pub loading: bool,
}

impl<'a> RenderInput<'a> {
    /// Gather inputs from the navigation state.
    pub fn from_state(
        engine: &'a LayoutEngine,
        nav: &'a NavigationStateMachine,
        layout_mode: LayoutMode,
        scope: &'a ScopeKey,
        overrides: Option<&'a BTreeMap<String, ManualPosition>>,
        clickable: &'a HashSet<&'a str>,
    ) -> Self {
        Self {
            engine,
            graph: nav.graph(),
            mode: nav.mode(),
            layout_mode,
            scope,
            overrides,
            selection: nav.selection(),
            clickable,
            breadcrumbs: nav.stack().iter().map(|i| i.name.clone()).collect(),
            loading: nav.is_loading(),
        }
    }
}

/// Lay out, route and decorate the active graph.
pub fn recompute(input: &RenderInput<'_>) -> Scene {
    let placements = input.engine.layout_with_overrides(
        input.graph,
        input.mode,
        input.layout_mode,
        input.overrides,
    );
    let router = EdgeRouter::new(input.engine.config().junction_margin);
    let routed = router.route(&input.graph.edges, &placements, input.mode);

    let pinned = |id: &str| {
        input.layout_mode == LayoutMode::Arrange
            && input.overrides.is_some_and(|o| o.contains_key(id))
    };

    let mut nodes: Vec<SceneNode> = placements
        .iter()
        .filter_map(|p| {
            let node = input.graph.node(&p.id)?;
            Some(SceneNode {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: if node.is_layer_header() {
                    SceneNodeKind::LayerHeader
                } else {
                    SceneNodeKind::Card
                },
                x: p.x,
                y: p.y,
                width: p.width,
                height: p.height,
                clickable: input.clickable.contains(node.id.as_str()),
                selected: input.selection == Some(node.id.as_str()),
                mastery: node.mastery_band(),
                card_count: node.card_count,
                layer_name: node.layer_name.clone(),
                pinned: pinned(&node.id),
            })
        })
        .collect();

    nodes.extend(routed.junctions.iter().map(|j| SceneNode {
        id: j.id.clone(),
        label: String::new(),
        kind: SceneNodeKind::Junction,
        x: j.x,
        y: j.y,
        width: 0.0,
        height: 0.0,
        clickable: false,
        selected: false,
        mastery: MasteryBand::Unknown,
        card_count: 0,
        layer_name: String::new(),
        pinned: false,
    }));

    Scene {
        mode: input.mode,
        layout_mode: input.layout_mode,
        scope: input.scope.clone(),
        breadcrumbs: input.breadcrumbs.clone(),
        nodes,
        edges: routed.edges,
        loading: input.loading,
    }
}
