//! Navigation state machine
//!
//! Owns the view mode, breadcrumb stack and selection, plus everything fetched
//! for them. Transitions are synchronous: they mutate state, clear whatever the
//! new view no longer shows, and return the fetches the caller must run. Fetch
//! results come back through [`NavigationStateMachine::apply_response`], which
//! drops any response the state no longer wants.
//!
//! ```text
//!  full ──click──▶ prerequisiteTree ──click inner node──▶ prerequisiteTree
//!   ▲                    │ pick subtopic
//!   │ "Full Graph"       ▼
//!   └──────────────── subtopic ──click card──▶ card ──click card──▶ card
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use super::fetch::{FetchPayload, FetchResponse, FetchSlot, FetchTarget};
use super::scope::ScopeKey;
use super::stack::{split_subtopic_item_id, NavItem, NavKind, NavigationStack};
use crate::error::{FetchError, NavFault};
use crate::graph::{
    synthesize_card_graph, Card, KnowledgeGraph, Subtopic, SubtreeCardDistribution, ViewMode,
};

// =============================================================================
// TRANSITION RESULTS
// =============================================================================

/// What a transition changed and which fetches it needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// View mode or stack changed
    pub navigated: bool,
    pub selection_changed: bool,
    /// Fetches to run; each is already registered as wanted
    pub fetches: Vec<FetchTarget>,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        !self.navigated && !self.selection_changed && self.fetches.is_empty()
    }
}

/// Whether a fetch response was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The state moved on; the response was discarded
    Stale,
}

/// Inline errors, one per panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelErrors {
    pub graph: Option<FetchError>,
    pub subtopics: Option<FetchError>,
    pub distribution: Option<FetchError>,
}

impl PanelErrors {
    pub fn is_empty(&self) -> bool {
        self.graph.is_none() && self.subtopics.is_none() && self.distribution.is_none()
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct NavigationStateMachine {
    mode: ViewMode,
    stack: NavigationStack,
    selection: Option<String>,

    /// Last full graph received, restored on "Full Graph"
    full_graph: Option<KnowledgeGraph>,
    /// Graph currently shown
    graph: KnowledgeGraph,
    /// Card set behind the synthesized card graph
    subtopic_cards: Vec<Card>,
    subtopics: Vec<Subtopic>,
    distribution: Option<SubtreeCardDistribution>,

    /// Live target per slot; responses for anything else are stale
    wanted: HashMap<FetchSlot, FetchTarget>,
    errors: PanelErrors,
}

impl NavigationStateMachine {
    /// Full mode, empty stack, no selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the full graph if it is not cached yet.
    pub fn init(&mut self) -> Transition {
        match self.full_graph.clone() {
            Some(graph) => {
                self.graph = graph;
                Transition::default()
            }
            None => Transition {
                fetches: vec![self.begin_graph_fetch(FetchTarget::FullGraph)],
                ..Transition::default()
            },
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn stack(&self) -> &NavigationStack {
        &self.stack
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn subtopic_cards(&self) -> &[Card] {
        &self.subtopic_cards
    }

    /// Detail of the card named by the card breadcrumb, from the fetched set.
    pub fn selected_card(&self) -> Option<&Card> {
        let id = &self.stack.card()?.id;
        self.subtopic_cards.iter().find(|c| &c.card_id == id)
    }

    pub fn subtopics(&self) -> &[Subtopic] {
        &self.subtopics
    }

    pub fn distribution(&self) -> Option<&SubtreeCardDistribution> {
        self.distribution.as_ref()
    }

    pub fn errors(&self) -> &PanelErrors {
        &self.errors
    }

    /// A graph fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.wanted.contains_key(&FetchSlot::Graph)
    }

    pub fn wanted(&self, slot: FetchSlot) -> Option<&FetchTarget> {
        self.wanted.get(&slot)
    }

    pub fn scope_key(&self) -> ScopeKey {
        ScopeKey::derive(self.mode, &self.stack)
    }

    /// Root of the current prerequisite subtree.
    pub fn current_root(&self) -> Option<&str> {
        self.stack.current_concept().map(|i| i.id.as_str())
    }

    // =========================================================================
    // CLICKABILITY
    // =========================================================================

    /// Whether clicking `id` can do anything in the current mode.
    ///
    /// Layer headers are never clickable. In the prerequisite tree only nodes
    /// with an incoming edge in the current subtree qualify, and never the root.
    pub fn is_clickable(&self, id: &str) -> bool {
        let Some(node) = self.graph.node(id) else {
            return false;
        };
        if node.is_layer_header() {
            return false;
        }
        match self.mode {
            ViewMode::Full | ViewMode::Subtopic | ViewMode::Card => true,
            ViewMode::PrerequisiteTree => {
                self.current_root() != Some(id) && self.graph.has_incoming(id)
            }
        }
    }

    /// Clickable node ids in graph order.
    pub fn clickable_nodes(&self) -> Vec<&str> {
        self.graph
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| self.is_clickable(id))
            .collect()
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Node click in the graph.
    pub fn click_node(&mut self, id: &str) -> Result<Transition, NavFault> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| NavFault::UnknownNode(id.to_string()))?;
        if node.is_layer_header() {
            return Ok(Transition::default());
        }
        let label = node.label.clone();

        match self.mode {
            ViewMode::Full => Ok(self.enter_concept(id, &label)),
            ViewMode::PrerequisiteTree => {
                if self.is_clickable(id) {
                    Ok(self.enter_concept(id, &label))
                } else {
                    debug!("Leaf or root {} clicked: selection only", id);
                    Ok(Transition {
                        selection_changed: self.selection.as_deref() != Some(id),
                        fetches: self.select_concept(id),
                        navigated: false,
                    })
                }
            }
            ViewMode::Subtopic | ViewMode::Card => {
                let changed = self.stack.card().map(|c| c.id.as_str()) != Some(id);
                self.stack.set_card(NavItem::card(id, label))?;
                self.mode = ViewMode::Card;
                self.selection = Some(id.to_string());
                debug!("Card {} selected", id);
                Ok(Transition {
                    navigated: changed,
                    selection_changed: changed,
                    fetches: Vec::new(),
                })
            }
        }
    }

    /// Open subtopic `subtopic_id` of the selected concept.
    pub fn pick_subtopic(&mut self, subtopic_id: &str) -> Result<Transition, NavFault> {
        if self.mode != ViewMode::PrerequisiteTree {
            return Err(NavFault::WrongMode {
                expected: ViewMode::PrerequisiteTree.as_str(),
                actual: self.mode.as_str(),
            });
        }
        let concept = self.selection.clone().ok_or(NavFault::NoSelection)?;
        let name = self
            .subtopics
            .iter()
            .find(|s| s.id == subtopic_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| subtopic_id.to_string());

        self.stack
            .set_subtopic(NavItem::subtopic(&concept, subtopic_id, name))?;
        self.mode = ViewMode::Subtopic;
        self.clear_selection();
        debug!("Entering subtopic {}.{}", concept, subtopic_id);

        Ok(Transition {
            navigated: true,
            selection_changed: true,
            fetches: vec![
                self.begin_graph_fetch(FetchTarget::subtopic_cards(concept, subtopic_id))
            ],
        })
    }

    /// Breadcrumb click; the stack keeps items `0..=index`.
    pub fn click_breadcrumb(&mut self, index: usize) -> Result<Transition, NavFault> {
        let item = self.stack.truncate_to(index)?.clone();
        debug!("Breadcrumb {} ({:?} {})", index, item.kind, item.id);

        match item.kind {
            NavKind::Concept => {
                self.mode = ViewMode::PrerequisiteTree;
                let mut fetches = vec![self.begin_graph_fetch(FetchTarget::subtree(&item.id))];
                let selection_changed = self.selection.as_deref() != Some(item.id.as_str());
                fetches.extend(self.select_concept(&item.id));
                Ok(Transition {
                    navigated: true,
                    selection_changed,
                    fetches,
                })
            }
            NavKind::Subtopic => {
                let (concept, subtopic) = split_subtopic_item_id(&item.id)
                    .map(|(c, s)| (c.to_string(), s.to_string()))
                    .ok_or(NavFault::MissingConcept)?;
                self.mode = ViewMode::Subtopic;
                let selection_changed = self.selection.is_some();
                self.clear_selection();
                Ok(Transition {
                    navigated: true,
                    selection_changed,
                    fetches: vec![
                        self.begin_graph_fetch(FetchTarget::subtopic_cards(concept, subtopic))
                    ],
                })
            }
            NavKind::Card => {
                self.mode = ViewMode::Card;
                let selection_changed = self.selection.as_deref() != Some(item.id.as_str());
                self.selection = Some(item.id);
                Ok(Transition {
                    navigated: false,
                    selection_changed,
                    fetches: Vec::new(),
                })
            }
        }
    }

    /// "Full Graph" breadcrumb: clear stack and selection, restore the cache.
    pub fn go_full(&mut self) -> Transition {
        let navigated = self.mode != ViewMode::Full || !self.stack.is_empty();
        let selection_changed = self.selection.is_some();

        self.mode = ViewMode::Full;
        self.stack.clear();
        self.clear_selection();
        self.subtopic_cards.clear();

        let fetches = match self.full_graph.clone() {
            Some(graph) => {
                self.wanted.remove(&FetchSlot::Graph);
                self.errors.graph = None;
                self.graph = graph;
                Vec::new()
            }
            None => vec![self.begin_graph_fetch(FetchTarget::FullGraph)],
        };
        debug!("Back to full graph (cached: {})", fetches.is_empty());

        Transition {
            navigated,
            selection_changed,
            fetches,
        }
    }

    // =========================================================================
    // FETCH RESPONSES
    // =========================================================================

    /// Apply a response if its target is still the one wanted for its slot.
    pub fn apply_response(&mut self, response: FetchResponse) -> ApplyOutcome {
        let slot = response.target.slot();
        if self.wanted.get(&slot) != Some(&response.target) {
            debug!("Discarding stale response for {}", response.target);
            return ApplyOutcome::Stale;
        }

        if let Some(err) = response.payload.error() {
            warn!("Fetch for {} failed: {}", response.target, err);
        }

        match (slot, response.payload) {
            (FetchSlot::Graph, FetchPayload::Graph(result)) => match result {
                Ok(graph) => {
                    if response.target == FetchTarget::FullGraph {
                        self.full_graph = Some(graph.clone());
                    }
                    self.graph = graph;
                    self.errors.graph = None;
                }
                Err(err) => {
                    self.graph = KnowledgeGraph::default();
                    self.errors.graph = Some(err);
                }
            },
            (FetchSlot::Graph, FetchPayload::Cards(result)) => match result {
                Ok(cards) => {
                    self.graph = synthesize_card_graph(&cards);
                    self.subtopic_cards = cards;
                    self.errors.graph = None;
                }
                Err(err) => {
                    self.graph = KnowledgeGraph::default();
                    self.subtopic_cards.clear();
                    self.errors.graph = Some(err);
                }
            },
            (FetchSlot::Subtopics, FetchPayload::Subtopics(result)) => match result {
                Ok(subtopics) => {
                    self.subtopics = subtopics;
                    self.errors.subtopics = None;
                }
                Err(err) => {
                    self.subtopics.clear();
                    self.errors.subtopics = Some(err);
                }
            },
            (FetchSlot::Distribution, FetchPayload::Distribution(result)) => match result {
                Ok(distribution) => {
                    self.distribution = Some(distribution);
                    self.errors.distribution = None;
                }
                Err(err) => {
                    self.distribution = None;
                    self.errors.distribution = Some(err);
                }
            },
            (slot, _) => {
                warn!(
                    "Payload does not match {:?} slot for {}; ignoring",
                    slot, response.target
                );
                return ApplyOutcome::Stale;
            }
        }

        self.wanted.remove(&slot);
        ApplyOutcome::Applied
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Push a concept and show its subtree.
    fn enter_concept(&mut self, id: &str, label: &str) -> Transition {
        self.stack.push_concept(NavItem::concept(id, label));
        self.mode = ViewMode::PrerequisiteTree;
        debug!("Entering subtree of {} (depth {})", id, self.stack.depth());

        let selection_changed = self.selection.as_deref() != Some(id);
        let mut fetches = vec![self.begin_graph_fetch(FetchTarget::subtree(id))];
        fetches.extend(self.select_concept(id));
        Transition {
            navigated: true,
            selection_changed,
            fetches,
        }
    }

    /// Replace the active graph with an empty one and want `target`.
    fn begin_graph_fetch(&mut self, target: FetchTarget) -> FetchTarget {
        self.graph = KnowledgeGraph::default();
        self.subtopic_cards.clear();
        self.errors.graph = None;
        self.wanted.insert(FetchSlot::Graph, target.clone());
        target
    }

    /// Select a concept and request its side-panel data.
    fn select_concept(&mut self, id: &str) -> Vec<FetchTarget> {
        if self.selection.as_deref() == Some(id) {
            return Vec::new();
        }
        self.selection = Some(id.to_string());
        self.subtopics.clear();
        self.distribution = None;
        self.errors.subtopics = None;
        self.errors.distribution = None;

        let targets = [FetchTarget::subtopics(id), FetchTarget::distribution(id)];
        for target in &targets {
            self.wanted.insert(target.slot(), target.clone());
        }
        targets.into()
    }

    fn clear_selection(&mut self) {
        self.selection = None;
        self.subtopics.clear();
        self.distribution = None;
        self.errors.subtopics = None;
        self.errors.distribution = None;
        self.wanted.remove(&FetchSlot::Subtopics);
        self.wanted.remove(&FetchSlot::Distribution);
    }
}
