//! Interaction controller
//!
//! Maps UI events onto state machine transitions and layout store mutations.
//! Owns the auto/arrange layout mode. Nothing here renders or fetches: the
//! returned [`Outcome`] says which effects happened and what to fetch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::effect::EffectSet;
use super::fetch::FetchTarget;
use super::state::{NavigationStateMachine, Transition};
use crate::error::NavFault;
use crate::graph::edges::is_junction_id;
use crate::graph::{LayoutEngine, LayoutMode, ManualPosition, ViewMode};
use crate::persistence::LayoutPersistenceStore;

/// Input events from the graph view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    NodeClicked { id: String },
    /// Drag finished; `x`, `y` is the node's new top-left corner
    DragStopped { id: String, x: f32, y: f32 },
    BreadcrumbClicked { index: usize },
    FullGraphClicked,
    SubtopicPicked { subtopic_id: String },
    ToggleLayoutMode,
    ResetLayout,
    StartDrill,
    NodeMeasured { id: String, width: f32, height: f32 },
}

/// Outbound request to start a drill session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillTarget {
    Concept(String),
    /// `concept.subtopic`
    Subtopic(String),
    Card(String),
}

/// Result of handling one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub effects: EffectSet,
    pub fetches: Vec<FetchTarget>,
    pub drill: Option<DrillTarget>,
}

impl Outcome {
    fn from_transition(transition: Transition) -> Self {
        let mut effects = EffectSet::NONE;
        if transition.navigated {
            effects |= EffectSet::NAVIGATED;
        }
        if transition.selection_changed {
            effects |= EffectSet::SELECTION_CHANGED;
        }
        if !transition.fetches.is_empty() {
            effects |= EffectSet::FETCH_ISSUED;
        }
        if !effects.is_empty() {
            effects |= EffectSet::RERENDER;
        }
        Self {
            effects,
            fetches: transition.fetches,
            drill: None,
        }
    }

    fn effects(effects: EffectSet) -> Self {
        Self {
            effects,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    layout_mode: LayoutMode,
}

impl InteractionController {
    pub fn new(layout_mode: LayoutMode) -> Self {
        Self { layout_mode }
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    /// Handle one UI event.
    ///
    /// A returned fault leaves navigation state, store and layout mode as they were.
    pub fn handle(
        &mut self,
        event: UiEvent,
        nav: &mut NavigationStateMachine,
        store: &mut LayoutPersistenceStore,
        engine: &mut LayoutEngine,
    ) -> Result<Outcome, NavFault> {
        match event {
            UiEvent::NodeClicked { id } => {
                if is_junction_id(&id) {
                    return Ok(Outcome::default());
                }
                nav.click_node(&id).map(Outcome::from_transition)
            }
            UiEvent::BreadcrumbClicked { index } => {
                nav.click_breadcrumb(index).map(Outcome::from_transition)
            }
            UiEvent::FullGraphClicked => Ok(Outcome::from_transition(nav.go_full())),
            UiEvent::SubtopicPicked { subtopic_id } => {
                nav.pick_subtopic(&subtopic_id).map(Outcome::from_transition)
            }
            UiEvent::DragStopped { id, x, y } => self.drag_stopped(&id, x, y, nav, store),
            UiEvent::ToggleLayoutMode => {
                self.layout_mode = self.layout_mode.toggled();
                debug!("Layout mode -> {}", self.layout_mode.as_str());
                Ok(Outcome::effects(
                    EffectSet::LAYOUT_MODE_CHANGED | EffectSet::RERENDER,
                ))
            }
            UiEvent::ResetLayout => {
                let scope = nav.scope_key();
                store.clear_scope(&scope);
                let mut effects = EffectSet::LAYOUT_RESET | EffectSet::RERENDER;
                if self.layout_mode != LayoutMode::Auto {
                    self.layout_mode = LayoutMode::Auto;
                    effects |= EffectSet::LAYOUT_MODE_CHANGED;
                }
                debug!("Reset manual layout for {}", scope);
                Ok(Outcome::effects(effects))
            }
            UiEvent::StartDrill => {
                let target = drill_target(nav)?;
                debug!("Drill requested: {:?}", target);
                Ok(Outcome {
                    effects: EffectSet::DRILL_REQUESTED,
                    fetches: Vec::new(),
                    drill: Some(target),
                })
            }
            UiEvent::NodeMeasured { id, width, height } => {
                engine.set_measured_size(id, width, height);
                Ok(Outcome::effects(EffectSet::RERENDER))
            }
        }
    }

    fn drag_stopped(
        &self,
        id: &str,
        x: f32,
        y: f32,
        nav: &NavigationStateMachine,
        store: &mut LayoutPersistenceStore,
    ) -> Result<Outcome, NavFault> {
        if is_junction_id(id) {
            return Ok(Outcome::default());
        }
        if !nav.graph().has_node(id) {
            return Err(NavFault::UnknownNode(id.to_string()));
        }
        if self.layout_mode != LayoutMode::Arrange || !x.is_finite() || !y.is_finite() {
            return Ok(Outcome::default());
        }
        let scope = nav.scope_key();
        store.set_position(&scope, id, ManualPosition::new(x, y));
        debug!("Stored {} at ({}, {}) under {}", id, x, y, scope);
        Ok(Outcome::effects(EffectSet::LAYOUT_STORED | EffectSet::RERENDER))
    }
}

/// What "start drill" means in the current view.
pub fn drill_target(nav: &NavigationStateMachine) -> Result<DrillTarget, NavFault> {
    let stack = nav.stack();
    match nav.mode() {
        ViewMode::Card => stack
            .card()
            .map(|c| DrillTarget::Card(c.id.clone()))
            .ok_or(NavFault::NothingToDrill),
        ViewMode::Subtopic => stack
            .subtopic()
            .map(|s| DrillTarget::Subtopic(s.id.clone()))
            .ok_or(NavFault::NothingToDrill),
        ViewMode::PrerequisiteTree => nav
            .selection()
            .map(|id| DrillTarget::Concept(id.to_string()))
            .ok_or(NavFault::NoSelection),
        ViewMode::Full => Err(NavFault::NothingToDrill),
    }
}
