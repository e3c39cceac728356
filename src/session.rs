//! Navigator session
//!
//! Wires the provider, state machine, interaction controller, layout store and
//! render step together. All state is mutated from the task that owns the
//! session; fetches run as spawned tokio tasks and report back through a
//! channel. Responses are applied when the owner pumps them, and the state
//! machine decides whether each one is still wanted.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{FetchError, NavFault};
use crate::graph::{LayoutEngine, LayoutMode};
use crate::navigation::fetch;
use crate::navigation::{
    ApplyOutcome, FetchResponse, FetchSlot, FetchTarget, InteractionController,
    NavigationStateMachine, Outcome, UiEvent,
};
use crate::persistence::LayoutPersistenceStore;
use crate::provider::GraphDataProvider;
use crate::render::{recompute, RenderInput, Scene};

pub struct NavigatorSession {
    provider: Arc<dyn GraphDataProvider>,
    nav: NavigationStateMachine,
    controller: InteractionController,
    store: LayoutPersistenceStore,
    engine: LayoutEngine,
    sender: mpsc::UnboundedSender<FetchResponse>,
    receiver: mpsc::UnboundedReceiver<FetchResponse>,
    in_flight: usize,
    scene: Scene,
}

impl NavigatorSession {
    pub fn new(
        provider: Arc<dyn GraphDataProvider>,
        store: LayoutPersistenceStore,
        config: &EngineConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let nav = NavigationStateMachine::new();
        let controller = InteractionController::new(config.initial_layout_mode);
        let engine = LayoutEngine::with_config(config.layout.clone());
        let scene = render_scene(&engine, &nav, &controller, &store);
        Self {
            provider,
            nav,
            controller,
            store,
            engine,
            sender,
            receiver,
            in_flight: 0,
            scene,
        }
    }

    /// Request the full graph. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        info!("Starting navigator session");
        let transition = self.nav.init();
        self.spawn_fetches(transition.fetches);
        self.rerender();
    }

    /// Handle one UI event; spawns any fetches it issues.
    pub fn handle(&mut self, event: UiEvent) -> Result<Outcome, NavFault> {
        debug!("UI event: {:?}", event);
        let outcome =
            self.controller
                .handle(event, &mut self.nav, &mut self.store, &mut self.engine)?;
        self.spawn_fetches(outcome.fetches.clone());
        if outcome.effects.has_layout_effects() {
            debug!(
                "Layout {} with {} stored scopes",
                self.controller.layout_mode().as_str(),
                self.store.scopes().count()
            );
        }
        if outcome.effects.needs_render() {
            self.rerender();
        }
        Ok(outcome)
    }

    /// Apply every response that has already arrived. Returns how many applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(response) = self.receiver.try_recv() {
            if self.apply(response) == ApplyOutcome::Applied {
                applied += 1;
            }
        }
        if applied > 0 {
            self.rerender();
        }
        applied
    }

    /// Wait for the next response and apply it.
    ///
    /// Returns `None` when no fetch is in flight.
    pub async fn next_response(&mut self) -> Option<ApplyOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let response = self.receiver.recv().await?;
        let outcome = self.apply(response);
        if outcome == ApplyOutcome::Applied {
            self.rerender();
        }
        Some(outcome)
    }

    /// Wait until every in-flight fetch has answered.
    pub async fn settle(&mut self) {
        while self.next_response().await.is_some() {}
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn state(&self) -> &NavigationStateMachine {
        &self.nav
    }

    pub fn store(&self) -> &LayoutPersistenceStore {
        &self.store
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.controller.layout_mode()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn apply(&mut self, response: FetchResponse) -> ApplyOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        let replaces_graph = response.target.slot() == FetchSlot::Graph;
        let outcome = self.nav.apply_response(response);
        if replaces_graph && outcome == ApplyOutcome::Applied {
            // Sizes belong to the nodes of the graph just replaced
            self.engine.clear_measured_sizes();
        }
        outcome
    }

    fn spawn_fetches(&mut self, targets: Vec<FetchTarget>) {
        for target in targets {
            debug!("Fetching {}", target);
            let provider = Arc::clone(&self.provider);
            let sender = self.sender.clone();
            self.in_flight += 1;
            tokio::spawn(async move {
                let fetch = tokio::spawn({
                    let target = target.clone();
                    async move { fetch::execute(provider.as_ref(), target).await }
                });
                // A panicked or aborted fetch still answers for its target
                let response = match fetch.await {
                    Ok(response) => response,
                    Err(err) => {
                        warn!("Fetch for {} did not complete: {}", target, err);
                        FetchResponse::failed(target, FetchError::Unavailable(err.to_string()))
                    }
                };
                // Receiver gone means the session was dropped
                let _ = sender.send(response);
            });
        }
    }

    fn rerender(&mut self) {
        self.scene = render_scene(&self.engine, &self.nav, &self.controller, &self.store);
    }
}

fn render_scene(
    engine: &LayoutEngine,
    nav: &NavigationStateMachine,
    controller: &InteractionController,
    store: &LayoutPersistenceStore,
) -> Scene {
    let scope = nav.scope_key();
    let clickable: HashSet<&str> = nav.clickable_nodes().into_iter().collect();
    let input = RenderInput::from_state(
        engine,
        nav,
        controller.layout_mode(),
        &scope,
        store.positions(&scope),
        &clickable,
    );
    recompute(&input)
}
