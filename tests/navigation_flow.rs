//! End-to-end navigation through a session: provider fetches, stale response
//! handling, scene output and manual layout persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use kg_nav::graph::{parse_mermaid, Subtopic, SubtreeCardDistribution};
use kg_nav::navigation::{ApplyOutcome, FetchSlot, FetchTarget};
use kg_nav::{
    Card, DrillTarget, EffectSet, EngineConfig, FetchError, GraphDataProvider, InMemoryProvider,
    KnowledgeGraph, LayoutMode, LayoutPersistenceStore, MemoryStorage, NavFault,
    NavigatorSession, SceneNodeKind, UiEvent, ViewMode,
};

const GRAPH: &str = r#"graph TD
    LINALG["Linear Algebra"]
    PROB["Probability"]
    CALC["Calculus"]
    NB["Naive Bayes"]
    LOGREG["Logistic Regression"]

    PROB --> NB
    LINALG --> LOGREG
    PROB --> LOGREG
    CALC --> LOGREG
    NB --> LOGREG

    class LINALG,PROB,CALC foundation
    class NB,LOGREG supervised
"#;

fn card(id: &str, node: &str, subtopic: &str, pillar: &str) -> Card {
    Card {
        concept_node: Some(node.into()),
        subtopic: Some(subtopic.into()),
        pillar: Some(pillar.into()),
        ..Card::new(id)
    }
}

fn provider() -> InMemoryProvider {
    InMemoryProvider::new(
        parse_mermaid(GRAPH).unwrap(),
        vec![
            card("nb-1C-01", "NB", "priors", "1-Use Case"),
            card("nb-2D-01", "NB", "priors", "2-Data"),
            card("nb-1C-02", "NB", "likelihood", "1-Use Case"),
            card("lr-3M-01", "LOGREG", "sigmoid", "3-Algorithm"),
        ],
    )
}

fn session_with(provider: Arc<dyn GraphDataProvider>, mode: LayoutMode) -> NavigatorSession {
    let config = EngineConfig {
        initial_layout_mode: mode,
        ..EngineConfig::default()
    };
    NavigatorSession::new(
        provider,
        LayoutPersistenceStore::load(MemoryStorage::new()),
        &config,
    )
}

async fn started(mode: LayoutMode) -> NavigatorSession {
    let mut session = session_with(Arc::new(provider()), mode);
    session.start();
    session.settle().await;
    session
}

fn click(id: &str) -> UiEvent {
    UiEvent::NodeClicked { id: id.into() }
}

#[tokio::test]
async fn test_full_graph_scene() {
    let session = started(LayoutMode::Auto).await;
    let scene = session.scene();

    assert_eq!(scene.mode, ViewMode::Full);
    assert_eq!(scene.scope.as_str(), "full");
    assert_eq!(scene.nodes.len(), 5);
    assert_eq!(scene.edges.len(), 5);
    assert_eq!(scene.junctions().count(), 0);
    assert!(scene.nodes.iter().all(|n| n.clickable));
    assert_eq!(scene.node("NB").unwrap().card_count, 3);
}

#[tokio::test]
async fn test_drill_down_to_card() {
    let mut session = started(LayoutMode::Auto).await;

    let outcome = session.handle(click("LOGREG")).unwrap();
    assert!(outcome.effects.contains(EffectSet::NAVIGATED));
    assert!(session.scene().loading);
    session.settle().await;

    let scene = session.scene();
    assert_eq!(scene.mode, ViewMode::PrerequisiteTree);
    assert_eq!(scene.breadcrumbs, vec!["Logistic Regression"]);
    // Four prerequisites merge into LOGREG through one junction
    assert_eq!(scene.junctions().count(), 1);
    assert_eq!(scene.edges.iter().filter(|e| e.arrowhead).count(), 2);
    let clickable: Vec<&str> = scene
        .nodes
        .iter()
        .filter(|n| n.clickable)
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(clickable, vec!["NB"]);

    session.handle(click("NB")).unwrap();
    session.settle().await;
    assert_eq!(session.state().stack().depth(), 2);
    assert_eq!(session.state().subtopics().len(), 2);
    assert_eq!(session.state().distribution().unwrap().total, 3);

    session
        .handle(UiEvent::SubtopicPicked {
            subtopic_id: "priors".into(),
        })
        .unwrap();
    session.settle().await;

    let scene = session.scene();
    assert_eq!(scene.mode, ViewMode::Subtopic);
    assert_eq!(scene.scope.as_str(), "subtopic:NB.priors");
    let headers = scene
        .nodes
        .iter()
        .filter(|n| n.kind == SceneNodeKind::LayerHeader)
        .count();
    assert_eq!(headers, 2);
    assert!(scene
        .nodes
        .iter()
        .filter(|n| n.kind == SceneNodeKind::LayerHeader)
        .all(|n| !n.clickable));

    session.handle(click("nb-2D-01")).unwrap();
    assert_eq!(session.scene().mode, ViewMode::Card);
    assert_eq!(
        session.state().selected_card().unwrap().pillar.as_deref(),
        Some("2-Data")
    );

    let outcome = session.handle(UiEvent::StartDrill).unwrap();
    assert_eq!(outcome.drill, Some(DrillTarget::Card("nb-2D-01".into())));
}

#[tokio::test]
async fn test_breadcrumb_and_full_graph() {
    let mut session = started(LayoutMode::Auto).await;
    session.handle(click("LOGREG")).unwrap();
    session.settle().await;
    session.handle(click("NB")).unwrap();
    session.settle().await;

    session.handle(UiEvent::BreadcrumbClicked { index: 0 }).unwrap();
    session.settle().await;
    assert_eq!(session.state().stack().depth(), 1);
    assert_eq!(session.state().stack().peek().unwrap().id, "LOGREG");
    assert_eq!(session.scene().nodes.len(), 6); // five concepts + junction

    assert_eq!(
        session
            .handle(UiEvent::BreadcrumbClicked { index: 4 })
            .unwrap_err(),
        NavFault::BreadcrumbOutOfRange { index: 4, len: 1 }
    );

    let outcome = session.handle(UiEvent::FullGraphClicked).unwrap();
    assert!(outcome.fetches.is_empty());
    assert_eq!(session.in_flight(), 0);
    assert_eq!(session.scene().mode, ViewMode::Full);
    assert_eq!(session.scene().nodes.len(), 5);
}

#[tokio::test]
async fn test_missing_subtopic_reported_inline() {
    let mut session = started(LayoutMode::Auto).await;
    session.handle(click("NB")).unwrap();
    session.settle().await;

    session
        .handle(UiEvent::SubtopicPicked {
            subtopic_id: "nonexistent".into(),
        })
        .unwrap();
    session.settle().await;

    assert!(matches!(
        session.state().errors().graph,
        Some(FetchError::SubtopicNotFound { .. })
    ));
    assert!(session.scene().nodes.is_empty());
    // Still navigable
    session.handle(UiEvent::FullGraphClicked).unwrap();
    assert_eq!(session.scene().nodes.len(), 5);
}

#[tokio::test]
async fn test_manual_position_survives_navigation() {
    let mut session = started(LayoutMode::Arrange).await;
    session.handle(click("NB")).unwrap();
    session.settle().await;
    let scope = session.scene().scope.clone();
    assert_eq!(scope.as_str(), "tree:NB");

    let outcome = session
        .handle(UiEvent::DragStopped {
            id: "PROB".into(),
            x: 333.0,
            y: 444.0,
        })
        .unwrap();
    assert!(outcome.effects.contains(EffectSet::LAYOUT_STORED));

    // Away to another scope and back
    session.handle(UiEvent::FullGraphClicked).unwrap();
    session.handle(click("LOGREG")).unwrap();
    session.settle().await;
    assert_ne!(session.scene().node("PROB").unwrap().x, 333.0);
    session.handle(UiEvent::FullGraphClicked).unwrap();
    session.handle(click("NB")).unwrap();
    session.settle().await;

    let prob = session.scene().node("PROB").unwrap();
    assert_eq!((prob.x, prob.y), (333.0, 444.0));
    assert!(prob.pinned);

    // Reset reverts to computed positions and auto mode
    session.handle(UiEvent::ResetLayout).unwrap();
    assert_eq!(session.layout_mode(), LayoutMode::Auto);
    assert!(session.store().positions(&scope).is_none());
    assert!(!session.scene().node("PROB").unwrap().pinned);
}

#[tokio::test]
async fn test_drag_in_auto_mode_is_not_stored() {
    let mut session = started(LayoutMode::Auto).await;
    session
        .handle(UiEvent::DragStopped {
            id: "PROB".into(),
            x: 1.0,
            y: 2.0,
        })
        .unwrap();
    assert!(session.store().cache().is_empty());
}

#[tokio::test]
async fn test_measured_sizes_do_not_outlive_their_graph() {
    let mut session = started(LayoutMode::Auto).await;
    session.handle(click("NB")).unwrap();
    session.settle().await;
    let priors = || UiEvent::SubtopicPicked {
        subtopic_id: "priors".into(),
    };
    session.handle(priors()).unwrap();
    session.settle().await;

    session
        .handle(UiEvent::NodeMeasured {
            id: "nb-1C-01".into(),
            width: 300.0,
            height: 90.0,
        })
        .unwrap();
    assert_eq!(session.scene().node("nb-1C-01").unwrap().width, 300.0);

    // Back to the concept and into the same subtopic: a fresh card graph
    session.handle(UiEvent::BreadcrumbClicked { index: 0 }).unwrap();
    session.settle().await;
    session.handle(priors()).unwrap();
    session.settle().await;

    let card = session.scene().node("nb-1C-01").unwrap();
    assert_ne!(card.width, 300.0);
    assert_ne!(card.height, 90.0);
}

/// Provider whose subtree fetch panics.
struct PanickingProvider {
    inner: InMemoryProvider,
}

#[async_trait]
impl GraphDataProvider for PanickingProvider {
    async fn full_graph(&self) -> Result<KnowledgeGraph, FetchError> {
        self.inner.full_graph().await
    }

    async fn subtree(&self, node_id: &str) -> Result<KnowledgeGraph, FetchError> {
        panic!("subtree backend crashed for {}", node_id);
    }

    async fn subtopics(&self, node_id: &str) -> Result<Vec<Subtopic>, FetchError> {
        self.inner.subtopics(node_id).await
    }

    async fn subtopic_cards(
        &self,
        concept_id: &str,
        subtopic_id: &str,
    ) -> Result<Vec<Card>, FetchError> {
        self.inner.subtopic_cards(concept_id, subtopic_id).await
    }

    async fn subtree_card_distribution(
        &self,
        node_id: &str,
    ) -> Result<SubtreeCardDistribution, FetchError> {
        self.inner.subtree_card_distribution(node_id).await
    }
}

#[tokio::test]
async fn test_panicking_fetch_is_reported_inline() {
    let provider = Arc::new(PanickingProvider { inner: provider() });
    let mut session = session_with(provider, LayoutMode::Auto);
    session.start();
    session.settle().await;

    session.handle(click("NB")).unwrap();
    tokio::time::timeout(Duration::from_secs(5), session.settle())
        .await
        .expect("session settles after a panicked fetch");

    assert_eq!(session.in_flight(), 0);
    assert!(!session.state().is_loading());
    assert!(!session.scene().loading);
    assert!(matches!(
        session.state().errors().graph,
        Some(FetchError::Unavailable(_))
    ));
    assert!(session.scene().nodes.is_empty());
    // Side panels still filled by the fetches that succeeded
    assert_eq!(session.state().subtopics().len(), 2);

    session.handle(UiEvent::FullGraphClicked).unwrap();
    assert_eq!(session.scene().nodes.len(), 5);
}

// =============================================================================
// RACES
// =============================================================================

/// Provider whose per-node fetches block until the test releases that node.
struct GatedProvider {
    inner: InMemoryProvider,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl GatedProvider {
    fn new(inner: InMemoryProvider) -> Self {
        Self {
            inner,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, node_id: &str) -> Arc<Semaphore> {
        let mut gates = self.gates.lock().unwrap();
        gates
            .entry(node_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    fn release(&self, node_id: &str) {
        self.gate(node_id).add_permits(64);
    }

    async fn wait(&self, node_id: &str) {
        let gate = self.gate(node_id);
        gate.acquire().await.unwrap().forget();
    }
}

#[async_trait]
impl GraphDataProvider for GatedProvider {
    async fn full_graph(&self) -> Result<KnowledgeGraph, FetchError> {
        self.inner.full_graph().await
    }

    async fn subtree(&self, node_id: &str) -> Result<KnowledgeGraph, FetchError> {
        self.wait(node_id).await;
        self.inner.subtree(node_id).await
    }

    async fn subtopics(&self, node_id: &str) -> Result<Vec<Subtopic>, FetchError> {
        self.wait(node_id).await;
        self.inner.subtopics(node_id).await
    }

    async fn subtopic_cards(
        &self,
        concept_id: &str,
        subtopic_id: &str,
    ) -> Result<Vec<Card>, FetchError> {
        self.wait(concept_id).await;
        self.inner.subtopic_cards(concept_id, subtopic_id).await
    }

    async fn subtree_card_distribution(
        &self,
        node_id: &str,
    ) -> Result<SubtreeCardDistribution, FetchError> {
        self.wait(node_id).await;
        self.inner.subtree_card_distribution(node_id).await
    }
}

/// Click NB, go back, click LOGREG; both sets of fetches stay blocked.
async fn double_navigation() -> (NavigatorSession, Arc<GatedProvider>) {
    let gated = Arc::new(GatedProvider::new(provider()));
    let mut session = session_with(gated.clone(), LayoutMode::Auto);
    session.start();
    session.settle().await;

    session.handle(click("NB")).unwrap();
    session.handle(UiEvent::FullGraphClicked).unwrap();
    session.handle(click("LOGREG")).unwrap();
    assert_eq!(session.in_flight(), 6);
    (session, gated)
}

async fn collect(session: &mut NavigatorSession, count: usize) -> Vec<ApplyOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..count {
        outcomes.push(session.next_response().await.unwrap());
    }
    outcomes
}

#[tokio::test]
async fn test_late_response_for_abandoned_target_is_discarded() {
    let (mut session, gated) = double_navigation().await;

    gated.release("LOGREG");
    let outcomes = collect(&mut session, 3).await;
    assert!(outcomes.iter().all(|o| *o == ApplyOutcome::Applied));

    gated.release("NB");
    let outcomes = collect(&mut session, 3).await;
    assert!(outcomes.iter().all(|o| *o == ApplyOutcome::Stale));

    let state = session.state();
    assert_eq!(state.selection(), Some("LOGREG"));
    assert_eq!(state.graph().nodes.len(), 5);
    assert_eq!(state.subtopics()[0].name, "sigmoid");
    assert_eq!(state.distribution().unwrap().node_id, "LOGREG");
}

#[tokio::test]
async fn test_early_response_for_abandoned_target_is_discarded() {
    let (mut session, gated) = double_navigation().await;

    gated.release("NB");
    let outcomes = collect(&mut session, 3).await;
    assert!(outcomes.iter().all(|o| *o == ApplyOutcome::Stale));
    assert!(session.state().graph().is_empty());
    assert_eq!(
        session.state().wanted(FetchSlot::Graph),
        Some(&FetchTarget::subtree("LOGREG"))
    );

    gated.release("LOGREG");
    session.settle().await;
    assert_eq!(session.state().graph().nodes.len(), 5);
    assert!(!session.scene().loading);
    assert_eq!(session.scene().breadcrumbs, vec!["Logistic Regression"]);
}
