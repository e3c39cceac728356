//! kg-nav - Knowledge Graph Navigation & Layout Engine
//!
//! Drill-down navigation over a concept graph at three granularities: the full
//! graph, a concept's prerequisite subtree, and a subtopic's card list (with an
//! optional selected card). Keeps a breadcrumb trail, positions nodes, bundles
//! fan-in edges through junction nodes, and stores user-arranged positions
//! per navigation scope.
//!
//! ## Flow
//! UiEvent -> InteractionController -> NavigationStateMachine (transition)
//!   -> tagged fetches (GraphDataProvider) -> apply if still wanted
//!   -> render::recompute (LayoutEngine + EdgeRouter) -> Scene
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kg_nav::{
//!     EngineConfig, InMemoryProvider, LayoutPersistenceStore, MemoryStorage, NavigatorSession,
//!     UiEvent,
//! };
//!
//! # async fn demo(provider: InMemoryProvider) {
//! let store = LayoutPersistenceStore::load(MemoryStorage::new());
//! let mut session = NavigatorSession::new(Arc::new(provider), store, &EngineConfig::default());
//! session.start();
//! session.settle().await;
//! session.handle(UiEvent::NodeClicked { id: "NB".into() }).ok();
//! session.settle().await;
//! println!("{} nodes", session.scene().nodes.len());
//! # }
//! ```

// Errors and configuration
pub mod config;
pub mod error;

// Graph model, layout, routing
pub mod graph;

// Navigation state, fetch tagging, UI events
pub mod navigation;

// Manual layout cache
pub mod persistence;

// Data source seam
pub mod provider;

// Explicit recompute step and async driver
pub mod render;
pub mod session;

pub use config::{EngineConfig, LayoutConfig};
pub use error::{ConfigError, FetchError, GraphError, MermaidError, NavFault, SourceError};
pub use graph::{
    Card, GraphEdge, GraphNode, KnowledgeGraph, LayoutEngine, LayoutMode, ManualPosition,
    ViewMode,
};
pub use navigation::{
    DrillTarget, EffectSet, InteractionController, NavigationStateMachine, Outcome, ScopeKey,
    UiEvent,
};
pub use persistence::{FileStorage, LayoutPersistenceStore, MemoryStorage};
pub use provider::{GraphDataProvider, InMemoryProvider};
pub use render::{Scene, SceneNode, SceneNodeKind};
pub use session::NavigatorSession;
