//! Drill-down navigation: breadcrumb stack, scope keys, tagged fetches, the
//! state machine and the controller that feeds it UI events.

pub mod effect;
pub mod fetch;
pub mod interaction;
pub mod scope;
pub mod stack;
pub mod state;

pub use effect::EffectSet;
pub use fetch::{FetchPayload, FetchResponse, FetchSlot, FetchTarget};
pub use interaction::{drill_target, DrillTarget, InteractionController, Outcome, UiEvent};
pub use scope::ScopeKey;
pub use stack::{NavItem, NavKind, NavigationStack};
pub use state::{ApplyOutcome, NavigationStateMachine, PanelErrors, Transition};
