//! Manual layout persistence
//!
//! One durable record maps scope key -> node id -> position:
//!
//! ```json
//! { "tree:NB>PROB": { "PROB": { "x": 120.0, "y": 40.0 } } }
//! ```

use std::collections::BTreeMap;

use crate::graph::ManualPosition;
use crate::navigation::ScopeKey;

pub mod storage;
pub mod store;

pub use storage::{FileStorage, LayoutStorage, MemoryStorage};
pub use store::LayoutPersistenceStore;

/// Scope key -> node id -> manual position
pub type LayoutCache = BTreeMap<ScopeKey, BTreeMap<String, ManualPosition>>;
