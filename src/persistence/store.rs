//! Scoped manual-layout store.
//!
//! The in-memory cache is authoritative for the session. It is loaded once
//! from storage (missing or unreadable data gives an empty cache) and written
//! back after every mutation; write failures are logged and otherwise ignored.

use std::collections::BTreeMap;

use tracing::debug;

use super::storage::LayoutStorage;
use super::LayoutCache;
use crate::error::StoreError;
use crate::graph::ManualPosition;
use crate::navigation::ScopeKey;

pub struct LayoutPersistenceStore {
    storage: Box<dyn LayoutStorage>,
    cache: LayoutCache,
}

impl std::fmt::Debug for LayoutPersistenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutPersistenceStore")
            .field("scopes", &self.cache.len())
            .finish()
    }
}

impl LayoutPersistenceStore {
    /// Load the cache from `storage`. Never fails.
    pub fn load(storage: impl LayoutStorage + 'static) -> Self {
        let cache = match read_cache(&storage) {
            Ok(cache) => cache,
            Err(e) => {
                debug!("Layout cache unreadable, starting empty: {}", e);
                LayoutCache::new()
            }
        };
        debug!("Loaded layout cache with {} scopes", cache.len());
        Self {
            storage: Box::new(storage),
            cache,
        }
    }

    /// Write the whole cache back. Returns whether the write succeeded.
    pub fn save(&self) -> bool {
        let result = serde_json::to_string(&self.cache)
            .map_err(StoreError::from)
            .and_then(|json| self.storage.write(&json));
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("Layout cache save failed, keeping in-memory copy: {}", e);
                false
            }
        }
    }

    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    pub fn positions(&self, scope: &ScopeKey) -> Option<&BTreeMap<String, ManualPosition>> {
        self.cache.get(scope)
    }

    pub fn position(&self, scope: &ScopeKey, node_id: &str) -> Option<ManualPosition> {
        self.cache.get(scope)?.get(node_id).copied()
    }

    /// Store one node position under `scope` and save.
    pub fn set_position(
        &mut self,
        scope: &ScopeKey,
        node_id: impl Into<String>,
        pos: ManualPosition,
    ) {
        self.cache
            .entry(scope.clone())
            .or_default()
            .insert(node_id.into(), pos);
        self.save();
    }

    /// Remove every position stored under `scope` and save.
    ///
    /// Returns whether the scope had any entry.
    pub fn clear_scope(&mut self, scope: &ScopeKey) -> bool {
        let removed = self.cache.remove(scope).is_some();
        self.save();
        removed
    }

    /// Stored scopes with their node counts.
    pub fn scopes(&self) -> impl Iterator<Item = (&ScopeKey, usize)> {
        self.cache.iter().map(|(scope, nodes)| (scope, nodes.len()))
    }
}

fn read_cache(storage: &dyn LayoutStorage) -> Result<LayoutCache, StoreError> {
    match storage.read()? {
        Some(text) if !text.trim().is_empty() => Ok(serde_json::from_str(&text)?),
        _ => Ok(LayoutCache::new()),
    }
}
