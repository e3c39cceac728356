//! Engine configuration
//!
//! Layout constants live in [`LayoutConfig`]; process-level settings (where the
//! manual layout cache is stored, which layout mode to start in) are read from
//! the environment by [`EngineConfig::from_env`].

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::graph::LayoutMode;

/// Environment variable naming the layout cache file.
pub const LAYOUT_FILE_ENV: &str = "KG_NAV_LAYOUT_FILE";
/// Environment variable selecting the initial layout mode (`auto` | `arrange`).
pub const LAYOUT_MODE_ENV: &str = "KG_NAV_LAYOUT_MODE";

const DEFAULT_LAYOUT_FILE: &str = "kg-nav-layouts.json";

/// Layout configuration constants
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Node width in layered mode (all nodes share it)
    pub node_width: f32,
    /// Node height in layered mode
    pub node_height: f32,
    /// Horizontal gap between nodes in the same rank
    pub node_sep: f32,
    /// Vertical gap between ranks
    pub rank_sep: f32,
    /// Margin around the whole drawing
    pub margin: f32,
    /// Width of the single column in stacked mode
    pub column_width: f32,
    /// Height of a layer header row in stacked mode
    pub header_height: f32,
    /// Height of a card row in stacked mode
    pub card_height: f32,
    /// Extra gap inserted before a header that starts a new rank
    pub rank_gap: f32,
    /// Distance between a junction node and the target it feeds
    pub junction_margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 160.0,
            node_height: 50.0,
            node_sep: 60.0,
            rank_sep: 100.0,
            margin: 40.0,
            column_width: 280.0,
            header_height: 36.0,
            card_height: 56.0,
            rank_gap: 28.0,
            junction_margin: 30.0,
        }
    }
}

/// Process-level engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    /// File backing the manual layout cache
    pub layout_file: PathBuf,
    /// Layout mode the session starts in
    pub initial_layout_mode: LayoutMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            layout_file: PathBuf::from(DEFAULT_LAYOUT_FILE),
            initial_layout_mode: LayoutMode::Auto,
        }
    }
}

impl EngineConfig {
    /// Build configuration from `KG_NAV_*` environment variables.
    ///
    /// Unset variables keep their defaults. Callers that want `.env` support
    /// load it (e.g. with `dotenvy`) before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(LAYOUT_FILE_ENV).filter(|p| !p.trim().is_empty()) {
            config.layout_file = PathBuf::from(path);
        }

        if let Some(raw) = lookup(LAYOUT_MODE_ENV) {
            config.initial_layout_mode =
                LayoutMode::parse(&raw).ok_or(ConfigError::InvalidValue {
                    key: LAYOUT_MODE_ENV,
                    value: raw,
                })?;
        }

        Ok(config)
    }
}
