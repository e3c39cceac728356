//! kg-nav command line interface
//!
//! Replays navigation against a mermaid graph file and prints the resulting
//! scene, and inspects the manual layout cache.
//!
//! # Usage
//!
//! ```bash
//! # Full graph
//! kg-nav show --graph knowledge_graph.mermaid
//!
//! # Drill into NB, then its "priors" subtopic, print as JSON
//! kg-nav show --graph knowledge_graph.mermaid --cards cards.json \
//!     --click NB --subtopic priors --json
//!
//! # Layout cache
//! kg-nav scopes
//! kg-nav reset "tree:NB"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use kg_nav::{
    EngineConfig, FileStorage, InMemoryProvider, LayoutMode, LayoutPersistenceStore,
    NavigatorSession, Scene, SceneNodeKind, ScopeKey, UiEvent,
};

#[derive(Parser)]
#[command(name = "kg-nav")]
#[command(version)]
#[command(about = "Navigate and lay out a knowledge graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Layout cache file (overrides KG_NAV_LAYOUT_FILE)
    #[arg(long, global = true)]
    layout_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay clicks against a graph and print the scene
    Show {
        /// Mermaid graph source
        #[arg(long)]
        graph: PathBuf,

        /// JSON array of cards
        #[arg(long)]
        cards: Option<PathBuf>,

        /// Node ids to click, in order
        #[arg(long = "click")]
        clicks: Vec<String>,

        /// Subtopic of the selected concept to open after the clicks
        #[arg(long)]
        subtopic: Option<String>,

        /// Honour stored manual positions
        #[arg(long)]
        arrange: bool,

        /// Print the scene as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored layout scopes
    Scopes,

    /// Clear one layout scope
    Reset {
        /// Scope key, e.g. "full" or "tree:NB>PROB"
        scope: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = EngineConfig::from_env().context("Invalid kg-nav environment")?;
    if let Some(path) = cli.layout_file {
        config.layout_file = path;
    }

    match cli.command {
        Commands::Show {
            graph,
            cards,
            clicks,
            subtopic,
            arrange,
            json,
        } => {
            let provider = InMemoryProvider::from_files(&graph, cards.as_deref())
                .with_context(|| format!("Failed to load {}", graph.display()))?;
            if arrange {
                config.initial_layout_mode = LayoutMode::Arrange;
            }
            let scene = replay(provider, &config, &clicks, subtopic.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&scene)?);
            } else {
                print_scene(&scene);
            }
        }
        Commands::Scopes => {
            let store = open_store(&config);
            for (scope, count) in store.scopes() {
                println!("{:<40} {} nodes", scope, count);
            }
        }
        Commands::Reset { scope } => {
            let mut store = open_store(&config);
            let key = ScopeKey::from(scope);
            if store.clear_scope(&key) {
                println!("Cleared {}", key);
            } else {
                println!("No stored layout for {}", key);
            }
        }
    }

    Ok(())
}

fn open_store(config: &EngineConfig) -> LayoutPersistenceStore {
    info!("Layout cache: {}", config.layout_file.display());
    LayoutPersistenceStore::load(FileStorage::new(&config.layout_file))
}

async fn replay(
    provider: InMemoryProvider,
    config: &EngineConfig,
    clicks: &[String],
    subtopic: Option<&str>,
) -> Result<Scene> {
    let mut session = NavigatorSession::new(Arc::new(provider), open_store(config), config);
    session.start();
    session.settle().await;

    for id in clicks {
        match session.handle(UiEvent::NodeClicked { id: id.clone() }) {
            Ok(_) => session.settle().await,
            Err(fault) if fault.is_benign() => warn!("Skipping click on {}: {}", id, fault),
            Err(fault) => {
                return Err(fault).with_context(|| format!("Click on {} rejected", id));
            }
        }
    }

    if let Some(subtopic_id) = subtopic {
        session
            .handle(UiEvent::SubtopicPicked {
                subtopic_id: subtopic_id.to_string(),
            })
            .with_context(|| format!("Cannot open subtopic {}", subtopic_id))?;
        session.settle().await;
    }

    if let Some(err) = &session.state().errors().graph {
        anyhow::bail!("Graph fetch failed: {}", err);
    }
    Ok(session.scene().clone())
}

fn print_scene(scene: &Scene) {
    let mut trail = vec!["Full Graph".to_string()];
    trail.extend(scene.breadcrumbs.iter().cloned());
    println!("{}", trail.join(" > ").bold());
    println!(
        "mode: {}  layout: {}  scope: {}",
        scene.mode.as_str(),
        scene.layout_mode.as_str(),
        scene.scope
    );
    println!();

    for node in &scene.nodes {
        let id = format!("{:<28}", node.id);
        let (marker, id) = match node.kind {
            SceneNodeKind::Junction => continue,
            SceneNodeKind::LayerHeader => ('#', id.cyan().bold()),
            SceneNodeKind::Card if node.selected => ('*', id.green().bold()),
            SceneNodeKind::Card if node.clickable => ('>', id.normal()),
            SceneNodeKind::Card => (' ', id.dimmed()),
        };
        let pin = if node.pinned { " (pinned)" } else { "" };
        println!(
            "{} {} ({:>7.1}, {:>7.1}) {}{}",
            marker, id, node.x, node.y, node.label, pin
        );
    }

    let junctions = scene.junctions().count();
    println!();
    println!("{} edges, {} junctions", scene.edges.len(), junctions);
}
