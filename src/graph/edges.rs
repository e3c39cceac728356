//! Edge routing
//!
//! Turns raw graph edges into render-ready edges. Outside the full graph, a
//! target with several incoming edges gets one invisible junction node: every
//! source feeds the junction without an arrowhead and a single trunk edge
//! carries the arrow into the target.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::layout::{NodePlacement, ViewMode};
use super::types::GraphEdge;

/// Prefix of synthetic junction node ids.
pub const JUNCTION_PREFIX: &str = "junction:";

/// Junction id for a target; stable so a render pass can find and reuse it.
pub fn junction_id(target: &str) -> String {
    format!("{}{}", JUNCTION_PREFIX, target)
}

pub fn is_junction_id(id: &str) -> bool {
    id.starts_with(JUNCTION_PREFIX)
}

/// Role of a routed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRole {
    /// Source straight to target
    Direct,
    /// Source into a junction
    Feeder,
    /// Junction into the shared target
    Trunk,
}

/// A render-ready edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation: String,
    pub arrowhead: bool,
    pub role: EdgeRole,
}

/// Invisible, zero-size, non-interactive merge point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionNode {
    pub id: String,
    /// Target this junction feeds
    pub target: String,
    pub x: f32,
    pub y: f32,
}

/// Output of one routing pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutedEdges {
    pub edges: Vec<RoutedEdge>,
    pub junctions: Vec<JunctionNode>,
}

impl RoutedEdges {
    pub fn junction_for(&self, target: &str) -> Option<&JunctionNode> {
        self.junctions.iter().find(|j| j.target == target)
    }
}

/// Converts raw edges into routed edges for the current view mode
#[derive(Debug, Clone)]
pub struct EdgeRouter {
    /// Vertical distance between a junction and its target's box
    junction_margin: f32,
}

impl Default for EdgeRouter {
    fn default() -> Self {
        Self {
            junction_margin: 30.0,
        }
    }
}

impl EdgeRouter {
    pub fn new(junction_margin: f32) -> Self {
        Self { junction_margin }
    }

    pub fn route(
        &self,
        edges: &[GraphEdge],
        placements: &[NodePlacement],
        mode: ViewMode,
    ) -> RoutedEdges {
        if mode == ViewMode::Full {
            return RoutedEdges {
                edges: edges
                    .iter()
                    .enumerate()
                    .map(|(i, e)| direct_edge(i, e))
                    .collect(),
                junctions: Vec::new(),
            };
        }

        let by_id: HashMap<&str, &NodePlacement> =
            placements.iter().map(|p| (p.id.as_str(), p)).collect();

        // Group incoming edges by target, keeping first-seen target order
        let mut target_order: Vec<&str> = Vec::new();
        let mut incoming: HashMap<&str, Vec<(usize, &GraphEdge)>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            let group = incoming.entry(edge.target.as_str()).or_default();
            if group.is_empty() {
                target_order.push(edge.target.as_str());
            }
            group.push((i, edge));
        }

        let mut routed = RoutedEdges::default();
        for target in target_order {
            let group = &incoming[target];
            let target_box = by_id.get(target).copied();
            let sources: Option<Vec<&NodePlacement>> = group
                .iter()
                .map(|(_, e)| by_id.get(e.source.as_str()).copied())
                .collect();

            match (target_box, sources) {
                (Some(target_box), Some(sources)) if group.len() >= 2 => {
                    let junction = self.place_junction(target_box, &sources);
                    for (i, edge) in group {
                        routed.edges.push(RoutedEdge {
                            id: format!("e-{}", i),
                            source: edge.source.clone(),
                            target: junction.id.clone(),
                            relation: edge.relation.clone(),
                            arrowhead: false,
                            role: EdgeRole::Feeder,
                        });
                    }
                    routed.edges.push(RoutedEdge {
                        id: format!("{}-trunk", junction.id),
                        source: junction.id.clone(),
                        target: target.to_string(),
                        relation: group[0].1.relation.clone(),
                        arrowhead: true,
                        role: EdgeRole::Trunk,
                    });
                    routed.junctions.push(junction);
                }
                _ => {
                    routed
                        .edges
                        .extend(group.iter().map(|(i, e)| direct_edge(*i, e)));
                }
            }
        }

        routed
    }

    /// x: mean of source centers clamped to their span.
    /// y: above the target when most sources are above it, else below.
    fn place_junction(&self, target: &NodePlacement, sources: &[&NodePlacement]) -> JunctionNode {
        let centers: Vec<(f32, f32)> = sources.iter().map(|p| p.center()).collect();
        let (min_x, max_x) = centers
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &(x, _)| {
                (lo.min(x), hi.max(x))
            });
        let mean_x = centers.iter().map(|&(x, _)| x).sum::<f32>() / centers.len() as f32;

        let (_, target_cy) = target.center();
        let above = centers.iter().filter(|&&(_, y)| y < target_cy).count();
        let below = centers.iter().filter(|&&(_, y)| y > target_cy).count();

        // Ties go above
        let y = if above >= below {
            target.y - self.junction_margin
        } else {
            target.y + target.height + self.junction_margin
        };

        JunctionNode {
            id: junction_id(&target.id),
            target: target.id.clone(),
            x: mean_x.clamp(min_x, max_x),
            y,
        }
    }
}

fn direct_edge(index: usize, edge: &GraphEdge) -> RoutedEdge {
    RoutedEdge {
        id: format!("e-{}", index),
        source: edge.source.clone(),
        target: edge.target.clone(),
        relation: edge.relation.clone(),
        arrowhead: true,
        role: EdgeRole::Direct,
    }
}
