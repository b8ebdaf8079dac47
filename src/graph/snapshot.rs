//! Lossless serialized form of a concept graph

use super::edge::ConceptEdge;
use super::engine::ConceptGraph;
use super::rank::ImportanceRanking;
use super::{GraphError, GraphState};
use crate::config::GraphConfig;
use crate::model::Concept;
use serde::{Deserialize, Serialize};

/// Nodes, edges and ranking of a graph at one point in its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub state: GraphState,
    pub nodes: Vec<Concept>,
    pub edges: Vec<ConceptEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<ImportanceRanking>,
}

impl ConceptGraph {
    /// Current nodes (id order), edges (insertion order) and ranking
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            state: self.state(),
            nodes: self.nodes().into_iter().cloned().collect(),
            edges: self.edges().to_vec(),
            ranking: self.ranking().cloned(),
        }
    }
}

impl GraphSnapshot {
    pub fn to_json(&self, pretty: bool) -> Result<String, GraphError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild a graph in the recorded state.
    ///
    /// Edges are loaded without the incremental cycle check; snapshots
    /// recorded as validated are re-validated, so a corrupted hierarchy is
    /// reported as `CyclicHierarchy` or `LevelViolation`.
    pub fn into_graph(self, config: GraphConfig) -> Result<ConceptGraph, GraphError> {
        let mut graph = ConceptGraph::new(config);
        for node in self.nodes {
            graph.add_node(node)?;
        }
        for edge in self.edges {
            graph.load_edge(edge)?;
        }
        match self.state {
            GraphState::Empty | GraphState::Populating => {
                if graph.node_count() > 0 || self.state == GraphState::Populating {
                    graph.force_state(GraphState::Populating);
                }
                graph.set_ranking(self.ranking);
            }
            GraphState::Validated => {
                graph.validate()?;
            }
            GraphState::Queryable => {
                graph.validate()?;
                graph.publish()?;
            }
        }
        Ok(graph)
    }
}
