//! Plain-data snapshots of graphs
//!
//! Nodes are stored through [`Node::synth`] and edges by the contexts of
//! their endpoints, so a snapshot does not depend on arena indices.

use crate::dependency::{Behavior, Relationship};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::{Node, NodeContext};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDependency {
    pub from: NodeContext,
    pub to: NodeContext,
    #[serde(default)]
    pub behaviors: Vec<Behavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Relationship>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub dependencies: Vec<SerializedDependency>,
}

/// Snapshot `graph`
pub fn serialize_graph<N: Node>(graph: &Graph<N>) -> Result<SerializedGraph> {
    let nodes = graph
        .nodes()
        .map(|(_, node)| node.synth())
        .collect::<Result<Vec<_>>>()?;

    let mut dependencies = Vec::new();
    for (_, dep) in graph.edges() {
        let (Some(from), Some(to)) = (graph.context_of(dep.from()), graph.context_of(dep.to()))
        else {
            continue;
        };
        dependencies.push(SerializedDependency {
            from: from.clone(),
            to: to.clone(),
            behaviors: dep.behaviors().to_vec(),
            relationship: dep.relationship().cloned(),
        });
    }

    Ok(SerializedGraph {
        nodes,
        dependencies,
    })
}

/// Rebuild a graph from a snapshot produced by [`serialize_graph`]
pub fn deserialize_graph<N: Node>(snapshot: SerializedGraph) -> Result<Graph<N>> {
    let mut graph = Graph::new();
    for value in snapshot.nodes {
        graph.add_node(N::un_synth(value)?)?;
    }

    for serialized in snapshot.dependencies {
        let from = graph.require(&serialized.from)?;
        let to = graph.require(&serialized.to)?;
        let edge = graph.add_dependency(from, to)?;
        let dep = graph
            .edge_mut(edge)
            .ok_or_else(|| Error::NodeNotFound(serialized.from.to_string()))?;
        for behavior in serialized.behaviors {
            dep.push_behavior(behavior);
        }
        dep.set_relationship(serialized.relationship);
    }
    Ok(graph)
}

impl<N: Node> Serialize for Graph<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_graph(self)
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, N: Node> Deserialize<'de> for Graph<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let snapshot = SerializedGraph::deserialize(deserializer)?;
        deserialize_graph(snapshot).map_err(D::Error::custom)
    }
}
