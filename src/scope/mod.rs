//! Scope resolution - what a node may reference at its point in the flow
//!
//! One resolution runs Accessor → Enumerate → Order → Materialize → Flatten
//! over a fresh graph snapshot and returns a plain value.

pub mod paths;
mod order;
pub mod materialize;
pub mod resolver;

use crate::arg::ArgDef;
use crate::arg_map::ArgMap;
use crate::node::{NodeId, NodeType};
use serde::Serialize;

pub use paths::{find_predecessors, Predecessor};
pub use resolver::{available_variables, calculate_node_previous_args, Resolver, ResolverBuilder};

/// One upstream node and the arguments it exposes to the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousNode {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub output_args: Vec<ArgDef>,
    /// Reachable only through failure handler edges
    pub via_exception: bool,
}

/// Resolution result for one target node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePreviousArgs {
    /// Visible upstream nodes, dependency order
    pub previous_nodes: Vec<PreviousNode>,
    /// Loop body outputs aggregated into arrays, when the target is a Loop
    pub inner_previous_nodes: Vec<PreviousNode>,
    pub arg_map: ArgMap,
}

impl NodePreviousArgs {
    pub fn is_empty(&self) -> bool {
        self.previous_nodes.is_empty() && self.inner_previous_nodes.is_empty()
    }

    pub fn previous_ids(&self) -> Vec<&str> {
        self.previous_nodes.iter().map(|n| n.id.as_str()).collect()
    }
}

/// A referenceable variable as shown in a reference picker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableVariable {
    pub key: String,
    pub name: String,
    pub data_type: String,
    pub path: String,
}

/// Variables of one upstream node, grouped for a reference picker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableNode {
    pub node_id: NodeId,
    pub node_name: String,
    pub node_type: NodeType,
    pub variables: Vec<AvailableVariable>,
}
