//! Reference Validator - checks tokens against a resolved scope
//!
//! `is_valid_reference` and `get_referenced_arg` are exact lookups on the arg
//! map. Dangling checks additionally walk nested `subArgs`, so a token such as
//! `2.rows_item.cells` is accepted when `cells` is a field of `2.rows_item`.

use crate::arg::ArgDef;
use crate::arg_map::ArgMap;
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeId};
use crate::references::{scan_references, FieldReference};
use crate::scope::Resolver;
use serde::Serialize;
use tracing::debug;

/// Whether `token` names an argument in scope
pub fn is_valid_reference(token: &str, arg_map: &ArgMap) -> bool {
    arg_map.contains(token)
}

pub fn get_referenced_arg<'a>(token: &str, arg_map: &'a ArgMap) -> Option<&'a ArgDef> {
    arg_map.get(token)
}

/// References carried by `node` that do not resolve in `arg_map`
pub fn dangling_references(node: &Node, arg_map: &ArgMap) -> Vec<FieldReference> {
    scan_references(node)
        .into_iter()
        .filter(|r| arg_map.resolve(&r.token).is_none())
        .collect()
}

/// Dangling references of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIssues {
    pub node_id: NodeId,
    pub node_name: String,
    pub dangling: Vec<FieldReference>,
}

/// Dangling references of every node with the default resolver
pub fn check_graph(graph: &WorkflowGraph) -> Vec<NodeIssues> {
    check_graph_with(&Resolver::new(), graph)
}

/// Dangling references of every node, each node resolved from scratch
pub fn check_graph_with(resolver: &Resolver, graph: &WorkflowGraph) -> Vec<NodeIssues> {
    let issues: Vec<NodeIssues> = graph
        .index()
        .nodes()
        .filter_map(|node| {
            let scope = resolver.resolve(&node.id, graph);
            let dangling = dangling_references(node, &scope.arg_map);
            (!dangling.is_empty()).then(|| NodeIssues {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                dangling,
            })
        })
        .collect();

    debug!("Checked {} nodes, {} with dangling references", graph.nodes.len(), issues.len());
    issues
}
