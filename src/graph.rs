//! Workflow Graph - snapshot and id-indexed accessor
//!
//! [`WorkflowGraph`] is the editor's snapshot as deserialized from JSON.
//! [`GraphIndex`] borrows a snapshot and lays it out as an arena: nodes are
//! addressed by position, edges are plain position lists. Nodes nested in a
//! Loop's `innerNodes` are indexed alongside top-level nodes.

use crate::arg::{nullable, ArgDef};
use crate::edge::{Edge, EdgeKind};
use crate::node::{Node, NodeId, NodeType};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, trace};

/// Read-only snapshot of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    #[serde(default, alias = "nodeList", deserialize_with = "nullable")]
    pub nodes: Vec<Node>,
    /// Canvas edges, supplementing `nextNodeIds`
    #[serde(
        default,
        alias = "edgeList",
        deserialize_with = "nullable",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub edges: Vec<Edge>,
    /// Extra system variables exposed by Start after the built-in ones
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub system_variables: Vec<ArgDef>,
}

impl WorkflowGraph {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    pub fn with_edges(mut self, edges: Vec<Edge>) -> Self {
        self.edges = edges;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build the id index over this snapshot
    pub fn index(&self) -> GraphIndex<'_> {
        GraphIndex::new(self)
    }
}

/// Id-indexed view of a [`WorkflowGraph`].
///
/// Ids that do not resolve to a node are dropped while building, so every
/// stored edge points at an indexed node.
#[derive(Debug)]
pub struct GraphIndex<'a> {
    graph: &'a WorkflowGraph,
    /// All nodes in graph order, body nodes right after their Loop
    nodes: Vec<&'a Node>,
    by_id: HashMap<&'a NodeId, usize>,
    /// Enclosing Loop of each node
    parent_loop: Vec<Option<usize>>,
    out_edges: Vec<Vec<(usize, EdgeKind)>>,
    in_edges: Vec<Vec<(usize, EdgeKind)>>,
}

impl<'a> GraphIndex<'a> {
    pub fn new(graph: &'a WorkflowGraph) -> Self {
        let mut nodes = Vec::new();
        let mut by_id = HashMap::new();
        let mut nested_in = Vec::new();
        for node in &graph.nodes {
            collect_node(node, None, &mut nodes, &mut by_id, &mut nested_in);
        }

        let parent_loop: Vec<Option<usize>> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                node.loop_node_id
                    .as_ref()
                    .and_then(|id| by_id.get(id).copied())
                    .filter(|&l| l != i && nodes[l].is_loop())
                    .or(nested_in[i])
            })
            .collect();

        let mut index = Self {
            graph,
            out_edges: vec![Vec::new(); nodes.len()],
            in_edges: vec![Vec::new(); nodes.len()],
            nodes,
            by_id,
            parent_loop,
        };
        index.link();

        debug!(
            "Indexed {} nodes ({} top-level, {} supplemental edges)",
            index.nodes.len(),
            graph.nodes.len(),
            graph.edges.len()
        );
        index
    }

    fn link(&mut self) {
        let graph = self.graph;
        let mut supplemental: HashMap<usize, Vec<&NodeId>> = HashMap::new();
        for edge in &graph.edges {
            match self.by_id.get(&edge.source) {
                Some(&source) => supplemental.entry(source).or_default().push(&edge.target),
                None => trace!("Dropping edge from unknown node {}", edge.source),
            }
        }

        let mut out_edges = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            // Body nodes jump back to their Loop, declared or by nesting
            let declared_loop = node.loop_node_id.as_ref();
            let enclosing = self.parent_loop[i];
            let mut targets: Vec<(usize, EdgeKind)> = Vec::new();
            let mut push = |id: &NodeId, kind: EdgeKind| {
                let target = self.by_id.get(id).copied();
                if Some(id) == declared_loop || (target.is_some() && target == enclosing) {
                    return;
                }
                match target {
                    Some(t) if t != i && !targets.iter().any(|(x, _)| *x == t) => {
                        targets.push((t, kind))
                    }
                    Some(_) => {}
                    None => trace!("Dead end {} -> {}", node.id, id),
                }
            };

            for id in &node.next_node_ids {
                push(id, EdgeKind::Next);
            }
            for id in node.branch_successors() {
                push(id, EdgeKind::Branch);
            }
            for id in node.exception_successors() {
                push(id, EdgeKind::Exception);
            }
            for id in supplemental.get(&i).into_iter().flatten() {
                push(id, EdgeKind::Supplemental);
            }
            out_edges.push(targets);
        }

        // Loop -> body entry edges
        for l in 0..self.nodes.len() {
            if !self.nodes[l].is_loop() {
                continue;
            }
            for entry in self.body_entries(l, &out_edges) {
                if !out_edges[l].iter().any(|(t, _)| *t == entry) {
                    out_edges[l].push((entry, EdgeKind::LoopBody));
                }
            }
        }

        for (source, targets) in out_edges.iter().enumerate() {
            for &(target, kind) in targets {
                self.in_edges[target].push((source, kind));
            }
        }
        self.out_edges = out_edges;
    }

    fn body_entries(&self, l: usize, out_edges: &[Vec<(usize, EdgeKind)>]) -> Vec<usize> {
        let body: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.parent_loop[i] == Some(l))
            .collect();

        let start = self.nodes[l]
            .inner_start_node_id
            .as_ref()
            .and_then(|id| self.by_id.get(id).copied())
            .filter(|s| body.contains(s));
        if let Some(start) = start {
            return vec![start];
        }

        let reached: HashSet<usize> = body
            .iter()
            .flat_map(|&b| out_edges[b].iter().map(|(t, _)| *t))
            .collect();
        body.into_iter().filter(|b| !reached.contains(b)).collect()
    }

    pub fn graph(&self) -> &'a WorkflowGraph {
        self.graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&'a Node> {
        self.position(id).map(|i| self.nodes[i])
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All indexed nodes in graph order
    pub fn nodes(&self) -> impl Iterator<Item = &'a Node> + '_ {
        self.nodes.iter().copied()
    }

    /// Distinct successors of a node with the kind of edge that reaches them
    pub fn successors(&self, id: &NodeId) -> Vec<Edge> {
        self.edges_of(id, &self.out_edges, false)
    }

    pub fn predecessors(&self, id: &NodeId) -> Vec<Edge> {
        self.edges_of(id, &self.in_edges, true)
    }

    fn edges_of(&self, id: &NodeId, table: &[Vec<(usize, EdgeKind)>], incoming: bool) -> Vec<Edge> {
        let Some(i) = self.position(id) else {
            return Vec::new();
        };
        table[i]
            .iter()
            .map(|&(other, kind)| {
                let (source, target) = if incoming { (other, i) } else { (i, other) };
                Edge::new(self.nodes[source].id.clone(), self.nodes[target].id.clone(), kind)
            })
            .collect()
    }

    /// Nodes with no incoming edge, plus every Start node, in graph order
    pub fn roots(&self) -> Vec<&'a NodeId> {
        self.root_positions()
            .into_iter()
            .map(|i| &self.nodes[i].id)
            .collect()
    }

    /// Enclosing Loop ids, innermost first
    pub fn loop_chain(&self, id: &NodeId) -> Vec<&'a NodeId> {
        self.position(id)
            .map(|i| {
                self.loop_chain_at(i)
                    .into_iter()
                    .map(|l| &self.nodes[l].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The Loop whose body contains this node
    pub fn enclosing_loop(&self, id: &NodeId) -> Option<&'a Node> {
        let i = self.position(id)?;
        self.parent_loop[i].map(|l| self.nodes[l])
    }

    /// Direct body nodes of a Loop, in graph order
    pub fn body_of(&self, loop_id: &NodeId) -> Vec<&'a Node> {
        let Some(l) = self.position(loop_id) else {
            return Vec::new();
        };
        (0..self.nodes.len())
            .filter(|&i| self.parent_loop[i] == Some(l))
            .map(|i| self.nodes[i])
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        let edges_by_kind: Vec<(EdgeKind, usize)> = EdgeKind::all()
            .iter()
            .map(|&kind| {
                let count = self
                    .out_edges
                    .iter()
                    .flatten()
                    .filter(|(_, k)| *k == kind)
                    .count();
                (kind, count)
            })
            .collect();

        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.out_edges.iter().map(|v| v.len()).sum(),
            edges_by_kind,
            loops: self.nodes.iter().filter(|n| n.is_loop()).count(),
            nested_nodes: self.parent_loop.iter().filter(|p| p.is_some()).count(),
            roots: self.root_positions().len(),
        }
    }

    pub(crate) fn position(&self, id: &NodeId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn node_at(&self, i: usize) -> &'a Node {
        self.nodes[i]
    }

    pub(crate) fn out_edges_at(&self, i: usize) -> &[(usize, EdgeKind)] {
        &self.out_edges[i]
    }

    pub(crate) fn in_edges_at(&self, i: usize) -> &[(usize, EdgeKind)] {
        &self.in_edges[i]
    }

    pub(crate) fn parent_loop_at(&self, i: usize) -> Option<usize> {
        self.parent_loop[i]
    }

    pub(crate) fn root_positions(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.in_edges[i].is_empty() || self.nodes[i].node_type == NodeType::Start)
            .collect()
    }

    pub(crate) fn loop_chain_at(&self, i: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([i]);
        let mut current = self.parent_loop[i];
        while let Some(l) = current {
            if !seen.insert(l) {
                break;
            }
            chain.push(l);
            current = self.parent_loop[l];
        }
        chain
    }
}

fn collect_node<'a>(
    node: &'a Node,
    parent: Option<usize>,
    nodes: &mut Vec<&'a Node>,
    by_id: &mut HashMap<&'a NodeId, usize>,
    nested_in: &mut Vec<Option<usize>>,
) {
    if by_id.contains_key(&node.id) {
        debug!("Ignoring duplicate node id {}", node.id);
        return;
    }
    let position = nodes.len();
    by_id.insert(&node.id, position);
    nodes.push(node);
    nested_in.push(parent);

    for body in node.body_nodes() {
        collect_node(body, Some(position), nodes, by_id, nested_in);
    }
}

/// Statistics about a workflow graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub edges_by_kind: Vec<(EdgeKind, usize)>,
    pub loops: usize,
    pub nested_nodes: usize,
    pub roots: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Workflow Graph Statistics:")?;
        writeln!(f, "  Nodes: {} (in loop bodies: {})", self.total_nodes, self.nested_nodes)?;
        writeln!(f, "  Loops: {}", self.loops)?;
        writeln!(f, "  Roots: {}", self.roots)?;
        writeln!(f, "  Edges: {}", self.total_edges)?;
        for (kind, count) in &self.edges_by_kind {
            writeln!(f, "    {}: {}", kind, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ExceptionHandleConfig;
    use crate::test_support::*;

    fn ids(edges: &[Edge]) -> Vec<&str> {
        edges.iter().map(|e| e.target.as_str()).collect()
    }

    #[test]
    fn test_successor_order_and_kinds() {
        let mut llm = node("2", NodeType::Llm).with_next(["3", "3", "99"]);
        llm.node_config.exception_handle_config = Some(ExceptionHandleConfig::execute_flow(["4"]));
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            llm,
            node("3", NodeType::Code),
            node("4", NodeType::Code),
            node("5", NodeType::End),
        ])
        .with_edges(vec![Edge::new("2", "5", EdgeKind::Supplemental)]);
        let index = graph.index();

        let succ = index.successors(&"2".into());
        assert_eq!(ids(&succ), vec!["3", "4", "5"]);
        assert_eq!(succ[1].kind, EdgeKind::Exception);
        assert_eq!(succ[2].kind, EdgeKind::Supplemental);
        assert!(index.successors(&"99".into()).is_empty());
    }

    #[test]
    fn test_roots_include_start() {
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            node("2", NodeType::Code).with_next(["1"]),
            node("3", NodeType::Code),
        ]);
        let index = graph.index();
        let roots: Vec<_> = index.roots().into_iter().map(NodeId::as_str).collect();
        assert_eq!(roots, vec!["1", "3"]);
    }

    #[test]
    fn test_loop_body_entries_and_back_edge() {
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            node("2", NodeType::Loop).with_next(["5"]),
            node("3", NodeType::Code).in_loop("2").with_next(["4"]),
            node("4", NodeType::Code).in_loop("2").with_next(["2"]),
            node("5", NodeType::End),
        ]);
        let index = graph.index();

        let succ = index.successors(&"2".into());
        assert_eq!(ids(&succ), vec!["5", "3"]);
        assert_eq!(succ[1].kind, EdgeKind::LoopBody);
        assert!(index.successors(&"4".into()).is_empty());
        assert_eq!(index.body_of(&"2".into()).len(), 2);
    }

    #[test]
    fn test_inner_nodes_are_indexed() {
        let mut body_start = node("11", NodeType::Code).with_next(["12"]);
        body_start.loop_node_id = None;
        let mut looped = node("10", NodeType::Loop);
        looped.inner_nodes = vec![body_start, node("12", NodeType::Code)];
        looped.inner_start_node_id = Some("11".into());
        let graph = WorkflowGraph::new(vec![start("1").with_next(["10"]), looped]);
        let index = graph.index();

        assert_eq!(index.len(), 4);
        let chain: Vec<_> = index.loop_chain(&"12".into()).into_iter().map(NodeId::as_str).collect();
        assert_eq!(chain, vec!["10"]);
        assert_eq!(ids(&index.successors(&"10".into())), vec!["11"]);
    }

    #[test]
    fn test_inner_node_back_edge_dropped() {
        let mut body_start = node("11", NodeType::Code).with_next(["12", "10"]);
        body_start.loop_node_id = None;
        let mut body_end = node("12", NodeType::Code).with_next(["10"]);
        body_end.loop_node_id = None;
        let mut looped = node("10", NodeType::Loop).with_next(["13"]);
        looped.inner_nodes = vec![body_start, body_end];
        looped.inner_start_node_id = Some("11".into());
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["10"]),
            looped,
            node("13", NodeType::End),
        ]);
        let index = graph.index();

        assert_eq!(ids(&index.successors(&"11".into())), vec!["12"]);
        assert!(index.successors(&"12".into()).is_empty());
        let preds = index.predecessors(&"10".into());
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].source.as_str(), "1");
    }

    #[test]
    fn test_nested_loop_chain_innermost_first() {
        let graph = WorkflowGraph::new(vec![
            node("1", NodeType::Loop),
            node("2", NodeType::Loop).in_loop("1"),
            node("3", NodeType::Code).in_loop("2"),
        ]);
        let index = graph.index();
        let chain: Vec<_> = index.loop_chain(&"3".into()).into_iter().map(NodeId::as_str).collect();
        assert_eq!(chain, vec!["2", "1"]);
    }

    #[test]
    fn test_loop_chain_terminates_on_cycle() {
        let graph = WorkflowGraph::new(vec![
            node("1", NodeType::Loop).in_loop("2"),
            node("2", NodeType::Loop).in_loop("1"),
        ]);
        let index = graph.index();
        assert_eq!(index.loop_chain(&"1".into()).len(), 1);
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let graph = WorkflowGraph::new(vec![
            node("1", NodeType::Start),
            node("1", NodeType::End),
        ]);
        let index = graph.index();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&"1".into()).unwrap().node_type, NodeType::Start);
    }

    #[test]
    fn test_snapshot_aliases() {
        let graph = WorkflowGraph::from_json(
            r#"{
                "nodeList": [
                    { "id": 1, "name": "Start", "type": "Start", "nextNodeIds": [2] },
                    { "id": 2, "name": "End", "type": "End" }
                ],
                "edgeList": [{ "source": "1", "target": "2" }]
            }"#,
        )
        .unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.index().stats().total_edges, 1);
    }

    #[test]
    fn test_snapshot_with_unknown_data_type_loads() {
        let graph = WorkflowGraph::from_json(
            r#"{
                "nodes": [
                    { "id": 1, "name": "Start", "type": "Start", "nextNodeIds": [2],
                      "nodeConfig": { "outputArgs": [
                          { "name": "scan", "dataType": "File_Hologram" },
                          { "name": "query", "dataType": "String" }
                      ] } },
                    { "id": 2, "name": "End", "type": "End" }
                ]
            }"#,
        )
        .unwrap();
        let outputs = &graph.nodes[0].node_config.output_args;
        assert_eq!(outputs[0].data_type, None);
        assert_eq!(outputs[1].data_type, Some(crate::arg::DataType::string()));
    }
}
