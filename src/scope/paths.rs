//! Path Enumerator - forward walk from the roots to a target node
//!
//! Every root→target route is walked once in depth-first order:
//! 1. Keep only nodes that can reach the target (reverse reachability)
//! 2. Walk forward from each root, never re-entering a node on the current path
//! 3. Record each node at its first discovery, never expanding the target
//!
//! A node reached again along a later route adds nothing new, so it is not
//! expanded twice. The walk is linear in the size of the graph and total over
//! cyclic graphs.

use crate::edge::EdgeKind;
use crate::graph::GraphIndex;
use crate::node::{Node, NodeId};
use std::collections::VecDeque;
use tracing::trace;

/// A node from which the target can be reached.
#[derive(Debug, Clone, Copy)]
pub struct Predecessor<'a> {
    pub node: &'a Node,
    /// Only reachable through a failure handler edge
    pub via_exception: bool,
}

/// Discovered predecessors of `target`, first-discovery order.
pub fn find_predecessors<'a>(index: &GraphIndex<'a>, target: &NodeId) -> Vec<Predecessor<'a>> {
    let Some(t) = index.position(target) else {
        return Vec::new();
    };
    discover(index, t)
        .into_iter()
        .map(|(p, via_exception)| Predecessor {
            node: index.node_at(p),
            via_exception,
        })
        .collect()
}

/// Positions of the predecessors of `t` with their via-exception flag.
pub(crate) fn discover(index: &GraphIndex<'_>, t: usize) -> Vec<(usize, bool)> {
    let roots = index.root_positions();
    if roots.contains(&t) {
        return Vec::new();
    }

    let reaches_target = reverse_reach(index, t, |_| true);
    let mut discovered = vec![false; index.len()];
    let mut on_path = vec![false; index.len()];
    let mut order = Vec::new();

    for &root in &roots {
        if !reaches_target[root] || discovered[root] {
            continue;
        }
        // (node, next edge to try)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        discovered[root] = true;
        on_path[root] = true;
        order.push(root);

        while let Some((u, next)) = stack.last_mut() {
            let u = *u;
            let edges = index.out_edges_at(u);
            if *next >= edges.len() {
                on_path[u] = false;
                stack.pop();
                continue;
            }
            let (v, kind) = edges[*next];
            *next += 1;

            if v == t || on_path[v] || discovered[v] || !reaches_target[v] {
                continue;
            }
            trace!("Discovered {} via {} edge", index.node_at(v).id, kind);
            discovered[v] = true;
            on_path[v] = true;
            order.push(v);
            stack.push((v, 0));
        }
    }

    let on_normal_route = normal_route(index, t, &roots);
    order
        .into_iter()
        .map(|p| (p, !on_normal_route[p]))
        .collect()
}

/// Whether each node lies on some root→target route made only of normal edges
fn normal_route(index: &GraphIndex<'_>, t: usize, roots: &[usize]) -> Vec<bool> {
    let reaches = reverse_reach(index, t, EdgeKind::is_normal);

    let mut reached = vec![false; index.len()];
    let mut queue: VecDeque<usize> = roots.iter().copied().collect();
    for &r in roots {
        reached[r] = true;
    }
    while let Some(u) = queue.pop_front() {
        if u == t {
            continue;
        }
        for &(v, kind) in index.out_edges_at(u) {
            if kind.is_normal() && !reached[v] {
                reached[v] = true;
                queue.push_back(v);
            }
        }
    }

    reached
        .into_iter()
        .zip(reaches)
        .map(|(from_root, to_target)| from_root && to_target)
        .collect()
}

/// Nodes that reach `t` along edges accepted by `follow`; `t` itself is excluded.
fn reverse_reach(index: &GraphIndex<'_>, t: usize, follow: impl Fn(&EdgeKind) -> bool) -> Vec<bool> {
    let mut reaches = vec![false; index.len()];
    let mut queue = VecDeque::from([t]);
    while let Some(v) = queue.pop_front() {
        for &(u, kind) in index.in_edges_at(v) {
            if u != t && follow(&kind) && !reaches[u] {
                reaches[u] = true;
                queue.push_back(u);
            }
        }
    }
    reaches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::WorkflowGraph;
    use crate::node::{ExceptionHandleConfig, NodeType};
    use crate::test_support::*;

    fn predecessor_ids(graph: &WorkflowGraph, target: &str) -> Vec<String> {
        find_predecessors(&graph.index(), &target.into())
            .into_iter()
            .map(|p| p.node.id.to_string())
            .collect()
    }

    #[test]
    fn test_diamond_first_discovery() {
        let graph = diamond();
        assert_eq!(predecessor_ids(&graph, "3"), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_target_is_root() {
        let graph = diamond();
        assert!(predecessor_ids(&graph, "1").is_empty());
    }

    #[test]
    fn test_unknown_and_unreachable_targets() {
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            node("2", NodeType::End),
            node("3", NodeType::Code).with_next(["3"]),
        ]);
        assert!(predecessor_ids(&graph, "404").is_empty());
        assert!(predecessor_ids(&graph, "3").is_empty());
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        // 1 -> 2 -> 3 -> 2, 3 -> 4 -> 1
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            node("2", NodeType::Code).with_next(["3"]),
            node("3", NodeType::Code).with_next(["2", "4"]),
            node("4", NodeType::Code).with_next(["1", "5"]),
            node("5", NodeType::End),
        ]);
        assert_eq!(predecessor_ids(&graph, "5"), vec!["1", "2", "3", "4"]);
        assert_eq!(predecessor_ids(&graph, "3"), vec!["1", "2"]);
    }

    #[test]
    fn test_target_never_in_own_result() {
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            node("2", NodeType::Code).with_next(["3"]),
            node("3", NodeType::Code).with_next(["2"]),
        ]);
        for target in ["2", "3"] {
            assert!(!predecessor_ids(&graph, target).contains(&target.to_string()));
        }
    }

    #[test]
    fn test_nodes_past_target_excluded() {
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            node("2", NodeType::Code).with_next(["3", "4"]),
            node("3", NodeType::Code),
            node("4", NodeType::Code).with_next(["3"]),
        ]);
        // 4 is a sibling branch that also reaches 3
        assert_eq!(predecessor_ids(&graph, "3"), vec!["1", "2", "4"]);
        assert_eq!(predecessor_ids(&graph, "2"), vec!["1"]);
    }

    #[test]
    fn test_exception_edges_reach_handlers() {
        // 1 -> 2 (fails to 3) -> 4; 3 -> 5
        let mut llm = node("2", NodeType::Llm).with_next(["4"]);
        llm.node_config.exception_handle_config = Some(ExceptionHandleConfig::execute_flow(["3"]));
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            llm,
            node("3", NodeType::Code).with_next(["5"]),
            node("4", NodeType::End),
            node("5", NodeType::End),
        ]);
        let index = graph.index();

        let found = find_predecessors(&index, &"5".into());
        let flags: Vec<_> = found
            .iter()
            .map(|p| (p.node.id.as_str(), p.via_exception))
            .collect();
        assert_eq!(flags, vec![("1", true), ("2", true), ("3", true)]);

        let normal = find_predecessors(&index, &"4".into());
        assert!(normal.iter().all(|p| !p.via_exception));
    }

    #[test]
    fn test_exception_flag_cleared_by_normal_route() {
        // 2 fails to 3, but also lists 3 as its next node
        let mut llm = node("2", NodeType::Llm).with_next(["3"]);
        llm.node_config.exception_handle_config = Some(ExceptionHandleConfig::execute_flow(["3"]));
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            llm,
            node("3", NodeType::End),
        ]);
        let found = find_predecessors(&graph.index(), &"3".into());
        assert!(found.iter().all(|p| !p.via_exception));
    }

    #[test]
    fn test_loop_body_reached_through_loop() {
        let graph = loop_graph();
        assert_eq!(predecessor_ids(&graph, "3"), vec!["1", "2"]);
    }
}
