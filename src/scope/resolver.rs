//! Resolver - computes the scope of a target node
//!
//! Resolution algorithm:
//! 1. Index the snapshot
//! 2. Discover predecessors of the target and order them topologically
//! 3. Drop nodes living in loop bodies the target is not inside
//! 4. Materialize each predecessor's exposed arguments in order, flattening them
//!    into the arg map as it goes so Loop inputs can see their sources
//! 5. If the target is a Loop, aggregate its body outputs and expose its own variables

use super::materialize::{aggregate, loop_variables, Materializer};
use super::{order, paths, AvailableNode, AvailableVariable, NodePreviousArgs, PreviousNode};
use crate::arg::{ArgDef, DataType};
use crate::arg_map::{token_for, ArgMap};
use crate::graph::{GraphIndex, WorkflowGraph};
use crate::node::NodeId;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Computes [`NodePreviousArgs`] for target nodes.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    system_variables: Vec<ArgDef>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// Extra system variables exposed by Start, after the built-in ones
    pub fn system_variables(&self) -> &[ArgDef] {
        &self.system_variables
    }

    pub fn resolve(&self, target: &NodeId, graph: &WorkflowGraph) -> NodePreviousArgs {
        let index = graph.index();
        let Some(t) = index.position(target) else {
            debug!("Target {} not in graph", target);
            return NodePreviousArgs::default();
        };

        let materializer = Materializer::new(
            graph
                .system_variables
                .iter()
                .chain(self.system_variables.iter())
                .cloned(),
        );
        let chain = index.loop_chain_at(t);

        let discovered = paths::discover(&index, t);
        let via_exception: HashMap<usize, bool> = discovered.iter().copied().collect();
        let positions: Vec<usize> = discovered.iter().map(|(p, _)| *p).collect();
        let ordered = order::topological_order(&index, &positions);
        let visible = with_enclosing_loops(&index, visible_in_scope(&index, ordered, &chain), &chain);

        let mut arg_map = ArgMap::new();
        let mut previous_nodes = Vec::with_capacity(visible.len());
        for p in visible {
            let node = index.node_at(p);
            let output_args = materializer.exposed_args(node, chain.contains(&p), &arg_map);
            arg_map.insert_node(&node.id, &output_args);
            previous_nodes.push(PreviousNode {
                id: node.id.clone(),
                name: node.name.clone(),
                node_type: node.node_type,
                output_args,
                via_exception: via_exception.get(&p).copied().unwrap_or(false),
            });
        }

        let mut inner_previous_nodes = Vec::new();
        if index.node_at(t).is_loop() {
            for p in inner_previous(&index, t) {
                let node = index.node_at(p);
                let output_args: Vec<ArgDef> = materializer
                    .exposed_args(node, false, &arg_map)
                    .iter()
                    .map(aggregate)
                    .collect();
                arg_map.insert_node(&node.id, &output_args);
                inner_previous_nodes.push(PreviousNode {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    node_type: node.node_type,
                    output_args,
                    via_exception: false,
                });
            }

            // The Loop's own variables, so its aggregate outputs can bind to them
            let looped = index.node_at(t);
            let variables = loop_variables(looped, &arg_map);
            if !variables.is_empty() {
                arg_map.insert_node(&looped.id, &variables);
                inner_previous_nodes.push(PreviousNode {
                    id: looped.id.clone(),
                    name: looped.name.clone(),
                    node_type: looped.node_type,
                    output_args: variables,
                    via_exception: false,
                });
            }
        }

        debug!(
            "Resolved {}: {} previous, {} inner, {} tokens",
            target,
            previous_nodes.len(),
            inner_previous_nodes.len(),
            arg_map.len()
        );

        NodePreviousArgs {
            previous_nodes,
            inner_previous_nodes,
            arg_map,
        }
    }

    /// Referenceable variables of `target`, grouped by upstream node
    pub fn available_variables(&self, target: &NodeId, graph: &WorkflowGraph) -> Vec<AvailableNode> {
        let resolved = self.resolve(target, graph);
        resolved
            .previous_nodes
            .iter()
            .chain(resolved.inner_previous_nodes.iter())
            .map(|node| AvailableNode {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.node_type,
                variables: node
                    .output_args
                    .iter()
                    .map(|arg| AvailableVariable {
                        key: token_for(&node.id, &arg.name),
                        name: arg.name.clone(),
                        data_type: arg
                            .data_type
                            .as_ref()
                            .map(DataType::tag)
                            .unwrap_or_else(|| DataType::string().tag()),
                        path: arg.name.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Builder for a [`Resolver`]
#[derive(Debug, Clone, Default)]
pub struct ResolverBuilder {
    system_variables: Vec<ArgDef>,
}

impl ResolverBuilder {
    pub fn system_variable(mut self, arg: ArgDef) -> Self {
        self.system_variables.push(arg);
        self
    }

    pub fn system_variables(mut self, args: impl IntoIterator<Item = ArgDef>) -> Self {
        self.system_variables.extend(args);
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            system_variables: self.system_variables,
        }
    }
}

/// Resolve `target` with the default resolver
pub fn calculate_node_previous_args(target: &NodeId, graph: &WorkflowGraph) -> NodePreviousArgs {
    Resolver::new().resolve(target, graph)
}

/// Picker view of `target`'s scope with the default resolver
pub fn available_variables(target: &NodeId, graph: &WorkflowGraph) -> Vec<AvailableNode> {
    Resolver::new().available_variables(target, graph)
}

/// Keep nodes outside any loop body, or inside a body that encloses the target
fn visible_in_scope(index: &GraphIndex<'_>, ordered: Vec<usize>, chain: &[usize]) -> Vec<usize> {
    ordered
        .into_iter()
        .filter(|&p| index.parent_loop_at(p).is_none_or(|l| chain.contains(&l)))
        .collect()
}

/// Enclosing Loops always belong to the scope of their body nodes. A missing one
/// is placed before the first visible node of its body.
fn with_enclosing_loops(index: &GraphIndex<'_>, mut visible: Vec<usize>, chain: &[usize]) -> Vec<usize> {
    for &l in chain.iter().rev() {
        if visible.contains(&l) {
            continue;
        }
        let at = visible
            .iter()
            .position(|&p| index.loop_chain_at(p).contains(&l))
            .unwrap_or(visible.len());
        visible.insert(at, l);
    }
    visible
}

/// Body nodes of Loop `l` that are its end node or reach it, dependency order
fn inner_previous(index: &GraphIndex<'_>, l: usize) -> Vec<usize> {
    let Some(end) = index
        .node_at(l)
        .inner_end_node_id
        .as_ref()
        .and_then(|id| index.position(id))
        .filter(|&e| index.parent_loop_at(e) == Some(l))
    else {
        return Vec::new();
    };

    let mut members = vec![false; index.len()];
    members[end] = true;
    let mut queue = VecDeque::from([end]);
    while let Some(v) = queue.pop_front() {
        for &(u, _) in index.in_edges_at(v) {
            if !members[u] && index.parent_loop_at(u) == Some(l) {
                members[u] = true;
                queue.push_back(u);
            }
        }
    }

    let in_graph_order: Vec<usize> = (0..index.len()).filter(|&p| members[p]).collect();
    order::topological_order(index, &in_graph_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ExceptionHandleConfig, NodeType};
    use crate::test_support::*;

    #[test]
    fn test_branch_scenario_order() {
        let result = calculate_node_previous_args(&"3".into(), &diamond());
        assert_eq!(result.previous_ids(), vec!["1", "2", "4"]);
        assert!(result.arg_map.contains("1.SYS_USER_ID"));
    }

    #[test]
    fn test_loop_scenario() {
        let graph = loop_graph();
        let result = calculate_node_previous_args(&"3".into(), &graph);

        assert!(result.arg_map.contains("2.arr_item"));
        assert!(result.arg_map.contains("2.INDEX"));
        assert!(result.arg_map.contains("1.arr"));
        let item = result.arg_map.get("2.arr_item").unwrap();
        assert_eq!(item.data_type, Some(DataType::Object));
        assert_eq!(item.sub_args[0].name, "field");
        assert!(!result.arg_map.contains("2.results"));
    }

    #[test]
    fn test_sibling_outside_loop_sees_only_outputs() {
        let graph = loop_graph();
        let result = calculate_node_previous_args(&"4".into(), &graph);

        assert_eq!(result.previous_ids(), vec!["1", "2"]);
        assert!(!result.arg_map.contains("2.arr_item"));
        assert!(!result.arg_map.contains("2.INDEX"));
        assert!(result.arg_map.contains("2.results"));
        assert!(!result.arg_map.contains("3.out"));
    }

    #[test]
    fn test_nested_loops() {
        // Start(1) → Outer(2) ⊃ [Inner(3) ⊃ [Code(4)]] → End(5)
        let rows = ArgDef::new("rows", DataType::array_of(DataType::Object))
            .with_sub_args(vec![ArgDef::new(
                "cells",
                DataType::array_of(DataType::string()),
            )]);
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]).with_output_args(vec![rows]),
            node("2", NodeType::Loop)
                .with_next(["3", "5"])
                .with_input_args(vec![ArgDef::new("rows", DataType::array_of(DataType::Object)).bound_to("1.rows")]),
            node("3", NodeType::Loop)
                .in_loop("2")
                .with_next(["4", "2"])
                .with_input_args(vec![ArgDef::new("cells", DataType::array_of(DataType::string())).bound_to("2.rows_item.cells")]),
            node("4", NodeType::Code).in_loop("3").with_next(["3"]),
            node("5", NodeType::End),
        ]);

        let inner = calculate_node_previous_args(&"4".into(), &graph);
        assert_eq!(inner.previous_ids(), vec!["1", "2", "3"]);
        assert!(inner.arg_map.contains("2.rows_item"));
        assert_eq!(
            inner.arg_map.get("3.cells_item").unwrap().data_type,
            Some(DataType::string())
        );

        let middle = calculate_node_previous_args(&"3".into(), &graph);
        assert!(middle.arg_map.contains("2.rows_item"));
        assert!(!middle.arg_map.contains("3.cells_item"));

        let outer = calculate_node_previous_args(&"5".into(), &graph);
        assert_eq!(outer.previous_ids(), vec!["1", "2"]);
        assert!(!outer.arg_map.contains("2.rows_item"));
    }

    #[test]
    fn test_exception_predecessor_included() {
        let mut llm = node("2", NodeType::Llm).with_next(["4"]);
        llm.node_config.output_args = vec![ArgDef::new("answer", DataType::string())];
        llm.node_config.exception_handle_config = Some(ExceptionHandleConfig::execute_flow(["3"]));
        let graph = WorkflowGraph::new(vec![
            start("1").with_next(["2"]),
            llm,
            node("3", NodeType::Code).with_next(["5"]),
            node("4", NodeType::End),
            node("5", NodeType::End),
        ]);

        let result = calculate_node_previous_args(&"5".into(), &graph);
        assert_eq!(result.previous_ids(), vec!["1", "2", "3"]);
        assert!(result.previous_nodes.iter().all(|n| n.via_exception));
        assert!(result.arg_map.contains("2.answer"));
    }

    #[test]
    fn test_loop_target_inner_previous_nodes() {
        let mut graph = loop_graph();
        graph.nodes[1].inner_end_node_id = Some("3".into());
        let result = calculate_node_previous_args(&"2".into(), &graph);

        assert_eq!(result.previous_ids(), vec!["1"]);
        assert_eq!(result.inner_previous_nodes.len(), 1);
        let out = &result.inner_previous_nodes[0].output_args[0];
        assert_eq!(out.data_type, Some(DataType::array_of(DataType::string())));
        assert_eq!(out.origin_data_type, Some(DataType::string()));
        assert!(result.arg_map.contains("3.out"));
    }

    #[test]
    fn test_loop_target_exposes_own_variables() {
        let mut graph = loop_graph();
        graph.nodes[1].inner_end_node_id = Some("3".into());
        graph.nodes[1].node_config.variable_args = vec![
            ArgDef::new("rows", DataType::array_of(DataType::Object)).bound_to("1.arr"),
            ArgDef::new("count", DataType::integer()).with_literal("0"),
        ];
        let result = calculate_node_previous_args(&"2".into(), &graph);

        let ids: Vec<_> = result.inner_previous_nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
        let loop_vars = &result.inner_previous_nodes[1];
        assert_eq!(loop_vars.output_args.len(), 2);
        assert_eq!(loop_vars.output_args[0].sub_args[0].name, "field");
        assert!(loop_vars.output_args[0].reference().is_none());
        assert!(result.arg_map.contains("2.rows"));
        assert!(result.arg_map.contains("2.count"));
        assert!(result.arg_map.resolve("2.rows.field").is_some());
    }

    #[test]
    fn test_loop_target_without_variables_adds_no_entry() {
        let mut graph = loop_graph();
        graph.nodes[1].inner_end_node_id = Some("3".into());
        let result = calculate_node_previous_args(&"2".into(), &graph);
        assert!(result.inner_previous_nodes.iter().all(|n| n.id.as_str() != "2"));
        assert!(!result.arg_map.contains("2.INDEX"));
    }

    #[test]
    fn test_extra_system_variables() {
        let resolver = Resolver::builder()
            .system_variable(ArgDef::system("SYS_TENANT_ID", DataType::string(), "Tenant"))
            .build();
        let mut graph = diamond();
        graph
            .system_variables
            .push(ArgDef::system("SYS_APP_ID", DataType::string(), "App"));

        let result = resolver.resolve(&"2".into(), &graph);
        let names: Vec<_> = result.previous_nodes[0]
            .output_args
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["SYS_USER_ID", "SYS_APP_ID", "SYS_TENANT_ID"]);
    }

    #[test]
    fn test_idempotent() {
        let graph = loop_graph();
        let first = calculate_node_previous_args(&"3".into(), &graph);
        let second = calculate_node_previous_args(&"3".into(), &graph);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_unknown_target_is_empty() {
        let result = calculate_node_previous_args(&"404".into(), &diamond());
        assert!(result.is_empty());
        assert!(result.arg_map.is_empty());
    }

    #[test]
    fn test_available_variables() {
        let vars = available_variables(&"3".into(), &loop_graph());
        let keys: Vec<_> = vars
            .iter()
            .flat_map(|n| n.variables.iter().map(|v| v.key.as_str()))
            .collect();
        assert_eq!(keys, vec!["1.arr", "1.SYS_USER_ID", "2.arr_item", "2.INDEX"]);
        assert_eq!(vars[1].variables[0].data_type, "Object");
    }
}
