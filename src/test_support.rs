//! Shared graph fixtures for unit tests

use crate::arg::{ArgDef, DataType};
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeType};

pub fn node(id: &str, node_type: NodeType) -> Node {
    Node::new(id, format!("{}{}", node_type, id), node_type)
}

pub fn start(id: &str) -> Node {
    node(id, NodeType::Start)
}

/// Start(1) → A(2) → C(3) and Start(1) → B(4) → C(3)
pub fn diamond() -> WorkflowGraph {
    WorkflowGraph::new(vec![
        start("1").with_next(["2", "4"]),
        node("2", NodeType::Code).with_next(["3"]),
        node("3", NodeType::Code),
        node("4", NodeType::Code).with_next(["3"]),
    ])
}

/// Start(1, arr: Array_Object{field}) → Loop(2, arr = 1.arr) → body Code(3); Loop(2) → End(4)
pub fn loop_graph() -> WorkflowGraph {
    let arr = ArgDef::new("arr", DataType::array_of(DataType::Object))
        .with_sub_args(vec![ArgDef::new("field", DataType::string())]);
    let looped = node("2", NodeType::Loop)
        .with_next(["3", "4"])
        .with_input_args(vec![ArgDef::new("arr", DataType::array_of(DataType::Object)).bound_to("1.arr")])
        .with_output_args(vec![ArgDef::new("results", DataType::array_of(DataType::Object))]);

    WorkflowGraph::new(vec![
        start("1").with_next(["2"]).with_output_args(vec![arr]),
        looped,
        node("3", NodeType::Code)
            .in_loop("2")
            .with_next(["2"])
            .with_output_args(vec![ArgDef::new("out", DataType::string())]),
        node("4", NodeType::End),
    ])
}
