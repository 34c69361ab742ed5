//! # Flowref - Variable Reference Resolution for Workflow Graphs
//!
//! Flow-sensitive, scope-aware analysis over a node-based workflow graph.
//!
//! Flowref provides:
//! - Upstream scope resolution: which node outputs a target node may reference
//! - A flat `"<nodeId>.<argName>"` lookup table of referenceable arguments
//! - Reverse lookup of every field that references a given node
//! - Dangling reference checks for pre-save validation
//!
//! Every query is a pure function over an explicit graph snapshot. Nothing is
//! cached between calls.

pub mod arg;
pub mod node;
pub mod edge;
pub mod graph;
pub mod arg_map;
pub mod reference;
pub mod scope;
pub mod references;
pub mod validate;
pub mod ignore;
pub mod watcher;
pub mod output;
pub mod config;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use arg::{ArgDef, BindValueType, DataType, FileKind, ScalarKind};
pub use node::{Node, NodeId, NodeType};
pub use edge::{Edge, EdgeKind};
pub use graph::{GraphIndex, WorkflowGraph};
pub use arg_map::ArgMap;
pub use reference::{parse_reference, ReferenceToken};
pub use scope::{
    available_variables, calculate_node_previous_args, AvailableNode, AvailableVariable,
    NodePreviousArgs, PreviousNode, Resolver, ResolverBuilder,
};
pub use references::{
    find_dependents, find_references_to_node, scan_references, Dependent, FieldReference,
};
pub use validate::{
    check_graph, check_graph_with, dangling_references, get_referenced_arg, is_valid_reference,
    NodeIssues,
};
pub use output::{emit_success, OutputMode};

/// Result type alias for Flowref operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Flowref operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    #[error("Invalid reference token: {0}")]
    InvalidToken(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Snapshot error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
