//! Edge types - control-flow relationships between workflow nodes
//!
//! Every successor relationship reduces to five edge kinds:
//! - `Next`: plain `nextNodeIds` successor
//! - `Branch`: Condition branch, intent or QA option successor
//! - `Exception`: failure handler, taken only when the source node fails
//! - `Supplemental`: canvas edge from the snapshot's edge list
//! - `LoopBody`: Loop → entry node of its body

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Edge kinds of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Next,
    Branch,
    /// Activated only on failure of the source node
    Exception,
    Supplemental,
    #[serde(rename = "loop_body")]
    LoopBody,
}

impl EdgeKind {
    /// Get the string representation of the edge kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Next => "next",
            EdgeKind::Branch => "branch",
            EdgeKind::Exception => "exception",
            EdgeKind::Supplemental => "supplemental",
            EdgeKind::LoopBody => "loop_body",
        }
    }

    /// Get all edge kinds
    pub fn all() -> &'static [EdgeKind] {
        &[
            EdgeKind::Next,
            EdgeKind::Branch,
            EdgeKind::Exception,
            EdgeKind::Supplemental,
            EdgeKind::LoopBody,
        ]
    }

    /// Whether the edge is taken on the success path
    pub fn is_normal(&self) -> bool {
        !matches!(self, EdgeKind::Exception)
    }
}

impl FromStr for EdgeKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "next" => Ok(EdgeKind::Next),
            "branch" | "condition" | "intent" | "option" => Ok(EdgeKind::Branch),
            "exception" | "error" => Ok(EdgeKind::Exception),
            "supplemental" | "edge" => Ok(EdgeKind::Supplemental),
            "loop_body" | "loop" => Ok(EdgeKind::LoopBody),
            _ => Err(crate::Error::InvalidToken(format!("Unknown edge kind: {}", s))),
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    /// Create a reversed edge (swap source/target)
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            kind: self.kind,
        }
    }
}

/// Edge list records carry only endpoints; they are always supplemental.
impl<'de> Deserialize<'de> for Edge {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Record {
            source: NodeId,
            target: NodeId,
        }

        let record = Record::deserialize(deserializer)?;
        Ok(Edge::new(record.source, record.target, EdgeKind::Supplemental))
    }
}
