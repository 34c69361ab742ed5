//! Workflow nodes - one step of the graph
//!
//! A node carries its successor edges inline (`nextNodeIds`), an optional
//! enclosing Loop (`loopNodeId`) and a type-specific `nodeConfig`.

use crate::arg::{lenient_data_type, nullable, ArgDef, BindValueType, DataType};
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable node identifier.
///
/// The editor emits numeric ids, sometimes as strings after a save round trip;
/// both forms deserialize to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => NodeId(n.to_string()),
            RawId::Text(s) => NodeId(s.trim().to_string()),
        })
    }
}

/// Closed set of node types understood by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Start,
    End,
    #[serde(rename = "LLM")]
    Llm,
    Code,
    Condition,
    IntentRecognition,
    Loop,
    LoopBreak,
    LoopContinue,
    #[serde(rename = "HTTPRequest")]
    HttpRequest,
    Knowledge,
    Database,
    Plugin,
    Workflow,
    Variable,
    TextProcessing,
    DocumentExtraction,
    Output,
    #[serde(rename = "QA")]
    Qa,
    LongTermMemory,
}

impl NodeType {
    /// Get the string representation of the node type
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Start => "Start",
            NodeType::End => "End",
            NodeType::Llm => "LLM",
            NodeType::Code => "Code",
            NodeType::Condition => "Condition",
            NodeType::IntentRecognition => "IntentRecognition",
            NodeType::Loop => "Loop",
            NodeType::LoopBreak => "LoopBreak",
            NodeType::LoopContinue => "LoopContinue",
            NodeType::HttpRequest => "HTTPRequest",
            NodeType::Knowledge => "Knowledge",
            NodeType::Database => "Database",
            NodeType::Plugin => "Plugin",
            NodeType::Workflow => "Workflow",
            NodeType::Variable => "Variable",
            NodeType::TextProcessing => "TextProcessing",
            NodeType::DocumentExtraction => "DocumentExtraction",
            NodeType::Output => "Output",
            NodeType::Qa => "QA",
            NodeType::LongTermMemory => "LongTermMemory",
        }
    }

    /// Get all node types
    pub fn all() -> &'static [NodeType] {
        &[
            NodeType::Start,
            NodeType::End,
            NodeType::Llm,
            NodeType::Code,
            NodeType::Condition,
            NodeType::IntentRecognition,
            NodeType::Loop,
            NodeType::LoopBreak,
            NodeType::LoopContinue,
            NodeType::HttpRequest,
            NodeType::Knowledge,
            NodeType::Database,
            NodeType::Plugin,
            NodeType::Workflow,
            NodeType::Variable,
            NodeType::TextProcessing,
            NodeType::DocumentExtraction,
            NodeType::Output,
            NodeType::Qa,
            NodeType::LongTermMemory,
        ]
    }
}

impl FromStr for NodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NodeType::all()
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::UnknownNodeType(s.to_string()))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a node does when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionHandleType {
    Interrupt,
    SpecificContent,
    ExecuteExceptionFlow,
}

/// Failure handling of a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionHandleConfig {
    #[serde(default)]
    pub exception_handle_type: Option<ExceptionHandleType>,
    #[serde(default, deserialize_with = "nullable")]
    pub exception_handle_node_ids: Vec<NodeId>,
}

impl ExceptionHandleConfig {
    pub fn execute_flow<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self {
            exception_handle_type: Some(ExceptionHandleType::ExecuteExceptionFlow),
            exception_handle_node_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the failure ids act as successor edges.
    ///
    /// An unset mode counts as routing to the handler nodes.
    pub fn routes_to_handlers(&self) -> bool {
        matches!(
            self.exception_handle_type,
            None | Some(ExceptionHandleType::ExecuteExceptionFlow)
        )
    }
}

/// `SET_VARIABLE` / `GET_VARIABLE` mode of a Variable node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableConfigType {
    SetVariable,
    GetVariable,
}

/// One side of a condition comparison
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bind_value_type: Option<BindValueType>,
    #[serde(default)]
    pub bind_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_data_type")]
    pub data_type: Option<DataType>,
}

impl BindConfig {
    pub fn reference(&self) -> Option<&str> {
        match (self.bind_value_type, self.bind_value.as_deref()) {
            (Some(BindValueType::Reference), Some(token)) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionArgs {
    #[serde(default)]
    pub compare_type: Option<String>,
    #[serde(default)]
    pub first_arg: Option<BindConfig>,
    #[serde(default)]
    pub second_arg: Option<BindConfig>,
}

/// One IF / ELSE_IF / ELSE branch of a Condition node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionBranchConfig {
    #[serde(default)]
    pub branch_type: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub next_node_ids: Vec<NodeId>,
    #[serde(default, deserialize_with = "nullable")]
    pub condition_args: Vec<ConditionArgs>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentConfig {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub next_node_ids: Vec<NodeId>,
}

/// Answer option of a QA node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaOption {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub next_node_ids: Vec<NodeId>,
}

/// Type-specific configuration. Fields a node type does not use stay empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub input_args: Vec<ArgDef>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub output_args: Vec<ArgDef>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub variable_args: Vec<ArgDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_type: Option<VariableConfigType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_handle_config: Option<ExceptionHandleConfig>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub condition_branch_configs: Vec<ConditionBranchConfig>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub intent_configs: Vec<IntentConfig>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QaOption>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ArgDef>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<ArgDef>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<ArgDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Loop body nodes, when the editor nests them in the config
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub inner_nodes: Vec<Node>,
}

/// One step of the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub next_node_ids: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_node_id: Option<NodeId>,
    #[serde(default, alias = "config", deserialize_with = "nullable")]
    pub node_config: NodeConfig,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub inner_nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_start_node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_end_node_id: Option<NodeId>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            next_node_ids: Vec::new(),
            loop_node_id: None,
            node_config: NodeConfig::default(),
            inner_nodes: Vec::new(),
            inner_start_node_id: None,
            inner_end_node_id: None,
        }
    }

    pub fn with_next<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.next_node_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Place this node inside the body of a Loop
    pub fn in_loop(mut self, loop_id: impl Into<NodeId>) -> Self {
        self.loop_node_id = Some(loop_id.into());
        self
    }

    pub fn with_input_args(mut self, args: Vec<ArgDef>) -> Self {
        self.node_config.input_args = args;
        self
    }

    pub fn with_output_args(mut self, args: Vec<ArgDef>) -> Self {
        self.node_config.output_args = args;
        self
    }

    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.node_config = config;
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.node_config
    }

    pub fn is_loop(&self) -> bool {
        self.node_type == NodeType::Loop
    }

    /// Nested body nodes from both places the editor may put them
    pub fn body_nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner_nodes
            .iter()
            .chain(self.node_config.inner_nodes.iter())
    }

    /// Ids activated when this node fails, if failures route to handler nodes
    pub fn exception_successors(&self) -> &[NodeId] {
        match &self.node_config.exception_handle_config {
            Some(cfg) if cfg.routes_to_handlers() => &cfg.exception_handle_node_ids,
            _ => &[],
        }
    }

    /// Successor ids introduced by branch configurations (conditions, intents, QA options)
    pub fn branch_successors(&self) -> impl Iterator<Item = &NodeId> {
        let cfg = &self.node_config;
        let conditions = cfg
            .condition_branch_configs
            .iter()
            .filter(move |_| self.node_type == NodeType::Condition)
            .flat_map(|b| b.next_node_ids.iter());
        let intents = cfg
            .intent_configs
            .iter()
            .filter(move |_| self.node_type == NodeType::IntentRecognition)
            .flat_map(|i| i.next_node_ids.iter());
        let options = cfg
            .options
            .iter()
            .filter(move |_| self.node_type == NodeType::Qa)
            .flat_map(|o| o.next_node_ids.iter());
        conditions.chain(intents).chain(options)
    }
}
