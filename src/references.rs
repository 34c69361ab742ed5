//! Reverse-Reference Finder - fields of a node that point at another node
//!
//! Each node type declares which of its fields may carry references:
//! - structured bindings (`bindValueType = Reference`) in argument lists
//! - condition operands of Condition branches
//! - `{{token}}` templates in free-text fields, on every node type
//!
//! Field paths carry array indices, e.g. `inputArgs[2].question`.

use crate::arg::ArgDef;
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeConfig, NodeId, NodeType};
use crate::reference::{template_tokens, ReferenceToken};
use serde::Serialize;

/// A field carrying a reference token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldReference {
    pub field: String,
    pub token: String,
}

impl FieldReference {
    pub fn new(field: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            token: token.into(),
        }
    }

    /// Node the token points at, if the token is well formed
    pub fn source(&self) -> Option<NodeId> {
        ReferenceToken::parse(&self.token).ok().map(|t| t.node_id)
    }

    pub fn points_at(&self, node_id: &NodeId) -> bool {
        self.source().is_some_and(|id| &id == node_id)
    }
}

/// Argument lists that may hold reference bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgField {
    InputArgs,
    VariableArgs,
    Headers,
    Queries,
    Body,
}

impl ArgField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgField::InputArgs => "inputArgs",
            ArgField::VariableArgs => "variableArgs",
            ArgField::Headers => "headers",
            ArgField::Queries => "queries",
            ArgField::Body => "body",
        }
    }

    fn args<'a>(&self, cfg: &'a NodeConfig) -> &'a [ArgDef] {
        match self {
            ArgField::InputArgs => &cfg.input_args,
            ArgField::VariableArgs => &cfg.variable_args,
            ArgField::Headers => &cfg.headers,
            ArgField::Queries => &cfg.queries,
            ArgField::Body => &cfg.body,
        }
    }
}

/// Free-text fields scanned for `{{token}}` templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    SystemPrompt,
    UserPrompt,
    Question,
    Url,
    Text,
    Content,
}

impl TextField {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::SystemPrompt => "systemPrompt",
            TextField::UserPrompt => "userPrompt",
            TextField::Question => "question",
            TextField::Url => "url",
            TextField::Text => "text",
            TextField::Content => "content",
        }
    }

    fn value<'a>(&self, cfg: &'a NodeConfig) -> Option<&'a str> {
        match self {
            TextField::SystemPrompt => cfg.system_prompt.as_deref(),
            TextField::UserPrompt => cfg.user_prompt.as_deref(),
            TextField::Question => cfg.question.as_deref(),
            TextField::Url => cfg.url.as_deref(),
            TextField::Text => cfg.text.as_deref(),
            TextField::Content => cfg.content.as_deref(),
        }
    }
}

/// Reference-carrying fields of one node type
#[derive(Debug, Clone, Copy)]
pub struct ReferenceFields {
    pub args: &'static [ArgField],
    pub conditions: bool,
    pub text: &'static [TextField],
}

const INPUTS: &[ArgField] = &[ArgField::InputArgs];
const WITH_VARIABLES: &[ArgField] = &[ArgField::InputArgs, ArgField::VariableArgs];
const HTTP_ARGS: &[ArgField] = &[
    ArgField::InputArgs,
    ArgField::Headers,
    ArgField::Queries,
    ArgField::Body,
];

/// Every free-text field is scanned on every node type. Forms reuse fields
/// across types, e.g. a Database node keeps its SQL template in `systemPrompt`.
const ALL_TEXT: &[TextField] = &[
    TextField::SystemPrompt,
    TextField::UserPrompt,
    TextField::Question,
    TextField::Url,
    TextField::Text,
    TextField::Content,
];

impl ReferenceFields {
    pub fn of(node_type: NodeType) -> Self {
        let (args, conditions) = match node_type {
            NodeType::HttpRequest => (HTTP_ARGS, false),
            NodeType::Loop | NodeType::Variable => (WITH_VARIABLES, false),
            NodeType::Condition => (INPUTS, true),
            NodeType::Start
            | NodeType::End
            | NodeType::Output
            | NodeType::Llm
            | NodeType::IntentRecognition
            | NodeType::Knowledge
            | NodeType::Plugin
            | NodeType::Workflow
            | NodeType::Code
            | NodeType::DocumentExtraction
            | NodeType::Qa
            | NodeType::TextProcessing
            | NodeType::LoopBreak
            | NodeType::LoopContinue
            | NodeType::Database
            | NodeType::LongTermMemory => (INPUTS, false),
        };
        Self {
            args,
            conditions,
            text: ALL_TEXT,
        }
    }

    /// Every reference the node carries in these fields, field order then position
    pub fn scan(&self, node: &Node) -> Vec<FieldReference> {
        let cfg = node.config();
        let mut found = Vec::new();

        for field in self.args {
            for (i, arg) in field.args(cfg).iter().enumerate() {
                if let Some(token) = arg.reference() {
                    found.push(FieldReference::new(
                        format!("{}[{}].{}", field.as_str(), i, arg.name),
                        token,
                    ));
                }
            }
        }

        if self.conditions {
            for (i, branch) in cfg.condition_branch_configs.iter().enumerate() {
                for (j, args) in branch.condition_args.iter().enumerate() {
                    let operands = [("firstArg", &args.first_arg), ("secondArg", &args.second_arg)];
                    for (side, operand) in operands {
                        if let Some(token) = operand.as_ref().and_then(|o| o.reference()) {
                            found.push(FieldReference::new(
                                format!("conditionBranchConfigs[{}].conditionArgs[{}].{}", i, j, side),
                                token,
                            ));
                        }
                    }
                }
            }
        }

        for field in self.text {
            if let Some(text) = field.value(cfg) {
                found.extend(
                    template_tokens(text)
                        .into_iter()
                        .map(|token| FieldReference::new(field.as_str(), token)),
                );
            }
        }

        found
    }
}

/// Every reference a node carries, regardless of what it points at
pub fn scan_references(node: &Node) -> Vec<FieldReference> {
    ReferenceFields::of(node.node_type).scan(node)
}

/// Fields of `node` whose token points at `source`
pub fn find_references_to_node(source: &NodeId, node: &Node) -> Vec<FieldReference> {
    scan_references(node)
        .into_iter()
        .filter(|r| r.points_at(source))
        .collect()
}

/// References to `source` held by one node of the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependent {
    pub node_id: NodeId,
    pub node_name: String,
    pub references: Vec<FieldReference>,
}

/// Every node of the graph referencing `source`, graph order
pub fn find_dependents(source: &NodeId, graph: &WorkflowGraph) -> Vec<Dependent> {
    graph
        .index()
        .nodes()
        .filter_map(|node| {
            let references = find_references_to_node(source, node);
            (!references.is_empty()).then(|| Dependent {
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                references,
            })
        })
        .collect()
}
