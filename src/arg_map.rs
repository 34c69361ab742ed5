//! Arg Map - flat lookup table of referenceable arguments
//!
//! Keys are reference tokens `"<nodeId>.<argName>"`. Only first-level names are
//! indexed; nested `subArgs` stay on their parent entry.

use crate::arg::ArgDef;
use crate::node::NodeId;
use crate::reference::ReferenceToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build the token for a node's first-level argument.
pub fn token_for(node_id: &NodeId, arg_name: &str) -> String {
    format!("{}.{}", node_id, arg_name)
}

/// Token → argument definition, ordered by token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgMap {
    entries: BTreeMap<String, ArgDef>,
}

impl ArgMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every argument a node exposes. A later entry for the same token replaces
    /// the earlier one.
    pub fn insert_node(&mut self, node_id: &NodeId, args: &[ArgDef]) {
        for arg in args {
            self.entries.insert(token_for(node_id, &arg.name), arg.clone());
        }
    }

    pub fn get(&self, token: &str) -> Option<&ArgDef> {
        self.entries.get(token)
    }

    /// Follow a token's nested path through `subArgs` below its first-level entry
    pub fn resolve(&self, token: &str) -> Option<&ArgDef> {
        let token = ReferenceToken::parse(token).ok()?;
        let mut current = self.entries.get(&token.root_token())?;
        for field in &token.path[1..] {
            current = current.sub_arg(field)?;
        }
        Some(current)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgDef)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
