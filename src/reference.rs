//! Reference tokens - `"<nodeId>.<argPath>"`
//!
//! A token names an upstream argument. It appears either as a structured
//! `bindValue` or embedded as `{{token}}` in free-text template fields.

use crate::node::NodeId;
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const TEMPLATE_PATTERN: &str = r"\{\{([^}]+)\}\}";

/// Parsed reference token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceToken {
    pub node_id: NodeId,
    /// Argument name followed by nested field names
    pub path: Vec<String>,
}

impl ReferenceToken {
    pub fn new(node_id: impl Into<NodeId>, path: &[&str]) -> Self {
        Self {
            node_id: node_id.into(),
            path: path.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse `"<nodeId>.<argName>[.<field>...]"`.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let (node_id, rest) = token
            .split_once('.')
            .ok_or_else(|| Error::InvalidToken(token.to_string()))?;
        if node_id.is_empty() || rest.is_empty() {
            return Err(Error::InvalidToken(token.to_string()));
        }
        let path: Vec<String> = rest.split('.').map(str::to_string).collect();
        if path.iter().any(String::is_empty) {
            return Err(Error::InvalidToken(token.to_string()));
        }

        Ok(Self {
            node_id: NodeId::new(node_id),
            path,
        })
    }

    /// First-level argument name
    pub fn arg_name(&self) -> &str {
        &self.path[0]
    }

    /// Path below the node id, dot-joined
    pub fn full_path(&self) -> String {
        self.path.join(".")
    }

    /// Token naming only the first-level argument, the arg map key
    pub fn root_token(&self) -> String {
        format!("{}.{}", self.node_id, self.arg_name())
    }

    pub fn points_at(&self, node_id: &NodeId) -> bool {
        &self.node_id == node_id
    }
}

impl FromStr for ReferenceToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ReferenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.full_path())
    }
}

impl Serialize for ReferenceToken {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ReferenceToken {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ReferenceToken::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse a reference token
pub fn parse_reference(token: &str) -> Result<ReferenceToken> {
    ReferenceToken::parse(token)
}

/// Every `{{token}}` embedded in a template string, trimmed, in order of appearance.
pub fn template_tokens(text: &str) -> Vec<&str> {
    static TEMPLATE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TEMPLATE_REGEX
        .get_or_init(|| Regex::new(TEMPLATE_PATTERN).expect("template pattern compiles"));

    regex
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_path() {
        let token = ReferenceToken::parse("12.output.field").unwrap();
        assert_eq!(token.node_id.as_str(), "12");
        assert_eq!(token.arg_name(), "output");
        assert_eq!(token.full_path(), "output.field");
        assert_eq!(token.root_token(), "12.output");
        assert_eq!(token.to_string(), "12.output.field");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "12", ".out", "12.", "12..x"] {
            assert!(
                matches!(ReferenceToken::parse(bad), Err(Error::InvalidToken(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_template_tokens_every_occurrence() {
        let text = "Hi {{1.name}}, see {{ 2.doc.title }} and {{1.name}} {{}} {{ }}";
        assert_eq!(template_tokens(text), vec!["1.name", "2.doc.title", "1.name"]);
        assert!(template_tokens("no templates here {1.x}").is_empty());
    }
}
