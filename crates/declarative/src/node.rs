//! Node identity and the trait shared by models and resources
//!
//! A node is identified inside its graph by a [`NodeContext`]: an ordered
//! list of `key=value` parts, rendered as `key=value,key=value`. The first
//! part names the node type and its id.

use crate::error::{Error, Result};
use crate::types::NodeKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Structured node identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeContext {
    parts: Vec<(String, String)>,
}

impl NodeContext {
    /// Create a context with a single `key=value` part
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parts: vec![(key.into(), value.into())],
        }
    }

    /// Append a part
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((key.into(), value.into()));
        self
    }

    /// Parse `key=value,key=value`
    pub fn parse(input: &str) -> Result<Self> {
        let parse_error = |reason: &str| Error::ContextParse {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.trim().is_empty() {
            return Err(parse_error("context is empty"));
        }

        let mut parts = Vec::new();
        for part in input.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| parse_error("expected key=value"))?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(parse_error("empty key or value"));
            }
            parts.push((key.to_string(), value.to_string()));
        }
        Ok(Self { parts })
    }

    pub fn parts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value of the first part with `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.parts()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Node type named by the first part
    pub fn node_name(&self) -> &str {
        self.parts.first().map_or("", |(k, _)| k.as_str())
    }

    /// Node id held by the first part
    pub fn id(&self) -> &str {
        self.parts.first().map_or("", |(_, v)| v.as_str())
    }

    /// Check if every part of `self` is also a part of `other`
    ///
    /// `region=r1` is a subset of `region=r1,account=a1,app=x`. Part order
    /// does not matter.
    pub fn is_subset_of(&self, other: &NodeContext) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|part| other.parts.contains(part))
    }
}

impl fmt::Display for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for NodeContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for NodeContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeContext {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Handle of a node inside a [`Graph`](crate::graph::Graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Handle of a dependency edge inside a [`Graph`](crate::graph::Graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) usize);

/// Core trait for graph vertices
///
/// Models and resources implement this trait. `synth`/`un_synth` are the
/// plain-data snapshot contract used for persistence; the default
/// implementations go through serde.
pub trait Node: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned {
    /// Which side of the engine this node type lives on
    const KIND: NodeKind;

    /// Identity of this node inside its graph
    fn context(&self) -> &NodeContext;

    /// Node type name, e.g. "region" or "vpc"
    fn node_name(&self) -> &str;

    /// Plain-data snapshot of this node
    fn synth(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild a node from a snapshot produced by [`Node::synth`]
    fn un_synth(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
