//! Core graph types
//!
//! Nodes, edges, and the property map they carry. A node is the atomic
//! storage unit: a typed record with properties, outgoing edges, and an
//! optional embedding for similarity search.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical node identity.
///
/// Callers may hand in string or integer identifiers; both normalize to one
/// string form so index keys stay consistent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(String);

impl NodeKey {
    /// Create a key from anything string-like
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Get the canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<i64> for NodeKey {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&Value> for NodeKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(i) => Self(i.to_string()),
            other => Self(other.to_string()),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A labeled, optionally weighted directed edge to another node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// The relationship label (e.g. "HAS_ORDER")
    pub relationship: String,

    /// Target node identity
    pub target: NodeKey,

    /// Optional numeric weight (stored, unused by plain traversal)
    pub weight: Option<f64>,
}

impl Edge {
    /// Create an unweighted edge
    pub fn new<K: Into<NodeKey>>(relationship: &str, target: K) -> Self {
        Self {
            relationship: relationship.to_string(),
            target: target.into(),
            weight: None,
        }
    }

    /// Create a weighted edge
    pub fn weighted<K: Into<NodeKey>>(relationship: &str, target: K, weight: f64) -> Self {
        Self {
            relationship: relationship.to_string(),
            target: target.into(),
            weight: Some(weight),
        }
    }
}

/// An ordered collection of named property values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    inner: BTreeMap<String, Value>,
}

impl Properties {
    /// Create an empty property collection
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    /// Create with a single property
    pub fn with<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        let mut props = Self::new();
        props.set(key, value);
        props
    }

    /// Set a property value
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Remove a property
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    /// Check if a property exists
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Get the number of properties
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    /// Get property keys
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.inner.keys()
    }

    /// Merge with another collection (other takes precedence)
    pub fn merge(&mut self, other: Properties) {
        self.inner.extend(other.inner);
    }
}

impl IntoIterator for Properties {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl FromIterator<(String, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

/// A node in the graph store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Canonical identity
    pub key: NodeKey,

    /// Type label, also the collection name queries target
    pub kind: String,

    /// Named property values
    pub properties: Properties,

    /// Outgoing edges, in insertion order
    pub edges: Vec<Edge>,

    /// Optional dense vector for similarity search
    pub embedding: Option<Vec<f32>>,
}

impl Node {
    /// Create a new node with the given identity and type label
    pub fn new<K: Into<NodeKey>>(key: K, kind: &str) -> Self {
        Self {
            key: key.into(),
            kind: kind.to_string(),
            properties: Properties::new(),
            edges: Vec::new(),
            embedding: None,
        }
    }

    /// Builder-style property setter
    pub fn with_property<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Builder-style edge append
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Builder-style embedding setter
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Set a property
    pub fn set_property<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.properties.set(key, value);
    }

    /// Get a property
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Append an outgoing edge
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Outgoing edges carrying one of the given relationship labels
    pub fn edges_with<'a>(&'a self, relationships: &'a [String]) -> impl Iterator<Item = &'a Edge> {
        self.edges
            .iter()
            .filter(move |e| relationships.iter().any(|r| r == &e.relationship))
    }
}
