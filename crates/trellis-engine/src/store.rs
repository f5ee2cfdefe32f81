//! Graph node store and secondary indexes
//!
//! The `GraphStore` owns the node collection and every derived index. Indexes
//! are rebuilt incrementally on each insertion, never lazily. Re-inserting a
//! node under an existing key removes the old index footprint first, so no
//! stale entries survive a replacement.
//!
//! The store has no internal concurrency: callers serialize access, and a
//! multi-threaded host must wrap every public operation in one exclusive
//! critical section.

use crate::cache::QueryCache;
use crate::config::EngineConfig;
use crate::similarity::cosine_similarity;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, info};
use trellis_core::{Error, Node, NodeKey, Result};

/// Observational summary of the store
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Total node count
    pub nodes: usize,

    /// Node count per type label
    pub nodes_by_type: BTreeMap<String, usize>,

    /// Distinct (property, value) buckets in the property index
    pub property_index_entries: usize,

    /// Distinct (source, relationship) buckets in the edge index
    pub edge_index_entries: usize,

    /// Live cache entries
    pub cache_entries: usize,

    /// Cache hit count since startup
    pub cache_hits: u64,

    /// Cache miss count since startup
    pub cache_misses: u64,

    /// Queries actually executed (cache misses that ran the pipeline)
    pub executions: u64,
}

/// In-memory node store with type, property, and edge indexes plus a result
/// cache.
pub struct GraphStore {
    pub(crate) config: EngineConfig,

    /// Node records by canonical key
    pub(crate) nodes: HashMap<String, Node>,

    /// type label -> node keys, in insertion order
    pub(crate) type_index: HashMap<String, Vec<String>>,

    /// property name -> value key -> node keys
    pub(crate) property_index: HashMap<String, HashMap<String, Vec<String>>>,

    /// "source:relationship" -> target keys
    pub(crate) edge_index: HashMap<String, Vec<String>>,

    pub(crate) cache: QueryCache,

    /// Pipeline executions, observable through `stats()`
    pub(crate) executions: u64,
}

impl GraphStore {
    /// Create a store with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        let cache = QueryCache::new(config.cache_ttl);
        Self {
            config,
            nodes: HashMap::new(),
            type_index: HashMap::new(),
            property_index: HashMap::new(),
            edge_index: HashMap::new(),
            cache,
            executions: 0,
        }
    }

    /// Insert or replace a node.
    ///
    /// Replacement removes the previous index footprint before reindexing, so
    /// the indexes never point at values the node no longer holds.
    pub fn add_node(&mut self, node: Node) {
        let key = node.key.as_str().to_string();

        if let Some(previous) = self.nodes.remove(&key) {
            self.deindex(&previous);
        }

        self.type_index
            .entry(node.kind.clone())
            .or_default()
            .push(key.clone());

        for (prop, value) in node.properties.iter() {
            self.property_index
                .entry(prop.clone())
                .or_default()
                .entry(value.index_key())
                .or_default()
                .push(key.clone());
        }

        for edge in &node.edges {
            self.edge_index
                .entry(edge_bucket(&key, &edge.relationship))
                .or_default()
                .push(edge.target.as_str().to_string());
        }

        debug!(key = %key, kind = %node.kind, "indexed node");
        self.nodes.insert(key, node);
    }

    /// Remove a node's entries from every index
    fn deindex(&mut self, node: &Node) {
        let key = node.key.as_str();

        if let Some(keys) = self.type_index.get_mut(&node.kind) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.type_index.remove(&node.kind);
            }
        }

        for (prop, value) in node.properties.iter() {
            if let Some(buckets) = self.property_index.get_mut(prop) {
                if let Some(keys) = buckets.get_mut(&value.index_key()) {
                    keys.retain(|k| k != key);
                    if keys.is_empty() {
                        buckets.remove(&value.index_key());
                    }
                }
                if buckets.is_empty() {
                    self.property_index.remove(prop);
                }
            }
        }

        for edge in &node.edges {
            self.edge_index.remove(&edge_bucket(key, &edge.relationship));
        }
    }

    /// Look up a node by identity
    pub fn get_node<K: Into<NodeKey>>(&self, key: K) -> Option<&Node> {
        self.nodes.get(key.into().as_str())
    }

    /// All nodes with the given type label, in insertion order
    pub fn get_nodes_by_type(&self, kind: &str) -> Vec<Node> {
        self.type_index
            .get(kind)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| self.nodes.get(k))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Exact-match property lookup via the property index.
    ///
    /// An absent property name or value yields an empty result, not an error.
    pub fn find_by_property(&self, key: &str, value: &trellis_core::Value) -> Vec<Node> {
        self.property_index
            .get(key)
            .and_then(|buckets| buckets.get(&value.index_key()))
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| self.nodes.get(k))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Targets of a node's edges with the given relationship, via the edge
    /// index
    pub fn targets_of<K: Into<NodeKey>>(&self, source: K, relationship: &str) -> Vec<NodeKey> {
        self.edge_index
            .get(&edge_bucket(source.into().as_str(), relationship))
            .map(|keys| keys.iter().map(|k| NodeKey::new(k.clone())).collect())
            .unwrap_or_default()
    }

    /// Breadth-first traversal from `start`, following only edges whose
    /// relationship is in `relationships`, at most `max_depth` hops out.
    ///
    /// The start node is excluded from the result; each reachable node
    /// appears once, in discovery order.
    pub fn traverse<K: Into<NodeKey>>(
        &self,
        start: K,
        relationships: &[String],
        max_depth: usize,
    ) -> Result<Vec<Node>> {
        let start = start.into();
        if !self.nodes.contains_key(start.as_str()) {
            return Err(Error::NodeNotFound(start.to_string()));
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.as_str().to_string());

        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        queue.push_back((start.as_str().to_string(), 0));

        let mut result = Vec::new();
        while let Some((key, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(node) = self.nodes.get(&key) else {
                continue;
            };
            for edge in node.edges_with(relationships) {
                let target = edge.target.as_str();
                if !visited.insert(target.to_string()) {
                    continue;
                }
                if let Some(reached) = self.nodes.get(target) {
                    result.push(reached.clone());
                }
                queue.push_back((target.to_string(), depth + 1));
            }
        }

        Ok(result)
    }

    /// Cosine-similarity search over node embeddings.
    ///
    /// Candidates are optionally restricted to one type; nodes without an
    /// embedding are skipped. Hits below `threshold` are dropped, the rest
    /// sorted by similarity descending and truncated to `limit`.
    pub fn vector_search(
        &self,
        query: &[f32],
        kind: Option<&str>,
        limit: usize,
        threshold: f32,
    ) -> Vec<Node> {
        let candidates: Vec<&Node> = match kind {
            Some(kind) => self
                .type_index
                .get(kind)
                .map(|keys| keys.iter().filter_map(|k| self.nodes.get(k)).collect())
                .unwrap_or_default(),
            None => self.nodes.values().collect(),
        };

        let mut scored: Vec<(f32, &Node)> = candidates
            .into_iter()
            .filter_map(|node| {
                let embedding = node.embedding.as_ref()?;
                let score = cosine_similarity(query, embedding);
                (score >= threshold).then_some((score, node))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored.into_iter().map(|(_, node)| node.clone()).collect()
    }

    /// Vector search with the configured defaults for limit and threshold
    pub fn vector_search_default(&self, query: &[f32], kind: Option<&str>) -> Vec<Node> {
        self.vector_search(
            query,
            kind,
            self.config.vector_limit,
            self.config.vector_threshold,
        )
    }

    /// Total node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Observational summary for status reporting
    pub fn stats(&self) -> StoreStats {
        let nodes_by_type = self
            .type_index
            .iter()
            .map(|(kind, keys)| (kind.clone(), keys.len()))
            .collect();
        let property_index_entries = self
            .property_index
            .values()
            .map(|buckets| buckets.len())
            .sum();

        StoreStats {
            nodes: self.nodes.len(),
            nodes_by_type,
            property_index_entries,
            edge_index_entries: self.edge_index.len(),
            cache_entries: self.cache.len(),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            executions: self.executions,
        }
    }

    /// Empty the node collection, every index, and the cache
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.type_index.clear();
        self.property_index.clear();
        self.edge_index.clear();
        self.cache.clear();
        info!("store cleared");
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn edge_bucket(source: &str, relationship: &str) -> String {
    format!("{source}:{relationship}")
}
