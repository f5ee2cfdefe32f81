//! Query execution pipeline
//!
//! Compiled queries run against the store in a fixed order: cache check,
//! operation dispatch, FILTER, SORT, LIMIT, COMPUTE, cache store. Only FETCH
//! and GRAPH_TRAVERSE reach the store; every other operation is rejected at
//! execution time, after parsing succeeded.

use crate::cache::cache_key;
use crate::store::GraphStore;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;
use trellis_core::{Error, Node, NodeKey, Properties, Result, Value};
use trellis_query::{CompareOp, Condition, Query, SortDirection};
use trellis_query::{Aggregate, AggregateFunc, Operation};

/// One result row.
///
/// A node row carries a snapshot of the node at execution time; an aggregate
/// row carries the computed values keyed by their COMPUTE names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum Row {
    Node {
        id: String,
        kind: String,
        properties: Properties,
    },
    Aggregate(Properties),
}

impl Row {
    pub fn from_node(node: &Node) -> Self {
        Row::Node {
            id: node.key.to_string(),
            kind: node.kind.clone(),
            properties: node.properties.clone(),
        }
    }

    /// The aggregate payload, if this is an aggregate row
    pub fn as_aggregate(&self) -> Option<&Properties> {
        match self {
            Row::Aggregate(props) => Some(props),
            Row::Node { .. } => None,
        }
    }

    /// Property lookup that works on both row shapes
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Row::Node { properties, .. } => properties.get(key),
            Row::Aggregate(props) => props.get(key),
        }
    }
}

impl GraphStore {
    /// Run a compiled query and return its rows.
    ///
    /// A fresh result is cached under the query's canonical key; a repeat of
    /// the same query within the TTL is answered from the cache without
    /// touching the pipeline. Failed executions never write a cache entry.
    pub fn execute(&mut self, query: &Query) -> Result<Vec<Row>> {
        let key = cache_key(query)?;
        if let Some(rows) = self.cache.get(key) {
            return Ok(rows);
        }

        self.executions += 1;
        debug!(name = %query.name, operation = %query.operation, "executing query");

        let mut nodes = match &query.operation {
            Operation::Fetch => self.run_fetch(query),
            Operation::Traverse => self.run_traverse(query)?,
            other => {
                return Err(Error::UnsupportedOperation(other.to_string()));
            }
        };

        if let Some(filter) = &query.filter {
            nodes.retain(|node| filter.iter().all(|(field, cond)| matches(node, field, cond)));
        }

        if let Some(sort) = &query.sort {
            nodes.sort_by(|a, b| {
                let ordering = compare_by_field(a, b, &sort.field);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            nodes.truncate(limit);
        }

        let rows = match &query.compute {
            Some(compute) => {
                let mut props = Properties::new();
                for (name, aggregate) in compute {
                    props.set(name.clone(), evaluate_aggregate(aggregate, &nodes));
                }
                vec![Row::Aggregate(props)]
            }
            None => nodes.iter().map(Row::from_node).collect(),
        };

        self.cache.put(key, rows.clone());
        Ok(rows)
    }

    /// FETCH: candidates by type, narrowed by WHERE equality on every pair
    fn run_fetch(&self, query: &Query) -> Vec<Node> {
        let mut nodes = self.get_nodes_by_type(&query.target);
        if let Some(clauses) = &query.where_clause {
            nodes.retain(|node| {
                clauses
                    .iter()
                    .all(|(field, value)| node.get_property(field) == Some(value))
            });
        }
        nodes
    }

    /// GRAPH_TRAVERSE: BFS driven by the WHERE clause's start/path/depth keys
    fn run_traverse(&self, query: &Query) -> Result<Vec<Node>> {
        let clauses = query
            .where_clause
            .as_ref()
            .ok_or_else(|| Error::MissingParameter("start".to_string()))?;

        let start = clauses
            .get("start")
            .map(NodeKey::from)
            .ok_or_else(|| Error::MissingParameter("start".to_string()))?;

        let relationships = clauses
            .get("path")
            .map(path_relationships)
            .ok_or_else(|| Error::MissingParameter("path".to_string()))?;

        let depth = clauses
            .get("depth")
            .and_then(Value::as_int)
            .map(|d| d.max(0) as usize)
            .unwrap_or(self.config.default_max_depth);

        self.traverse(start, &relationships, depth)
    }
}

/// A `path` value may be a list of relationship names or a single name
fn path_relationships(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items.iter().map(Value::to_string).collect(),
        other => vec![other.to_string()],
    }
}

/// A node passes a condition only if the property exists and the comparison
/// holds. Cross-type ordering comparisons fail the condition rather than
/// erroring.
fn matches(node: &Node, field: &str, condition: &Condition) -> bool {
    let Some(actual) = node.get_property(field) else {
        return false;
    };
    match condition.op {
        CompareOp::Eq => actual == &condition.value,
        CompareOp::Ne => actual != &condition.value,
        CompareOp::Gt => ordered(actual, &condition.value, Ordering::is_gt),
        CompareOp::Gte => ordered(actual, &condition.value, Ordering::is_ge),
        CompareOp::Lt => ordered(actual, &condition.value, Ordering::is_lt),
        CompareOp::Lte => ordered(actual, &condition.value, Ordering::is_le),
    }
}

fn ordered(actual: &Value, expected: &Value, pred: fn(Ordering) -> bool) -> bool {
    actual
        .partial_compare(expected)
        .map(pred)
        .unwrap_or(false)
}

/// Nodes with a missing or incomparable sort field keep their relative order
fn compare_by_field(a: &Node, b: &Node, field: &str) -> Ordering {
    match (a.get_property(field), b.get_property(field)) {
        (Some(left), Some(right)) => left.partial_compare(right).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

fn evaluate_aggregate(aggregate: &Aggregate, nodes: &[Node]) -> Value {
    if aggregate.func == AggregateFunc::Count {
        return Value::Int(nodes.len() as i64);
    }

    let field = aggregate.field.as_deref().unwrap_or_default();
    let values = nodes
        .iter()
        .map(|node| node.get_property(field).and_then(Value::as_float));

    match aggregate.func {
        AggregateFunc::Count => unreachable!(),
        // Missing properties contribute zero to the sum
        AggregateFunc::Sum => Value::Float(values.map(|v| v.unwrap_or(0.0)).sum()),
        AggregateFunc::Avg => {
            let sum: f64 = values.map(|v| v.unwrap_or(0.0)).sum();
            Value::Float(sum / nodes.len() as f64)
        }
        AggregateFunc::Min => Value::Float(
            values
                .flatten()
                .fold(f64::INFINITY, f64::min),
        ),
        AggregateFunc::Max => Value::Float(
            values
                .flatten()
                .fold(f64::NEG_INFINITY, f64::max),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use trellis_core::Edge;

    fn order(id: i64, total: f64, status: &str) -> Node {
        Node::new(NodeKey::from(id), "order")
            .with_property("total", total)
            .with_property("status", status)
    }

    fn seeded() -> GraphStore {
        let mut store = GraphStore::new(EngineConfig::default());
        store.add_node(order(1, 50.0, "shipped"));
        store.add_node(order(2, 120.0, "pending"));
        store.add_node(order(3, 120.0, "shipped"));
        store.add_node(order(4, 80.0, "pending"));
        store
    }

    #[test]
    fn test_fetch_by_type() {
        let mut store = seeded();
        let rows = store.execute(&Query::fetch("order")).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| matches!(r, Row::Node { kind, .. } if kind == "order")));
    }

    #[test]
    fn test_fetch_unknown_type_is_empty() {
        let mut store = seeded();
        let rows = store.execute(&Query::fetch("ghost")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_where_is_conjunctive_equality() {
        let mut store = seeded();
        let query = Query::fetch("order")
            .with_where("status", "shipped")
            .with_where("total", 120.0);
        let rows = store.execute(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("status"), Some(&Value::Str("shipped".into())));
    }

    #[test]
    fn test_filter_ordering_and_missing_property() {
        let mut store = seeded();
        store.add_node(Node::new("order:5", "order").with_property("status", "pending"));

        let query = Query::fetch("order").with_filter("total", CompareOp::Gt, 100.0);
        let rows = store.execute(&query).unwrap();
        // order:5 has no total, so it fails the condition
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_filter_numeric_cross_type() {
        let mut store = GraphStore::default();
        store.add_node(Node::new("a", "item").with_property("qty", 3i64));

        let query = Query::fetch("item").with_filter("qty", CompareOp::Gte, 3.0);
        assert_eq!(store.execute(&query).unwrap().len(), 1);
    }

    #[test]
    fn test_sort_desc_is_stable() {
        let mut store = seeded();
        let query = Query::fetch("order").with_sort("total", SortDirection::Desc);
        let rows = store.execute(&query).unwrap();

        let ids: Vec<String> = rows
            .iter()
            .map(|r| match r {
                Row::Node { id, .. } => id.clone(),
                _ => unreachable!(),
            })
            .collect();
        // 2 and 3 tie on total and keep insertion order
        assert_eq!(ids, vec!["2", "3", "4", "1"]);
    }

    #[test]
    fn test_limit_truncates_after_sort() {
        let mut store = seeded();
        let query = Query::fetch("order")
            .with_sort("total", SortDirection::Asc)
            .with_limit(2);
        let rows = store.execute(&query).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("total"), Some(&Value::Float(50.0)));
    }

    #[test]
    fn test_compute_collapses_to_one_row() {
        let mut store = seeded();
        let query = Query::fetch("order")
            .with_compute("n", AggregateFunc::Count, None)
            .with_compute("revenue", AggregateFunc::Sum, Some("total"))
            .with_compute("avg_total", AggregateFunc::Avg, Some("total"))
            .with_compute("cheapest", AggregateFunc::Min, Some("total"))
            .with_compute("priciest", AggregateFunc::Max, Some("total"));

        let rows = store.execute(&query).unwrap();
        assert_eq!(rows.len(), 1);
        let props = rows[0].as_aggregate().unwrap();
        assert_eq!(props.get("n"), Some(&Value::Int(4)));
        assert_eq!(props.get("revenue"), Some(&Value::Float(370.0)));
        assert_eq!(props.get("avg_total"), Some(&Value::Float(92.5)));
        assert_eq!(props.get("cheapest"), Some(&Value::Float(50.0)));
        assert_eq!(props.get("priciest"), Some(&Value::Float(120.0)));
    }

    #[test]
    fn test_compute_on_empty_set() {
        let mut store = seeded();
        let query = Query::fetch("ghost")
            .with_compute("n", AggregateFunc::Count, None)
            .with_compute("s", AggregateFunc::Sum, Some("total"))
            .with_compute("a", AggregateFunc::Avg, Some("total"))
            .with_compute("lo", AggregateFunc::Min, Some("total"))
            .with_compute("hi", AggregateFunc::Max, Some("total"));

        let rows = store.execute(&query).unwrap();
        let props = rows[0].as_aggregate().unwrap();
        assert_eq!(props.get("n"), Some(&Value::Int(0)));
        assert_eq!(props.get("s"), Some(&Value::Float(0.0)));
        assert!(matches!(props.get("a"), Some(Value::Float(v)) if v.is_nan()));
        assert_eq!(props.get("lo"), Some(&Value::Float(f64::INFINITY)));
        assert_eq!(props.get("hi"), Some(&Value::Float(f64::NEG_INFINITY)));
    }

    #[test]
    fn test_traverse_operation() {
        let mut store = GraphStore::default();
        store.add_node(Node::new("user:1", "user").with_edge(Edge::new("HAS_ORDER", "order:9")));
        store.add_node(Node::new("order:9", "order").with_edge(Edge::new("CONTAINS", "product:2")));
        store.add_node(Node::new("product:2", "product"));

        let query = Query::traverse()
            .with_where("start", "user:1")
            .with_where(
                "path",
                Value::List(vec![
                    Value::Str("HAS_ORDER".into()),
                    Value::Str("CONTAINS".into()),
                ]),
            );
        let rows = store.execute(&query).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_traverse_missing_parameters() {
        let mut store = GraphStore::default();
        store.add_node(Node::new("user:1", "user"));

        let err = store.execute(&Query::traverse()).unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref p) if p == "start"));

        let err = store
            .execute(&Query::traverse().with_where("start", "user:1"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter(ref p) if p == "path"));
    }

    #[test]
    fn test_unsupported_operation() {
        let mut store = seeded();
        let query = Query::new(Operation::Insert, "order");
        let err = store.execute(&query).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_cache_short_circuits_pipeline() {
        let mut store = seeded();
        let query = Query::fetch("order").with_filter("total", CompareOp::Gt, 60.0);

        let first = store.execute(&query).unwrap();
        let second = store.execute(&query).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.stats().executions, 1);
        assert_eq!(store.stats().cache_hits, 1);
    }

    #[test]
    fn test_errors_do_not_populate_cache() {
        let mut store = seeded();
        let query = Query::new(Operation::Delete, "order");
        assert!(store.execute(&query).is_err());
        assert_eq!(store.stats().cache_entries, 0);
    }
}
