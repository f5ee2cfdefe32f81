//! End-to-end tests: query text through the parser, planner, and engine.

use std::time::Duration;
use trellisdb::{
    parse, Edge, EngineConfig, GraphStore, Node, QueryPlanner, Row, Value,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn shop() -> GraphStore {
    let mut store = GraphStore::default();
    store.add_node(
        Node::new("user:1", "user")
            .with_property("status", "active")
            .with_property("name", "Alice")
            .with_edge(Edge::new("HAS_ORDER", "order:101")),
    );
    store.add_node(
        Node::new("user:2", "user")
            .with_property("status", "inactive")
            .with_property("name", "Bob"),
    );
    store.add_node(
        Node::new("order:101", "order")
            .with_property("total", 140.0)
            .with_property("status", "shipped")
            .with_edge(Edge::new("CONTAINS", "product:7")),
    );
    store.add_node(
        Node::new("order:102", "order")
            .with_property("total", 60.0)
            .with_property("status", "pending"),
    );
    store.add_node(
        Node::new("product:7", "product")
            .with_property("price", 140.0)
            .with_property("name", "keyboard"),
    );
    store.add_node(
        Node::new("product:8", "product")
            .with_property("price", 35.0)
            .with_property("name", "mousepad"),
    );
    store
}

#[test]
fn fetch_with_inline_where() {
    init_tracing();
    let mut store = shop();

    let query = parse("FETCH user WHERE status=active").unwrap();
    let rows = store.execute(&query).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Str("Alice".into())));
}

#[test]
fn compute_counts_and_sums_orders() {
    init_tracing();
    let mut store = shop();

    let text = "\
QUERY order_report
FETCH order
COMPUTE {
    n: COUNT()
    revenue: SUM(total)
}";
    let query = parse(text).unwrap();
    let rows = store.execute(&query).unwrap();

    assert_eq!(rows.len(), 1);
    let props = rows[0].as_aggregate().unwrap();
    assert_eq!(props.get("n"), Some(&Value::Int(2)));
    assert_eq!(props.get("revenue"), Some(&Value::Float(200.0)));
}

#[test]
fn traversal_follows_relationship_path() {
    init_tracing();
    let mut store = shop();

    let text = "\
GRAPH_TRAVERSE
WHERE {
    start: user:1
    path: [HAS_ORDER, CONTAINS]
    depth: 2
}";
    let query = parse(text).unwrap();
    let rows = store.execute(&query).unwrap();

    let ids: Vec<String> = rows
        .iter()
        .map(|r| match r {
            Row::Node { id, .. } => id.clone(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(ids, vec!["order:101", "product:7"]);
}

#[test]
fn single_line_filter_block() {
    init_tracing();
    let mut store = shop();

    let query = parse("FETCH product { FILTER { price > 100 } }").unwrap();
    let rows = store.execute(&query).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::Str("keyboard".into())));
}

#[test]
fn sort_and_limit_compose() {
    init_tracing();
    let mut store = shop();

    let text = "\
FETCH product
SORT BY price DESC
LIMIT 1";
    let query = parse(text).unwrap();
    let rows = store.execute(&query).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("price"), Some(&Value::Float(140.0)));
}

#[test]
fn repeated_query_is_served_from_cache() {
    init_tracing();
    let mut store = shop();
    let query = parse("FETCH order WHERE status=shipped").unwrap();

    let first = store.execute(&query).unwrap();
    let second = store.execute(&query).unwrap();

    assert_eq!(first, second);
    let stats = store.stats();
    assert_eq!(stats.executions, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
}

#[test]
fn expired_cache_entry_recomputes() {
    init_tracing();
    let mut store = GraphStore::new(EngineConfig::short_ttl(Duration::from_millis(20)));
    store.add_node(Node::new("user:1", "user").with_property("status", "active"));

    let query = parse("FETCH user").unwrap();
    store.execute(&query).unwrap();
    std::thread::sleep(Duration::from_millis(40));
    store.execute(&query).unwrap();

    assert_eq!(store.stats().executions, 2);
}

#[test]
fn planner_explains_a_full_pipeline() {
    let text = "\
QUERY big_spenders
INTENT find products worth sorting
FETCH product
FILTER { price > 100 }
SORT BY price DESC
LIMIT 5";
    let query = parse(text).unwrap();
    let plan = QueryPlanner::new().compile(&query);

    assert!(plan.estimated_ms > 0.0);
    let explanation = QueryPlanner::new().explain(&query);
    assert!(explanation.contains("FETCH"));
}

#[test]
fn unknown_operation_parses_but_will_not_execute() {
    init_tracing();
    let mut store = shop();

    let query = parse("FROTZ user").unwrap();
    let err = store.execute(&query).unwrap_err();
    assert!(err.to_string().contains("FROTZ"));
}
