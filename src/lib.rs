//! TrellisDB - In-memory graph store with a declarative query language
//!
//! This is the main library crate that re-exports all TrellisDB components.

pub use trellis_core as core;
pub use trellis_engine as engine;
pub use trellis_query as query;

// Re-export commonly used types
pub use trellis_core::{Edge, Error, Node, NodeKey, Properties, Result, Value};

pub use trellis_engine::{EngineConfig, GraphStore, Row, StoreStats};
pub use trellis_query::{parse, KeywordTemplater, Query, QueryPlan, QueryPlanner, Templater};
