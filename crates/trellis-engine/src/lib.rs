//! In-memory graph engine: node store, secondary indexes, query execution,
//! TTL result cache, and embedding similarity search.
//!
//! The engine holds everything in process memory. A [`GraphStore`] owns the
//! nodes and their type, property, and edge indexes; compiled queries from
//! `trellis-query` run through [`GraphStore::execute`], which consults a
//! per-store result cache keyed by the query's canonical form.

pub mod cache;
pub mod config;
pub mod executor;
pub mod similarity;
pub mod store;

pub use cache::{cache_key, QueryCache};
pub use config::EngineConfig;
pub use executor::Row;
pub use similarity::cosine_similarity;
pub use store::{GraphStore, StoreStats};
