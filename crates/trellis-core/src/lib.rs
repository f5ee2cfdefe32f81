//! Trellis Core Library
//!
//! Fundamental types and error handling for the trellisdb graph store.
//!
//! # Modules
//!
//! - `types` - Core data types (Node, Edge, Properties, NodeKey)
//! - `value` - The property value union
//! - `error` - Error types and result alias

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use types::{Edge, Node, NodeKey, Properties};
pub use value::Value;
