//! Compiled query representation
//!
//! A `Query` is the structured, immutable result of parsing query text. It is
//! produced once by the compiler and consumed by the engine; clause maps are
//! `BTreeMap`s so the serde serialization of a query is canonical and can key
//! the engine's result cache.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use trellis_core::Value;

/// The operation a query performs.
///
/// Unknown operation keywords are carried through as `Other` and rejected by
/// the engine at execution time, not by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Fetch,
    Insert,
    Update,
    Delete,
    Traverse,
    Other(String),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Fetch => write!(f, "FETCH"),
            Operation::Insert => write!(f, "INSERT"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
            Operation::Traverse => write!(f, "GRAPH_TRAVERSE"),
            Operation::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Aggregate functions usable in a COMPUTE clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    /// Parse an (upper-cased) function name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "COUNT" => Some(AggregateFunc::Count),
            "SUM" => Some(AggregateFunc::Sum),
            "AVG" => Some(AggregateFunc::Avg),
            "MIN" => Some(AggregateFunc::Min),
            "MAX" => Some(AggregateFunc::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

/// One COMPUTE entry: `FUNC(field)`. The field is absent only for COUNT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub func: AggregateFunc,
    pub field: Option<String>,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.func.name(), self.field.as_deref().unwrap_or(""))
    }
}

/// Comparison operators usable in a FILTER clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// One FILTER entry: a comparison against a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub op: CompareOp,
    pub value: Value,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Single-field sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// A compiled query.
///
/// Absent clauses are `None`, never empty maps, so consumers can treat
/// "field present" as "clause active".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Query name from the header, informational
    pub name: String,

    /// Free-text intent from the header, informational
    pub intent: String,

    /// What the query does
    pub operation: Operation,

    /// Target collection (type label); may be empty for traversals
    pub target: String,

    /// Equality predicates (AND across fields)
    pub where_clause: Option<BTreeMap<String, Value>>,

    /// Aggregate expressions, keyed by output field name
    pub compute: Option<BTreeMap<String, Aggregate>>,

    /// Post-aggregate comparison predicates (AND across fields)
    pub filter: Option<BTreeMap<String, Condition>>,

    /// Single-field sort
    pub sort: Option<SortSpec>,

    /// Row limit, applied after sort
    pub limit: Option<usize>,
}

impl Query {
    /// A bare query with the given operation and target
    pub fn new(operation: Operation, target: &str) -> Self {
        Self {
            name: String::new(),
            intent: String::new(),
            operation,
            target: target.to_string(),
            where_clause: None,
            compute: None,
            filter: None,
            sort: None,
            limit: None,
        }
    }

    /// A bare FETCH against the given collection
    pub fn fetch(target: &str) -> Self {
        Self::new(Operation::Fetch, target)
    }

    /// A bare traversal query; `start` and `path` go in the WHERE clause
    pub fn traverse() -> Self {
        Self::new(Operation::Traverse, "")
    }

    /// Builder-style WHERE entry
    pub fn with_where<V: Into<Value>>(mut self, field: &str, value: V) -> Self {
        self.where_clause
            .get_or_insert_with(BTreeMap::new)
            .insert(field.to_string(), value.into());
        self
    }

    /// Builder-style COMPUTE entry
    pub fn with_compute(mut self, name: &str, func: AggregateFunc, field: Option<&str>) -> Self {
        self.compute.get_or_insert_with(BTreeMap::new).insert(
            name.to_string(),
            Aggregate {
                func,
                field: field.map(str::to_string),
            },
        );
        self
    }

    /// Builder-style FILTER entry
    pub fn with_filter<V: Into<Value>>(mut self, field: &str, op: CompareOp, value: V) -> Self {
        self.filter.get_or_insert_with(BTreeMap::new).insert(
            field.to_string(),
            Condition {
                op,
                value: value.into(),
            },
        );
        self
    }

    /// Builder-style sort
    pub fn with_sort(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Builder-style limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
